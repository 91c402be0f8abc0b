use colored::Colorize;
use indicatif::ProgressBar;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::runner::{AttackEvent, Outcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        return Some(OutputFormat::Yaml);
    }
    if lower.ends_with(".txt") || lower.ends_with(".log") {
        return Some(OutputFormat::Text);
    }
    None
}

// what the renderer learned from the event stream, folded into the report
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderStats {
    pub captcha_detected: bool,
    pub transport_errors: usize,
    pub explicit_failures: usize,
    pub ambiguous_failures: usize,
}

// consumes the event stream: colored lines above the progress bar, plain
// lines into the logfile, bar position from progress events
pub async fn render_events(
    pb: ProgressBar,
    mut rx: mpsc::Receiver<AttackEvent>,
    mut logfile: Option<File>,
    show_attempts: bool,
) -> RenderStats {
    let mut stats = RenderStats::default();

    while let Some(event) = rx.recv().await {
        match event {
            AttackEvent::Attempt(outcome) => match &outcome {
                Outcome::Success { password } => {
                    let msg = format!("[SUCCESS] password found: {password}");
                    pb.println(format!(
                        "{} {}",
                        "[SUCCESS]".bold().green(),
                        format!("password found: {password}").bold().white()
                    ));
                    log_line(&mut logfile, &msg).await;
                }
                Outcome::ExplicitFailure { password } => {
                    stats.explicit_failures += 1;
                    let msg = format!("[FAILURE] tried: {password} - explicit failure detected");
                    if show_attempts {
                        pb.println(format!(
                            "{} tried: {} - explicit failure detected",
                            "[FAILURE]".bold().red(),
                            password
                        ));
                    }
                    log_line(&mut logfile, &msg).await;
                }
                Outcome::AmbiguousFailure { password } => {
                    stats.ambiguous_failures += 1;
                    let msg = format!("[FAILURE] tried: {password} - no match");
                    if show_attempts {
                        pb.println(format!(
                            "{} tried: {} - no match",
                            "[FAILURE]".bold().red(),
                            password
                        ));
                    }
                    log_line(&mut logfile, &msg).await;
                }
                Outcome::CaptchaDetected { password } => {
                    stats.captcha_detected = true;
                    let msg = format!("[CAPTCHA] detected after trying: {password} - backing off");
                    pb.println(format!(
                        "{} detected after trying: {} - backing off",
                        "[CAPTCHA]".bold().yellow(),
                        password
                    ));
                    log_line(&mut logfile, &msg).await;
                }
                Outcome::TransportError { password, detail } => {
                    stats.transport_errors += 1;
                    let msg = format!("[ERROR] error trying {password}: {detail}");
                    pb.println(format!(
                        "{} error trying {}: {}",
                        "[ERROR]".bold().yellow(),
                        password,
                        detail
                    ));
                    log_line(&mut logfile, &msg).await;
                }
            },
            AttackEvent::Progress { tried, total } => {
                pb.set_position(tried as u64);
                let msg = format!("[PROGRESS] {tried}/{total} passwords tried...");
                pb.println(format!(
                    "{} {tried}/{total} passwords tried...",
                    "[PROGRESS]".bold().cyan()
                ));
                log_line(&mut logfile, &msg).await;
            }
            AttackEvent::Terminal { found } => match found {
                Some(password) => {
                    log_line(&mut logfile, &format!("[RESULT] password found: {password}")).await;
                }
                None => {
                    pb.println(format!(
                        "{} password not found in the provided list.",
                        "[RESULT]".bold().yellow()
                    ));
                    log_line(&mut logfile, "[RESULT] password not found in the provided list.")
                        .await;
                }
            },
        }
    }

    stats
}

async fn log_line(logfile: &mut Option<File>, line: &str) {
    if let Some(file) = logfile.as_mut() {
        let mut buf = line.as_bytes().to_owned();
        buf.extend_from_slice(b"\n");
        if file.write_all(&buf).await.is_err() {
            return;
        }
        let _ = file.flush().await;
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AttackReport {
    pub target: String,
    pub username: String,
    pub total_candidates: usize,
    pub attempts: usize,
    pub found: Option<String>,
    pub captcha_detected: bool,
    pub transport_errors: usize,
    pub elapsed_seconds: f64,
}

pub fn render_text(report: &AttackReport) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format!("target: {}\n", report.target));
    out.push_str(&format!("username: {}\n", report.username));
    out.push_str(&format!(
        "attempts: {}/{}\n",
        report.attempts, report.total_candidates
    ));
    match report.found.as_deref() {
        Some(password) => out.push_str(&format!("found: {}\n", password)),
        None => out.push_str("found: none\n"),
    }
    out.push_str(&format!("captcha_detected: {}\n", report.captcha_detected));
    out.push_str(&format!("transport_errors: {}\n", report.transport_errors));
    out.push_str(&format!("elapsed_seconds: {:.2}\n", report.elapsed_seconds));
    out.into_bytes()
}

pub fn render_json(report: &AttackReport) -> Vec<u8> {
    serde_json::to_vec_pretty(report).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_yaml(report: &AttackReport) -> Vec<u8> {
    serde_yaml::to_string(report)
        .map(String::into_bytes)
        .unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_report(report: &AttackReport, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => render_json(report),
        OutputFormat::Yaml => render_yaml(report),
    }
}
