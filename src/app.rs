use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile, TargetEntry};
use crate::classifier::Indicators;
use crate::output::{self, AttackReport, OutputFormat};
use crate::runner::{AttackError, AttackEvent, AttackSession, AttackSpec};
use crate::scanner;
use crate::wordlist::{self, PasswordSource, BUILTIN_WORDLIST};

fn print_banner(no_color: bool) {
    let _ = no_color;
    const BANNER: &str = r#"
                      ____                __
  _____________  ____/ / /_  __  _______/ /____  _____
 / ___/ ___/ _ \/ __  / __ \/ / / / ___/ __/ _ \/ ___/
/ /__/ /  /  __/ /_/ / /_/ / /_/ (__  ) /_/  __/ /
\___/_/   \___/\__,_/_.___/\__,_/____/\__/\___/_/
       v0.4.2 - login brute-forcing pentesting tool
    "#;
    print!("{}", BANNER);
    println!();
    println!(":: Use only against systems you are authorized to test.");
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn prompt_line(label: &str) -> Result<String, String> {
    print!("{label}: ");
    std::io::stdout()
        .flush()
        .map_err(|e| format!("failed to flush stdout: {e}"))?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| format!("failed to read input: {e}"))?;
    Ok(line.trim().to_string())
}

// process-level settings shared by every run in this invocation
#[derive(Clone, Debug)]
struct AppSettings {
    no_color: bool,
    show_attempts: bool,
    logfile: Option<String>,
    output: Option<String>,
    output_format: Option<String>,
    max_passwords: usize,
}

// one fully resolved attack: the spec plus where its passwords come from
#[derive(Clone, Debug)]
struct ResolvedAttack {
    name: Option<String>,
    spec: AttackSpec,
    wordlist: Option<String>,
}

fn build_indicators(
    success_literal: Option<String>,
    failure_literal: Option<String>,
    success_regex: Option<String>,
    failure_regex: Option<String>,
) -> Result<Indicators, String> {
    let success_regex = match success_regex.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            regex::Regex::new(raw).map_err(|e| format!("invalid success regex '{raw}': {e}"))?,
        ),
        None => None,
    };
    let failure_regex = match failure_regex.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            regex::Regex::new(raw).map_err(|e| format!("invalid failure regex '{raw}': {e}"))?,
        ),
        None => None,
    };
    Ok(Indicators {
        success_literal: success_literal.filter(|s| !s.trim().is_empty()),
        failure_literal: failure_literal.filter(|s| !s.trim().is_empty()),
        success_regex,
        failure_regex,
    })
}

fn build_settings(args: &CliArgs, cfg: &ConfigFile) -> AppSettings {
    AppSettings {
        no_color: args.no_color || cfg.no_color.unwrap_or(false),
        show_attempts: args.show_attempts || cfg.show_attempts.unwrap_or(false),
        logfile: args
            .logfile
            .clone()
            .or_else(|| cfg.logfile.clone())
            .map(|p| config::expand_tilde_string(&p)),
        output: args
            .output
            .clone()
            .or_else(|| cfg.output.clone())
            .map(|p| config::expand_tilde_string(&p)),
        output_format: args.output_format.clone().or_else(|| cfg.output_format.clone()),
        max_passwords: args
            .max_passwords
            .or(cfg.max_passwords)
            .unwrap_or(wordlist::DEFAULT_MAX_PASSWORDS),
    }
}

// precedence: explicit flag > config file > hardcoded default; missing url
// and username fall back to interactive prompts
fn build_single_attack(args: &CliArgs, cfg: &ConfigFile) -> Result<ResolvedAttack, String> {
    let mut url = args.url.clone().or_else(|| cfg.url.clone()).unwrap_or_default();
    if url.trim().is_empty() {
        url = prompt_line("Enter target login URL")?;
    }
    let mut username = args
        .username
        .clone()
        .or_else(|| cfg.username.clone())
        .unwrap_or_default();
    if username.trim().is_empty() {
        username = prompt_line("Enter username")?;
    }

    let indicators = build_indicators(
        args.success_indicator
            .clone()
            .or_else(|| cfg.success_indicator.clone())
            .or_else(|| Some("welcome".to_string())),
        args.failure_indicator
            .clone()
            .or_else(|| cfg.failure_indicator.clone()),
        args.success_regex.clone().or_else(|| cfg.success_regex.clone()),
        args.failure_regex.clone().or_else(|| cfg.failure_regex.clone()),
    )?;

    let spec = AttackSpec {
        url,
        username,
        username_field: args
            .username_field
            .clone()
            .or_else(|| cfg.username_field.clone())
            .unwrap_or_else(|| "username".to_string()),
        password_field: args
            .password_field
            .clone()
            .or_else(|| cfg.password_field.clone())
            .unwrap_or_else(|| "password".to_string()),
        proxy: args.proxy.clone().or_else(|| cfg.proxy.clone()),
        user_agent: args.user_agent.clone().or_else(|| cfg.user_agent.clone()),
        timeout_seconds: args.timeout.or(cfg.timeout).unwrap_or(10),
        delay: Duration::from_secs_f64(args.delay.or(cfg.delay).unwrap_or(0.0)),
        concurrency: args.threads.or(cfg.threads).unwrap_or(4),
        rate: args.rate.or(cfg.rate).unwrap_or(1000),
        progress_interval: args.progress_interval.or(cfg.progress_interval).unwrap_or(10),
        indicators,
    };

    Ok(ResolvedAttack {
        name: None,
        spec,
        wordlist: args.wordlist.clone().or_else(|| cfg.wordlist.clone()),
    })
}

// targets-file entries inherit nothing from the CLI except the wordlist
// override, mirroring how each entry is a self-contained configuration
fn build_attack_from_entry(
    name: &str,
    entry: &TargetEntry,
    args: &CliArgs,
) -> Result<ResolvedAttack, String> {
    let indicators = build_indicators(
        entry
            .success_indicator
            .clone()
            .or_else(|| Some("welcome".to_string())),
        entry.failure_indicator.clone(),
        entry.success_regex.clone(),
        entry.failure_regex.clone(),
    )
    .map_err(|e| format!("target '{name}': {e}"))?;

    let spec = AttackSpec {
        url: entry.url.clone(),
        username: entry.username.clone(),
        username_field: entry
            .username_field
            .clone()
            .unwrap_or_else(|| "username".to_string()),
        password_field: entry
            .password_field
            .clone()
            .unwrap_or_else(|| "password".to_string()),
        proxy: entry.proxy.clone(),
        user_agent: entry.user_agent.clone(),
        timeout_seconds: entry.timeout.unwrap_or(10),
        delay: Duration::from_secs_f64(entry.delay.unwrap_or(0.0)),
        concurrency: entry.threads.unwrap_or(4),
        rate: entry.rate.unwrap_or(1000),
        progress_interval: entry.progress_interval.unwrap_or(10),
        indicators,
    };

    Ok(ResolvedAttack {
        name: Some(name.to_string()),
        spec,
        wordlist: args.wordlist.clone().or_else(|| entry.wordlist.clone()),
    })
}

async fn resolve_passwords(
    wordlist: Option<&str>,
    max_passwords: usize,
) -> Result<Vec<String>, String> {
    let source = match wordlist {
        Some(BUILTIN_WORDLIST) => PasswordSource::Builtin,
        Some(path) => PasswordSource::FilePath(path.to_string()),
        None => {
            println!(
                "{} no wordlist given, using built-in passwords",
                "[INFO]".bold().cyan()
            );
            PasswordSource::Builtin
        }
    };

    match wordlist::load_passwords(&source, max_passwords).await {
        Ok(passwords) if !passwords.is_empty() => Ok(passwords),
        Ok(_) => {
            println!(
                "{} wordlist is empty, falling back to built-in passwords",
                "[WRN]".bold().yellow()
            );
            Ok(wordlist::builtin_passwords())
        }
        Err(e) => {
            println!(
                "{} {e}, falling back to built-in passwords",
                "[WRN]".bold().yellow()
            );
            Ok(wordlist::builtin_passwords())
        }
    }
}

pub async fn run() -> Result<(), String> {
    let args = CliArgs::parse();
    validation::validate(&args)?;

    let cfg = match args.config.as_deref() {
        Some(path) => {
            let path = config::expand_tilde(path);
            config::load_config(&path, false)?
        }
        None => match config::default_config_path() {
            Some(path) => {
                config::ensure_default_config_file(&path)?;
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    let settings = build_settings(&args, &cfg);
    if settings.no_color {
        colored::control::set_override(false);
    }
    print_banner(settings.no_color);

    if let Some(scan_url) = args.scan.clone() {
        return run_scan(&scan_url, args.scan_output.as_deref(), &args, &cfg).await;
    }

    let targets_path = args.targets.clone().or_else(|| cfg.targets.clone());
    let attacks: Vec<ResolvedAttack> = if let Some(path) = targets_path {
        let path = config::expand_tilde(&path);
        let entries = config::load_targets_file(&path)?;
        if entries.is_empty() {
            return Err(format!("no targets found in '{}'", path.display()));
        }
        if args.list_targets {
            format_kv_line("Targets", &path.display().to_string());
            for (name, entry) in entries.iter() {
                println!("  {} {} ({})", name.bold().white(), entry.url, entry.username);
            }
            return Ok(());
        }
        match args.target.as_deref() {
            Some(selected) => {
                let entry = entries
                    .get(selected)
                    .ok_or_else(|| format!("unknown target '{selected}'"))?;
                vec![build_attack_from_entry(selected, entry, &args)?]
            }
            None => {
                let mut out = Vec::new();
                for (name, entry) in entries.iter() {
                    out.push(build_attack_from_entry(name, entry, &args)?);
                }
                out
            }
        }
    } else {
        vec![build_single_attack(&args, &cfg)?]
    };

    let multi = attacks.len() > 1;
    for attack in attacks {
        let interrupted = run_attack(attack, &settings).await?;
        if interrupted && multi {
            println!(
                "{} interrupted, skipping remaining targets",
                "[WRN]".bold().yellow()
            );
            break;
        }
    }

    Ok(())
}

// runs one attack end to end; returns whether the operator interrupted it
async fn run_attack(attack: ResolvedAttack, settings: &AppSettings) -> Result<bool, String> {
    let ResolvedAttack {
        name,
        spec,
        wordlist,
    } = attack;

    let passwords = resolve_passwords(wordlist.as_deref(), settings.max_passwords).await?;

    let session = AttackSession::new(spec).map_err(|e| e.to_string())?;
    let spec = session.spec().clone();

    if let Some(name) = name.as_deref() {
        format_kv_line("Run", name);
    }
    format_kv_line("Target", &format!("{} user={}", spec.url, spec.username));
    format_kv_line(
        "Form",
        &format!("{}={{user}} {}={{pass}}", spec.username_field, spec.password_field),
    );
    format_kv_line(
        "Detect",
        &format!(
            "success={} failure={} success_re={} failure_re={}",
            spec.indicators.success_literal.as_deref().unwrap_or("none"),
            spec.indicators.failure_literal.as_deref().unwrap_or("none"),
            format_bool(spec.indicators.success_regex.is_some()),
            format_bool(spec.indicators.failure_regex.is_some()),
        ),
    );
    format_kv_line(
        "HTTP",
        &format!(
            "threads={} rate={} timeout={}s delay={:.1}s proxy={}",
            spec.concurrency,
            spec.rate,
            spec.timeout_seconds,
            spec.delay.as_secs_f64(),
            if spec.proxy.is_some() { "on" } else { "off" },
        ),
    );
    format_kv_line("Wordlist", &format!("{} passwords", passwords.len()));
    println!();

    let pb = ProgressBar::new(passwords.len() as u64);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Progress: [{pos}/{len}] :: {per_sec} :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );
    pb.set_message(format!("attacking {}", spec.url));

    let logfile = match settings.logfile.as_deref() {
        Some(path) => Some(
            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .map_err(|e| format!("failed to open logfile '{path}': {e}"))?,
        ),
        None => None,
    };

    let (event_tx, event_rx) = mpsc::channel::<AttackEvent>(1024);
    let render_handle = task::spawn(output::render_events(
        pb.clone(),
        event_rx,
        logfile,
        settings.show_attempts,
    ));

    let interrupted = Arc::new(AtomicBool::new(false));
    let cancel = session.cancel_handle();
    let sig_pb = pb.clone();
    let sig_flag = Arc::clone(&interrupted);
    let sig_handle = task::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            sig_pb.println(format!(
                "{} interrupted by user, letting in-flight attempts finish...",
                "[WRN]".bold().yellow()
            ));
            sig_flag.store(true, Ordering::SeqCst);
            cancel.cancel();
        }
    });

    let summary = match session.run(passwords, event_tx).await {
        Ok(summary) => summary,
        Err(AttackError::EmptyPasswordList) => {
            sig_handle.abort();
            return Err("no usable passwords in the wordlist".to_string());
        }
        Err(e) => {
            sig_handle.abort();
            return Err(e.to_string());
        }
    };
    sig_handle.abort();
    let interrupted = interrupted.load(Ordering::SeqCst);

    let stats = render_handle.await.unwrap_or_default();
    pb.finish_and_clear();

    match summary.found.as_deref() {
        Some(password) => {
            println!(
                "{} password for user '{}' is: {}",
                "[RESULT]".bold().green(),
                spec.username,
                password.bold().white()
            );
        }
        None => {
            println!(
                "{} no valid password found for user '{}'",
                "[RESULT]".bold().yellow(),
                spec.username
            );
        }
    }

    if let Some(path) = settings.output.as_deref() {
        let format = settings
            .output_format
            .as_deref()
            .and_then(OutputFormat::parse)
            .or_else(|| output::infer_format_from_path(path))
            .unwrap_or(OutputFormat::Text);
        let report = AttackReport {
            target: spec.url.clone(),
            username: spec.username.clone(),
            total_candidates: summary.total,
            attempts: summary.attempted,
            found: summary.found.clone(),
            captcha_detected: stats.captcha_detected,
            transport_errors: stats.transport_errors,
            elapsed_seconds: summary.elapsed.as_secs_f64(),
        };
        tokio::fs::write(path, output::render_report(&report, format))
            .await
            .map_err(|e| format!("failed to write report '{path}': {e}"))?;
        format_kv_line("Report", path);
    }

    Ok(interrupted)
}

async fn run_scan(
    scan_url: &str,
    scan_output: Option<&str>,
    args: &CliArgs,
    cfg: &ConfigFile,
) -> Result<(), String> {
    let spec = AttackSpec {
        url: scan_url.to_string(),
        username: "probe".to_string(),
        proxy: args.proxy.clone().or_else(|| cfg.proxy.clone()),
        user_agent: args.user_agent.clone().or_else(|| cfg.user_agent.clone()),
        timeout_seconds: args.timeout.or(cfg.timeout).unwrap_or(10),
        ..Default::default()
    };
    let client = crate::attempt::build_client(&spec).map_err(|e| e.to_string())?;

    format_kv_line("Scan", scan_url);
    let detected = scanner::scan_target(&client, scan_url)
        .await
        .map_err(|e| e.to_string())?;

    match detected {
        Some(target) => {
            println!(
                "{} login form found :: {}",
                "(+)".bold().green(),
                target.url.bold().blue()
            );
            format_kv_line(
                "Form",
                &format!("{}={{user}} {}={{pass}}", target.username_field, target.password_field),
            );
            format_kv_line(
                "Detect",
                &format!(
                    "success={} failure={}",
                    target.success_indicator, target.failure_indicator
                ),
            );

            if let Some(path) = scan_output {
                let host = reqwest::Url::parse(&target.url)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h.replace('.', "_")))
                    .unwrap_or_else(|| "detected".to_string());
                let yaml = scanner::render_targets_yaml(&[(host, target)])
                    .map_err(|e| format!("failed to render targets yaml: {e}"))?;
                std::fs::write(PathBuf::from(path), yaml)
                    .map_err(|e| format!("failed to write '{path}': {e}"))?;
                format_kv_line("Saved", path);
            }
        }
        None => {
            println!(
                "{} no workable login form found on {}",
                "[WRN]".bold().yellow(),
                scan_url
            );
        }
    }

    Ok(())
}
