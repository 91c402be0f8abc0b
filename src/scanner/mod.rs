use std::collections::BTreeMap;
use std::time::Duration;

use scraper::{Html, Selector};
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::config::TargetEntry;

const LOGIN_KEYWORDS: [&str; 5] = ["login", "signin", "auth", "user", "password"];

const SUCCESS_PATTERNS: [&str; 9] = [
    "welcome",
    "dashboard",
    "profile",
    "account",
    "logged in",
    "success",
    "authenticated",
    "user info",
    "my account",
];

const FAILURE_PATTERNS: [&str; 9] = [
    "invalid",
    "failed",
    "incorrect",
    "wrong",
    "error",
    "not found",
    "denied",
    "unauthorized",
    "must login",
];

// credential pairs probed to tell apart success and failure responses
const PROBE_CREDENTIALS: [(&str, &str); 7] = [
    ("admin", "admin"),
    ("admin", "password"),
    ("test", "test"),
    ("user", "password"),
    ("root", "root"),
    ("admin", "123456"),
    ("admin", "admin123"),
];

const PROBE_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("target {url} answered with status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("invalid base url: {url}")]
    InvalidBaseUrl { url: String },
}

// a login form lifted out of the page, with the action resolved to an
// absolute URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredForm {
    pub action_url: String,
    pub username_field: String,
    pub password_field: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectedTarget {
    pub url: String,
    pub username: String,
    pub username_field: String,
    pub password_field: String,
    pub success_indicator: String,
    pub failure_indicator: String,
    pub threads: u32,
    pub timeout: usize,
    pub delay: f64,
    pub progress_interval: usize,
}

impl DetectedTarget {
    pub fn to_target_entry(&self) -> TargetEntry {
        TargetEntry {
            url: self.url.clone(),
            username: self.username.clone(),
            username_field: Some(self.username_field.clone()),
            password_field: Some(self.password_field.clone()),
            success_indicator: Some(self.success_indicator.clone()),
            failure_indicator: Some(self.failure_indicator.clone()),
            threads: Some(self.threads),
            timeout: Some(self.timeout),
            delay: Some(self.delay),
            progress_interval: Some(self.progress_interval),
            ..Default::default()
        }
    }
}

// scans one page: fetch, extract login forms, probe each for workable
// success/failure indicators. returns the first form that produced a
// usable configuration.
pub async fn scan_target(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Option<DetectedTarget>, ScanError> {
    let response = client
        .get(base_url)
        .send()
        .await
        .map_err(|e| ScanError::Fetch {
            url: base_url.to_string(),
            source: e,
        })?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(ScanError::BadStatus {
            url: base_url.to_string(),
            status,
        });
    }
    let body = response.text().await.map_err(|e| ScanError::Fetch {
        url: base_url.to_string(),
        source: e,
    })?;

    let forms = extract_login_forms(&body, base_url)?;
    for form in forms {
        if let Some(detected) = probe_form(client, &form).await {
            return Ok(Some(detected));
        }
    }
    Ok(None)
}

// pure HTML extraction so parsing never straddles an await point
pub fn extract_login_forms(
    body: &str,
    base_url: &str,
) -> Result<Vec<DiscoveredForm>, ScanError> {
    let base = reqwest::Url::parse(base_url).map_err(|_| ScanError::InvalidBaseUrl {
        url: base_url.to_string(),
    })?;

    let document = Html::parse_document(body);
    let form_selector = Selector::parse("form").unwrap();
    let input_selector = Selector::parse("input").unwrap();

    let mut out = Vec::new();
    for form in document.select(&form_selector) {
        let action = form.value().attr("action").unwrap_or("");
        let form_text = form.text().collect::<Vec<_>>().join(" ").to_lowercase();
        let looks_like_login = LOGIN_KEYWORDS
            .iter()
            .any(|kw| form_text.contains(kw) || action.to_lowercase().contains(kw));
        if !looks_like_login {
            continue;
        }

        let mut username_field: Option<String> = None;
        let mut password_field: Option<String> = None;
        for input in form.select(&input_selector) {
            let input_type = input.value().attr("type").unwrap_or("text").to_lowercase();
            let input_name = input.value().attr("name").unwrap_or("");
            if input_name.is_empty() {
                continue;
            }
            match input_type.as_str() {
                "password" => {
                    if password_field.is_none() {
                        password_field = Some(input_name.to_string());
                    }
                }
                "text" | "email" => {
                    if username_field.is_none() {
                        username_field = Some(input_name.to_string());
                    }
                }
                _ => {}
            }
        }

        let (username_field, password_field) = match (username_field, password_field) {
            (Some(u), Some(p)) => (u, p),
            _ => continue,
        };

        let action_url = if action.trim().is_empty() {
            base.to_string()
        } else {
            match base.join(action.trim()) {
                Ok(joined) => joined.to_string(),
                Err(_) => continue,
            }
        };

        out.push(DiscoveredForm {
            action_url,
            username_field,
            password_field,
        });
    }
    Ok(out)
}

// posts a handful of common credential pairs at the form; the first response
// carrying a success pattern fixes the indicators for this target
async fn probe_form(client: &reqwest::Client, form: &DiscoveredForm) -> Option<DetectedTarget> {
    for (username, password) in PROBE_CREDENTIALS {
        let body = [
            (form.username_field.as_str(), username),
            (form.password_field.as_str(), password),
        ];
        let response = match client.post(&form.action_url).form(&body).send().await {
            Ok(response) => response,
            Err(_) => continue,
        };
        let text = match response.text().await {
            Ok(text) => text,
            Err(_) => continue,
        };

        let success = detect_patterns(&text, &SUCCESS_PATTERNS);
        let failure = detect_patterns(&text, &FAILURE_PATTERNS);

        if let Some(success_indicator) = success.first() {
            return Some(DetectedTarget {
                url: form.action_url.clone(),
                username: username.to_string(),
                username_field: form.username_field.clone(),
                password_field: form.password_field.clone(),
                success_indicator: success_indicator.clone(),
                failure_indicator: failure
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "invalid".to_string()),
                threads: 4,
                timeout: 10,
                delay: 0.0,
                progress_interval: 10,
            });
        }

        tokio::time::sleep(PROBE_PAUSE).await;
    }
    None
}

fn detect_patterns(body: &str, patterns: &[&str]) -> Vec<String> {
    let lowered = body.to_lowercase();
    patterns
        .iter()
        .filter(|p| lowered.contains(*p))
        .map(|p| p.to_string())
        .collect()
}

pub fn render_targets_yaml(
    detected: &[(String, DetectedTarget)],
) -> Result<String, serde_yaml::Error> {
    let map: BTreeMap<String, TargetEntry> = detected
        .iter()
        .map(|(name, target)| (name.clone(), target.to_target_entry()))
        .collect();
    serde_yaml::to_string(&map)
}
