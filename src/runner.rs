use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use governor::{Quota, RateLimiter};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task;
use tokio::time::Instant;

use crate::attempt;
use crate::classifier::Indicators;

#[derive(Clone, Debug)]
pub struct AttackSpec {
    pub url: String,
    pub username: String,
    pub username_field: String,
    pub password_field: String,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: usize,
    pub delay: Duration,
    pub concurrency: u32,
    pub rate: u32,
    pub progress_interval: usize,
    pub indicators: Indicators,
}

impl Default for AttackSpec {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            proxy: None,
            user_agent: None,
            timeout_seconds: 10,
            delay: Duration::ZERO,
            concurrency: 4,
            rate: 1000,
            progress_interval: 10,
            indicators: Indicators::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AttackError {
    #[error("target url is empty")]
    EmptyUrl,

    #[error("invalid target url: {url}")]
    InvalidUrl { url: String },

    #[error("username is empty")]
    EmptyUsername,

    #[error("form field names must not be empty")]
    EmptyFormField,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("rate must be at least 1")]
    ZeroRate,

    #[error("progress interval must be at least 1")]
    ZeroProgressInterval,

    #[error("password list is empty")]
    EmptyPasswordList,

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("task join failed: {source}")]
    TaskJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}

// classified result of a single login attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success { password: String },
    ExplicitFailure { password: String },
    AmbiguousFailure { password: String },
    CaptchaDetected { password: String },
    TransportError { password: String, detail: String },
}

impl Outcome {
    pub fn password(&self) -> &str {
        match self {
            Outcome::Success { password }
            | Outcome::ExplicitFailure { password }
            | Outcome::AmbiguousFailure { password }
            | Outcome::CaptchaDetected { password }
            | Outcome::TransportError { password, .. } => password,
        }
    }
}

#[derive(Clone, Debug)]
pub enum AttackEvent {
    Attempt(Outcome),
    Progress { tried: usize, total: usize },
    Terminal { found: Option<String> },
}

// shared coordination state for one run: a one-way cancellation flag, a
// write-once found-password slot, and the attempt counter. workers only
// ever touch it through these methods.
#[derive(Debug, Default)]
pub struct SharedRunState {
    cancelled: AtomicBool,
    found: OnceLock<String>,
    attempted: AtomicUsize,
}

impl SharedRunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    // first writer wins; later offers are no-ops
    pub fn offer_found(&self, password: &str) -> bool {
        self.found.set(password.to_string()).is_ok()
    }

    pub fn found(&self) -> Option<String> {
        self.found.get().cloned()
    }

    pub fn record_attempt(&self) -> usize {
        self.attempted.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn attempted(&self) -> usize {
        self.attempted.load(Ordering::SeqCst)
    }
}

// the only piece of run state handed outside the engine: lets the app
// translate an operator interrupt into cooperative cancellation
#[derive(Clone, Debug)]
pub struct CancelHandle {
    state: Arc<SharedRunState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

#[derive(Clone, Debug)]
pub struct AttackSummary {
    pub started_at: Instant,
    pub elapsed: Duration,
    pub total: usize,
    pub attempted: usize,
    pub found: Option<String>,
}

#[derive(Clone, Debug)]
struct AttemptJob {
    password: String,
}

#[derive(Debug)]
pub struct AttackSession {
    spec: Arc<AttackSpec>,
    state: Arc<SharedRunState>,
}

impl AttackSession {
    pub fn new(mut spec: AttackSpec) -> Result<Self, AttackError> {
        if spec.url.trim().is_empty() {
            return Err(AttackError::EmptyUrl);
        }
        let parsed = reqwest::Url::parse(spec.url.trim()).map_err(|_| AttackError::InvalidUrl {
            url: spec.url.clone(),
        })?;
        // canonical form so the executor can compare it against the final
        // URL after redirects
        spec.url = parsed.to_string();
        if spec.username.trim().is_empty() {
            return Err(AttackError::EmptyUsername);
        }
        if spec.username_field.trim().is_empty() || spec.password_field.trim().is_empty() {
            return Err(AttackError::EmptyFormField);
        }
        if spec.timeout_seconds == 0 {
            return Err(AttackError::ZeroTimeout);
        }
        if spec.concurrency == 0 {
            return Err(AttackError::ZeroConcurrency);
        }
        if spec.rate == 0 {
            return Err(AttackError::ZeroRate);
        }
        if spec.progress_interval == 0 {
            return Err(AttackError::ZeroProgressInterval);
        }
        Ok(Self {
            spec: Arc::new(spec),
            state: Arc::new(SharedRunState::new()),
        })
    }

    pub fn spec(&self) -> &AttackSpec {
        &self.spec
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            state: Arc::clone(&self.state),
        }
    }

    // consumes the session: every run gets fresh shared state
    pub async fn run(
        self,
        passwords: Vec<String>,
        events: mpsc::Sender<AttackEvent>,
    ) -> Result<AttackSummary, AttackError> {
        let started_at = Instant::now();

        let candidates = collect_candidates(&passwords);
        if candidates.is_empty() {
            return Err(AttackError::EmptyPasswordList);
        }
        let total = candidates.len();

        let client = attempt::build_client(&self.spec)?;

        let worker_count = self.spec.concurrency.max(1) as usize;
        let mut worker_job_rxs = Vec::new();
        let mut worker_job_txs = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let (tx, rx) = mpsc::channel::<AttemptJob>(1024);
            worker_job_txs.push(tx);
            worker_job_rxs.push(rx);
        }

        let submit_handle = tokio::spawn({
            let state = Arc::clone(&self.state);
            let rate = self.spec.rate;
            async move {
                let lim =
                    RateLimiter::direct(Quota::per_second(NonZeroU32::new(rate.max(1)).unwrap()));
                let mut idx = 0usize;
                for password in candidates {
                    if state.is_cancelled() {
                        break;
                    }
                    let tx = worker_job_txs[idx % worker_job_txs.len()].clone();
                    if tx.send(AttemptJob { password }).await.is_err() {
                        break;
                    }
                    idx = idx.wrapping_add(1);
                    lim.until_ready().await;
                }
            }
        });

        let workers = FuturesUnordered::new();
        for rx in worker_job_rxs {
            let client = client.clone();
            let spec = Arc::clone(&self.spec);
            let state = Arc::clone(&self.state);
            let events = events.clone();
            workers.push(task::spawn(async move {
                run_attempt_worker(client, spec, state, rx, events, total).await
            }));
        }

        submit_handle
            .await
            .map_err(|e| AttackError::TaskJoin { source: e })?;
        let _worker_results: Vec<_> = workers.collect().await;

        let found = self.state.found();
        let _ = events
            .send(AttackEvent::Terminal {
                found: found.clone(),
            })
            .await;

        Ok(AttackSummary {
            started_at,
            elapsed: started_at.elapsed(),
            total,
            attempted: self.state.attempted(),
            found,
        })
    }
}

fn collect_candidates(passwords: &[String]) -> Vec<String> {
    passwords
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

async fn run_attempt_worker(
    client: reqwest::Client,
    spec: Arc<AttackSpec>,
    state: Arc<SharedRunState>,
    mut rx: mpsc::Receiver<AttemptJob>,
    events: mpsc::Sender<AttackEvent>,
    total: usize,
) {
    while let Some(job) = rx.recv().await {
        let outcome = attempt::attempt(&client, &spec, &job.password, &state).await;

        if let Some(outcome) = outcome {
            match &outcome {
                Outcome::Success { password } => {
                    // the slot is single-assignment, so racing successes
                    // resolve to exactly one reported winner
                    if state.offer_found(password) {
                        let _ = events.send(AttackEvent::Attempt(outcome.clone())).await;
                    }
                    state.cancel();
                }
                Outcome::CaptchaDetected { .. } => {
                    let _ = events.send(AttackEvent::Attempt(outcome.clone())).await;
                    state.cancel();
                }
                _ => {
                    let _ = events.send(AttackEvent::Attempt(outcome.clone())).await;
                }
            }
        }

        // skipped attempts still count toward progress
        let tried = state.record_attempt();
        if tried % spec.progress_interval == 0 || tried == total {
            let _ = events.send(AttackEvent::Progress { tried, total }).await;
        }
    }
}
