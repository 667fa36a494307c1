#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    sync::OnceLock,
    time::Duration,
};

use log::{LevelFilter, Log, Metadata, Record};

use async_trait::async_trait;
use socratic::chat::{
    CompletionGateway,
    client::{CompletionRequest, CompletionResponse, CompletionTransport, ProviderError},
    engine::{Clock, RetryPolicy},
};

/// Replays scripted provider results in order and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<(String, CompletionRequest)>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Result<CompletionResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, CompletionRequest)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn complete(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((credential.to_string(), request.clone()));

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::new(Some(500), "script exhausted")))
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Default)]
pub struct MockClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Clock for MockClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

impl MockClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

pub fn rate_limited() -> ProviderError {
    ProviderError::new(
        Some(429),
        "[429 Too Many Requests] Resource has been exhausted (e.g. check quota). [RESOURCE_EXHAUSTED]",
    )
}

pub fn gateway(
    transport: Arc<ScriptedTransport>,
    clock: Arc<MockClock>,
    default_credential: Option<&str>,
) -> CompletionGateway {
    CompletionGateway::new(
        transport,
        RetryPolicy::default(),
        default_credential.map(str::to_string),
    )
    .with_clock(clock)
}

/// Keeps every log line emitted by the crate so tests can assert on events.
struct CapturingLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("socratic")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();

fn logger() -> &'static CapturingLogger {
    LOGGER.get_or_init(|| {
        let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger {
            lines: Mutex::new(vec![]),
        }));
        log::set_logger(logger).expect("logger already installed");
        log::set_max_level(LevelFilter::Trace);
        logger
    })
}

/// Installs the capturing logger (once per test binary).
pub fn capture_logs() {
    logger();
}

/// Captured lines containing `needle`.
pub fn logged(needle: &str) -> Vec<String> {
    logger()
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.contains(needle))
        .cloned()
        .collect()
}
