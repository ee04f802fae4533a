//! Tracing setup and per-step call records.
//!
//! [`init`] installs the process-wide subscriber once and hands back a
//! [`TelemetryHandle`]; components receive the handle explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use rvla_config::LoggingConfig;
use rvla_protocols::types::ActionKind;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },

    #[error("Failed to create log appender: {0}")]
    Appender(String),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Ok,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// A finished call as seen by telemetry.
pub trait TracedCall {
    fn name(&self) -> &str;
    fn status(&self) -> CallStatus;
    fn duration(&self) -> Duration;
    fn output(&self) -> String;
}

/// One Step Engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTrace {
    pub depth: u32,
    pub step: u32,
    pub action: Option<ActionKind>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl TracedCall for StepTrace {
    fn name(&self) -> &str {
        "step"
    }

    fn status(&self) -> CallStatus {
        if self.error.is_some() {
            CallStatus::Error
        } else {
            CallStatus::Ok
        }
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn output(&self) -> String {
        match (&self.action, &self.error) {
            (_, Some(error)) => error.clone(),
            (Some(action), None) => action.to_string(),
            (None, None) => String::new(),
        }
    }
}

struct Inner {
    _guard: Option<WorkerGuard>,
    recorded: AtomicU64,
}

/// Handle to the installed telemetry pipeline.
///
/// Owns the file writer guard; buffered log lines are flushed when the last
/// clone is dropped.
#[derive(Clone)]
pub struct TelemetryHandle {
    inner: Arc<Inner>,
}

impl TelemetryHandle {
    fn with_guard(guard: Option<WorkerGuard>) -> Self {
        Self {
            inner: Arc::new(Inner {
                _guard: guard,
                recorded: AtomicU64::new(0),
            }),
        }
    }

    /// Handle that records through whatever subscriber is already installed.
    pub fn detached() -> Self {
        Self::with_guard(None)
    }

    pub fn record(&self, call: &dyn TracedCall) {
        self.inner.recorded.fetch_add(1, Ordering::Relaxed);
        let duration_ms = call.duration().as_millis() as u64;
        match call.status() {
            CallStatus::Ok => info!(
                call = call.name(),
                status = call.status().as_str(),
                duration_ms,
                output = %call.output(),
                "Call finished"
            ),
            CallStatus::Error => warn!(
                call = call.name(),
                status = call.status().as_str(),
                duration_ms,
                output = %call.output(),
                "Call failed"
            ),
        }
    }

    /// Number of calls recorded through this handle and its clones.
    pub fn recorded(&self) -> u64 {
        self.inner.recorded.load(Ordering::Relaxed)
    }

    pub fn same_as(&self, other: &TelemetryHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for TelemetryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHandle")
            .field("recorded", &self.recorded())
            .finish()
    }
}

static INSTALLED: Mutex<Option<TelemetryHandle>> = parking_lot::const_mutex(None);

/// Install the global subscriber described by `config`.
///
/// Later calls return the first handle without touching the subscriber.
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init(config: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    let mut installed = INSTALLED.lock();
    if let Some(handle) = installed.as_ref() {
        return Ok(handle.clone());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::Filter {
            filter: config.level.clone(),
            message: e.to_string(),
        })?,
    };

    let text_layer = (!config.json).then(|| fmt::layer().with_target(true));
    let json_layer = config.json.then(|| fmt::layer().json());

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(config.file_prefix.clone())
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| TelemetryError::Appender(e.to_string()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    let handle = TelemetryHandle::with_guard(guard);
    *installed = Some(handle.clone());
    Ok(handle)
}
