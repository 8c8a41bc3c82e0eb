use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink};

use crate::config::TelemetrySettings;

/// Builder for dashboard telemetry sinks.
pub struct DashboardTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    sink: Option<Arc<dyn LogSink>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl DashboardTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            sink: None,
            event_publisher: None,
        }
    }

    /// Sets the JSON-lines log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the least severe level written to the log file.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Uses an existing sink instead of a log file.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Applies file settings from configuration.
    #[must_use]
    pub fn settings(mut self, settings: &TelemetrySettings) -> Self {
        self.log_path = settings.log_path.clone();
        self.min_level = settings.min_level;
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<DashboardTelemetry> {
        let sink = match (self.sink, self.log_path) {
            (Some(sink), _) => Some(sink),
            (None, Some(path)) => {
                Some(Arc::new(JsonLogger::new(path)?.with_min_level(self.min_level)) as Arc<dyn LogSink>)
            }
            (None, None) => None,
        };
        Ok(DashboardTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                sink,
                publisher: self.event_publisher,
            }),
        })
    }
}

/// Telemetry handle shared by the API client and the views.
#[derive(Clone)]
pub struct DashboardTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for DashboardTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardTelemetry")
            .field("module", &self.inner.module)
            .field("logs", &self.inner.sink.is_some())
            .field("events", &self.inner.publisher.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    sink: Option<Arc<dyn LogSink>>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl DashboardTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> DashboardTelemetryBuilder {
        DashboardTelemetryBuilder::new(module)
    }

    /// Handle with no sinks.
    #[must_use]
    pub fn disabled(module: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                module: module.into(),
                sink: None,
                publisher: None,
            }),
        }
    }

    /// Handle writing to the same sinks under another module name.
    #[must_use]
    pub fn scoped(&self, module: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                module: module.into(),
                sink: self.inner.sink.clone(),
                publisher: self.inner.publisher.clone(),
            }),
        }
    }

    /// Module name stamped on records.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Logs structured metadata.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        match level {
            LogLevel::Debug => tracing::debug!(module = %self.inner.module, %metadata, "{message}"),
            LogLevel::Info => tracing::info!(module = %self.inner.module, %metadata, "{message}"),
            LogLevel::Warn => tracing::warn!(module = %self.inner.module, %metadata, "{message}"),
            LogLevel::Error => tracing::error!(module = %self.inner.module, %metadata, "{message}"),
        }
        if let Some(sink) = &self.inner.sink {
            sink.write(&LogRecord::new(&self.inner.module, level, message).with_metadata(metadata))?;
        }
        Ok(())
    }

    /// Emits an event on the bus.
    pub async fn event(&self, topic: &str, payload: Value) -> Result<()> {
        if let Some(publisher) = &self.inner.publisher {
            publisher
                .publish(EventRecord::new(&self.inner.module, topic, payload))
                .await?;
        }
        Ok(())
    }

    /// Logs and emits, reporting sink failures through `tracing` only.
    pub async fn record(&self, level: LogLevel, topic: &str, payload: Value) {
        if let Err(err) = self.log(level, topic, payload.clone()) {
            tracing::warn!(module = %self.inner.module, error = %err, "telemetry log failed");
        }
        if let Err(err) = self.event(topic, payload).await {
            tracing::warn!(module = %self.inner.module, error = %err, "telemetry event failed");
        }
    }
}
