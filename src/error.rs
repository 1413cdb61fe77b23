use std::fmt;

use crate::config::completion::ConfigError;

/// Unified error type for replyclean.
/// Only the completion fetcher and its setup produce errors; normalization never fails.
#[derive(Debug, Clone)]
pub struct ReplyError {
    pub message: String,
    pub stage: String,
    pub model: Option<String>,
    /// Upstream HTTP status, when the service answered with one
    pub status: Option<u16>,
    pub context: Option<String>,
    pub source: Option<String>,
}

impl ReplyError {
    /// Create a new error with stage and message
    pub fn new<S: Into<String>>(message: S, stage: &'static str) -> Self {
        ReplyError {
            message: message.into(),
            stage: stage.to_string(),
            model: None,
            status: None,
            context: None,
            source: None,
        }
    }

    /// Add model context to the error
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attach the upstream HTTP status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add additional context information
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add source error information
    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)?;
        if let Some(ref model) = self.model {
            write!(f, " (model: {})", model)?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {})", status)?;
        }
        if let Some(ref context) = self.context {
            write!(f, " (context: {})", context)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (source: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ReplyError {}

impl From<serde_json::Error> for ReplyError {
    fn from(err: serde_json::Error) -> Self {
        ReplyError::new(
            format!("JSON error: {}", err),
            "json_parse"
        ).with_source("serde_json")
    }
}

impl From<reqwest::Error> for ReplyError {
    fn from(err: reqwest::Error) -> Self {
        let stage = if err.is_timeout() { "timeout" } else { "http" };
        let mut error = ReplyError::new(
            format!("HTTP error: {}", err),
            stage
        ).with_source("reqwest");
        if let Some(status) = err.status() {
            error = error.with_status(status.as_u16());
        }
        error
    }
}

impl From<tokio::time::error::Elapsed> for ReplyError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ReplyError::new(
            "Operation timed out",
            "timeout"
        ).with_source("tokio::time")
    }
}

impl From<ConfigError> for ReplyError {
    fn from(err: ConfigError) -> Self {
        ReplyError::new(err.to_string(), "config").with_source("config")
    }
}
