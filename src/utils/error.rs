use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported scheduling policy `{0}`, expected one of FCFS, SJF, PRIORITY")]
    UnsupportedPolicy(String),
    #[error("job queue is closed")]
    QueueClosed,
    #[error("session is stopped")]
    Stopped,
    #[error("invalid benchmark parameters: {0}")]
    InvalidPerfParams(String),
    #[error("{0}")]
    InvalidCommand(String),
    #[error(transparent)]
    InvalidConfig(#[from] config::ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Others(#[from] anyhow::Error),
}

/// A type alias that forces the usage of the custom error type.
pub type Result<T> = std::result::Result<T, Error>;

impl From<tracing_subscriber::util::TryInitError> for Error {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        Self::Others(anyhow::Error::from(err))
    }
}

impl Error {
    /// Errors that only mean the pipeline is shutting down
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Error::QueueClosed | Error::Stopped)
    }
}
