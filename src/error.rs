use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigilError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Quarantine(#[from] crate::quarantine::QuarantineError),

    #[error(transparent)]
    Incident(#[from] crate::incident::IncidentError),

    #[error(transparent)]
    Notify(#[from] crate::sink::NotifyError),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("no watch root could be registered")]
    NoRoots,

    #[error("Other error: {0}")]
    Other(String),
}

pub type VigilResult<T> = Result<T, VigilError>;
