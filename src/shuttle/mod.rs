pub mod runner;
pub mod state;

use thiserror::Error;

pub use runner::Shuttle;
pub use state::{InvalidTransition, ShutdownPhase};

#[derive(Debug, Error)]
pub enum ShuttleError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("delivery setup failed: {0}")]
    Delivery(#[from] crate::outlet::DeliveryError),

    #[error(transparent)]
    Stats(#[from] crate::stats::StatsError),

    #[error(transparent)]
    Logging(#[from] crate::logging::LoggingError),

    #[error("input error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input has already been read")]
    InputClosed,

    #[error("No stdin detected")]
    NoStdin,
}
