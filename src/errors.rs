use crate::core::stage::Stage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error(
        "Invalid transition from {current} to {requested}. Valid next stages: {}",
        format_stages(.valid_next)
    )]
    InvalidTransition {
        current: Stage,
        requested: Stage,
        valid_next: Vec<Stage>,
    },

    #[error("Transaction with ID {id} not found")]
    NotFound { id: String },

    #[error("Agent with ID {id} not found")]
    AgentNotFound { id: String },

    #[error("Transaction is not completed yet. Current stage: {stage}")]
    NotCompleted { stage: Stage },

    #[error("Agent with email {email} already exists")]
    DuplicateEmail { email: String },

    #[error("Transaction {id} is no longer at stage {expected}; it was modified concurrently")]
    StaleStage { id: String, expected: Stage },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

fn format_stages(stages: &[Stage]) -> String {
    if stages.is_empty() {
        return "none".to_string();
    }
    stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
