use thiserror::Error;

#[derive(Error, Debug)]
pub enum HearthError {
    #[error("Hub error: {0}")]
    Hub(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Reply channel error: {0}")]
    Reply(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HearthError>;
