use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod cache;
pub mod cancel;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod outbound;
pub mod protocol;
pub mod server;
pub mod tools;
