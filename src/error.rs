use thiserror::Error;

use crate::action::ActionError;
use crate::render::RenderError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    // config / io
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}
