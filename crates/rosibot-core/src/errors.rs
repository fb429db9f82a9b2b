/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can log
/// runtime failures uniformly and treat startup failures as fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message catalog error: {0}")]
    Catalog(String),

    #[error("state error: {0}")]
    State(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
