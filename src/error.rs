use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    /// The crawl cannot continue at all (login failed, catalog never rendered).
    #[error("Crawl aborted: {message}")]
    FatalCrawl { message: String },

    /// Detail enrichment failed for one discipline; the crawl goes on.
    #[error("Extraction failed for discipline {discipline_id}: {message}")]
    EntryExtraction {
        discipline_id: String,
        message: String,
    },

    #[error("Timed out after {timeout_ms}ms waiting for '{selector}'")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("Invalid navigation: cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("A crawl is already in progress")]
    CrawlInProgress,

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl ScraperError {
    pub fn fatal(message: impl Into<String>) -> Self {
        ScraperError::FatalCrawl {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        ScraperError::Persistence {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScraperError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
