use thiserror::Error;

#[derive(Error, Debug)]
pub enum TollError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("browser init error: {0}")]
    BrowserInit(String),

    #[error("navigation error: {0}")]
    Navigation(String),

    #[error("login error: {0}")]
    Login(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("statement text extraction error: {0}")]
    Extract(String),

    #[error("file error: {0}")]
    FileIo(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage lock poisoned")]
    StorageLock,

    #[error("audit artifact error: {0}")]
    Audit(#[from] serde_json::Error),

    #[error("a statement run is already in progress")]
    AlreadyRunning,
}
