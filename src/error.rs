use thiserror::Error;

#[derive(Error, Debug)]
pub enum CIDoctorError {
    #[error("Invalid run URL: {0}")]
    InvalidRunUrl(String),

    #[error("Missing GitHub token. Set --token or GITHUB_TOKEN env.")]
    MissingToken,

    #[error("Unauthorized. Check token scopes (actions:read, contents:read).")]
    Unauthorized,

    #[error("GET {url} -> {status}: {message}")]
    Api {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Log archive error: {0}")]
    LogArchive(#[from] zip::result::ZipError),

    #[error("Summarization failed: {0}")]
    Summary(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CIDoctorError {
    /// Process exit code used when this error terminates the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingToken => 10,
            Self::Unauthorized => 11,
            Self::InvalidRunUrl(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CIDoctorError>;
