use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaltError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Missing build dependency: {0}")]
    DependencyMissing(String),

    #[error("Build failed: `{command}` exited with status {code}")]
    BuildFailed { command: String, code: i32 },

    #[error("Install error: {0}")]
    Install(String),

    #[error("{name} conflicts with {other}: {because}")]
    Conflict {
        name: String,
        other: String,
        because: String,
    },

    #[error("Test command exited with status {code}")]
    TestFailed { code: i32 },

    #[error("Test assertion failed: output does not contain {expected:?}")]
    TestAssertionFailed { expected: String },

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MaltError>;
