use thiserror::Error;

pub type Result<T> = core::result::Result<T, RouteManagerError>;

#[derive(Error, Debug)]
pub enum RouteManagerError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    ConfigIssues(Vec<String>),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("command `{command}` failed: {stderr}")]
    RemoteCommand { command: String, stderr: String },
    #[error("{0} binary not found: {1}")]
    MissingBinary(String, String),
    #[error("command `{0}` timed out")]
    Timeout(String),
    #[error("io error")]
    IoError(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("settings error: {0}")]
    SettingsError(#[from] config::ConfigError),
}

impl RouteManagerError {
    pub fn remote(command: impl ToString, stderr: impl Into<String>) -> Self {
        Self::RemoteCommand {
            command: command.to_string(),
            stderr: stderr.into(),
        }
    }
}
