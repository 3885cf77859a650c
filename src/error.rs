#[derive(Debug, thiserror::Error)]
pub enum DriftsyncError {
  #[error("invalid settings configuration: {0}")]
  ConfigError(String),
  #[error("could not serialize configuration of '{0}'")]
  SerializationError(String, #[source] serde_json::Error),
  #[error("search store is unreachable: {0}")]
  StoreUnavailable(String),
  #[error(transparent)]
  StoreError(#[from] elasticsearch::Error),
  #[error(transparent)]
  OtherError(#[from] anyhow::Error),
}
