#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] perisentez_types::TextError),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to deserialize JSON: {0}")]
    JsonDeserialization(serde_json::Error),

    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("username is already registered")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("credential store lock poisoned")]
    LockPoisoned,

    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("model artifact is invalid: {0}")]
    InvalidModel(String),
    #[error("model input rejected: {0}")]
    Model(String),

    #[error("failed to render PDF report: {0}")]
    Report(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
