use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsReactError {
    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, TlsReactError>;
