use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("FORMAT_INVALID: {0}")]
    Format(String),
    #[error("MISSING_COLUMN: {0}")]
    MissingColumn(String),
    #[error("DECODE_FAILURE: {0}")]
    Decode(String),
    #[error("CSV_INVALID: {0}")]
    Csv(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors scoped to a single capture file. The folder scans recover from
    /// these and move on to the next file.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::MissingColumn(_) | Self::Decode(_) | Self::Csv(_) | Self::Io(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn messages_carry_code_prefix() {
        let error = AppError::MissingColumn("TMSSR".to_string());
        assert_eq!(error.to_string(), "MISSING_COLUMN: TMSSR");
    }

    #[test]
    fn directory_errors_are_not_per_file() {
        assert!(AppError::Decode("x".to_string()).is_per_file());
        assert!(!AppError::NotFound("x".to_string()).is_per_file());
        assert!(!AppError::Config("x".to_string()).is_per_file());
    }
}
