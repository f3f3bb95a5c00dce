use serde::{Deserialize, Serialize};

/// Failure categories shared by every service, independent of where the
/// failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed, missing or out-of-range arguments.
    InvalidInput,
    /// A referenced product, user or notification does not exist.
    NotFound,
    /// A business rule rejected the request.
    InvalidOperation,
    /// The request collides with existing state, such as a taken SKU.
    Conflict,
    /// The storage layer failed or could not commit.
    StorageFailure,
    /// The execution budget ran out.
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidOperation).unwrap();
        assert_eq!(json, "\"invalid_operation\"");
        assert_eq!(ErrorKind::StorageFailure.to_string(), "storage_failure");
    }
}
