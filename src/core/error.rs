//! Evaluator errors

/// Failure reported by an [`Evaluator`](super::Evaluator)
///
/// The console never propagates these. Their display text is printed into
/// the scrollback instead.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("{0}")]
    Failed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    pub fn failed(message: impl Into<String>) -> Self {
        EvalError::Failed(message.into())
    }
}

impl From<String> for EvalError {
    fn from(message: String) -> Self {
        EvalError::Failed(message)
    }
}

impl From<&str> for EvalError {
    fn from(message: &str) -> Self {
        EvalError::Failed(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_displays_message_verbatim() {
        let err = EvalError::failed("unknown command: foo");
        assert_eq!(err.to_string(), "unknown command: foo");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: EvalError = io.into();
        assert_eq!(err.to_string(), "IO error: no such file");
    }
}
