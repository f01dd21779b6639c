//! Common error type for per-file conversion jobs

/// Error that fails one conversion job as a whole.
///
/// Record-level problems (a citation missing a required field) are not
/// job errors; converters count and skip them instead.
#[derive(Debug)]
pub enum JobError {
    /// Input file could not be opened
    Open(std::io::Error),
    /// Input is not well-formed XML, or the compressed stream is truncated
    Parse(String),
    /// Output file could not be created, written, or renamed into place
    Write(std::io::Error),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(e) => write!(f, "open: {e}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Write(e) => write!(f, "write: {e}"),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(e) | Self::Write(e) => Some(e),
            Self::Parse(_) => None,
        }
    }
}

impl JobError {
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn display_open() {
        let err = JobError::Open(std::io::Error::new(ErrorKind::NotFound, "missing"));
        assert_eq!(format!("{err}"), "open: missing");
    }

    #[test]
    fn display_parse() {
        let err = JobError::Parse("unexpected end of document".to_string());
        assert_eq!(format!("{err}"), "parse: unexpected end of document");
        assert!(err.is_parse());
    }

    #[test]
    fn write_is_not_parse() {
        let err = JobError::Write(std::io::Error::other("disk"));
        assert!(!err.is_parse());
        assert_eq!(format!("{err}"), "write: disk");
    }

    #[test]
    fn source_is_io_error() {
        use std::error::Error;
        let err = JobError::Open(std::io::Error::new(ErrorKind::PermissionDenied, "denied"));
        assert!(err.source().is_some());
        assert!(JobError::Parse("x".into()).source().is_none());
    }
}
