use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Disposition class of an error, independent of the variant that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Lookup,
    Transfer,
    ExtractionOpen,
}

impl ErrorKind {
    /// Fatal kinds end the run; the caller only ever sees them as a returned error.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::ExtractionOpen)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CkanError {
    #[error("configuration error: {0}")]
    #[diagnostic(help("set it in ckan-dl.json or pass it on the command line"))]
    Configuration(String),

    #[error("failed to read config file at {path}: {message}")]
    ConfigRead { path: PathBuf, message: String },

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid package name: {0}")]
    InvalidPackageName(String),

    #[error("package not found: {0}")]
    PackageNotFound(String),

    #[error("ambiguous package name: {name} matched {count} packages")]
    AmbiguousPackage { name: String, count: usize },

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("unexpected catalog response: {0}")]
    CatalogResponse(String),

    #[error("transfer of {url} failed: {message}")]
    Transfer { url: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("cannot open archive {path}: {message}")]
    ExtractionOpen { path: PathBuf, message: String },
}

impl CkanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CkanError::Configuration(_)
            | CkanError::ConfigRead { .. }
            | CkanError::ConfigParse(_) => ErrorKind::Configuration,
            CkanError::InvalidPackageName(_)
            | CkanError::PackageNotFound(_)
            | CkanError::AmbiguousPackage { .. }
            | CkanError::CatalogHttp(_)
            | CkanError::CatalogStatus { .. }
            | CkanError::CatalogResponse(_) => ErrorKind::Lookup,
            CkanError::Transfer { .. } | CkanError::Filesystem(_) => ErrorKind::Transfer,
            CkanError::ExtractionOpen { .. } => ErrorKind::ExtractionOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_extraction_open_is_recoverable() {
        let err = CkanError::ExtractionOpen {
            path: PathBuf::from("b.zip"),
            message: "invalid Zip archive".to_string(),
        };
        assert!(!err.kind().is_fatal());
        assert!(CkanError::PackageNotFound("pkg".to_string()).kind().is_fatal());
        assert!(CkanError::Configuration("x".to_string()).kind().is_fatal());
    }
}
