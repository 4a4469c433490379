use dcfm_model::ModelError;
use thiserror::Error;

/// Errors from reading or writing `.xlsx` packages.
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a readable zip archive.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml parse error in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("{part} is not valid UTF-8: {source}")]
    Utf8 {
        part: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("missing required part: {0}")]
    MissingPart(String),

    #[error("part {part} inflates beyond the {limit}-byte limit")]
    PartTooLarge { part: String, limit: u64 },

    #[error("malformed {part}: {reason}")]
    Malformed { part: String, reason: String },

    #[error("workbook model error: {0}")]
    Model(#[from] ModelError),
}

impl XlsxError {
    pub(crate) fn malformed(part: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            part: part.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for codec operations.
pub type XlsxResult<T> = Result<T, XlsxError>;
