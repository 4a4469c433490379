use dcfm_model::ModelError;
use dcfm_xlsx::XlsxError;

/// Errors that abort a worksheet copy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CopyError {
    #[error("destination sheet {0:?} is not empty")]
    DestinationNotEmpty(String),

    #[error("copying {sheet:?} failed: {source}")]
    Model {
        sheet: String,
        #[source]
        source: ModelError,
    },
}

/// A best-effort attribute that could not be carried over.
///
/// Never propagated: the copier logs it, records it in the report and moves
/// on to the next attribute.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributeError {
    #[error("conditional format on {sqref} references differential style {dxf_id}, which the source workbook does not define")]
    UnresolvedDifferentialStyle { sqref: String, dxf_id: u32 },

    #[error("conditional format has no target range")]
    EmptyConditionalRange,

    #[error("freeze pane at {0} is outside the sheet")]
    InvalidFreezePane(String),

    #[error("data validation has no target range")]
    EmptyValidationRange,

    #[error("defined name {name:?} refers to sheet {sheet:?}, which the merged workbook does not contain")]
    DanglingDefinedName { name: String, sheet: String },
}

/// Errors from assembling a merged workbook.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A mandatory sheet is absent from an uploaded workbook.
    #[error("'{sheet}' sheet not found in the {source_name} file")]
    MissingSheet { sheet: String, source_name: String },

    /// An upload could not be parsed as a spreadsheet.
    #[error("the {source_name} file is not a readable .xlsx workbook: {reason}")]
    InvalidUpload { source_name: String, reason: String },

    #[error("template is missing the '{0}' sheet")]
    MissingTemplateSheet(String),

    #[error("template could not be loaded: {0}")]
    Template(#[source] XlsxError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error("workbook assembly failed: {0}")]
    Model(#[from] ModelError),

    #[error("merged workbook could not be written: {0}")]
    Write(#[source] XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MergeError {
    /// Whether the caller (rather than the service) is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingSheet { .. } | Self::InvalidUpload { .. })
    }
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        let missing = MergeError::MissingSheet {
            sheet: "Consensus".into(),
            source_name: "consensus".into(),
        };
        assert!(missing.is_client_error());
        assert_eq!(missing.to_string(), "'Consensus' sheet not found in the consensus file");
        assert!(!MergeError::MissingTemplateSheet("DCF Model".into()).is_client_error());
        let copy = MergeError::from(CopyError::DestinationNotEmpty("X".into()));
        assert!(!copy.is_client_error());
    }
}
