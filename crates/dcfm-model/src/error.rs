use thiserror::Error;

use crate::address::{CellRange, CellRef};

/// Errors produced by model operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("merged range {new} overlaps existing merged range {existing}")]
    OverlappingMerge { new: CellRange, existing: CellRange },

    /// Attempted to write into a non-anchor cell of a merged range.
    #[error("cell {cell} is a placeholder inside merged range {range}")]
    MergedCellPlaceholder { cell: CellRef, range: CellRange },

    #[error("a sheet named {0:?} already exists")]
    DuplicateSheetName(String),

    #[error("invalid sheet name {name:?}: {reason}")]
    InvalidSheetName { name: String, reason: String },

    #[error("a defined name {0:?} already exists in that scope")]
    DuplicateDefinedName(String),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),
}

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
