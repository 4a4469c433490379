use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{column_index, CellRange, CellRef, MAX_COLS, MAX_ROWS};
use crate::cell::Cell;
use crate::conditional::ConditionalFormat;
use crate::dimension::{ColumnDimension, RowDimension, SheetFormat};
use crate::error::{ModelError, ModelResult};
use crate::print::PrintSettings;
use crate::style::Style;
use crate::validation::DataValidation;
use crate::value::CellValue;
use crate::view::{SheetView, SheetVisibility};

/// A named, sparse grid of cells plus its layout records.
///
/// Merged ranges are authoritative: positions inside a merged range other
/// than its anchor are placeholders, and every mutating accessor refuses to
/// touch them. Declaring a merge drops whatever the placeholders held.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellRef, Cell>,
    merged: Vec<CellRange>,
    rows: BTreeMap<u32, RowDimension>,
    columns: BTreeMap<u32, ColumnDimension>,
    pub format: SheetFormat,
    /// Top-left cell of the scrollable pane (`B2` freezes row 1 and column A).
    pub freeze_panes: Option<CellRef>,
    pub conditional_formats: Vec<ConditionalFormat>,
    pub data_validations: Vec<DataValidation>,
    pub print: PrintSettings,
    pub view: SheetView,
    pub visibility: SheetVisibility,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the sheet holds no cells and no layout state at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
            && self.merged.is_empty()
            && self.rows.is_empty()
            && self.columns.is_empty()
            && self.format == SheetFormat::default()
            && self.freeze_panes.is_none()
            && self.conditional_formats.is_empty()
            && self.data_validations.is_empty()
            && self.print.is_empty()
            && self.view.is_default()
            && self.visibility.is_visible()
    }

    // -- cells --------------------------------------------------------------

    pub fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.cells.get(&at)
    }

    pub fn value(&self, at: CellRef) -> Option<&CellValue> {
        self.cells.get(&at).map(|c| &c.value)
    }

    /// Populated cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().map(|(at, cell)| (*at, cell))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Mutable access to a cell, creating it if absent.
    ///
    /// Fails for out-of-grid positions and merged-cell placeholders.
    pub fn cell_mut(&mut self, at: CellRef) -> ModelResult<&mut Cell> {
        if at.row == 0 || at.col == 0 || at.row > MAX_ROWS || at.col > MAX_COLS {
            return Err(ModelError::InvalidReference(format!("R{}C{}", at.row, at.col)));
        }
        if let Some(range) = self.placeholder_range(at) {
            return Err(ModelError::MergedCellPlaceholder { cell: at, range });
        }
        Ok(self.cells.entry(at).or_default())
    }

    pub fn set_value(&mut self, at: CellRef, value: impl Into<CellValue>) -> ModelResult<()> {
        self.cell_mut(at)?.value = value.into();
        Ok(())
    }

    pub fn set_style(&mut self, at: CellRef, style: Style) -> ModelResult<()> {
        self.cell_mut(at)?.style = Some(style);
        Ok(())
    }

    /// Insert a whole cell, replacing any previous content at `at`.
    pub fn put_cell(&mut self, at: CellRef, cell: Cell) -> ModelResult<()> {
        *self.cell_mut(at)? = cell;
        Ok(())
    }

    pub fn remove_cell(&mut self, at: CellRef) -> Option<Cell> {
        self.cells.remove(&at)
    }

    /// Bounding range of populated cells and merged ranges.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut corners = self
            .cells
            .keys()
            .map(|at| (*at, *at))
            .chain(self.merged.iter().map(|r| (r.start, r.end)));
        let (first_start, first_end) = corners.next()?;
        let (mut top, mut left, mut bottom, mut right) =
            (first_start.row, first_start.col, first_end.row, first_end.col);
        for (start, end) in corners {
            top = top.min(start.row);
            left = left.min(start.col);
            bottom = bottom.max(end.row);
            right = right.max(end.col);
        }
        Some(CellRange::new(CellRef::new(top, left), CellRef::new(bottom, right)))
    }

    // -- merges -------------------------------------------------------------

    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.merged
    }

    /// Declare a merged range. Placeholder positions lose their content; the
    /// anchor keeps its own. Single-cell ranges are accepted and ignored.
    pub fn merge(&mut self, range: CellRange) -> ModelResult<()> {
        if range.is_single_cell() {
            return Ok(());
        }
        if let Some(existing) = self.merged.iter().find(|m| m.overlaps(&range)) {
            if *existing == range {
                return Ok(());
            }
            return Err(ModelError::OverlappingMerge { new: range, existing: *existing });
        }
        let anchor = range.anchor();
        let doomed: Vec<CellRef> = self
            .cells
            .range(range.start..=range.end)
            .map(|(at, _)| *at)
            .filter(|at| *at != anchor && range.contains(*at))
            .collect();
        for at in doomed {
            self.cells.remove(&at);
        }
        self.merged.push(range);
        Ok(())
    }

    /// Remove a merged range; returns whether it existed.
    pub fn unmerge(&mut self, range: CellRange) -> bool {
        let before = self.merged.len();
        self.merged.retain(|m| *m != range);
        self.merged.len() != before
    }

    /// The merged range for which `at` is a non-anchor placeholder.
    pub fn placeholder_range(&self, at: CellRef) -> Option<CellRange> {
        self.merged
            .iter()
            .find(|m| m.contains(at) && m.anchor() != at)
            .copied()
    }

    pub fn is_placeholder(&self, at: CellRef) -> bool {
        self.placeholder_range(at).is_some()
    }

    // -- dimensions ---------------------------------------------------------

    pub fn row_dimension(&self, row: u32) -> Option<&RowDimension> {
        self.rows.get(&row)
    }

    /// Rows with a non-default record, ascending.
    pub fn row_dimensions(&self) -> impl Iterator<Item = (u32, &RowDimension)> {
        self.rows.iter().map(|(r, d)| (*r, d))
    }

    /// Store a row record; default records are dropped.
    pub fn set_row_dimension(&mut self, row: u32, dim: RowDimension) {
        if dim.is_default() {
            self.rows.remove(&row);
        } else {
            self.rows.insert(row, dim);
        }
    }

    pub fn column_dimension(&self, col: u32) -> Option<&ColumnDimension> {
        self.columns.get(&col)
    }

    /// Look a column record up by its letters (`"C"`).
    pub fn column_dimension_by_letter(&self, letters: &str) -> Option<&ColumnDimension> {
        column_index(letters).and_then(|col| self.columns.get(&col))
    }

    /// Columns with a non-default record, ascending.
    pub fn column_dimensions(&self) -> impl Iterator<Item = (u32, &ColumnDimension)> {
        self.columns.iter().map(|(c, d)| (*c, d))
    }

    pub fn set_column_dimension(&mut self, col: u32, dim: ColumnDimension) {
        if dim.is_default() {
            self.columns.remove(&col);
        } else {
            self.columns.insert(col, dim);
        }
    }
}
