use std::path::Path;
use std::time::Instant;

use dcfm_model::{Workbook, DEFAULT_SHEET_NAME};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::copier::{copy_worksheet, CopyReport};
use crate::error::{AttributeError, MergeError, MergeResult};
use crate::names::carry_defined_names;
use crate::selection::{plan_sheets, PublicCompanyPrecedence, SheetOrigin, DCF_MODEL_SHEET};
use crate::valuation::{stamp_valuation_date, ValuationDate};

// ---------------------------------------------------------------------------
// MergeOptions
// ---------------------------------------------------------------------------

/// Knobs for one merge run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    pub precedence: PublicCompanyPrecedence,
    pub valuation_date: ValuationDate,
}

/// The assembled workbook and one report per copied sheet.
#[derive(Debug)]
pub struct MergeOutcome {
    pub workbook: Workbook,
    pub reports: Vec<CopyReport>,
    /// Defined names left out because a sheet they refer to was not copied.
    pub skipped_names: Vec<AttributeError>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and check the template. It must contain the "DCF Model" sheet.
pub fn load_template(path: impl AsRef<Path>) -> MergeResult<Workbook> {
    let path = path.as_ref();
    let template = dcfm_xlsx::read_workbook_from_path(path).map_err(MergeError::Template)?;
    if !template.contains_sheet(DCF_MODEL_SHEET) {
        return Err(MergeError::MissingTemplateSheet(DCF_MODEL_SHEET.to_string()));
    }
    info!(path = %path.display(), sheets = ?template.sheet_names(), "loaded template");
    Ok(template)
}

/// Parse an uploaded workbook. Anything unreadable is the uploader's fault.
pub fn parse_upload(role: SheetOrigin, bytes: &[u8]) -> MergeResult<Workbook> {
    dcfm_xlsx::read_workbook_from_bytes(bytes).map_err(|err| MergeError::InvalidUpload {
        source_name: role.as_str().to_string(),
        reason: err.to_string(),
    })
}

fn read_upload(role: SheetOrigin, path: &Path) -> MergeResult<Workbook> {
    let bytes = std::fs::read(path)?;
    parse_upload(role, &bytes)
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Build the merged workbook: DCF Model from the template, Consensus from the
/// consensus upload, and Public Company per `options.precedence`.
///
/// Sources are only read. The output starts as a fresh workbook; any sheet
/// already holding a target name is replaced, and the initial blank sheet is
/// dropped before returning. Defined names whose sheets all made it into the
/// output are carried last.
pub fn build_workbook(
    consensus: &Workbook,
    profile: Option<&Workbook>,
    template: &Workbook,
    options: &MergeOptions,
) -> MergeResult<MergeOutcome> {
    let plan = plan_sheets(template, consensus, profile, options.precedence)?;

    let mut output = Workbook::new();
    output.default_font = template.default_font.clone();
    let mut reports = Vec::with_capacity(plan.len());

    for step in &plan {
        if output.remove_sheet(step.name).is_some() {
            debug!(sheet = step.name, "replaced existing sheet");
        }
        let destination = output.create_sheet(step.name)?;
        let report = copy_worksheet(step.source, destination)?;
        info!(
            sheet = step.name,
            origin = step.origin.as_str(),
            cells = report.cells,
            skipped = report.skipped.len(),
            "copied sheet"
        );
        reports.push(report);
    }

    if let Some(date) = options.valuation_date.resolve() {
        if let Some(sheet) = output.sheet_mut(DCF_MODEL_SHEET) {
            stamp_valuation_date(sheet, date)?;
        }
    }

    let planned: Vec<&str> = plan.iter().map(|p| p.name).collect();
    if !planned.contains(&DEFAULT_SHEET_NAME)
        && output.sheet(DEFAULT_SHEET_NAME).is_some_and(|s| s.is_empty())
    {
        output.remove_sheet(DEFAULT_SHEET_NAME);
    }
    output.reorder(&planned)?;
    let skipped_names = carry_defined_names(&plan, &mut output);

    Ok(MergeOutcome { workbook: output, reports, skipped_names })
}

/// Merge uploaded bytes against a loaded template and serialize the result.
pub fn build_output(
    consensus: &[u8],
    profile: Option<&[u8]>,
    template: &Workbook,
    options: &MergeOptions,
) -> MergeResult<Vec<u8>> {
    let started = Instant::now();
    let consensus = parse_upload(SheetOrigin::Consensus, consensus)?;
    let profile = profile
        .map(|bytes| parse_upload(SheetOrigin::Profile, bytes))
        .transpose()?;
    let outcome = build_workbook(&consensus, profile.as_ref(), template, options)?;
    let bytes = dcfm_xlsx::write_workbook_to_vec(&outcome.workbook).map_err(MergeError::Write)?;
    info!(
        sheets = ?outcome.workbook.sheet_names(),
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "built merged workbook"
    );
    Ok(bytes)
}

/// Merge staged or on-disk files; the same as [`build_output`] but reading
/// the uploads from paths.
pub fn build_output_from_paths(
    consensus: &Path,
    profile: Option<&Path>,
    template: &Workbook,
    options: &MergeOptions,
) -> MergeResult<Vec<u8>> {
    let consensus = std::fs::read(consensus)?;
    let profile = profile.map(std::fs::read).transpose()?;
    build_output(&consensus, profile.as_deref(), template, options)
}

/// Offline merge: read everything from disk and write the result to `output`.
pub fn merge_files(
    consensus: &Path,
    profile: Option<&Path>,
    template: &Path,
    output: &Path,
    options: &MergeOptions,
) -> MergeResult<MergeOutcome> {
    let template = load_template(template)?;
    let consensus = read_upload(SheetOrigin::Consensus, consensus)?;
    let profile = profile
        .map(|p| read_upload(SheetOrigin::Profile, p))
        .transpose()?;
    let outcome = build_workbook(&consensus, profile.as_ref(), &template, options)?;
    dcfm_xlsx::write_workbook_to_path(&outcome.workbook, output).map_err(MergeError::Write)?;
    info!(output = %output.display(), "wrote merged workbook");
    Ok(outcome)
}
