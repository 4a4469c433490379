//! Defined names carried into the merged workbook.
//!
//! A name survives when every sheet it refers to exists in the output:
//!
//! - names local to a copied sheet (print areas, print titles, sheet-scoped
//!   inputs) travel with that sheet;
//! - workbook-scoped names of the template are kept, constants included;
//! - workbook-scoped names of an upload are kept only when they refer to
//!   sheets copied from that same upload.
//!
//! Sources are visited in plan order and the first definition of a name in a
//! scope wins.

use dcfm_model::{DefinedName, ModelError, Workbook};
use tracing::{debug, warn};

use crate::error::AttributeError;
use crate::selection::{SheetOrigin, SheetPlan};

/// Copy the defined names `plan` makes reachable into `output`, returning
/// the ones that had to be dropped because a referenced sheet is missing.
pub fn carry_defined_names(plan: &[SheetPlan<'_>], output: &mut Workbook) -> Vec<AttributeError> {
    let mut skipped = Vec::new();

    for step in plan {
        let local = step
            .workbook
            .defined_names()
            .iter()
            .filter(|n| n.local_sheet.as_deref() == Some(step.source.name()));
        for name in local {
            let carried = DefinedName {
                local_sheet: Some(step.name.to_string()),
                ..name.clone()
            };
            add(output, carried, &mut skipped, |sheet, output| output.contains_sheet(sheet));
        }
    }

    for (index, step) in plan.iter().enumerate() {
        if plan[..index].iter().any(|p| std::ptr::eq(p.workbook, step.workbook)) {
            continue;
        }

        // Sheets of this workbook that made it into the output.
        let copied: Vec<&str> = plan
            .iter()
            .filter(|p| std::ptr::eq(p.workbook, step.workbook))
            .map(|p| p.name)
            .collect();
        let from_template = step.origin == SheetOrigin::Template;
        let globals = step
            .workbook
            .defined_names()
            .iter()
            .filter(|n| n.local_sheet.is_none());
        for name in globals {
            if !from_template && name.referenced_sheets().is_empty() {
                debug!(defined = %name.name, origin = step.origin.as_str(), "ignoring upload constant");
                continue;
            }
            add(output, name.clone(), &mut skipped, |sheet, output| {
                output.contains_sheet(sheet) && (from_template || copied.contains(&sheet))
            });
        }
    }

    for err in &skipped {
        warn!(error = %err, "skipped defined name");
    }
    skipped
}

fn add(
    output: &mut Workbook,
    name: DefinedName,
    skipped: &mut Vec<AttributeError>,
    resolves: impl Fn(&str, &Workbook) -> bool,
) {
    let missing = name
        .referenced_sheets()
        .into_iter()
        .find(|s| !resolves(s.as_str(), &*output));
    if let Some(sheet) = missing {
        skipped.push(AttributeError::DanglingDefinedName { name: name.name, sheet });
        return;
    }
    match output.add_defined_name(name) {
        Ok(()) => {}
        Err(ModelError::DuplicateDefinedName(name)) => {
            debug!(defined = %name, "defined name already carried from an earlier source");
        }
        Err(err) => warn!(error = %err, "could not add defined name"),
    }
}
