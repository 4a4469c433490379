//! Which source sheet fills each slot of the merged workbook.

use std::fmt;
use std::str::FromStr;

use dcfm_model::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};

pub const DCF_MODEL_SHEET: &str = "DCF Model";
pub const CONSENSUS_SHEET: &str = "Consensus";
pub const PUBLIC_COMPANY_SHEET: &str = "Public Company";

/// Sheet names of the merged workbook, in output order.
pub const OUTPUT_ORDER: [&str; 3] = [DCF_MODEL_SHEET, CONSENSUS_SHEET, PUBLIC_COMPANY_SHEET];

/// Which upload wins when both carry a "Public Company" sheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublicCompanyPrecedence {
    /// The profile upload's sheet, falling back to the consensus upload's.
    #[default]
    ProfileFirst,
    /// The consensus upload's sheet, falling back to the profile's.
    ConsensusFirst,
}

impl fmt::Display for PublicCompanyPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProfileFirst => "profile-first",
            Self::ConsensusFirst => "consensus-first",
        })
    }
}

impl FromStr for PublicCompanyPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile-first" => Ok(Self::ProfileFirst),
            "consensus-first" => Ok(Self::ConsensusFirst),
            other => Err(format!(
                "unknown precedence {other:?} (expected profile-first or consensus-first)"
            )),
        }
    }
}

/// Where a planned sheet comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetOrigin {
    Template,
    Consensus,
    Profile,
}

impl SheetOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Consensus => "consensus",
            Self::Profile => "profile",
        }
    }
}

/// One output sheet and the source sheet it is copied from.
#[derive(Clone, Copy, Debug)]
pub struct SheetPlan<'a> {
    pub name: &'static str,
    pub origin: SheetOrigin,
    pub source: &'a Worksheet,
    /// Workbook holding `source`; its defined names travel with the sheet.
    pub workbook: &'a Workbook,
}

/// Decide the output sheets.
///
/// The template must hold "DCF Model" and the consensus upload must hold
/// "Consensus". "Public Company" is taken by `precedence` from whichever
/// upload has it and is left out when neither does.
pub fn plan_sheets<'a>(
    template: &'a Workbook,
    consensus: &'a Workbook,
    profile: Option<&'a Workbook>,
    precedence: PublicCompanyPrecedence,
) -> MergeResult<Vec<SheetPlan<'a>>> {
    let dcf = template
        .sheet(DCF_MODEL_SHEET)
        .ok_or_else(|| MergeError::MissingTemplateSheet(DCF_MODEL_SHEET.to_string()))?;
    let consensus_sheet = consensus
        .sheet(CONSENSUS_SHEET)
        .ok_or_else(|| MergeError::MissingSheet {
            sheet: CONSENSUS_SHEET.to_string(),
            source_name: SheetOrigin::Consensus.as_str().to_string(),
        })?;

    let mut plan = vec![
        SheetPlan {
            name: DCF_MODEL_SHEET,
            origin: SheetOrigin::Template,
            source: dcf,
            workbook: template,
        },
        SheetPlan {
            name: CONSENSUS_SHEET,
            origin: SheetOrigin::Consensus,
            source: consensus_sheet,
            workbook: consensus,
        },
    ];

    let from_profile = profile.and_then(|p| {
        p.sheet(PUBLIC_COMPANY_SHEET)
            .map(|s| (SheetOrigin::Profile, s, p))
    });
    let from_consensus = consensus
        .sheet(PUBLIC_COMPANY_SHEET)
        .map(|s| (SheetOrigin::Consensus, s, consensus));
    let public_company = match precedence {
        PublicCompanyPrecedence::ProfileFirst => from_profile.or(from_consensus),
        PublicCompanyPrecedence::ConsensusFirst => from_consensus.or(from_profile),
    };
    if let Some((origin, source, workbook)) = public_company {
        plan.push(SheetPlan { name: PUBLIC_COMPANY_SHEET, origin, source, workbook });
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfm_model::CellRef;

    fn workbook(sheets: &[(&str, &str)]) -> Workbook {
        let mut wb = Workbook::empty();
        for (name, marker) in sheets {
            wb.create_sheet(name)
                .unwrap()
                .set_value(CellRef::new(1, 1), *marker)
                .unwrap();
        }
        wb
    }

    fn marker(plan: &SheetPlan<'_>) -> String {
        plan.source
            .value(CellRef::new(1, 1))
            .and_then(|v| v.as_text())
            .unwrap_or_default()
            .to_string()
    }

    fn template() -> Workbook {
        workbook(&[("DCF Model", "template")])
    }

    #[test]
    fn consensus_only() {
        let t = template();
        let c = workbook(&[("Consensus", "c")]);
        let plan = plan_sheets(&t, &c, None, PublicCompanyPrecedence::default()).unwrap();
        let names: Vec<_> = plan.iter().map(|p| p.name).collect();
        assert_eq!(names, ["DCF Model", "Consensus"]);
    }

    #[test]
    fn consensus_supplies_public_company() {
        let t = template();
        let c = workbook(&[("Consensus", "c"), ("Public Company", "c-pc")]);
        let plan = plan_sheets(&t, &c, None, PublicCompanyPrecedence::default()).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2].origin, SheetOrigin::Consensus);
        assert_eq!(marker(&plan[2]), "c-pc");
    }

    #[test]
    fn profile_wins_by_default() {
        let t = template();
        let c = workbook(&[("Consensus", "c"), ("Public Company", "c-pc")]);
        let p = workbook(&[("Public Company", "p-pc")]);
        let plan = plan_sheets(&t, &c, Some(&p), PublicCompanyPrecedence::ProfileFirst).unwrap();
        assert_eq!(plan[2].origin, SheetOrigin::Profile);
        assert_eq!(marker(&plan[2]), "p-pc");
    }

    #[test]
    fn consensus_first_overrides_profile() {
        let t = template();
        let c = workbook(&[("Consensus", "c"), ("Public Company", "c-pc")]);
        let p = workbook(&[("Public Company", "p-pc")]);
        let plan = plan_sheets(&t, &c, Some(&p), PublicCompanyPrecedence::ConsensusFirst).unwrap();
        assert_eq!(marker(&plan[2]), "c-pc");
    }

    #[test]
    fn profile_without_public_company_falls_back() {
        let t = template();
        let c = workbook(&[("Consensus", "c"), ("Public Company", "c-pc")]);
        let p = workbook(&[("Overview", "p")]);
        let plan = plan_sheets(&t, &c, Some(&p), PublicCompanyPrecedence::ProfileFirst).unwrap();
        assert_eq!(marker(&plan[2]), "c-pc");
    }

    #[test]
    fn missing_consensus_is_a_client_error() {
        let t = template();
        let c = workbook(&[("Summary", "x")]);
        let err = plan_sheets(&t, &c, None, PublicCompanyPrecedence::default()).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("'Consensus'"));
    }

    #[test]
    fn template_without_dcf_model_is_internal() {
        let t = workbook(&[("Sheet1", "x")]);
        let c = workbook(&[("Consensus", "c")]);
        let err = plan_sheets(&t, &c, None, PublicCompanyPrecedence::default()).unwrap_err();
        assert!(matches!(err, MergeError::MissingTemplateSheet(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn precedence_parses_and_prints() {
        for p in [PublicCompanyPrecedence::ProfileFirst, PublicCompanyPrecedence::ConsensusFirst] {
            assert_eq!(p.to_string().parse::<PublicCompanyPrecedence>().unwrap(), p);
        }
        assert!("newest".parse::<PublicCompanyPrecedence>().is_err());
    }
}
