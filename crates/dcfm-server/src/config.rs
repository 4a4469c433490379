use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use dcfm_merge::{MergeOptions, PublicCompanyPrecedence, ValuationDate};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Workbook holding the "DCF Model" sheet.
    pub template_path: PathBuf,
    /// Parent of per-request staging directories; the OS temp dir if unset.
    pub staging_root: Option<PathBuf>,
    pub max_upload_bytes: usize,
    /// File name offered in `Content-Disposition`.
    pub output_filename: String,
    pub public_company_precedence: PublicCompanyPrecedence,
    /// Write today's date next to the "Valuation Date" label.
    pub stamp_valuation_date: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            template_path: PathBuf::from("DCF Model.xlsx"),
            staging_root: None,
            max_upload_bytes: 50 * 1024 * 1024,
            output_filename: "Merged_DCF_Model.xlsx".to_string(),
            public_company_precedence: PublicCompanyPrecedence::default(),
            stamp_valuation_date: false,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            precedence: self.public_company_precedence,
            valuation_date: if self.stamp_valuation_date {
                ValuationDate::Today
            } else {
                ValuationDate::Off
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.template_path, PathBuf::from("DCF Model.xlsx"));
        assert_eq!(c.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(c.output_filename, "Merged_DCF_Model.xlsx");
        assert!(c.staging_root.is_none());
        assert_eq!(c.merge_options(), MergeOptions::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml(
            r#"
            bind_addr = "0.0.0.0:9000"
            public_company_precedence = "consensus-first"
            stamp_valuation_date = true
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.output_filename, "Merged_DCF_Model.xlsx");
        let options = c.merge_options();
        assert_eq!(options.precedence, PublicCompanyPrecedence::ConsensusFirst);
        assert_eq!(options.valuation_date, ValuationDate::Today);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = ServerConfig::from_toml("public_company_precedence = \"newest\"").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dcfm.toml");
        std::fs::write(&path, "max_upload_bytes = 1024\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().max_upload_bytes, 1024);
        assert!(ServerConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
