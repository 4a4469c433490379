use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dcfm_merge::{PublicCompanyPrecedence, ValuationDate};

#[derive(Parser)]
#[command(
    name = "dcfm",
    about = "DCF Merge: combine a DCF template with consensus and company profile workbooks",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP upload server
    Serve(ServeArgs),
    /// Merge workbooks from disk without the server
    Merge(MergeArgs),
    /// List the sheets of a workbook
    Sheets(SheetsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub template: Option<PathBuf>,
    #[arg(long)]
    pub staging_root: Option<PathBuf>,
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
    #[arg(long)]
    pub output_filename: Option<String>,
    #[arg(long)]
    pub precedence: Option<PublicCompanyPrecedence>,
    /// Stamp today's date next to the "Valuation Date" label
    #[arg(long)]
    pub stamp_valuation_date: bool,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Workbook holding the "Consensus" sheet
    #[arg(long)]
    pub consensus: PathBuf,
    /// Company profile workbook holding a "Public Company" sheet
    #[arg(long)]
    pub profile: Option<PathBuf>,
    #[arg(long, default_value = "DCF Model.xlsx")]
    pub template: PathBuf,
    #[arg(short, long, default_value = "Merged_DCF_Model.xlsx")]
    pub output: PathBuf,
    #[arg(long, default_value_t = PublicCompanyPrecedence::ProfileFirst)]
    pub precedence: PublicCompanyPrecedence,
    /// `off`, `today`, or a YYYY-MM-DD date
    #[arg(long, default_value = "off")]
    pub valuation_date: ValuationDate,
}

#[derive(Args)]
pub struct SheetsArgs {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_merge() {
        let cli = Cli::try_parse_from([
            "dcfm", "merge", "--consensus", "c.xlsx", "--profile", "p.xlsx", "-o", "out.xlsx",
        ])
        .unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.consensus, PathBuf::from("c.xlsx"));
            assert_eq!(args.profile, Some(PathBuf::from("p.xlsx")));
            assert_eq!(args.output, PathBuf::from("out.xlsx"));
            assert_eq!(args.template, PathBuf::from("DCF Model.xlsx"));
            assert_eq!(args.precedence, PublicCompanyPrecedence::ProfileFirst);
            assert_eq!(args.valuation_date, ValuationDate::Off);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_merge_options() {
        let cli = Cli::try_parse_from([
            "dcfm", "merge", "--consensus", "c.xlsx",
            "--precedence", "consensus-first", "--valuation-date", "2025-06-30",
        ])
        .unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.precedence, PublicCompanyPrecedence::ConsensusFirst);
            assert!(matches!(args.valuation_date, ValuationDate::Fixed(_)));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn merge_requires_consensus() {
        assert!(Cli::try_parse_from(["dcfm", "merge"]).is_err());
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["dcfm", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert!(args.config.is_none());
            assert!(!args.stamp_valuation_date);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["dcfm", "--format", "json", "sheets", "book.xlsx"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
