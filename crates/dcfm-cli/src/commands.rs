use anyhow::Context;
use colored::Colorize;
use dcfm_merge::{CopyReport, MergeOptions};
use dcfm_server::{DcfMergeServer, ServerConfig};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Merge(args) => cmd_merge(args, &cli.format),
        Command::Sheets(args) => cmd_sheets(args, &cli.format),
    }
}

fn server_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(template) = args.template {
        config.template_path = template;
    }
    if let Some(root) = args.staging_root {
        config.staging_root = Some(root);
    }
    if let Some(limit) = args.max_upload_bytes {
        config.max_upload_bytes = limit;
    }
    if let Some(name) = args.output_filename {
        config.output_filename = name;
    }
    if let Some(precedence) = args.precedence {
        config.public_company_precedence = precedence;
    }
    config.stamp_valuation_date |= args.stamp_valuation_date;
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(args)?;
    println!(
        "DCF Merge server on {} (template: {})",
        config.bind_addr.to_string().bold(),
        config.template_path.display()
    );
    let server = DcfMergeServer::new(config).context("failed to start server")?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_merge(args: MergeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let options = MergeOptions {
        precedence: args.precedence,
        valuation_date: args.valuation_date,
    };
    tracing::debug!(?options, template = %args.template.display(), "merging from disk");
    let outcome = dcfm_merge::merge_files(
        &args.consensus,
        args.profile.as_deref(),
        &args.template,
        &args.output,
        &options,
    )?;

    match format {
        OutputFormat::Json => {
            let doc = json!({
                "output": args.output.display().to_string(),
                "sheets": outcome.workbook.sheet_names(),
                "reports": outcome.reports,
                "defined_names": outcome.workbook.defined_names().len(),
                "skipped_names": outcome
                    .skipped_names
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            println!("{} Wrote {}", "✓".green().bold(), args.output.display().to_string().bold());
            for report in &outcome.reports {
                print_report(report);
            }
            for skipped in &outcome.skipped_names {
                println!("  {} {}", "skipped:".yellow(), skipped);
            }
        }
    }
    Ok(())
}

fn print_report(report: &CopyReport) {
    let mark = if report.is_complete() { "✓".green() } else { "!".yellow() };
    println!(
        "  {} {}: {} cells, {} merged ranges, {} conditional formats, {} validations",
        mark,
        report.sheet.cyan(),
        report.cells,
        report.merged_ranges,
        report.conditional_formats,
        report.data_validations
    );
    for skipped in &report.skipped {
        println!("      {} {}", "skipped:".yellow(), skipped);
    }
}

fn cmd_sheets(args: SheetsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.path)
        .with_context(|| format!("cannot read {}", args.path.display()))?;
    let names = dcfm_xlsx::sheet_names_from_bytes(&bytes)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&names)?),
        OutputFormat::Text => {
            for name in &names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use dcfm_merge::PublicCompanyPrecedence;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let mut full = vec!["dcfm", "serve"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Serve(args) => args,
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dcfm.toml");
        std::fs::write(&path, "output_filename = \"From_File.xlsx\"\nmax_upload_bytes = 10\n").unwrap();

        let config = server_config(serve_args(&[
            "--config",
            path.to_str().unwrap(),
            "--max-upload-bytes",
            "20",
            "--precedence",
            "consensus-first",
        ]))
        .unwrap();

        assert_eq!(config.output_filename, "From_File.xlsx");
        assert_eq!(config.max_upload_bytes, 20);
        assert_eq!(config.public_company_precedence, PublicCompanyPrecedence::ConsensusFirst);
        assert!(!config.stamp_valuation_date);
    }

    #[test]
    fn defaults_without_config() {
        let config = server_config(serve_args(&["--stamp-valuation-date"])).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert!(config.stamp_valuation_date);
    }
}
