//! # Solidity-Sentinel CLI Entry Point
//!
//! @title Solidity-Sentinel CLI
//! @author Ramprasad
//!
//! This module provides the main entry point for the Solidity-Sentinel
//! command-line security scanner.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use solidity_sentinel::cli::Commands;
use solidity_sentinel::report::render_tree;
use solidity_sentinel::scan::{collect_artifacts, load_index, scan, ScanOptions};
use solidity_sentinel::{extract_contract, Cli, DetectorRegistry, Severity};
use std::path::{Path, PathBuf};

/// ASCII art banner displayed at startup.
const BANNER: &str = r#"
  ____        _ _     _ _ _            ____             _   _            _
 / ___|  ___ | (_) __| (_) |_ _   _   / ___|  ___ _ __ | |_(_)_ __   ___| |
 \___ \ / _ \| | |/ _` | | __| | | |  \___ \ / _ \ '_ \| __| | '_ \ / _ \ |
  ___) | (_) | | | (_| | | |_| |_| |   ___) |  __/ | | | |_| | | | |  __/ |
 |____/ \___/|_|_|\__,_|_|\__|\__, |  |____/ \___|_| |_|\__|_|_| |_|\___|_|
                              |___/
              Solidity Smart Contract Security Scanner
"#;

/// Application entry point.
///
/// Initializes the logging system, parses command-line arguments, and
/// dispatches to the appropriate command handler.
///
/// # Returns
///
/// Returns `Ok(())` on successful execution, or an error if any operation fails.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            recursive,
            contracts,
            function,
            format,
            output,
            severity,
            exclude,
            only,
            include_sequence,
            fail_on_findings,
        } => {
            let options = ScanOptions {
                recursive,
                contracts,
                function,
                include_sequence,
                only,
                exclude,
                show_progress: format == "terminal",
            };
            let remaining = run_scan(&path, &options, &format, output, severity)?;
            if fail_on_findings && remaining > 0 {
                std::process::exit(1);
            }
        }
        Commands::Extract {
            path,
            contract,
            json,
        } => {
            run_extract(&path, &contract, json)?;
        }
        Commands::List => {
            list_detectors();
        }
        Commands::Version => {
            println!(
                "{} {}",
                "Solidity-Sentinel version:".green(),
                env!("CARGO_PKG_VERSION").yellow()
            );
        }
    }

    Ok(())
}

/// Executes the security scan operation.
///
/// # Arguments
///
/// * `path` - Artifact file, directory, or glob pattern
/// * `options` - Contract, function and detector selection
/// * `format` - Output format: "terminal", "json", "markdown" or "github"
/// * `output` - Optional output directory for Markdown and JSON reports
/// * `min_severity` - Optional minimum severity level to include in results
///
/// # Returns
///
/// The number of findings left after severity filtering.
fn run_scan(
    path: &Path,
    options: &ScanOptions,
    format: &str,
    output: Option<PathBuf>,
    min_severity: Option<String>,
) -> Result<usize> {
    if format == "terminal" {
        println!("{}", BANNER.cyan().bold());
        println!(
            "{} {}",
            "[*] Scanning:".green().bold(),
            path.display().to_string().yellow()
        );
    }

    let mut report = scan(path, options)
        .with_context(|| format!("scan of {} failed", path.display()))?;
    if let Some(ref min_sev) = min_severity {
        report.retain_severity(Severity::from_str(min_sev));
    }

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&report)?;
            write_or_print(output.as_deref(), "security_report.json", &json)?;
        }
        "markdown" => {
            let md = report.to_markdown()?;
            write_or_print(output.as_deref(), "security_report.md", &md)?;
        }
        "github" => {
            for annotation in report.github_annotations() {
                println!("{}", annotation);
            }
        }
        _ => {
            report.print_terminal();
            println!("\n{}", "=".repeat(60).cyan());
            report.print_summary();
        }
    }

    Ok(report.findings.len())
}

fn write_or_print(output: Option<&Path>, file_name: &str, content: &str) -> Result<()> {
    let Some(dir) = output else {
        println!("{}", content);
        return Ok(());
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create {}", dir.display()))?;
    let report_path = dir.join(file_name);
    std::fs::write(&report_path, content)
        .with_context(|| format!("cannot write {}", report_path.display()))?;
    eprintln!(
        "{} {}",
        "[+] Report saved to:".green(),
        report_path.display().to_string().yellow()
    );
    Ok(())
}

/// Prints the extracted IR of `contract` as a tree or JSON.
fn run_extract(path: &Path, contract: &str, json: bool) -> Result<()> {
    let files = collect_artifacts(path, true)?;
    let index = load_index(&files, path.is_file())?;
    let extraction = extract_contract(&index, contract)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else {
        println!("{}", render_tree(&extraction));
    }
    Ok(())
}

/// Displays all available vulnerability detectors.
///
/// Prints a formatted list of registered detectors including their
/// IDs, names, severity levels, scope, and descriptions.
fn list_detectors() {
    let registry = DetectorRegistry::new();

    println!("{}", "[*] Available Vulnerability Detectors:".green().bold());
    println!("{}", "-".repeat(60).cyan());

    for detector in registry.detectors() {
        println!(
            "  {} {} [{}] ({:?})",
            detector.id().cyan().bold(),
            detector.name().white(),
            detector.severity().to_string().yellow(),
            detector.scope()
        );
        println!("     {}", detector.description().dimmed());
        if let Some(cwe) = detector.cwe() {
            println!("     {}", cwe.blue());
        }
        println!();
    }
}
