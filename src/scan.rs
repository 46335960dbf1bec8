//! # Scan Orchestration
//!
//! @title Batch Contract Scanner
//! @author Ramprasad
//!
//! Collects AST artifacts from a file, directory or glob pattern, indexes them,
//! and runs every registered detector over each target contract in parallel.

use crate::analysis::AnalysisContext;
use crate::detectors::DetectorRegistry;
use crate::error::{Error, Result};
use crate::parser::{extract_contract, read_document, AstIndex, NodeType};
use crate::report::{ContractReport, FunctionReport, Report};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Options controlling a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Contracts to analyze. Empty means every non-interface contract.
    pub contracts: Vec<String>,
    /// Restrict per-function results to this function.
    pub function: Option<String>,
    /// Keep the statement IR in function reports.
    pub include_sequence: bool,
    pub only: Vec<String>,
    pub exclude: Vec<String>,
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            contracts: Vec::new(),
            function: None,
            include_sequence: false,
            only: Vec::new(),
            exclude: Vec::new(),
            show_progress: false,
        }
    }
}

/// Collects the JSON artifacts named by `path`.
///
/// # Arguments
///
/// * `path` - A JSON file, a directory, or a glob pattern
/// * `recursive` - Whether to search subdirectories of a directory
///
/// # Returns
///
/// Artifact paths in sorted order. `node_modules` directories are skipped.
pub fn collect_artifacts(path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = if path.is_dir() {
        let walker = if recursive {
            WalkDir::new(path)
        } else {
            WalkDir::new(path).max_depth(1)
        };
        walker
            .into_iter()
            .filter_entry(|e| e.file_name() != "node_modules")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_json(e.path()))
            .map(|e| e.into_path())
            .collect()
    } else {
        let pattern = path.to_string_lossy();
        glob::glob(&pattern)
            .map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("skipping unreadable glob match: {}", e);
                    None
                }
            })
            .filter(|p| p.is_file() && is_json(p))
            .collect()
    };

    files.sort();
    log::debug!("{} artifact(s) under {}", files.len(), path.display());
    Ok(files)
}

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

/// Reads `files` in parallel and indexes every compiler AST among them.
///
/// # Arguments
///
/// * `files` - Artifact paths
/// * `strict` - Fail on the first unreadable or non-AST document instead of
///   skipping it with a warning
pub fn load_index(files: &[PathBuf], strict: bool) -> Result<AstIndex> {
    let documents: Vec<_> = files
        .par_iter()
        .map(|path| (path, read_document(path)))
        .collect();

    let mut index = AstIndex::new();
    for (path, document) in documents {
        let loaded = document.and_then(|document| index.add_document(document, path));
        match loaded {
            Ok(_) => {}
            Err(e) if strict => return Err(e),
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }
    Ok(index)
}

/// Extracts one contract and runs the registry over it.
///
/// # Arguments
///
/// * `index` - Loaded source units
/// * `name` - Contract to analyze
/// * `registry` - Detectors to run
/// * `options` - Function filter and sequence retention
///
/// # Returns
///
/// The contract's report, or [`Error::NotFound`] if `name` is not indexed.
pub fn analyze_contract(
    index: &AstIndex,
    name: &str,
    registry: &DetectorRegistry,
    options: &ScanOptions,
) -> Result<ContractReport> {
    let extraction = extract_contract(index, name)?;

    let contract = &extraction.contract;
    let context = AnalysisContext::new(contract, index);
    let functions: Vec<FunctionReport> = contract
        .functions
        .iter()
        .filter(|f| options.function.as_deref().map_or(true, |wanted| f.name == wanted))
        .map(|f| FunctionReport::new(f, registry.run_function(&context, f), options.include_sequence))
        .collect();
    let contract_results = registry.run_contract(&context);

    let report = ContractReport::new(
        contract,
        context.file_path(contract.src.as_ref()),
        functions,
        contract_results,
        extraction.diagnostics.clone(),
    );
    log::info!(
        "{}: {} function(s), {} finding(s)",
        name,
        report.functions.len(),
        report.findings().count()
    );
    Ok(report)
}

/// Contracts to analyze: the requested ones, or every indexed non-interface.
fn targets(index: &AstIndex, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(index
            .contract_names()
            .iter()
            .filter(|name| {
                index
                    .contract(name)
                    .and_then(|node| node.str("contractKind"))
                    .map_or(true, |kind| kind != "interface")
            })
            .cloned()
            .collect());
    }

    requested
        .iter()
        .map(|name| match index.contract(name) {
            Some(node) if node.is(NodeType::ContractDefinition) => Ok(name.clone()),
            _ => Err(Error::NotFound {
                kind: "contract",
                name: name.clone(),
            }),
        })
        .collect()
}

/// Display form of `path`, relative to the working directory when possible.
fn display_path(path: &Path) -> String {
    let relative = std::env::current_dir().ok().and_then(|cwd| {
        let absolute = path.canonicalize().ok()?;
        pathdiff::diff_paths(absolute, cwd)
    });
    match relative {
        Some(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
        Some(_) => ".".to_string(),
        None => path.display().to_string(),
    }
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

/// Scans `path` and builds a report.
///
/// # Arguments
///
/// * `path` - Artifact file, directory, or glob pattern
/// * `options` - Scan options
///
/// # Returns
///
/// The aggregated report. Fails with [`Error::NotFound`] when a requested
/// contract, or the requested function, exists nowhere in the targets.
pub fn scan(path: &Path, options: &ScanOptions) -> Result<Report> {
    let files = collect_artifacts(path, options.recursive)?;
    let index = load_index(&files, path.is_file())?;
    let targets = targets(&index, &options.contracts)?;
    let registry = DetectorRegistry::with_filter(&options.only, &options.exclude);

    let pb = progress_bar(targets.len(), options.show_progress);
    let results: Vec<Result<ContractReport>> = targets
        .par_iter()
        .map(|name| {
            pb.set_message(format!("Analyzing {}", name));
            let report = analyze_contract(&index, name, &registry, options);
            pb.inc(1);
            report
        })
        .collect();
    pb.finish_and_clear();

    let contracts = results.into_iter().collect::<Result<Vec<_>>>()?;
    if let Some(function) = &options.function {
        if contracts.iter().all(|c| c.functions.is_empty()) {
            return Err(Error::NotFound {
                kind: "function",
                name: function.clone(),
            });
        }
    }

    Ok(Report::new(contracts, display_path(path), index.documents()))
}
