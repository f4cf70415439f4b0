//! Batch processing command for multiple documents.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error};

use caqhex_core::{
    summarize, DocumentExtractionResult, DocumentExtractor, DocumentTypeChecker, GateDecision,
};

use super::{load_config, parse_fields, parse_reference_date, read_document_text};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory for per-document JSON results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Comma-separated field names (default: the tier-1 field set)
    #[arg(long)]
    fields: Option<String>,

    /// Reference date for expiration checks (YYYY-MM-DD, default: today)
    #[arg(long)]
    reference_date: Option<String>,

    /// Treat token-stream inputs as OCR output
    #[arg(long)]
    ocr: bool,

    /// Skip the document-type gate
    #[arg(long)]
    skip_gate: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "txt" | "json")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No input files matched: {}", args.input);
    }

    let mut extractor = DocumentExtractor::new(config)?;
    if let Some(date_arg) = &args.reference_date {
        extractor = extractor.with_reference_date(parse_reference_date(date_arg)?);
    }

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
    }

    let checker = DocumentTypeChecker::new();
    let fields = parse_fields(args.fields.as_deref());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    let mut results: Vec<DocumentExtractionResult> = Vec::new();
    let mut failures = 0usize;

    for path in &files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        pb.set_message(name.clone());

        match process_one(&extractor, &checker, path, &args, &fields) {
            Ok(result) => {
                if let Some(dir) = &args.output_dir {
                    let out_path = dir.join(format!(
                        "{}.json",
                        path.file_stem().and_then(|s| s.to_str()).unwrap_or("out")
                    ));
                    fs::write(&out_path, serde_json::to_string_pretty(&result)?)?;
                }
                results.push(result);
            }
            Err(e) => {
                failures += 1;
                error!("{}: {e}", path.display());
                if !args.continue_on_error {
                    pb.abandon();
                    return Err(e);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");

    if args.summary {
        let summary_csv = build_summary_csv(&results)?;
        match &args.output_dir {
            Some(dir) => {
                let path = dir.join("summary.csv");
                fs::write(&path, summary_csv)?;
                println!("{} Summary written to {}", style("✓").green(), path.display());
            }
            None => print!("{summary_csv}"),
        }
    }

    let extracted_total: usize = results.iter().map(|r| r.fields_extracted).sum();
    let attempted_total: usize = results.iter().map(|r| r.total_fields_attempted).sum();
    println!(
        "{} Processed {} document(s), {} failure(s), {}/{} fields extracted in {:.1}s",
        style("✓").green(),
        results.len(),
        failures,
        extracted_total,
        attempted_total,
        start.elapsed().as_secs_f32()
    );

    Ok(())
}

fn process_one(
    extractor: &DocumentExtractor,
    checker: &DocumentTypeChecker,
    path: &PathBuf,
    args: &BatchArgs,
    fields: &[String],
) -> anyhow::Result<DocumentExtractionResult> {
    let text = read_document_text(path, args.ocr, extractor.config())?;

    let gate = if args.skip_gate {
        GateDecision::valid("gate skipped by flag")
    } else {
        checker.validate(&text)
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let result = extractor.extract_document(name, &text, &gate, fields);
    debug!(
        "{}: {}/{} fields",
        name, result.fields_extracted, result.total_fields_attempted
    );
    Ok(result)
}

fn build_summary_csv(results: &[DocumentExtractionResult]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "document",
        "passed_gate",
        "fields_attempted",
        "fields_extracted",
        "avg_confidence",
        "errors",
        "warnings",
    ])?;

    for result in results {
        let summary = summarize(result);
        let passed_gate = result.passed_gate.to_string();
        let total_fields = summary.total_fields.to_string();
        let fields_extracted = summary.fields_extracted.to_string();
        let avg_confidence = format!("{:.2}", summary.avg_confidence);
        let total_errors = summary.total_errors.to_string();
        let total_warnings = summary.total_warnings.to_string();
        wtr.write_record([
            result.document_name.as_str(),
            passed_gate.as_str(),
            total_fields.as_str(),
            fields_extracted.as_str(),
            avg_confidence.as_str(),
            total_errors.as_str(),
            total_warnings.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
