//! Process command - extract fields from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use caqhex_core::{
    summarize, DocumentExtractionResult, DocumentExtractor, DocumentTypeChecker, GateDecision,
};

use super::{load_config, parse_fields, parse_reference_date, read_document_text};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (.txt reconstructed text or .json token stream)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Comma-separated field names (default: the tier-1 field set)
    #[arg(long)]
    fields: Option<String>,

    /// Reference date for expiration checks (YYYY-MM-DD, default: today)
    #[arg(long)]
    reference_date: Option<String>,

    /// Treat a token-stream input as OCR output
    #[arg(long)]
    ocr: bool,

    /// Skip the document-type gate
    #[arg(long)]
    skip_gate: bool,

    /// Show extraction summary statistics
    #[arg(long)]
    show_summary: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output (one row per field)
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let text = read_document_text(&args.input, args.ocr, &config)?;

    let gate = if args.skip_gate {
        GateDecision::valid("gate skipped by flag")
    } else {
        DocumentTypeChecker::new().validate(&text)
    };

    let mut extractor = DocumentExtractor::new(config)?;
    if let Some(date_arg) = &args.reference_date {
        extractor = extractor.with_reference_date(parse_reference_date(date_arg)?);
    }

    let document_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();
    let fields = parse_fields(args.fields.as_deref());

    let result = extractor.extract_document(&document_name, &text, &gate, &fields);

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_summary {
        let summary = summarize(&result);
        println!();
        println!(
            "{} Extracted {}/{} fields, avg confidence {:.2}",
            style("ℹ").blue(),
            summary.fields_extracted,
            summary.total_fields,
            summary.avg_confidence
        );
        println!(
            "{} High/medium/low confidence: {}/{}/{}",
            style("ℹ").blue(),
            summary.high_confidence_fields,
            summary.medium_confidence_fields,
            summary.low_confidence_fields
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_result(
    result: &DocumentExtractionResult,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => format_text(result),
    }
}

fn format_csv(result: &DocumentExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field_name", "value", "confidence", "method"])?;

    for field in &result.field_results {
        let confidence = format!("{:.2}", field.confidence);
        let method = method_tag(field)?;
        wtr.write_record([
            field.field_name.as_str(),
            field.extracted_value.as_deref().unwrap_or(""),
            confidence.as_str(),
            method.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn method_tag(field: &caqhex_core::FieldExtractionResult) -> anyhow::Result<String> {
    let json = serde_json::to_string(&field.extraction_method)?;
    Ok(json.trim_matches('"').to_string())
}

fn format_text(result: &DocumentExtractionResult) -> anyhow::Result<String> {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", result.document_name));
    output.push_str(&format!(
        "Fields extracted: {}/{}\n",
        result.fields_extracted, result.total_fields_attempted
    ));
    output.push_str(&format!("Passed gate: {}\n", result.passed_gate));
    output.push('\n');

    for field in &result.field_results {
        match &field.extracted_value {
            Some(value) => {
                output.push_str(&format!(
                    "  {:40} {}  (confidence {:.2})\n",
                    field.field_name, value, field.confidence
                ));
            }
            None => {
                output.push_str(&format!("  {:40} <not found>\n", field.field_name));
            }
        }
        for warning in &field.warnings {
            output.push_str(&format!("      warning: {}\n", warning));
        }
    }

    if !result.errors.is_empty() {
        output.push('\n');
        for error in &result.errors {
            output.push_str(&format!("error: {}\n", error));
        }
    }

    Ok(output)
}
