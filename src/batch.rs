use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::document::{get_current_doc_context, Document};
use crate::language::Language;
use crate::pipeline::shape_completion;
use crate::text::{get_last_line, Position};

/// One evaluation record: a document split at the cursor plus the raw model
/// completion. Unknown fields ride along untouched so downstream tooling
/// keeps whatever it put there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub language_id: String,
    pub prefix: String,
    pub suffix: String,
    pub completion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub line_no: u32,
    pub context_start_characterno: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Record {
    /// Cursor position: taken from metadata when present, otherwise derived
    /// from the prefix shape.
    fn cursor(&self) -> Position {
        match &self.metadata {
            Some(m) => Position::new(m.line_no, m.context_start_characterno),
            None => Position::new(
                self.prefix.matches('\n').count() as u32,
                get_last_line(&self.prefix).chars().count() as u32,
            ),
        }
    }
}

/// Shape one record's completion. Always returns a record: unsupported
/// languages and shaping failures degrade to the raw completion with an
/// `error` annotation rather than failing the batch.
pub fn process_record(mut record: Record, multiline: bool) -> Record {
    let Some(language) = Language::from_id(&record.language_id) else {
        record.error = Some(format!("unknown language id: {}", record.language_id));
        return record;
    };

    let document = Document::new(
        "",
        language,
        record.prefix.clone(),
        record.suffix.clone(),
        record.cursor(),
    );
    let doc_context = get_current_doc_context(&document);

    let shaped = shape_completion(&record.completion, &document, &doc_context, multiline);
    record.completion = shaped.insert_text;
    record
}

/// Process a newline-delimited JSON file record by record.
///
/// Records are shaped in parallel but written in input order. Lines that are
/// not valid records pass through unchanged — a bad line never aborts the
/// batch.
pub fn process_jsonl_file(input: &Path, output: &Path, multiline: bool) -> Result<usize> {
    let reader = BufReader::new(
        std::fs::File::open(input)
            .with_context(|| format!("Failed to open input {}", input.display()))?,
    );
    let lines: Vec<String> = reader
        .lines()
        .collect::<std::io::Result<_>>()
        .context("Failed to read input JSONL")?;

    let pb = ProgressBar::new(lines.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("shaping completions");

    let shaped: Vec<String> = lines
        .par_iter()
        .map(|line| {
            let out = match serde_json::from_str::<Record>(line) {
                Ok(record) => {
                    let processed = process_record(record, multiline);
                    serde_json::to_string(&processed).unwrap_or_else(|_| line.clone())
                }
                Err(err) => {
                    debug_log!("skipping malformed record: {err}");
                    line.clone()
                }
            };
            pb.inc(1);
            out
        })
        .collect();
    pb.finish_and_clear();

    let mut writer = BufWriter::new(
        std::fs::File::create(output)
            .with_context(|| format!("Failed to create output {}", output.display()))?,
    );
    for line in &shaped {
        writeln!(writer, "{line}").context("Failed to write output record")?;
    }
    writer.flush().context("Failed to flush output")?;

    Ok(shaped.len())
}
