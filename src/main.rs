use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use codeweld::batch::process_jsonl_file;
use codeweld::config::load_config;
use codeweld::document::{get_current_doc_context, Document};
use codeweld::language::Language;
use codeweld::pipeline::shape_completion;
use codeweld::text::{get_last_line, Position};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "codeweld")]
#[command(version)]
#[command(about = "Shapes raw LLM code completions so they splice cleanly into a source file")]
struct Cli {
    /// Input JSONL file of completion records (prefix/suffix/completion)
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output JSONL file (shaped completions, input order preserved)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Treat completions as single-line (skip structural truncation)
    #[arg(long)]
    single_line: bool,

    /// Worker threads for the batch run (default: rayon's choice)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Shape one completion and print the result as JSON
    Shape {
        /// File holding the document text before the cursor
        #[arg(long, value_name = "FILE")]
        prefix_file: PathBuf,

        /// File holding the document text after the cursor (may be omitted)
        #[arg(long, value_name = "FILE")]
        suffix_file: Option<PathBuf>,

        /// File holding the raw model completion
        #[arg(long, value_name = "FILE")]
        completion_file: PathBuf,

        /// Language id (editor style, e.g. "python", "typescriptreact")
        #[arg(long, value_name = "ID")]
        language: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Shape {
        prefix_file,
        suffix_file,
        completion_file,
        language,
    }) = cli.cmd
    {
        let config = load_config(
            prefix_file
                .parent()
                .unwrap_or_else(|| std::path::Path::new(".")),
        );
        let multiline = !cli.single_line && config.multiline;
        return shape_one(
            &prefix_file,
            suffix_file.as_deref(),
            &completion_file,
            &language,
            multiline,
        );
    }

    let input = cli
        .input
        .ok_or_else(|| anyhow!("--input is required (or use the `shape` subcommand)"))?;
    let output = cli
        .output
        .ok_or_else(|| anyhow!("--output is required"))?;

    let config = load_config(input.parent().unwrap_or_else(|| std::path::Path::new(".")));
    let multiline = !cli.single_line && config.multiline;

    if let Some(threads) = cli.threads.or(config.threads) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let count = process_jsonl_file(&input, &output, multiline)?;
    eprintln!("shaped {count} records -> {}", output.display());
    Ok(())
}

fn shape_one(
    prefix_file: &std::path::Path,
    suffix_file: Option<&std::path::Path>,
    completion_file: &std::path::Path,
    language_id: &str,
    multiline: bool,
) -> Result<()> {
    let language = Language::from_id(language_id)
        .ok_or_else(|| anyhow!("Unknown language id: {language_id}"))?;

    let prefix = std::fs::read_to_string(prefix_file)
        .with_context(|| format!("Failed to read {}", prefix_file.display()))?;
    let suffix = match suffix_file {
        Some(p) => {
            std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))?
        }
        None => String::new(),
    };
    let completion = std::fs::read_to_string(completion_file)
        .with_context(|| format!("Failed to read {}", completion_file.display()))?;

    let position = Position::new(
        prefix.matches('\n').count() as u32,
        get_last_line(&prefix).chars().count() as u32,
    );
    let document = Document::new("", language, prefix, suffix, position);
    let doc_context = get_current_doc_context(&document);

    let shaped = shape_completion(&completion, &document, &doc_context, multiline);
    println!("{}", serde_json::to_string(&shaped)?);
    Ok(())
}
