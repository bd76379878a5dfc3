use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};

use docmark::{Config, Document, MemoryDocument, PlannedTable, Position, Session};

#[derive(Parser)]
#[command(name = "docmark")]
#[command(about = "Convert between Markdown and document edit requests", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the request batches for a Markdown file as JSON
    Compile {
        /// Input Markdown file
        input: PathBuf,

        /// Document index the text is inserted at
        #[arg(long, default_value_t = 1)]
        start: usize,
    },
    /// Print a document JSON file as Markdown
    Decompile {
        /// Document JSON, as returned by the documents API
        input: PathBuf,

        /// First line to print (1-based)
        #[arg(long, default_value_t = 1)]
        start_line: usize,

        /// Maximum lines to print (defaults to the configured page size)
        #[arg(long)]
        max_lines: Option<usize>,
    },
    /// Write a Markdown file into an empty in-memory document and print the result
    Preview {
        /// Input Markdown file
        input: PathBuf,

        /// Print the document JSON instead of reading it back as Markdown
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::compiled_default(),
    };

    if let Err(e) = run(cli.command, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Compile { input, start } => {
            let markdown = read(&input)?;
            let compiled = docmark::compile_with_config(&markdown, start, &config.styles)?;
            let structure: Vec<_> = compiled
                .tables
                .iter()
                .map(|spec| PlannedTable::new(spec.clone()).structure_directive())
                .collect();

            let output = json!({
                "textBatch": compiled.text_batch(),
                "tableStructure": structure,
                "tables": compiled.tables,
                "end": compiled.end,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Decompile {
            input,
            start_line,
            max_lines,
        } => {
            let document: Document = serde_json::from_str(&read(&input)?)?;
            let markdown = docmark::decompile_with_config(&document, &config.styles)?;
            let page = docmark::paginate(
                &markdown,
                &document.title,
                start_line,
                max_lines.unwrap_or(config.read.max_lines),
            );
            println!("{}", page.content);
            if let Some(next) = page.next_start_line {
                info!(remaining = page.remaining_lines, next, "More lines available");
            }
        }
        Commands::Preview { input, json } => {
            let markdown = read(&input)?;
            let title = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut session = Session::new(MemoryDocument::new("preview", title), config);
            let summary = session
                .write_markdown("preview", &markdown, Position::End)
                .await?;
            info!(
                inserted = summary.inserted_characters,
                tables = summary.tables,
                "Previewed"
            );

            if json {
                let document = session.service().document();
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                let page = session.read_markdown("preview", 1, Some(usize::MAX)).await?;
                println!("{}", page.content);
            }
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    fs::read_to_string(path).map_err(|e| format!("Error reading {}: {}", path.display(), e).into())
}
