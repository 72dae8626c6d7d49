//! CLI application indexing an annotated corpus into a local index snapshot.

use std::fs;
use std::path::PathBuf;

use annograph::data::CorpusReader;
use annograph::index::schema::{DEFAULT_ANNOT_FIELD, DEFAULT_TEXT_FIELD};
use annograph::{MemoryIndexWriter, SchemaConfig};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "annograph-index")]
#[command(about = "Index an annotated corpus for structured search")]
#[command(version)]
struct Args {
    /// Document file: one `docno<TAB>text` line per document
    #[arg(short = 't', long)]
    text: PathBuf,

    /// Annotation file: `docno<TAB>label<TAB>id<TAB>parent<TAB>start<TAB>len` lines
    #[arg(short = 'a', long)]
    annot: PathBuf,

    /// Output directory for the index snapshot
    #[arg(short = 'i', long, default_value = "./index")]
    index: PathBuf,

    /// Documents per progress batch
    #[arg(short = 'n', long, default_value_t = 100)]
    batch_size: usize,

    /// Name of the annotated text field
    #[arg(long, default_value = DEFAULT_TEXT_FIELD)]
    text_field: String,

    /// Name of the annotations field
    #[arg(long, default_value = DEFAULT_ANNOT_FIELD)]
    annot_field: String,

    /// Schema configuration file (optional; a default schema is used otherwise)
    #[arg(short, long)]
    schema: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let schema = match &args.schema {
        Some(path) => SchemaConfig::from_yaml_file(path)
            .with_context(|| format!("loading schema from {}", path.display()))?,
        None => SchemaConfig::default().with_field_names(&args.text_field, &args.annot_field),
    };
    info!(
        "indexing with text field '{}', annotation field '{}'",
        schema.text_field, schema.annot_field
    );

    let mut writer = MemoryIndexWriter::new(schema)?;
    let reader = CorpusReader::open(&args.text, &args.annot)
        .with_context(|| "opening corpus files")?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} docs {msg}")
            .context("invalid progress template")?,
    );

    let mut count = 0usize;
    for doc in reader {
        let doc = doc?;
        writer.add_document(&doc.docno, &doc.text, &doc.annotations)?;
        count += 1;
        progress.inc(1);
        if count % args.batch_size == 0 {
            progress.set_message(format!("(last: {})", doc.docno));
        }
    }
    progress.finish_with_message("done");

    let index = writer.commit();
    fs::create_dir_all(&args.index)
        .with_context(|| format!("creating {}", args.index.display()))?;
    let snapshot = args.index.join("index.json");
    index.save(&snapshot)?;
    info!("indexed {count} documents into {}", snapshot.display());
    println!("Indexed {count} documents into {}", snapshot.display());
    Ok(())
}
