//! Prints a concordance of a text file: every word in ascending order, how
//! often it occurs, and the lines it occurs on.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example concordance -- notes.txt
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avl_concordance::{AvlMap, AvlSet};

const DEFAULT_DELIMITERS: &str = " .,<>`!?@#$%^&*()_+=[]{}-;:\t'\"|";

#[derive(Debug, Parser)]
#[command(about = "Index the words of a text file by occurrence count and line number")]
struct Args {
    /// Text file to index
    path: PathBuf,

    /// Characters that separate words
    #[arg(long, default_value = DEFAULT_DELIMITERS)]
    delimiters: String,

    /// Keep the casing of words instead of folding them to upper case
    #[arg(long)]
    keep_case: bool,
}

#[derive(Debug, Default)]
struct WordEntry {
    occurrences: usize,
    lines: AvlSet<usize>,
}

impl WordEntry {
    fn record(&mut self, line: usize) {
        self.lines.add(line);
        self.occurrences += 1;
    }
}

impl fmt::Display for WordEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "occurs {} times on lines ", self.occurrences)?;
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{line}")?;
        }
        Ok(())
    }
}

fn build_concordance<R: BufRead>(reader: R, args: &Args) -> Result<AvlMap<String, WordEntry>> {
    let mut concordance = AvlMap::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        let words = line
            .split(|c: char| args.delimiters.contains(c))
            .filter(|word| !word.is_empty());
        for word in words {
            let word = if args.keep_case {
                word.to_owned()
            } else {
                word.to_uppercase()
            };
            concordance
                .get_or_insert_with(word, WordEntry::default)
                .record(index + 1);
        }
        tracing::debug!(line = index + 1, words = concordance.len(), "indexed line");
    }
    Ok(concordance)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let started = Instant::now();

    let file = File::open(&args.path)
        .with_context(|| format!("failed to open {}", args.path.display()))?;
    let concordance = build_concordance(BufReader::new(file), &args)?;

    for (word, entry) in &concordance {
        println!("{word} {entry}");
    }

    tracing::info!(
        path = %args.path.display(),
        words = concordance.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "concordance built"
    );
    Ok(())
}
