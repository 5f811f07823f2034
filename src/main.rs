use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

use coauthor_graph::{
    find_input_files, read_publications, GraphBuilder, Pairing, DEFAULT_TOP_COUNTRIES,
};

#[derive(Parser)]
#[command(name = "coauthor_graph")]
#[command(about = "Co-authorship network builder for bibliographic CSV exports")]
struct Cli {
    /// Input CSV files or glob patterns (files ending in .gz are decompressed)
    #[arg(short, long, num_args = 1.., default_value = "data_scopus.csv")]
    input: Vec<String>,

    /// Output path for the nodes/links JSON document
    #[arg(short, long, default_value = "author_network_data_with_links.json")]
    output: PathBuf,

    /// Number of most frequent countries to keep (the rest become "Other")
    #[arg(short, long, default_value_t = DEFAULT_TOP_COUNTRIES)]
    top_countries: usize,

    /// Field delimiter of the input files
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Fail on records whose author and affiliation counts differ instead of truncating
    #[arg(long)]
    strict_pairing: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    let delimiter = u8::try_from(args.delimiter)
        .ok()
        .filter(|b| b.is_ascii())
        .with_context(|| {
            format!(
                "Delimiter must be a single ASCII character, got {:?}",
                args.delimiter
            )
        })?;

    let pairing = if args.strict_pairing {
        Pairing::Strict
    } else {
        Pairing::Truncate
    };
    info!(
        "Keeping top {} countries, pairing mode: {:?}",
        args.top_countries, pairing
    );

    let files = find_input_files(&args.input)?;

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:50.cyan/blue} {pos:>7}/{len:7} input files | {msg}",
    )?);
    progress.set_message("Reading publications...");

    let mut publications = Vec::new();
    for path in &files {
        let batch = read_publications(path, delimiter)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        publications.extend(batch);
        progress.inc(1);
    }
    progress.finish_with_message("Input reading complete");

    let (graph, stats) = GraphBuilder::new()
        .top_countries(args.top_countries)
        .pairing(pairing)
        .build(&publications)?;

    graph
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    // Print final statistics
    info!("Final Processing Statistics:");
    info!("  Records read: {}", stats.records_read);
    info!("  Records with affiliations: {}", stats.records_with_affiliations);
    info!("  Author-affiliation pairs: {}", stats.author_affiliation_pairs);
    info!("  Distinct countries: {}", stats.distinct_countries);
    info!("  Nodes: {}", stats.nodes);
    info!("  Links: {}", stats.links);
    for (country, count) in &stats.top_countries {
        info!("  {}: {}", country, count);
    }
    if stats.mismatched_records > 0 {
        warn!(
            "{} records had differing author and affiliation counts and were truncated",
            stats.mismatched_records
        );
    }

    println!("\nData saved with nodes and links: {}", args.output.display());

    Ok(())
}
