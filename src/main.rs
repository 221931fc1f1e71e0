mod cli_main;

use clap::Parser;
use cli_main::{Cli, Commands, KmerInput};
use colourdb::io::fasta::read_fasta;
use colourdb::{ColourError, ColourIndex, IndexConfig, KmerMode, KmerRef, Result};
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Setting tracing default failed");

    ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .expect("Failed to build thread pool");

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_index(cli: &Cli) -> Result<ColourIndex> {
    let config = match &cli.config {
        Some(path) => IndexConfig::from_json_file(path)?,
        None => IndexConfig::default(),
    };
    if cli.db.exists() {
        info!("Loading index from {}", cli.db.display());
        ColourIndex::restore(config, &cli.db)
    } else {
        ColourIndex::in_memory(config)
    }
}

fn kmer_mode(input: &KmerInput) -> KmerMode {
    if input.as_given {
        KmerMode::AsGiven
    } else {
        KmerMode::Canonical
    }
}

/// Sequences named by the input: each `--kmer` and every FASTA record.
fn input_sequences(input: &KmerInput) -> Result<Vec<(String, String)>> {
    let mut sequences: Vec<(String, String)> = input
        .kmers
        .iter()
        .map(|kmer| (kmer.clone(), kmer.clone()))
        .collect();
    if let Some(path) = &input.fasta {
        for record in read_fasta(path)? {
            sequences.push((record.id, record.sequence));
        }
    }
    if sequences.is_empty() {
        return Err(ColourError::config("no k-mers given; use --kmer or --fasta"));
    }
    Ok(sequences)
}

/// Every k-mer window of the input sequences, in order.
fn input_kmers<'a>(index: &ColourIndex, sequences: &'a [(String, String)]) -> Vec<KmerRef<'a>> {
    sequences
        .iter()
        .flat_map(|(_, seq)| index.codec().windows(seq))
        .map(KmerRef::Seq)
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let index = load_index(&cli)?;

    let changed = match &cli.command {
        Commands::AddSample { name } => {
            let colour = index.add_sample(name)?;
            print_json(&json!({ "sample": name, "colour": colour }))?;
            true
        }

        Commands::Insert { sample, input } => {
            let colour = index.registry().require_colour(sample)?;
            let sequences = input_sequences(input)?;
            let kmers = input_kmers(&index, &sequences);
            index.insert_kmers(&kmers, colour, kmer_mode(input))?;
            info!("Inserted {} k-mers into {}", kmers.len(), sample);
            print_json(&json!({ "sample": sample, "inserted": kmers.len() }))?;
            true
        }

        Commands::InsertSecondary { primary, secondary, input } => {
            let primary_colour = index.registry().require_colour(primary)?;
            let secondary_colour = index.registry().require_colour(secondary)?;
            let sequences = input_sequences(input)?;
            let kmers = input_kmers(&index, &sequences);
            let stored = index.insert_secondary_kmers(
                &kmers,
                primary_colour,
                secondary_colour,
                kmer_mode(input),
            )?;
            info!(
                "Stored {} of {} k-mers of {} as diffs against {}",
                stored,
                kmers.len(),
                secondary,
                primary
            );
            print_json(&json!({ "secondary": secondary, "kmers": kmers.len(), "diffs": stored }))?;
            true
        }

        Commands::LookupDiff { primary, index: position } => {
            let colour = index.registry().require_colour(primary)?;
            let kmer = index.lookup_primary_secondary_diff(colour, *position)?;
            print_json(&json!({ "primary": primary, "index": position, "kmer": kmer }))?;
            false
        }

        Commands::Query { input, threshold } => {
            let mode = kmer_mode(input);
            let sequences = input_sequences(input)?;
            if input.fasta.is_none() && sequences.len() == 1 {
                let (_, kmer) = &sequences[0];
                if kmer.len() == index.codec().k() {
                    print_json(&index.query_kmer(KmerRef::Seq(kmer.as_str()), mode)?)?;
                    return Ok(());
                }
            }
            let mut results = BTreeMap::new();
            for (name, sequence) in &sequences {
                results.insert(name.clone(), index.query_sequence(sequence, *threshold, mode)?);
            }
            print_json(&results)?;
            false
        }

        Commands::Compare { sample_a, sample_b } => {
            print_json(&index.compare(sample_a, sample_b)?)?;
            false
        }

        Commands::Samples => {
            print_json(&index.colours_to_samples()?)?;
            false
        }

        Commands::Stats => {
            print_json(&json!({
                "colours": index.num_colours()?,
                "keys": index.count_keys()?,
                "memory_bytes": index.calculate_memory()?,
                "bits_set": index.bitcount()?,
            }))?;
            false
        }

        Commands::Reset => {
            index.delete_all()?;
            true
        }
    };

    if changed {
        index.dump(&cli.db)?;
    }
    Ok(())
}
