// Chorale Markov — CLI entry point.
//
// Trains a K-gram model on a JSON corpus of parsed chorales, seeds it with
// the opening of a randomly chosen piece, generates a chord sequence and
// writes it to MIDI.
//
// Usage:
//   cargo run -p chorale_markov -- <corpus.json> [output.mid] [--config FILE]
//     [--window N] [--length N] [--seed N] [--tempo BPM] [--parallel]
//     [--json FILE]
//
// Logging goes through `tracing`; set RUST_LOG (e.g. `chorale_markov=debug`)
// for per-piece and per-chord detail.

use anyhow::{Context, Result, bail};
use chorale_markov::config::GeneratorConfig;
use chorale_markov::corpus::{Corpus, choose_seed};
use chorale_markov::driver::generate;
use chorale_markov::ingest::{train, train_parallel};
use chorale_markov::midi::write_midi;
use chorale_markov::prng::ChoraleRng;
use chorale_markov::KgramError;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chorale_markov=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(corpus_path) = args.get(1).filter(|s| !s.starts_with("--")) else {
        bail!(
            "usage: generate <corpus.json> [output.mid] [--config FILE] [--window N] \
             [--length N] [--seed N] [--tempo BPM] [--parallel] [--json FILE]"
        );
    };
    let output_path = args
        .get(2)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("chorale.mid");

    let mut config = match parse_flag::<String>(&args, "--config") {
        Some(path) => GeneratorConfig::load(Path::new(&path))
            .with_context(|| format!("loading config {path}"))?,
        None => GeneratorConfig::default(),
    };
    if let Some(k) = parse_flag(&args, "--window") {
        config.window_len = k;
    }
    if let Some(length) = parse_flag(&args, "--length") {
        config.length = length;
    }
    if let Some(seed) = parse_flag(&args, "--seed") {
        config.seed = Some(seed);
    }
    if let Some(tempo) = parse_flag(&args, "--tempo") {
        config.tempo_bpm = tempo;
    }
    config.validate().context("invalid configuration")?;
    let seed = config.seed.unwrap_or_else(clock_seed);
    let parallel = args.iter().any(|a| a == "--parallel");

    println!("=== Chorale Markov ===");
    println!("Corpus: {corpus_path}");
    println!("Output: {output_path}");
    println!("K-gram length: {}", config.window_len);
    println!("Chords to generate: {}", config.length);
    println!(
        "Register band: {}..={}",
        config.register.lower, config.register.upper
    );
    println!("Seed: {seed}");
    println!();

    let mut rng = ChoraleRng::new(seed);

    println!("[1/4] Loading corpus...");
    let corpus = Corpus::load(Path::new(corpus_path))
        .with_context(|| format!("loading corpus {corpus_path}"))?;
    let pieces = corpus.resolve_all().context("resolving corpus pieces")?;
    println!("  {} pieces.", pieces.len());

    println!("[2/4] Training{}...", if parallel { " (parallel)" } else { "" });
    let (engine, report) = if parallel {
        train_parallel(config.window_len, config.voices, &pieces)
    } else {
        train(config.window_len, config.voices, &pieces)
    }
    .context("training failed")?;
    println!(
        "  {} windows recorded ({} skipped for rests), {} distinct fingerprints.",
        report.recorded, report.skipped, report.fingerprints
    );

    println!("[3/4] Generating...");
    let opening = choose_seed(&pieces, config.window_len, &mut rng).context("choosing a seed")?;
    let sequence = match generate(&engine, &opening, config.length, config.register, &mut rng) {
        Ok(sequence) => sequence,
        Err(KgramError::UnseenWindow) => bail!(
            "generation reached a window never seen in training; \
             try another --seed or a smaller --window"
        ),
        Err(e) => return Err(e).context("generation failed"),
    };
    println!("  {} chords.", sequence.len());
    print!("{}", sequence.summary());

    println!("[4/4] Writing MIDI to {output_path}...");
    write_midi(&sequence, config.tempo_bpm, config.program, Path::new(output_path))
        .with_context(|| format!("writing {output_path}"))?;
    if let Some(json_path) = parse_flag::<String>(&args, "--json") {
        let json = serde_json::to_string_pretty(&sequence)?;
        std::fs::write(&json_path, json).with_context(|| format!("writing {json_path}"))?;
        println!("  Sequence JSON written to {json_path}.");
    }

    println!();
    println!("Play with: timidity {output_path} (or any MIDI player)");
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
