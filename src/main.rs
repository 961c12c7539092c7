mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jitterpass::charset::CategorySet;
use jitterpass::config::{DEFAULT_LOG_FILTER, ServerConfig};
use jitterpass::generator::generate_password;
use jitterpass::seed::{Collector, DEFAULT_REQUIRED_MOVES, MotionSample, Seed};
use jitterpass::settings::{DEFAULT_LENGTH, Settings};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "jitterpass",
    version,
    author,
    about = "Password derivation from pointer-motion entropy"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the derivation API over HTTP
    Serve(ServerConfig),
    /// Derive a password locally from a seed or a motion sample file
    Derive(DeriveArgs),
}

#[derive(Args)]
struct DeriveArgs {
    /// Base64-encoded 32-byte seed (prompted for when neither source is given)
    #[arg(short, long, conflicts_with = "samples")]
    entropy: Option<String>,

    /// File with one motion sample per line: x y t
    #[arg(short = 'f', long)]
    samples: Option<PathBuf>,

    /// Number of samples that make up one collection
    #[arg(long, default_value_t = DEFAULT_REQUIRED_MOVES)]
    required_moves: usize,

    #[arg(short, long, default_value_t = DEFAULT_LENGTH)]
    length: usize,

    #[arg(long)]
    lowercase: bool,

    #[arg(long)]
    uppercase: bool,

    #[arg(long)]
    numbers: bool,

    #[arg(long)]
    symbols: bool,

    /// Latin-1 supplement, U+00A0 to U+00FF
    #[arg(long)]
    extended_latin: bool,

    /// Extra characters appended to the alphabet
    #[arg(short, long, default_value = "")]
    custom: String,

    /// Require at least one character from every selected category
    #[arg(short, long)]
    require_each: bool,

    /// Print only the password
    #[arg(short, long)]
    quiet: bool,
}

impl DeriveArgs {
    fn settings(&self) -> Result<Settings> {
        let mut categories = CategorySet::empty();
        categories.set(CategorySet::LOWERCASE, self.lowercase);
        categories.set(CategorySet::UPPERCASE, self.uppercase);
        categories.set(CategorySet::NUMBERS, self.numbers);
        categories.set(CategorySet::SYMBOLS, self.symbols);
        categories.set(CategorySet::EXTENDED_LATIN, self.extended_latin);

        let custom = ui::normalize_custom_characters(&self.custom)?;
        if categories.is_empty() && custom.is_empty() {
            categories = Settings::default().categories;
        }

        Ok(Settings::new(self.length, categories)
            .with_custom_characters(custom)
            .with_require_each_selected(self.require_each))
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn collect_seed(path: &Path, required_moves: usize) -> Result<Seed> {
    let samples = ui::read_samples(path)?;
    seed_from_samples(samples, required_moves)
        .with_context(|| format!("Failed to collect a seed from {}", path.display()))
}

/// Feeds one full collection through the collector. The file must hold
/// exactly `required_moves` samples.
fn seed_from_samples(samples: Vec<MotionSample>, required_moves: usize) -> Result<Seed> {
    let mut collector = Collector::new(required_moves)?;
    if samples.len() != required_moves {
        return Err(jitterpass::Error::SampleCount {
            expected: required_moves,
            actual: samples.len(),
        }
        .into());
    }

    collector.start();
    for sample in samples {
        collector.record(sample)?;
    }

    collector.take_seed().ok_or_else(|| {
        anyhow::Error::from(jitterpass::Error::SampleCount {
            expected: required_moves,
            actual: collector.collected(),
        })
    })
}

fn derive(args: DeriveArgs) -> Result<()> {
    let settings = args.settings()?;
    let alphabet = settings.alphabet()?;

    let (seed, source) = match (&args.entropy, &args.samples) {
        (Some(encoded), _) => (
            Seed::from_base64(encoded).context("Failed to decode entropy")?,
            ui::EntropySource::Encoded,
        ),
        (None, Some(path)) => (
            collect_seed(path, args.required_moves)?,
            ui::EntropySource::Samples {
                count: args.required_moves,
            },
        ),
        (None, None) => (ui::prompt_entropy()?, ui::EntropySource::Encoded),
    };

    let options = ui::DisplayOptions {
        unicode_support: ui::detect_unicode_support(),
        color_support: ui::detect_color_support(),
        quiet: args.quiet,
    };

    let (password, elapsed) = ui::show_progress(options.unicode_support, || {
        Ok(generate_password(&seed, &settings)?)
    })?;

    ui::display_output(&password, &settings, &alphabet, &source, elapsed, &options);

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Serve(config) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(jitterpass::server::serve(config))
        }
        Command::Derive(args) => derive(args),
    }
}
