mod commands;
mod report;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(clap::Parser)]
#[command(
    name = "fingerprint",
    about = "Website fingerprinting from encrypted session metadata",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Build a dataset from a session table and train a new model
    Train {
        /// Session table (`site_label,packet_features`)
        #[arg(long)]
        sessions: PathBuf,
        /// Label map (`label,site_name`)
        #[arg(long)]
        labels: Option<PathBuf>,
        /// Training configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Network configuration (JSON)
        #[arg(long)]
        network: Option<PathBuf>,
        /// Output model file
        #[arg(long, default_value = "fingerprint_model.bin")]
        model: PathBuf,
        /// Fraction of samples held out for testing
        #[arg(long, default_value_t = session_features::dataset::DEFAULT_TEST_RATIO)]
        test_ratio: f64,
        /// Seed for initialization, balancing and shuffling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Report per-label accuracy of a trained model on a session table
    Evaluate {
        #[arg(long)]
        sessions: PathBuf,
        #[arg(long, default_value = "fingerprint_model.bin")]
        model: PathBuf,
        #[arg(long)]
        labels: Option<PathBuf>,
    },
    /// Derive site labels from a domain list and write the label map
    Labels {
        /// One domain per line, e.g. `www.baidu.com`
        #[arg(long)]
        domains: PathBuf,
        /// Output label map (`label,site_name`)
        #[arg(long, default_value = "site_labels.csv")]
        out: PathBuf,
    },
    /// Classify one session given as `size_direction` pairs, e.g. `387_0;1492_1`
    Predict {
        #[arg(long, default_value = "fingerprint_model.bin")]
        model: PathBuf,
        #[arg(long)]
        labels: Option<PathBuf>,
        /// Number of ranked labels to print
        #[arg(long, default_value_t = 5)]
        top: usize,
        packet_features: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Command::Train {
            sessions,
            labels,
            config,
            network,
            model,
            test_ratio,
            seed,
        } => commands::train(&commands::TrainOptions {
            sessions,
            labels,
            config,
            network,
            model,
            test_ratio,
            seed,
        }),
        Command::Evaluate {
            sessions,
            model,
            labels,
        } => commands::evaluate(&sessions, &model, labels.as_deref()),
        Command::Labels { domains, out } => commands::labels(&domains, &out),
        Command::Predict {
            model,
            labels,
            top,
            packet_features,
        } => commands::predict(&model, labels.as_deref(), &packet_features, top),
    }
}
