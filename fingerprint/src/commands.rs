use crate::report::AccuracyReport;
use anyhow::{Context, Result, bail};
use log::{info, warn};
use neural_network::{Network, NetworkConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use session_features::{
    DatasetBuilder, EncoderSettings, LabelRegistry, SessionEncoder, read_session_table,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use training::{Trainer, TrainingConfig};

pub struct TrainOptions {
    pub sessions: PathBuf,
    pub labels: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub network: Option<PathBuf>,
    pub model: PathBuf,
    pub test_ratio: f64,
    pub seed: Option<u64>,
}

/// `<model><suffix>`, e.g. `model.bin.encoder.json`.
fn sidecar(model: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(model.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

pub fn encoder_path(model: &Path) -> PathBuf {
    sidecar(model, ".encoder.json")
}

pub fn network_config_path(model: &Path) -> PathBuf {
    sidecar(model, ".network.json")
}

pub fn history_path(model: &Path) -> PathBuf {
    sidecar(model, ".history.json")
}

fn load_registry(labels: Option<&Path>) -> Result<LabelRegistry> {
    match labels {
        Some(path) => LabelRegistry::from_label_map(path)
            .with_context(|| format!("Failed to read label map {}", path.display())),
        None => Ok(LabelRegistry::new()),
    }
}

/// Encoder settings and network shape saved next to `model` by `train`.
fn load_model(model: &Path) -> Result<(SessionEncoder, Network)> {
    let settings_path = encoder_path(model);
    let settings = EncoderSettings::load(&settings_path).with_context(|| {
        format!(
            "Failed to read encoder settings {}; was the model trained with `train`?",
            settings_path.display()
        )
    })?;
    let config_path = network_config_path(model);
    let config = if config_path.exists() {
        NetworkConfig::load(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?
    } else {
        warn!(
            "{} not found; assuming the default network configuration",
            config_path.display()
        );
        NetworkConfig::default()
    };

    let network = Network::load(model, settings.feature_dim, settings.num_labels, &config)
        .context("Failed to build network")?;
    Ok((SessionEncoder::from_settings(&settings), network))
}

pub fn train(options: &TrainOptions) -> Result<()> {
    let records = read_session_table(&options.sessions).with_context(|| {
        format!("Failed to read session table {}", options.sessions.display())
    })?;
    let registry = load_registry(options.labels.as_deref())?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let (dataset, encoder) = DatasetBuilder::new()
        .test_ratio(options.test_ratio)
        .num_labels(registry.label_count())
        .build(&records, &mut rng)
        .context("Failed to build dataset")?;
    println!(
        "Dataset: {} training / {} test samples, {} labels, feature dimension {}",
        dataset.train.len(),
        dataset.test.len(),
        dataset.num_labels,
        dataset.feature_dim
    );

    let mut network_config = match &options.network {
        Some(path) => NetworkConfig::load(path)
            .with_context(|| format!("Failed to read network config {}", path.display()))?,
        None => NetworkConfig::default(),
    };
    if network_config.seed.is_none() {
        network_config.seed = options.seed;
    }
    let training_config = match &options.config {
        Some(path) => TrainingConfig::load(path)
            .with_context(|| format!("Failed to read training config {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    println!("{network_config}");

    let network = Network::new(dataset.feature_dim, dataset.num_labels, &network_config)
        .context("Failed to build network")?;
    println!("{network}");

    let mut trainer = Trainer::new(network, training_config);
    trainer
        .train(&dataset, Some(options.model.as_path()), &mut rng)
        .context("Training failed")?;
    if trainer.history().epochs() == 0 {
        trainer
            .network()
            .save(&options.model)
            .with_context(|| format!("Failed to save model {}", options.model.display()))?;
    }

    encoder
        .settings()
        .save(&encoder_path(&options.model))
        .context("Failed to save encoder settings")?;
    network_config
        .save(&network_config_path(&options.model))
        .context("Failed to save network config")?;
    let history = trainer.history();
    history
        .save(&history_path(&options.model))
        .context("Failed to save training history")?;

    history.print_summary();
    println!("\nModel saved to {}", options.model.display());
    Ok(())
}

pub fn evaluate(sessions: &Path, model: &Path, labels: Option<&Path>) -> Result<()> {
    let records = read_session_table(sessions)
        .with_context(|| format!("Failed to read session table {}", sessions.display()))?;
    let registry = load_registry(labels)?;
    let (encoder, mut network) = load_model(model)?;

    let mut report = AccuracyReport::new();
    for (index, record) in records.iter().enumerate() {
        let prediction = encoder
            .encode_record(record)
            .map_err(anyhow::Error::from)
            .and_then(|sample| network.predict(&sample.features).map_err(anyhow::Error::from));
        match prediction {
            Ok(prediction) => report.record(record.label, prediction.label),
            Err(e) => {
                warn!("Skipping record {index}: {e}");
                report.skip();
            }
        }
    }
    if report.total() == 0 {
        bail!("No session in {} could be evaluated", sessions.display());
    }

    info!("Evaluated {} sessions", report.total());
    print!("{}", report.render(&registry));
    Ok(())
}

pub fn labels(domains: &Path, out: &Path) -> Result<()> {
    let registry = LabelRegistry::from_domain_list(domains)
        .with_context(|| format!("Failed to read domain list {}", domains.display()))?;
    registry
        .write_label_map(out)
        .with_context(|| format!("Failed to write label map {}", out.display()))?;

    for (label, name) in registry.iter() {
        println!("{label:>3}  {name}");
    }
    println!("\n{} site labels written to {}", registry.len(), out.display());
    Ok(())
}

pub fn predict(
    model: &Path,
    labels: Option<&Path>,
    packet_features: &str,
    top: usize,
) -> Result<()> {
    let registry = load_registry(labels)?;
    let (encoder, mut network) = load_model(model)?;

    let features = encoder
        .encode_packet_string(packet_features)
        .context("Failed to encode packet features")?;
    let prediction = network.predict(&features).context("Prediction failed")?;

    let mut ranked: Vec<(usize, f64)> =
        prediction.probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!(
        "Predicted site: {} ({:.2}%)",
        registry.name(prediction.label),
        prediction.confidence * 100.0
    );
    for (rank, (label, probability)) in ranked.into_iter().take(top).enumerate() {
        println!(
            "{:>3}. {:<20} {:>7.2}%",
            rank + 1,
            registry.name(label),
            probability * 100.0
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_paths() {
        let model = Path::new("out/model.bin");
        assert_eq!(encoder_path(model), PathBuf::from("out/model.bin.encoder.json"));
        assert_eq!(network_config_path(model), PathBuf::from("out/model.bin.network.json"));
        assert_eq!(history_path(model), PathBuf::from("out/model.bin.history.json"));
    }
}
