use criterion::{Criterion, black_box, criterion_group, criterion_main};
use neural_network::{ConvolutionConfig, Network, NetworkConfig, Sample};

const INPUT_DIM: usize = 206;
const NUM_LABELS: usize = 10;

fn synthetic_batch(size: usize) -> Vec<Sample> {
    (0..size)
        .map(|i| {
            let features = (0..INPUT_DIM)
                .map(|j| ((i * 31 + j * 7) % 97) as f64 / 97.0)
                .collect();
            Sample::new(i % NUM_LABELS, features)
        })
        .collect()
}

fn network_benchmarks(c: &mut Criterion) {
    let configs = vec![
        (
            "dense_64",
            NetworkConfig {
                seed: Some(1),
                ..NetworkConfig::default()
            },
        ),
        (
            "conv_dense_64",
            NetworkConfig {
                convolution: Some(ConvolutionConfig::default()),
                seed: Some(1),
                ..NetworkConfig::default()
            },
        ),
    ];
    let batch = synthetic_batch(32);

    for (name, config) in &configs {
        let mut network = match Network::new(INPUT_DIM, NUM_LABELS, config) {
            Ok(network) => network,
            Err(e) => {
                eprintln!("skipping {name}: {e}");
                continue;
            }
        };

        c.bench_function(&format!("forward_{name}"), |b| {
            b.iter(|| network.forward(black_box(&batch[0].features)))
        });
        c.bench_function(&format!("train_batch_32_{name}"), |b| {
            b.iter(|| network.train_batch(black_box(&batch), 0.01))
        });
    }
}

criterion_group!(benches, network_benchmarks);
criterion_main!(benches);
