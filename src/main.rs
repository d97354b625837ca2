use std::error::Error;
use std::fs;

use log::info;
use serde::Deserialize;

use ferrite_live::{
    ActivationFunction, Command, Dataset, Engine, EngineOptions, LayerGraph, LossType, Notification,
    OptimizerKind, TaskKind, TrainingConfig,
};

/// Optional JSON run description: `ferrite-live [run.json]`.
/// Missing parts fall back to the XOR demo.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RunFile {
    network: Option<LayerGraph>,
    config: Option<TrainingConfig>,
    dataset: Option<Dataset>,
    engine: EngineOptions,
}

fn xor_config() -> TrainingConfig {
    TrainingConfig {
        task: TaskKind::Classification,
        loss: LossType::BinaryCrossEntropy,
        optimizer: OptimizerKind::Adam,
        learning_rate: 0.05,
        batch_size: 4,
        epochs: 500,
        validation_split: 0.0,
        seed: Some(42),
        ..TrainingConfig::default()
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let run_file = match std::env::args().nth(1) {
        Some(path) => {
            info!("loading run description from {path}");
            serde_json::from_str::<RunFile>(&fs::read_to_string(&path)?)?
        }
        None => RunFile::default(),
    };

    let network = run_file.network.unwrap_or_else(|| {
        LayerGraph::dense(
            2,
            &[(4, ActivationFunction::Tanh), (1, ActivationFunction::Sigmoid)],
            Some(42),
        )
    });
    let config = run_file.config.unwrap_or_else(xor_config);
    let dataset = run_file.dataset.unwrap_or_else(Dataset::xor);

    let engine = Engine::spawn(run_file.engine)?;
    engine.send(Command::Start { network, config, dataset })?;

    while let Some(notification) = engine.recv() {
        println!("{}", serde_json::to_string(&notification)?);
        match notification {
            Notification::TrainingComplete { .. } | Notification::Error { .. } => break,
            _ => {}
        }
    }

    engine.shutdown();
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("ferrite-live: {e}");
        std::process::exit(1);
    }
}
