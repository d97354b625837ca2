use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::data::{split_data, DataPartition, Dataset, FeatureScaler, Normalization};
use crate::error::{Result, TrainError};
use crate::network::{compile, CompiledNetwork, LayerGraph};
use crate::train::batch::{evaluate, train_batch, BatchOutcome, Evaluation};
use crate::train::metrics::MetricsSnapshot;
use crate::train::train_config::TrainingConfig;

/// Lifecycle of a training session.
///
/// `Idle → Training ⇄ Paused`, `Training → Complete`, any state → `Error`,
/// and `stop`/`reset` return to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    #[default]
    Idle,
    Training,
    Paused,
    Error,
    Complete,
}

/// Something the session reports back after running batches.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainEvent {
    /// One batch was applied.
    Batch(MetricsSnapshot),
    /// `epoch` just finished; training values are averaged over the epoch.
    EpochComplete { epoch: usize, metrics: MetricsSnapshot },
    /// The epoch budget was reached or early stopping triggered.
    TrainingComplete(MetricsSnapshot),
}

#[derive(Debug, Clone, Default)]
struct EpochTotals {
    loss_sum: f64,
    batches: usize,
    correct: Option<usize>,
    samples: usize,
}

impl EpochTotals {
    fn add(&mut self, outcome: &BatchOutcome) {
        self.loss_sum += outcome.loss;
        self.batches += 1;
        self.samples += outcome.samples;
        if let Some(c) = outcome.correct {
            *self.correct.get_or_insert(0) += c;
        }
    }

    fn mean_loss(&self) -> f64 {
        if self.batches == 0 { 0.0 } else { self.loss_sum / self.batches as f64 }
    }

    fn accuracy(&self) -> Option<f64> {
        self.correct.map(|c| c as f64 / self.samples.max(1) as f64)
    }
}

/// Everything owned by one started run: compiled network, config, data
/// partition and counters.
#[derive(Debug)]
struct TrainingRun {
    network: CompiledNetwork,
    config: TrainingConfig,
    data: DataPartition,
    step: usize,
    epoch: usize,
    rng: StdRng,
    totals: EpochTotals,
    validation: Option<Evaluation>,
    best_loss: Option<f64>,
    stale_epochs: usize,
}

impl TrainingRun {
    fn new(graph: &LayerGraph, config: TrainingConfig, dataset: &Dataset) -> Result<TrainingRun> {
        config.validate()?;
        dataset.validate()?;
        let network = compile(graph)?;
        if dataset.feature_width() != network.input_width() {
            return Err(TrainError::ShapeMismatch {
                what: "feature row",
                expected: network.input_width(),
                got: dataset.feature_width(),
            });
        }

        let mut data = split_data(dataset, config.validation_split, config.seed);
        if config.normalization != Normalization::None {
            let scaler = FeatureScaler::fit(&data.train.features, config.normalization);
            scaler.apply(&mut data.train.features);
            scaler.apply(&mut data.validation.features);
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(TrainingRun {
            network,
            config,
            data,
            step: 0,
            epoch: 0,
            rng,
            totals: EpochTotals::default(),
            validation: None,
            best_loss: None,
            stale_epochs: 0,
        })
    }

    fn batches_per_epoch(&self) -> usize {
        self.data.train.len().div_ceil(self.config.batch_size).max(1)
    }

    /// Back to step 0 with the current weights; optimizer accumulators are dropped.
    fn reset_counters(&mut self) {
        self.step = 0;
        self.epoch = 0;
        self.totals = EpochTotals::default();
        self.validation = None;
        self.best_loss = None;
        self.stale_epochs = 0;
        self.network.reset_optimizer();
    }

    fn snapshot(&self, loss: f64, accuracy: Option<f64>) -> MetricsSnapshot {
        MetricsSnapshot {
            step: self.step,
            epoch: self.epoch,
            loss,
            val_loss: self.validation.map(|v| v.loss),
            accuracy,
            val_accuracy: self.validation.and_then(|v| v.accuracy),
        }
    }

    /// Runs one batch, pushing its events. Returns `true` once the run is complete.
    fn run_batch(&mut self, events: &mut Vec<TrainEvent>) -> Result<bool> {
        let outcome = train_batch(
            &mut self.network,
            &self.data.train,
            &self.config,
            self.step,
            &mut self.rng,
        )?;
        self.step += 1;
        self.totals.add(&outcome);

        let epoch_done = self.step % self.batches_per_epoch() == 0;
        if epoch_done || self.step % self.config.validate_every == 0 {
            self.validation = evaluate(&mut self.network, &self.data.validation, &self.config)?;
        }

        let batch_accuracy = outcome.correct.map(|c| c as f64 / outcome.samples as f64);
        events.push(TrainEvent::Batch(self.snapshot(outcome.loss, batch_accuracy)));
        if !epoch_done {
            return Ok(false);
        }

        self.epoch += 1;
        let metrics = self.snapshot(self.totals.mean_loss(), self.totals.accuracy());
        self.totals = EpochTotals::default();
        debug!("epoch {} complete: loss={:.6} val_loss={:?}", self.epoch, metrics.loss, metrics.val_loss);
        events.push(TrainEvent::EpochComplete { epoch: self.epoch, metrics: metrics.clone() });

        let stop_early = self.should_stop_early(&metrics);
        if self.epoch >= self.config.epochs || stop_early {
            if stop_early {
                info!("early stopping after {} epochs without improvement", self.stale_epochs);
            }
            events.push(TrainEvent::TrainingComplete(metrics));
            return Ok(true);
        }
        Ok(false)
    }

    /// Tracks the validation loss (training loss without a holdout).
    fn should_stop_early(&mut self, metrics: &MetricsSnapshot) -> bool {
        let Some(rule) = self.config.early_stopping else {
            return false;
        };
        let monitored = metrics.val_loss.unwrap_or(metrics.loss);
        match self.best_loss {
            Some(best) if monitored >= best - rule.min_delta => self.stale_epochs += 1,
            _ => {
                self.best_loss = Some(monitored);
                self.stale_epochs = 0;
            }
        }
        self.stale_epochs >= rule.patience.max(1)
    }
}

/// The training loop controller.
///
/// Owns at most one run and drives it batch by batch. The session itself is
/// synchronous; `worker::Engine` runs it on a background thread and calls
/// `run_batches` in bounded ticks.
#[derive(Debug, Default)]
pub struct TrainingSession {
    status: RunStatus,
    run: Option<TrainingRun>,
    last_error: Option<String>,
}

impl TrainingSession {
    pub fn new() -> TrainingSession {
        TrainingSession::default()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn step_count(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.step)
    }

    pub fn epoch(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.epoch)
    }

    pub fn network(&self) -> Option<&CompiledNetwork> {
        self.run.as_ref().map(|r| &r.network)
    }

    pub fn config(&self) -> Option<&TrainingConfig> {
        self.run.as_ref().map(|r| &r.config)
    }

    pub fn partition(&self) -> Option<&DataPartition> {
        self.run.as_ref().map(|r| &r.data)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Compiles `graph`, partitions `dataset` and enters `Training` with fresh
    /// buffers and counters. Any previous run is discarded first.
    pub fn start(&mut self, graph: &LayerGraph, config: TrainingConfig, dataset: &Dataset) -> Result<()> {
        self.run = None;
        match TrainingRun::new(graph, config, dataset) {
            Ok(run) => {
                info!(
                    "run started: {} parameters, {} train / {} validation samples, {} batches per epoch",
                    run.network.parameter_count(),
                    run.data.train.len(),
                    run.data.validation.len(),
                    run.batches_per_epoch(),
                );
                self.run = Some(run);
                self.status = RunStatus::Training;
                self.last_error = None;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Runs exactly one batch synchronously.
    ///
    /// A training session is paused first. Afterwards the session is `Paused`,
    /// or `Complete` if the batch used up the epoch budget.
    pub fn step(&mut self) -> Result<Vec<TrainEvent>> {
        if self.run.is_none() {
            return Err(self.fail(TrainError::UninitializedRun("step")));
        }
        if self.status == RunStatus::Training {
            debug!("step requested while training; pausing first");
        }

        let mut events = Vec::new();
        let outcome = match self.run.as_mut() {
            Some(run) => run.run_batch(&mut events),
            None => Err(TrainError::UninitializedRun("step")),
        };
        match outcome {
            Ok(finished) => {
                self.status = if finished { RunStatus::Complete } else { RunStatus::Paused };
                Ok(events)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Runs up to `max_batches` batches while `Training`.
    ///
    /// `interrupt` is checked before every batch; when it is raised the tick
    /// ends early and the flag is left for the caller to clear.
    pub fn run_batches(&mut self, max_batches: usize, interrupt: Option<&AtomicBool>) -> Result<Vec<TrainEvent>> {
        let mut events = Vec::new();
        if self.status != RunStatus::Training {
            return Ok(events);
        }
        let Some(run) = self.run.as_mut() else {
            return Ok(events);
        };

        let mut outcome = Ok(false);
        for _ in 0..max_batches {
            if interrupt.is_some_and(|flag| flag.load(Ordering::Acquire)) {
                debug!("tick interrupted at step {}", run.step);
                break;
            }
            outcome = run.run_batch(&mut events);
            if !matches!(outcome, Ok(false)) {
                break;
            }
        }

        match outcome {
            Ok(true) => {
                info!("run complete at step {}", self.step_count());
                self.status = RunStatus::Complete;
            }
            Ok(false) => {}
            Err(e) => return Err(self.fail(e)),
        }
        Ok(events)
    }

    /// `Training → Paused`. Returns whether the state changed.
    pub fn pause(&mut self) -> Result<bool> {
        if self.run.is_none() {
            return Err(self.fail(TrainError::UninitializedRun("pause")));
        }
        if self.status == RunStatus::Training {
            info!("paused at step {} (epoch {})", self.step_count(), self.epoch());
            self.status = RunStatus::Paused;
            Ok(true)
        } else {
            debug!("pause ignored in state {:?}", self.status);
            Ok(false)
        }
    }

    /// `Paused`/`Idle → Training`, continuing from the current counters.
    /// Returns whether the state changed.
    pub fn resume(&mut self) -> Result<bool> {
        if self.run.is_none() {
            return Err(self.fail(TrainError::UninitializedRun("resume")));
        }
        match self.status {
            RunStatus::Paused | RunStatus::Idle => {
                info!("resumed at step {} (epoch {})", self.step_count(), self.epoch());
                self.status = RunStatus::Training;
                Ok(true)
            }
            status => {
                if status != RunStatus::Training {
                    warn!("resume ignored in state {status:?}; start a new run instead");
                }
                Ok(false)
            }
        }
    }

    /// Halts execution and zeroes the counters. The compiled network keeps
    /// its trained weights.
    pub fn stop(&mut self) {
        if let Some(run) = self.run.as_mut() {
            info!("stopped at step {} (epoch {})", run.step, run.epoch);
            run.reset_counters();
        }
        self.status = RunStatus::Idle;
    }

    /// Discards the network, config and data, returning to a blank `Idle`.
    pub fn reset(&mut self) {
        self.run = None;
        self.status = RunStatus::Idle;
        self.last_error = None;
        info!("session reset");
    }

    fn fail(&mut self, err: TrainError) -> TrainError {
        error!("training error: {err}");
        self.status = RunStatus::Error;
        self.last_error = Some(err.to_string());
        err
    }
}
