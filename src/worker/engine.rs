use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};
use crate::train::{MetricsSnapshot, RunStatus, TrainEvent, TrainingSession};
use crate::worker::protocol::{Command, Notification};
use crate::worker::snapshot::{build_update, UpdateThrottle};

/// Scheduling and snapshot settings for the worker thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    /// Batches run per scheduling tick before pending commands are checked.
    pub batches_per_tick: usize,
    /// Minimum time between `UPDATE` notifications, in milliseconds.
    #[serde(rename = "updateInterval")]
    pub update_interval_ms: u64,
    pub max_snapshot_weights: usize,
    pub include_activations: bool,
    pub include_gradients: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            batches_per_tick: 10,
            update_interval_ms: 50,
            max_snapshot_weights: 256,
            include_activations: false,
            include_gradients: false,
        }
    }
}

impl EngineOptions {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

/// Handle to a training worker running on its own thread.
///
/// Commands go in through `send`, notifications come back through
/// `recv`/`try_recv`. The worker owns its session outright; nothing is shared
/// with the handle except the interrupt flag. Dropping the handle shuts the
/// worker down.
#[derive(Debug)]
pub struct Engine {
    commands: Option<Sender<Command>>,
    notifications: Receiver<Notification>,
    interrupt: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn spawn(options: EngineOptions) -> Result<Engine> {
        let (command_tx, command_rx) = mpsc::channel();
        let (notification_tx, notification_rx) = mpsc::channel();
        let interrupt = Arc::new(AtomicBool::new(false));

        let worker = Worker::new(options, command_rx, notification_tx, Arc::clone(&interrupt));
        let handle = thread::Builder::new()
            .name("ferrite-live-worker".into())
            .spawn(move || worker.run())
            .map_err(|e| TrainError::ExecutionContextUnavailable(e.to_string()))?;

        Ok(Engine {
            commands: Some(command_tx),
            notifications: notification_rx,
            interrupt,
            handle: Some(handle),
        })
    }

    /// Queues a command. `PAUSE`, `STOP` and `RESET` also raise the interrupt
    /// flag so a running tick ends after its current batch.
    pub fn send(&self, command: Command) -> Result<()> {
        let commands = self.commands.as_ref().ok_or_else(|| {
            TrainError::ExecutionContextUnavailable("engine has been shut down".into())
        })?;
        if command.interrupts_training() {
            self.interrupt.store(true, Ordering::Release);
        }
        commands
            .send(command)
            .map_err(|_| TrainError::ExecutionContextUnavailable("worker thread has exited".into()))
    }

    /// Blocks for the next notification; `None` once the worker has exited.
    pub fn recv(&self) -> Option<Notification> {
        self.notifications.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Notification> {
        self.notifications.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<Notification> {
        self.notifications.try_recv().ok()
    }

    /// Closes the command channel and waits for the worker to exit.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.commands.take().is_none() {
            return;
        }
        self.interrupt.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("training worker panicked");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}

/// The worker side: one session, driven tick by tick.
struct Worker {
    options: EngineOptions,
    commands: Receiver<Command>,
    notifications: Sender<Notification>,
    interrupt: Arc<AtomicBool>,
    session: TrainingSession,
    throttle: UpdateThrottle,
    detached: bool,
}

impl Worker {
    fn new(
        options: EngineOptions,
        commands: Receiver<Command>,
        notifications: Sender<Notification>,
        interrupt: Arc<AtomicBool>,
    ) -> Worker {
        let throttle = UpdateThrottle::new(options.update_interval());
        Worker {
            options,
            commands,
            notifications,
            interrupt,
            session: TrainingSession::new(),
            throttle,
            detached: false,
        }
    }

    fn run(mut self) {
        info!("training worker started");
        while !self.detached {
            if self.session.status() == RunStatus::Training {
                if !self.tick() {
                    thread::yield_now();
                }
                if !self.drain() {
                    break;
                }
            } else {
                match self.commands.recv() {
                    Ok(command) => self.handle(command),
                    Err(_) => break,
                }
            }
        }
        info!("training worker exiting");
    }

    /// Runs up to `batches_per_tick` batches. Returns whether any batch ran.
    fn tick(&mut self) -> bool {
        match self.session.run_batches(self.options.batches_per_tick, Some(self.interrupt.as_ref())) {
            Ok(events) => {
                let ran = !events.is_empty();
                self.publish(events, false);
                ran
            }
            Err(e) => {
                self.notify(Notification::Error { message: e.to_string() });
                true
            }
        }
    }

    /// Handles every queued command without blocking. Returns `false` once
    /// the host has closed the command channel.
    fn drain(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.handle(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle(&mut self, command: Command) {
        debug!("worker received {:?}", CommandName(&command));
        if command.interrupts_training() {
            self.interrupt.store(false, Ordering::Release);
        }

        match command {
            Command::Start { network, config, dataset } => {
                self.throttle.reset();
                if let Err(e) = self.session.start(&network, config, &dataset) {
                    self.notify(Notification::Error { message: e.to_string() });
                }
            }
            Command::Pause => match self.session.pause() {
                Ok(true) => self.notify(Notification::Paused),
                Ok(false) => {}
                Err(e) => self.notify(Notification::Error { message: e.to_string() }),
            },
            Command::Resume => {
                if let Err(e) = self.session.resume() {
                    self.notify(Notification::Error { message: e.to_string() });
                }
            }
            Command::Step => {
                let was_training = self.session.status() == RunStatus::Training;
                match self.session.step() {
                    Ok(events) => {
                        self.publish(events, true);
                        if was_training && self.session.status() == RunStatus::Paused {
                            self.notify(Notification::Paused);
                        }
                    }
                    Err(e) => self.notify(Notification::Error { message: e.to_string() }),
                }
            }
            Command::Stop => {
                self.session.stop();
                self.notify(Notification::Stopped);
            }
            Command::Reset => {
                self.session.reset();
                self.notify(Notification::Stopped);
            }
        }
    }

    /// Forwards session events. Only the newest batch of a tick can become an
    /// `UPDATE`, and only when the throttle allows it or `force` is set;
    /// epoch and completion events are always sent.
    fn publish(&mut self, events: Vec<TrainEvent>, force: bool) {
        let mut latest = None;
        for event in events {
            match event {
                TrainEvent::Batch(metrics) => latest = Some(metrics),
                TrainEvent::EpochComplete { epoch, metrics } => {
                    self.notify(Notification::EpochComplete { epoch, metrics });
                }
                TrainEvent::TrainingComplete(final_metrics) => {
                    if let Some(metrics) = latest.take() {
                        self.send_update(metrics);
                    }
                    self.notify(Notification::TrainingComplete { final_metrics });
                }
            }
        }

        if let Some(metrics) = latest {
            if force {
                self.send_update(metrics);
            } else if self.throttle.ready() {
                self.send_update_unmarked(metrics);
            }
        }
    }

    fn send_update(&mut self, metrics: MetricsSnapshot) {
        self.throttle.mark();
        self.send_update_unmarked(metrics);
    }

    fn send_update_unmarked(&mut self, metrics: MetricsSnapshot) {
        let update = match self.session.network() {
            Some(network) => build_update(network, metrics, &self.options),
            None => return,
        };
        self.notify(update);
    }

    fn notify(&mut self, notification: Notification) {
        if self.notifications.send(notification).is_err() && !self.detached {
            warn!("notification receiver dropped; worker detaching");
            self.detached = true;
        }
    }
}

/// Logs a command by its tag only; `START` payloads can be large.
struct CommandName<'a>(&'a Command);

impl std::fmt::Debug for CommandName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            Command::Start { .. } => "START",
            Command::Pause => "PAUSE",
            Command::Resume => "RESUME",
            Command::Step => "STEP",
            Command::Stop => "STOP",
            Command::Reset => "RESET",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_deserialize_with_defaults() {
        let options: EngineOptions =
            serde_json::from_str(r#"{"batchesPerTick": 3, "updateInterval": 0}"#).unwrap();
        assert_eq!(options.batches_per_tick, 3);
        assert_eq!(options.update_interval(), Duration::ZERO);
        assert_eq!(options.max_snapshot_weights, 256);
        assert!(!options.include_gradients);
    }

    #[test]
    fn send_after_shutdown_is_rejected() {
        let mut engine = Engine::spawn(EngineOptions::default()).unwrap();
        engine.close();
        assert!(matches!(
            engine.send(Command::Pause),
            Err(TrainError::ExecutionContextUnavailable(_))
        ));
    }

    #[test]
    fn step_without_a_run_reports_an_error() {
        let engine = Engine::spawn(EngineOptions::default()).unwrap();
        engine.send(Command::Step).unwrap();
        match engine.recv_timeout(Duration::from_secs(5)) {
            Some(Notification::Error { message }) => assert!(message.contains("step")),
            other => panic!("expected ERROR, got {other:?}"),
        }
    }
}
