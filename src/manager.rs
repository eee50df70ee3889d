//! High-level DualShock 4 Manager
//!
//! This module provides the interface the presentation layer talks to. It
//! owns one dedicated device thread that runs the [`DeviceWorker`] on a timer
//! loop, forwards commands to it and hands events back over a channel.

use crossbeam_channel::{bounded, Receiver};
use log::{debug, info, warn};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ds4::error::Ds4Error;
use crate::ds4::session::{ConnectedDevice, DeviceSession};
use crate::ds4::types::{BatteryStatus, OutputCommand};
use crate::ds4::vibration::VibrationPattern;
use crate::event::{Ds4Event, EventQueue};
use crate::transport::Transport;
use crate::worker::{Command, DeviceWorker, Reply, StepSchedule};

/// Manager for one DualShock 4 controller
pub struct Ds4Manager<T>
where
    T: Transport + Send + 'static,
    T::Handle: Send,
{
    config: Config,
    /// Moved onto the device thread by `start`
    transport: Option<T>,
    command_sender: Option<UnboundedSender<Command>>,
    event_queue: EventQueue,
    event_receiver: Receiver<Ds4Event>,
    shutdown: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl<T> Ds4Manager<T>
where
    T: Transport + Send + 'static,
    T::Handle: Send,
{
    /// Create a new manager; nothing runs until [`start`](Self::start)
    pub fn new(config: Config, transport: T) -> Self {
        let (event_queue, event_receiver) = EventQueue::bounded(config.polling.event_capacity);

        Self {
            config,
            transport: Some(transport),
            command_sender: None,
            event_queue,
            event_receiver,
            shutdown: CancellationToken::new(),
            worker: None,
        }
    }

    /// Spawn the device thread
    pub fn start(&mut self) -> Result<(), Ds4Error> {
        if self.is_running() {
            warn!("Manager is already running");
            return Ok(());
        }

        let transport = self.transport.take().ok_or(Ds4Error::WorkerStopped)?;

        info!("Starting DualShock 4 manager...");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let session = DeviceSession::new(transport, self.config.session_settings());
        let worker = DeviceWorker::new(
            session,
            self.config.worker_settings(),
            self.event_queue.clone(),
        );

        let (command_sender, command_receiver) = unbounded_channel();
        let shutdown = self.shutdown.clone();
        let poll_interval = self.config.poll_interval();

        let handle = thread::Builder::new()
            .name("ds4-device".to_string())
            .spawn(move || {
                info!("Device thread started");
                runtime.block_on(drive(worker, command_receiver, shutdown, poll_interval));
                info!("Device thread exited");
            })?;

        self.command_sender = Some(command_sender);
        self.worker = Some(handle);

        info!("✓ Manager started (polling every {:?})", poll_interval);
        Ok(())
    }

    /// Stop the device thread, closing the controller if it is open
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        info!("Stopping DualShock 4 manager...");
        self.command_sender = None;
        self.shutdown.cancel();

        if handle.join().is_err() {
            warn!("Device thread panicked");
        }
        info!("✓ Manager stopped");
    }

    /// Check if the device thread is alive
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    /// Event stream for the presentation layer
    pub fn events(&self) -> &Receiver<Ds4Event> {
        &self.event_receiver
    }

    pub fn connect(&self) -> Result<ConnectedDevice, Ds4Error> {
        self.request(|reply| Command::Connect { reply })
    }

    pub fn disconnect(&self) -> Result<(), Ds4Error> {
        self.request(|reply| Command::Disconnect { reply })
    }

    /// Left drives the big motor, right the small one; values are clamped
    pub fn set_motors(&self, left: i32, right: i32) -> Result<(), Ds4Error> {
        self.send(OutputCommand::set_motors(left, right))
    }

    /// Light bar color; values are clamped
    pub fn set_color(&self, red: i32, green: i32, blue: i32) -> Result<(), Ds4Error> {
        self.send(OutputCommand::set_color(red, green, blue))
    }

    pub fn send(&self, command: OutputCommand) -> Result<(), Ds4Error> {
        self.request(|reply| Command::Send { command, reply })
    }

    /// Start a pattern, replacing any pattern already playing
    pub fn run_pattern(&self, pattern: VibrationPattern) -> Result<(), Ds4Error> {
        self.request(|reply| Command::RunPattern { pattern, reply })
    }

    pub fn stop_vibration(&self) -> Result<(), Ds4Error> {
        self.request(|reply| Command::StopVibration { reply })
    }

    pub fn battery_level(&self) -> Result<BatteryStatus, Ds4Error> {
        self.request(|reply| Command::QueryBattery { reply })
    }

    /// Queue a command and wait for the worker's answer
    fn request<R>(&self, make: impl FnOnce(Reply<R>) -> Command) -> Result<R, Ds4Error> {
        let sender = self.command_sender.as_ref().ok_or(Ds4Error::WorkerStopped)?;
        let (reply, answer) = bounded(1);

        sender
            .send(make(reply))
            .map_err(|_| Ds4Error::WorkerStopped)?;
        answer.recv().map_err(|_| Ds4Error::WorkerStopped)?
    }
}

/// Implement Drop to release the controller on shutdown
impl<T> Drop for Ds4Manager<T>
where
    T: Transport + Send + 'static,
    T::Handle: Send,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// Device thread main loop
///
/// Commands win over vibration steps, which win over poll ticks. Ticks that
/// fall behind are delayed rather than bunched up.
async fn drive<T: Transport>(
    mut worker: DeviceWorker<T>,
    mut commands: UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    poll_interval: Duration,
) {
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_step: Option<Instant> = None;

    loop {
        let step_due = next_step.unwrap_or_else(Instant::now);

        let schedule = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => worker.handle_command(command),
                None => break,
            },
            _ = time::sleep_until(step_due), if next_step.is_some() => worker.advance_vibration(),
            _ = ticker.tick() => worker.poll_tick(),
        };

        match schedule {
            StepSchedule::Keep => {}
            StepSchedule::Clear => next_step = None,
            StepSchedule::After(hold) => next_step = Some(Instant::now() + hold),
        }
    }

    debug!("Device loop exiting");
    worker.shutdown();
}
