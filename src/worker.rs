//! Device worker
//!
//! The single owner of the session and the vibration sequencer. Commands, poll
//! ticks and vibration steps all go through here one at a time, so reads and
//! writes never overlap on the handle. Nothing in this module looks at a clock:
//! the caller decides when to tick and when the next vibration step is due.

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::time::Duration;

use crate::ds4::error::Ds4Error;
use crate::ds4::session::{ConnectedDevice, DeviceSession, ReadOutcome};
use crate::ds4::types::{BatteryStatus, OutputCommand};
use crate::ds4::vibration::{VibrationPattern, VibrationSequencer};
use crate::event::{DisconnectReason, Ds4Event, EventQueue};
use crate::transport::{Transport, TransportError};

/// Reply channel carried by a [`Command`]
pub type Reply<R> = Sender<Result<R, Ds4Error>>;

/// Requests queued for the worker
#[derive(Debug)]
pub enum Command {
    Connect { reply: Reply<ConnectedDevice> },
    Disconnect { reply: Reply<()> },
    Send { command: OutputCommand, reply: Reply<()> },
    RunPattern { pattern: VibrationPattern, reply: Reply<()> },
    StopVibration { reply: Reply<()> },
    QueryBattery { reply: Reply<BatteryStatus> },
}

/// When the driver should call [`DeviceWorker::advance_vibration`] next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSchedule {
    /// Leave any pending step where it is
    Keep,
    /// Nothing is playing
    Clear,
    /// Next step is due after this long
    After(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub max_decode_failures: u32,
    pub vibration_enabled: bool,
    pub connect_feedback: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_decode_failures: 10,
            vibration_enabled: true,
            connect_feedback: false,
        }
    }
}

pub struct DeviceWorker<T: Transport> {
    session: DeviceSession<T>,
    sequencer: VibrationSequencer,
    events: EventQueue,
    settings: WorkerSettings,
    decode_failures: u32,
    last_battery: Option<BatteryStatus>,
}

impl<T: Transport> DeviceWorker<T> {
    pub fn new(session: DeviceSession<T>, settings: WorkerSettings, events: EventQueue) -> Self {
        Self {
            session,
            sequencer: VibrationSequencer::new(),
            events,
            settings,
            decode_failures: 0,
            last_battery: None,
        }
    }

    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    pub fn sequencer(&self) -> &VibrationSequencer {
        &self.sequencer
    }

    /// Execute one queued command and answer its reply channel
    pub fn handle_command(&mut self, command: Command) -> StepSchedule {
        match command {
            Command::Connect { reply } => {
                let (result, schedule) = self.connect();
                let _ = reply.send(result);
                schedule
            }
            Command::Disconnect { reply } => {
                self.disconnect(DisconnectReason::Requested);
                let _ = reply.send(Ok(()));
                StepSchedule::Clear
            }
            Command::Send { command, reply } => {
                let (result, schedule) = self.send(command);
                let _ = reply.send(result);
                schedule
            }
            Command::RunPattern { pattern, reply } => {
                let (result, schedule) = self.run_pattern(pattern);
                let _ = reply.send(result);
                schedule
            }
            Command::StopVibration { reply } => {
                let _ = reply.send(self.stop_vibration());
                StepSchedule::Clear
            }
            Command::QueryBattery { reply } => {
                let result = self.session.get_battery_level();
                if let Ok(battery) = result {
                    self.publish_battery(battery);
                }
                let _ = reply.send(result);
                StepSchedule::Keep
            }
        }
    }

    fn connect(&mut self) -> (Result<ConnectedDevice, Ds4Error>, StepSchedule) {
        if self.session.is_connected() {
            return (self.session.connect(), StepSchedule::Keep);
        }

        let connected = match self.session.connect() {
            Ok(connected) => connected,
            Err(e) => {
                warn!("Connect failed: {}", e);
                return (Err(e), StepSchedule::Keep);
            }
        };

        self.decode_failures = 0;
        self.publish(Ds4Event::Connected {
            endpoint: connected.endpoint.clone(),
        });
        if let Some(battery) = connected.battery {
            self.publish_battery(battery);
        }

        let mut schedule = StepSchedule::Keep;
        if self.settings.connect_feedback && self.settings.vibration_enabled {
            debug!("Playing connect feedback rumble");
            self.sequencer.start_connect_feedback();
            schedule = self.advance_vibration();
        }

        (Ok(connected), schedule)
    }

    /// Close the session; the session itself writes the final stop report
    fn disconnect(&mut self, reason: DisconnectReason) {
        self.sequencer.reset();
        if !self.session.is_connected() {
            return;
        }

        self.session.disconnect();
        self.last_battery = None;
        self.publish(Ds4Event::Disconnected { reason });
    }

    fn send(&mut self, command: OutputCommand) -> (Result<(), Ds4Error>, StepSchedule) {
        if !self.session.is_connected() {
            return (Err(Ds4Error::NotConnected), StepSchedule::Keep);
        }

        let mut schedule = StepSchedule::Keep;
        let command = match command {
            OutputCommand::SetColor(_) => command,
            OutputCommand::SetMotors { .. } | OutputCommand::SetAll { .. } => {
                // Manual motor control takes over from a running pattern
                if let Some(stop) = self.sequencer.cancel() {
                    if let Err(e) = self.write(stop.command()) {
                        return (Err(e), StepSchedule::Clear);
                    }
                    schedule = StepSchedule::Clear;
                }
                self.mask_motors(command)
            }
        };

        match self.write(command) {
            Ok(()) => (Ok(()), schedule),
            Err(e) => (Err(e), StepSchedule::Clear),
        }
    }

    fn mask_motors(&self, command: OutputCommand) -> OutputCommand {
        if self.settings.vibration_enabled {
            return command;
        }
        match command {
            OutputCommand::SetMotors { .. } => OutputCommand::stop(),
            OutputCommand::SetAll { color, .. } => OutputCommand::SetAll {
                left: 0,
                right: 0,
                color,
            },
            other => other,
        }
    }

    fn run_pattern(&mut self, pattern: VibrationPattern) -> (Result<(), Ds4Error>, StepSchedule) {
        if !self.session.is_connected() {
            return (Err(Ds4Error::NotConnected), StepSchedule::Keep);
        }

        if !self.settings.vibration_enabled {
            info!("Vibration disabled, ignoring pattern '{}'", pattern);
            return (Ok(()), StepSchedule::Keep);
        }

        info!("Starting vibration pattern '{}'", pattern);
        self.sequencer.start(pattern);
        (Ok(()), self.advance_vibration())
    }

    fn stop_vibration(&mut self) -> Result<(), Ds4Error> {
        self.sequencer.reset();
        if !self.session.is_connected() {
            return Ok(());
        }
        self.write(OutputCommand::stop())
    }

    /// Write the next vibration step
    pub fn advance_vibration(&mut self) -> StepSchedule {
        if !self.session.is_connected() {
            self.sequencer.reset();
            return StepSchedule::Clear;
        }

        let Some(step) = self.sequencer.advance() else {
            return StepSchedule::Clear;
        };

        if self.write(step.command()).is_err() {
            return StepSchedule::Clear;
        }

        if self.sequencer.is_running() {
            StepSchedule::After(step.hold)
        } else {
            debug!("Vibration sequence finished");
            StepSchedule::Clear
        }
    }

    /// One polling-loop iteration: read, decode, publish
    pub fn poll_tick(&mut self) -> StepSchedule {
        if !self.session.is_connected() {
            return StepSchedule::Keep;
        }

        match self.session.read_state() {
            Ok(ReadOutcome::NoData) => StepSchedule::Keep,
            Ok(ReadOutcome::State(state)) => {
                self.decode_failures = 0;
                self.publish(Ds4Event::StateChanged(state));
                if let Some(battery) = state.battery {
                    self.publish_battery(battery);
                }
                StepSchedule::Keep
            }
            Err(Ds4Error::Decode(e)) => {
                self.decode_failures += 1;
                warn!(
                    "Skipping input report ({}/{}): {}",
                    self.decode_failures, self.settings.max_decode_failures, e
                );

                if self.decode_failures >= self.settings.max_decode_failures {
                    let consecutive = self.decode_failures;
                    self.decode_failures = 0;
                    self.disconnect(DisconnectReason::MalformedReports { consecutive });
                    return StepSchedule::Clear;
                }
                StepSchedule::Keep
            }
            Err(Ds4Error::Transport(e)) => {
                self.on_transport_failure(e);
                StepSchedule::Clear
            }
            Err(e) => {
                debug!("Poll skipped: {}", e);
                StepSchedule::Keep
            }
        }
    }

    /// Release the device when the worker stops
    pub fn shutdown(&mut self) {
        self.disconnect(DisconnectReason::Shutdown);
    }

    /// Send through the session, turning transport failures into a
    /// disconnection event
    fn write(&mut self, command: OutputCommand) -> Result<(), Ds4Error> {
        match self.session.send(command) {
            Err(Ds4Error::Transport(e)) => {
                self.on_transport_failure(e.clone());
                Err(Ds4Error::Transport(e))
            }
            other => other,
        }
    }

    /// The session has already closed itself
    fn on_transport_failure(&mut self, error: TransportError) {
        warn!("Controller lost: {}", error);
        self.sequencer.reset();
        self.decode_failures = 0;
        self.last_battery = None;
        self.publish(Ds4Event::Disconnected {
            reason: DisconnectReason::TransportFailure(error.to_string()),
        });
    }

    fn publish_battery(&mut self, battery: BatteryStatus) {
        if self.last_battery == Some(battery) {
            return;
        }
        self.last_battery = Some(battery);
        self.publish(Ds4Event::BatteryUpdate(battery));
    }

    fn publish(&self, event: Ds4Event) {
        self.events.publish(event);
    }
}
