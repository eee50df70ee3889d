//! Events published to the presentation layer

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;
use serde::Serialize;

use crate::ds4::types::{BatteryStatus, ControllerState};
use crate::transport::HidEndpoint;

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The user asked for it
    Requested,
    /// A read or write on the open handle failed
    TransportFailure(String),
    /// Too many undecodable reports in a row
    MalformedReports { consecutive: u32 },
    /// The manager is shutting down
    Shutdown,
}

/// DualShock 4 event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Ds4Event {
    Connected { endpoint: HidEndpoint },
    StateChanged(ControllerState),
    BatteryUpdate(BatteryStatus),
    Disconnected { reason: DisconnectReason },
}

/// Callback-style consumer of [`Ds4Event`]s
///
/// Every method defaults to doing nothing so observers only implement what
/// they render.
pub trait Ds4Observer {
    fn on_connected(&mut self, _endpoint: &HidEndpoint) {}

    fn on_state_changed(&mut self, _state: &ControllerState) {}

    fn on_disconnected(&mut self, _reason: &DisconnectReason) {}

    fn on_battery_update(&mut self, _battery: BatteryStatus) {}
}

impl Ds4Event {
    /// `Connected` and `Disconnected` must reach the consumer; the rest can
    /// be superseded by the next report
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Ds4Event::Connected { .. } | Ds4Event::Disconnected { .. })
    }

    /// Route this event to the matching observer callback
    pub fn dispatch<O: Ds4Observer + ?Sized>(&self, observer: &mut O) {
        match self {
            Ds4Event::Connected { endpoint } => observer.on_connected(endpoint),
            Ds4Event::StateChanged(state) => observer.on_state_changed(state),
            Ds4Event::BatteryUpdate(battery) => observer.on_battery_update(*battery),
            Ds4Event::Disconnected { reason } => observer.on_disconnected(reason),
        }
    }
}

/// Bounded event queue fed by the device thread
///
/// Publishing never blocks. When the consumer falls behind, state and
/// battery events are dropped, while a lifecycle event evicts the oldest
/// queued non-lifecycle event to make room.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: Sender<Ds4Event>,
    // Only read when making room
    backlog: Receiver<Ds4Event>,
}

impl EventQueue {
    /// Queue plus the receiving end handed to the consumer
    pub fn bounded(capacity: usize) -> (Self, Receiver<Ds4Event>) {
        let (sender, receiver) = bounded(capacity);
        let queue = Self {
            sender,
            backlog: receiver.clone(),
        };
        (queue, receiver)
    }

    pub fn publish(&self, event: Ds4Event) {
        let event = match self.sender.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => return,
            Err(TrySendError::Full(event)) => event,
        };

        if !event.is_lifecycle() {
            warn!("Event queue full, dropping {:?}", event);
            return;
        }

        self.make_room();
        if let Err(e) = self.sender.try_send(event) {
            warn!("Event queue full, dropping {:?}", e.into_inner());
        }
    }

    /// Take the backlog out and put it back minus one event, preferring to
    /// lose a state update over a lifecycle event
    fn make_room(&self) {
        let queued: Vec<Ds4Event> = self.backlog.try_iter().collect();
        let evict = queued
            .iter()
            .position(|event| !event.is_lifecycle())
            .unwrap_or(0);

        for (index, event) in queued.into_iter().enumerate() {
            if index == evict {
                warn!("Event queue full, dropping {:?}", event);
                continue;
            }
            let _ = self.sender.try_send(event);
        }
    }
}
