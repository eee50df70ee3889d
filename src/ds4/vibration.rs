//! Timed rumble patterns
//!
//! A pattern expands into a fixed list of motor steps. The
//! [`VibrationSequencer`] hands those steps out one at a time; whoever drives
//! it decides when to ask for the next one, so no timers live here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::ds4::error::Ds4Error;
use crate::ds4::types::OutputCommand;

const RAMP_HOLD: Duration = Duration::from_millis(50);
const WAVE_HOLD: Duration = Duration::from_millis(50);
const PULSE_HOLD: Duration = Duration::from_millis(200);
const SOFT_HOLD: Duration = Duration::from_millis(100);
const CONNECT_FEEDBACK_HOLD: Duration = Duration::from_millis(500);

/// One motor setting held for a while
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VibrationStep {
    pub left: u8,
    pub right: u8,
    pub hold: Duration,
}

impl VibrationStep {
    pub const fn new(left: u8, right: u8, hold_ms: u64) -> Self {
        Self {
            left,
            right,
            hold: Duration::from_millis(hold_ms),
        }
    }

    /// Motors off, nothing to wait for afterwards
    pub const fn stop() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn command(&self) -> OutputCommand {
        OutputCommand::SetMotors {
            left: self.left,
            right: self.right,
        }
    }
}

/// Named rumble patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VibrationPattern {
    /// Both motors climb from 0 to 250
    RampUp,
    /// Motors sweep against each other, twice
    Wave,
    /// Three full-strength beats
    Pulse,
    /// Gentle rise and fall to half strength, twice
    Soft,
}

impl VibrationPattern {
    pub const ALL: [VibrationPattern; 4] = [
        VibrationPattern::RampUp,
        VibrationPattern::Wave,
        VibrationPattern::Pulse,
        VibrationPattern::Soft,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VibrationPattern::RampUp => "ramp-up",
            VibrationPattern::Wave => "wave",
            VibrationPattern::Pulse => "pulse",
            VibrationPattern::Soft => "soft",
        }
    }

    /// Expand into the full step list, trailing stop included
    pub fn steps(self) -> Vec<VibrationStep> {
        let mut steps = Vec::new();

        match self {
            VibrationPattern::RampUp => {
                for level in (0..=250u8).step_by(5) {
                    steps.push(VibrationStep {
                        left: level,
                        right: level,
                        hold: RAMP_HOLD,
                    });
                }
            }
            VibrationPattern::Wave => {
                for _ in 0..2 {
                    let rise = (0..=250u8).step_by(10);
                    let fall = (5..=255u8).rev().step_by(10);
                    for level in rise.chain(fall) {
                        steps.push(VibrationStep {
                            left: level,
                            right: u8::MAX - level,
                            hold: WAVE_HOLD,
                        });
                    }
                }
            }
            VibrationPattern::Pulse => {
                for _ in 0..3 {
                    steps.push(VibrationStep {
                        left: u8::MAX,
                        right: u8::MAX,
                        hold: PULSE_HOLD,
                    });
                    steps.push(VibrationStep {
                        left: 0,
                        right: 0,
                        hold: PULSE_HOLD,
                    });
                }
            }
            VibrationPattern::Soft => {
                for _ in 0..2 {
                    let rise = (0..=125u8).step_by(5);
                    let fall = (5..=125u8).rev().step_by(5);
                    for level in rise.chain(fall) {
                        steps.push(VibrationStep {
                            left: level,
                            right: level,
                            hold: SOFT_HOLD,
                        });
                    }
                }
            }
        }

        steps.push(VibrationStep::stop());
        steps
    }
}

impl fmt::Display for VibrationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VibrationPattern {
    type Err = Ds4Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ramp-up" | "ramp_up" | "rampup" | "artan" => Ok(VibrationPattern::RampUp),
            "wave" | "dalgali" => Ok(VibrationPattern::Wave),
            "pulse" | "nabiz" => Ok(VibrationPattern::Pulse),
            "soft" => Ok(VibrationPattern::Soft),
            _ => Err(Ds4Error::UnknownPattern(s.to_string())),
        }
    }
}

/// What is currently being played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSource {
    Pattern(VibrationPattern),
    /// Short rumble played right after connecting
    ConnectFeedback,
}

/// Sequencer state as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Running {
        source: SequenceSource,
        step_index: usize,
    },
}

#[derive(Debug)]
struct ActiveSequence {
    source: SequenceSource,
    steps: Vec<VibrationStep>,
    next: usize,
}

/// Plays one sequence at a time
///
/// Starting a new sequence while one is running queues a stop step that is
/// handed out before the first step of the new one.
#[derive(Debug, Default)]
pub struct VibrationSequencer {
    active: Option<ActiveSequence>,
    pending_stop: bool,
}

impl VibrationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SequencerState {
        match &self.active {
            Some(active) => SequencerState::Running {
                source: active.source,
                step_index: active.next,
            },
            None => SequencerState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some() || self.pending_stop
    }

    /// Replace whatever is playing with `pattern`
    pub fn start(&mut self, pattern: VibrationPattern) {
        self.start_sequence(SequenceSource::Pattern(pattern), pattern.steps());
    }

    /// Replace whatever is playing with the connect rumble
    pub fn start_connect_feedback(&mut self) {
        let steps = vec![
            VibrationStep {
                left: 128,
                right: 128,
                hold: CONNECT_FEEDBACK_HOLD,
            },
            VibrationStep::stop(),
        ];
        self.start_sequence(SequenceSource::ConnectFeedback, steps);
    }

    fn start_sequence(&mut self, source: SequenceSource, steps: Vec<VibrationStep>) {
        if self.active.is_some() {
            self.pending_stop = true;
        }
        self.active = Some(ActiveSequence {
            source,
            steps,
            next: 0,
        });
    }

    /// Hand out the next step, or `None` once everything has been played
    pub fn advance(&mut self) -> Option<VibrationStep> {
        if self.pending_stop {
            self.pending_stop = false;
            return Some(VibrationStep::stop());
        }

        let active = self.active.as_mut()?;
        let step = active.steps.get(active.next).copied();
        active.next += 1;

        if active.next >= active.steps.len() {
            self.active = None;
        }
        step
    }

    /// Abort the current sequence. Returns the stop step to write if anything
    /// was playing.
    pub fn cancel(&mut self) -> Option<VibrationStep> {
        let was_running = self.is_running();
        self.active = None;
        self.pending_stop = false;
        was_running.then(VibrationStep::stop)
    }

    /// Forget the current sequence without a stop step, for when the device
    /// is already gone
    pub fn reset(&mut self) {
        self.active = None;
        self.pending_stop = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(sequencer: &mut VibrationSequencer) -> Vec<VibrationStep> {
        std::iter::from_fn(|| sequencer.advance()).collect()
    }

    #[test]
    fn test_pulse_steps() {
        let expected = vec![
            VibrationStep::new(255, 255, 200),
            VibrationStep::new(0, 0, 200),
            VibrationStep::new(255, 255, 200),
            VibrationStep::new(0, 0, 200),
            VibrationStep::new(255, 255, 200),
            VibrationStep::new(0, 0, 200),
            VibrationStep::stop(),
        ];
        assert_eq!(VibrationPattern::Pulse.steps(), expected);
    }

    #[test]
    fn test_ramp_up_steps() {
        let steps = VibrationPattern::RampUp.steps();
        assert_eq!(steps.len(), 52);
        assert_eq!(steps[0], VibrationStep::new(0, 0, 50));
        assert_eq!(steps[1], VibrationStep::new(5, 5, 50));
        assert_eq!(steps[50], VibrationStep::new(250, 250, 50));
        assert_eq!(steps[51], VibrationStep::stop());
        assert!(steps.windows(2).take(50).all(|w| w[1].left == w[0].left + 5));
    }

    #[test]
    fn test_wave_motors_move_against_each_other() {
        let steps = VibrationPattern::Wave.steps();
        // Two sweeps of 26 up and 26 down, then the stop
        assert_eq!(steps.len(), 2 * 52 + 1);

        for step in &steps[..steps.len() - 1] {
            assert_eq!(step.left as u16 + step.right as u16, 255);
            assert_eq!(step.hold, Duration::from_millis(50));
        }

        assert_eq!((steps[0].left, steps[0].right), (0, 255));
        assert_eq!((steps[25].left, steps[25].right), (250, 5));
        assert_eq!((steps[26].left, steps[26].right), (255, 0));
        assert_eq!((steps[51].left, steps[51].right), (5, 250));
        assert_eq!(steps[52], steps[0]);
        assert_eq!(*steps.last().unwrap(), VibrationStep::stop());
    }

    #[test]
    fn test_soft_steps() {
        let steps = VibrationPattern::Soft.steps();
        assert_eq!(steps.len(), 2 * 51 + 1);
        assert_eq!(steps[0], VibrationStep::new(0, 0, 100));
        assert_eq!(steps[25], VibrationStep::new(125, 125, 100));
        assert_eq!(steps[26], VibrationStep::new(125, 125, 100));
        assert_eq!(steps[50], VibrationStep::new(5, 5, 100));
        assert!(steps.iter().all(|s| s.left <= 125 && s.left == s.right));
        assert_eq!(*steps.last().unwrap(), VibrationStep::stop());
    }

    #[test]
    fn test_every_pattern_ends_with_stop() {
        for pattern in VibrationPattern::ALL {
            let steps = pattern.steps();
            assert_eq!(steps.last(), Some(&VibrationStep::stop()), "{}", pattern);
            // Deterministic
            assert_eq!(steps, pattern.steps());
        }
    }

    #[test]
    fn test_sequencer_plays_pattern_then_idles() {
        let mut sequencer = VibrationSequencer::new();
        assert_eq!(sequencer.state(), SequencerState::Idle);

        sequencer.start(VibrationPattern::Pulse);
        assert_eq!(
            sequencer.state(),
            SequencerState::Running {
                source: SequenceSource::Pattern(VibrationPattern::Pulse),
                step_index: 0
            }
        );

        let played = drain(&mut sequencer);
        assert_eq!(played, VibrationPattern::Pulse.steps());
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert!(sequencer.cancel().is_none());
    }

    #[test]
    fn test_restart_emits_stop_before_new_pattern() {
        let mut sequencer = VibrationSequencer::new();
        sequencer.start(VibrationPattern::RampUp);
        for _ in 0..10 {
            sequencer.advance();
        }

        sequencer.start(VibrationPattern::Pulse);
        let played = drain(&mut sequencer);

        assert_eq!(played[0], VibrationStep::stop());
        assert_eq!(&played[1..], VibrationPattern::Pulse.steps().as_slice());
    }

    #[test]
    fn test_cancel_midway_returns_stop() {
        let mut sequencer = VibrationSequencer::new();
        sequencer.start(VibrationPattern::Soft);
        sequencer.advance();

        assert_eq!(sequencer.cancel(), Some(VibrationStep::stop()));
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert!(sequencer.advance().is_none());
    }

    #[test]
    fn test_pattern_names() {
        for pattern in VibrationPattern::ALL {
            assert_eq!(pattern.name().parse::<VibrationPattern>().unwrap(), pattern);
        }
        assert_eq!("nabiz".parse::<VibrationPattern>().unwrap(), VibrationPattern::Pulse);
        assert_eq!(" Wave ".parse::<VibrationPattern>().unwrap(), VibrationPattern::Wave);
        assert!("earthquake".parse::<VibrationPattern>().is_err());
    }
}
