//! Engine state machine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Idle,
    Waiting,
    Listening,
    Playing,
}

impl EngineState {
    #[inline]
    pub fn is_active(self) -> bool {
        !matches!(self, EngineState::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Waiting => "waiting",
            EngineState::Listening => "listening",
            EngineState::Playing => "playing",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A wait directive was reached.
    Arm,
    /// Timer, note-on or motion cue released a wait.
    Trigger,
    /// The listening delay elapsed.
    Begin,
    /// Start playback with no wait in front.
    Play,
    /// Explicit stop or end of score.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Entered { from: EngineState, to: EngineState },
}

impl Transition {
    #[inline]
    pub fn entered(&self) -> Option<EngineState> {
        match *self {
            Transition::Entered { to, .. } => Some(to),
            Transition::None => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct EngineFsm {
    state: EngineState,
}

impl EngineFsm {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn transition(&mut self, event: EngineEvent) -> Transition {
        use EngineEvent::*;
        use EngineState::*;

        let next = match (event, self.state) {
            // Waiting re-arms so a fresh timer can replace an un-armed wait.
            (Arm, Idle | Waiting | Playing) => Some(Waiting),
            (Arm, Listening) => None,

            (Trigger, Waiting) => Some(Listening),
            (Trigger, _) => None,

            (Begin, Listening) => Some(Playing),
            (Begin, _) => None,

            (Play, Idle | Waiting) => Some(Playing),
            (Play, Listening | Playing) => None,

            (Stop, Waiting | Listening | Playing) => Some(Idle),
            (Stop, Idle) => None,
        };

        match next {
            Some(to) => {
                let from = self.state;
                self.state = to;
                Transition::Entered { from, to }
            }
            None => Transition::None,
        }
    }
}
