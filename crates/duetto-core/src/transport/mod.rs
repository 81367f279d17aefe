pub(crate) mod fsm;
pub(crate) mod scheduler;
pub(crate) mod timers;

pub use fsm::{EngineEvent, EngineFsm, EngineState, Transition};
pub use scheduler::{
    blend_tempo, AccompanimentScheduler, NoteSink, TickOutcome, MAX_PLAYBACK_RATIO, MIN_PLAYBACK_RATIO,
};
pub use timers::{DeferredQueue, TimerToken};
