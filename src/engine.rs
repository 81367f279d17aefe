//! The accompaniment engine: state machine, clock and tracker wired together.
//!
//! Everything runs on one logical thread. Time only moves when the owner calls
//! [`Engine::poll`] (or [`Engine::advance_by`]) with a millisecond clock value;
//! timers for waits, the listening hand-off and the auto-play tick are fired
//! from there in due order. This keeps the engine fully deterministic under
//! test, and [`EngineRunner`](crate::EngineRunner) drives it from a real clock.

use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use tracing::{debug, info, warn};

use duetto_core::{
    AccompanimentScheduler, AnnotationMap, DeferredQueue, EngineConfig, EngineEvent, EngineFsm, EngineState,
    NoteEvent, NoteSink, ParsedScore, PlaybackTimeline, RoleDirective, TickOutcome, Transition, WaitDirective,
};
use duetto_follow::{PositionTracker, TrackerEstimate, TrackerStatus};
use duetto_input::{MotionCue, MotionKind, PerformerEvent, RehearsalCommand, TempoChange};

use crate::{EngineBuilder, Result};

/// Lead tempo bounds for breath nudges, as fractions of the base tempo.
const NUDGE_MIN_RATIO: f64 = 0.7;
const NUDGE_MAX_RATIO: f64 = 1.3;
/// Tempo change per unit of breath intensity.
const BREATH_GAIN: f64 = 0.1;

/// Consolidated engine state pushed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub engine_state: EngineState,
    pub current_role: RoleDirective,
    pub current_measure: i32,
    pub current_beat: f64,
    pub tempo: f64,
    pub lead_follow_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// A timed wait ran out.
    ResumeFromWait,
    /// The listening delay elapsed.
    BeginPlaying,
    /// Auto-play clock tick.
    Tick,
}

/// Score-level state kept so rehearsal edits can be undone.
struct LoadedScore {
    annotations: AnnotationMap,
    tempo: f64,
}

pub struct Engine {
    config: EngineConfig,
    fsm: EngineFsm,
    timers: DeferredQueue<Deferred>,
    now_ms: f64,

    loaded: Option<LoadedScore>,
    annotations: AnnotationMap,
    tracker: PositionTracker,
    scheduler: Option<AccompanimentScheduler>,

    role: RoleDirective,
    current_index: usize,
    current_measure: i32,
    /// Highest playback index whose wait has already fired.
    last_wait_index: Option<usize>,
    /// Tempo of the last estimate confident enough to steer playback.
    tracked_tempo: Option<f64>,
    muted: HashSet<usize>,

    sink: Box<dyn NoteSink + Send>,
    subscribers: Vec<Sender<EngineSnapshot>>,
    last_publish_ms: Option<f64>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Engine with a silent note sink.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_sink(config, Box::new(|_: &NoteEvent, _: f64| {}))
    }

    pub fn with_sink(config: EngineConfig, sink: Box<dyn NoteSink + Send>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fsm: EngineFsm::new(),
            timers: DeferredQueue::new(),
            now_ms: 0.0,
            loaded: None,
            annotations: AnnotationMap::new(),
            tracker: PositionTracker::new(),
            scheduler: None,
            role: RoleDirective::default(),
            current_index: 0,
            current_measure: 1,
            last_wait_index: None,
            tracked_tempo: None,
            muted: HashSet::new(),
            sink,
            subscribers: Vec::new(),
            last_publish_ms: None,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[inline]
    pub fn state(&self) -> EngineState {
        self.fsm.state()
    }

    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn role(&self) -> RoleDirective {
        self.role
    }

    pub fn current_measure(&self) -> i32 {
        self.current_measure
    }

    pub fn current_beat(&self) -> f64 {
        self.scheduler.as_ref().map_or(0.0, |s| s.current_beat())
    }

    /// Effective playback tempo.
    pub fn tempo(&self) -> f64 {
        self.scheduler.as_ref().map_or(0.0, |s| s.effective_tempo())
    }

    pub fn scheduler(&self) -> Option<&AccompanimentScheduler> {
        self.scheduler.as_ref()
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn annotations(&self) -> &AnnotationMap {
        &self.annotations
    }

    pub fn muted_parts(&self) -> &HashSet<usize> {
        &self.muted
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            engine_state: self.state(),
            current_role: self.role,
            current_measure: self.current_measure,
            current_beat: self.current_beat(),
            tempo: self.tempo(),
            lead_follow_ratio: self.role.factor,
        }
    }

    // =========================================================================
    // Subscribers
    // =========================================================================

    /// Receives a snapshot on every state transition and, throttled, while playing.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<EngineSnapshot> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn add_subscriber(&mut self, tx: Sender<EngineSnapshot>) {
        self.subscribers.push(tx);
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers.retain(|tx| tx.send(snapshot).is_ok());
        self.last_publish_ms = Some(self.now_ms);
    }

    fn publish_throttled(&mut self) {
        let due = self
            .last_publish_ms
            .map_or(true, |last| self.now_ms - last >= self.config.publish_interval_ms);
        if due {
            self.publish();
        }
    }

    // =========================================================================
    // Score lifecycle
    // =========================================================================

    /// Replaces the current score. Any playback in progress is stopped.
    pub fn load_score(&mut self, score: &ParsedScore) -> Result<()> {
        score.validate()?;
        let timeline = PlaybackTimeline::from_score(score)?;

        self.stop();

        let solo: Option<Arc<[NoteEvent]>> = score.solo_sequence().map(Arc::from);
        self.tracker.load(solo, score.tempo);

        let accompaniment: Arc<[NoteEvent]> = Arc::from(score.accompaniment_notes());
        let first_measure = timeline.first_measure();
        self.scheduler = Some(AccompanimentScheduler::new(
            accompaniment,
            timeline,
            score.tempo,
            self.config.mode,
        ));

        let annotations = AnnotationMap::from_annotations(&score.measures);
        self.annotations = annotations.clone();
        self.loaded = Some(LoadedScore {
            annotations,
            tempo: score.tempo,
        });
        self.muted.clear();
        self.current_index = 0;
        self.current_measure = first_measure;
        self.role = self.annotations.resolve_role(first_measure);
        self.last_wait_index = None;
        self.tracked_tempo = None;

        info!(
            title = %score.title,
            tempo = score.tempo,
            parts = score.parts.len(),
            "score loaded"
        );

        // A wait on the opening measure shows as waiting straight away; the
        // timer is only armed by start().
        if self.annotations.wait_at(first_measure).is_some() && self.transition(EngineEvent::Arm).is_some() {
            self.tracker.pause();
        }
        self.publish();
        Ok(())
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Starts playback from the current position, honouring a wait there.
    pub fn start(&mut self) {
        if matches!(self.state(), EngineState::Listening | EngineState::Playing) {
            debug!(state = %self.state(), "start ignored");
            return;
        }
        let Some(scheduler) = self.scheduler.as_ref() else {
            warn!("start without a loaded score");
            return;
        };

        let index = scheduler.playback_index();
        let measure = scheduler.current_measure().unwrap_or(self.current_measure);
        match self.annotations.wait_at(measure) {
            Some(wait) => self.enter_waiting(index, wait),
            None => {
                if self.transition(EngineEvent::Play).is_some() {
                    let beat = self.current_beat();
                    self.tracker.start(beat);
                    self.schedule_tick(self.now_ms);
                    self.publish();
                }
            }
        }
    }

    /// Halts playback and rewinds to the top of the score.
    pub fn stop(&mut self) {
        if self.transition(EngineEvent::Stop).is_none() {
            return;
        }
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.rewind();
        }
        self.tracker.reset();
        self.current_index = 0;
        self.current_measure = self
            .scheduler
            .as_ref()
            .map_or(1, |s| s.timeline().first_measure());
        self.role = self.annotations.resolve_role(self.current_measure);
        self.last_wait_index = None;
        self.tracked_tempo = None;
        self.publish();
    }

    /// Fires every timer due at or before `now_ms`, in due order.
    pub fn poll(&mut self, now_ms: f64) {
        while let Some((due_ms, action)) = self.timers.pop_due(now_ms) {
            self.now_ms = self.now_ms.max(due_ms);
            self.dispatch(action);
        }
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn advance_by(&mut self, ms: f64) {
        self.poll(self.now_ms + ms.max(0.0));
    }

    fn dispatch(&mut self, action: Deferred) {
        match action {
            Deferred::ResumeFromWait => {
                if self.state() == EngineState::Waiting {
                    self.enter_listening();
                }
            }
            Deferred::BeginPlaying => {
                if self.transition(EngineEvent::Begin).is_some() {
                    self.schedule_tick(self.now_ms);
                    self.publish();
                }
            }
            Deferred::Tick => self.on_tick(),
        }
    }

    /// Runs a state machine event. On entry the previous state's timers are cancelled.
    fn transition(&mut self, event: EngineEvent) -> Option<EngineState> {
        match self.fsm.transition(event) {
            Transition::Entered { from, to } => {
                self.timers.cancel_all();
                info!(%from, %to, measure = self.current_measure, "engine state changed");
                Some(to)
            }
            Transition::None => None,
        }
    }

    fn enter_waiting(&mut self, index: usize, wait: WaitDirective) {
        if self.transition(EngineEvent::Arm).is_none() {
            return;
        }
        self.last_wait_index = Some(index);
        self.tracker.pause();
        if let Some(timeout_ms) = wait.timeout_ms() {
            self.timers.schedule(self.now_ms + timeout_ms, Deferred::ResumeFromWait);
        }
        debug!(?wait, index, "waiting");
        self.publish();
    }

    fn enter_listening(&mut self) {
        if self.transition(EngineEvent::Trigger).is_none() {
            return;
        }
        match self.tracker.status() {
            TrackerStatus::Paused => self.tracker.resume(),
            _ => {
                let beat = self.current_beat();
                self.tracker.start(beat);
            }
        }
        self.timers.schedule(
            self.now_ms + self.config.listening_delay_ms,
            Deferred::BeginPlaying,
        );
        self.publish();
    }

    fn schedule_tick(&mut self, from_ms: f64) {
        self.timers.schedule(from_ms + self.config.tick_interval_ms, Deferred::Tick);
    }

    fn on_tick(&mut self) {
        if self.state() != EngineState::Playing {
            return;
        }
        let hold = self.next_wait_beat();
        let Some(scheduler) = self.scheduler.as_mut() else {
            return;
        };

        scheduler.set_hold(hold);
        scheduler.update_tempo(self.role.factor, self.tracked_tempo);
        let outcome = scheduler.tick(self.config.tick_interval_ms, &self.muted, self.sink.as_mut());
        if outcome == TickOutcome::Finished {
            info!("end of score");
            self.stop();
            return;
        }

        if !self.follow_clock() {
            return;
        }
        self.schedule_tick(self.now_ms);
        self.publish_throttled();
    }

    /// Start beat of the next playback slot whose wait has not fired yet.
    ///
    /// The clock and the lookahead window stop there, so no accompaniment
    /// from a waited measure sounds before the wait is released.
    fn next_wait_beat(&self) -> Option<f64> {
        let timeline = self.scheduler.as_ref()?.timeline();
        let from = match self.last_wait_index {
            Some(last) => (last + 1).max(self.current_index + 1),
            None => self.current_index + 1,
        };
        (from..timeline.len())
            .find(|&index| {
                timeline
                    .measure_at_index(index)
                    .is_some_and(|measure| self.annotations.wait_at(measure).is_some())
            })
            .map(|index| timeline.index_start_beat(index))
    }

    /// Enters the playback slot under the clock if it changed.
    ///
    /// Returns false once a wait has taken the engine out of `Playing`.
    fn follow_clock(&mut self) -> bool {
        let Some(scheduler) = self.scheduler.as_ref() else {
            return false;
        };
        let index = scheduler.playback_index();
        let measure = scheduler.current_measure();
        if index != self.current_index {
            self.current_index = index;
            if let Some(measure) = measure {
                self.enter_measure(index, measure);
            }
        }
        self.state() == EngineState::Playing
    }

    /// Re-resolves the role and checks for a wait on entering a playback slot.
    fn enter_measure(&mut self, index: usize, measure: i32) {
        self.current_measure = measure;
        let role = self.annotations.resolve_role(measure);
        if role != self.role {
            debug!(measure, %role, "role changed");
            self.role = role;
        }

        let fresh = self.last_wait_index.map_or(true, |last| index > last);
        if let Some(wait) = self.annotations.wait_at(measure).filter(|_| fresh) {
            self.enter_waiting(index, wait);
        }
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Handles a performer event.
    ///
    /// A note-on releases any wait, and while listening or playing it is fed
    /// to the tracker. An estimate above the confidence threshold becomes the
    /// tracked tempo and, while playing, pulls the clock toward the performer
    /// weighted by the active role.
    pub fn process_note(&mut self, event: &PerformerEvent) -> Option<TrackerEstimate> {
        if !event.is_note_on() {
            return None;
        }
        match self.state() {
            EngineState::Idle => return None,
            EngineState::Waiting => self.enter_listening(),
            EngineState::Listening | EngineState::Playing => {}
        }

        let estimate = self.tracker.process_note(event, self.role.mode)?;
        if estimate.confidence <= self.config.confidence_threshold {
            return Some(estimate);
        }
        self.tracked_tempo = Some(estimate.tempo);
        if self.state() == EngineState::Playing {
            let hold = self.next_wait_beat();
            if let Some(scheduler) = self.scheduler.as_mut() {
                scheduler.set_hold(hold);
                scheduler.correct_toward(estimate.beat, self.role.factor);
            }
            // A pull onto a waited measure stops there and arms the wait.
            self.follow_clock();
        }
        Some(estimate)
    }

    /// Handles a motion cue: entry gestures release waits, breaths nudge tempo.
    pub fn process_motion(&mut self, cue: &MotionCue) {
        match self.state() {
            EngineState::Waiting if cue.is_wait_trigger() => self.enter_listening(),
            EngineState::Playing if cue.kind == MotionKind::Breath => {
                if let Some(scheduler) = self.scheduler.as_mut() {
                    let scale = 1.0 + BREATH_GAIN * cue.intensity();
                    scheduler.nudge_lead_tempo(scale, NUDGE_MIN_RATIO, NUDGE_MAX_RATIO);
                    debug!(lead_tempo = scheduler.lead_tempo(), "breath nudge");
                }
            }
            _ => {}
        }
    }

    /// Applies a rehearsal edit to the live annotations or tempo.
    pub fn apply_command(&mut self, command: &RehearsalCommand) {
        match *command {
            RehearsalCommand::SetRole { .. } | RehearsalCommand::SetWait { .. } => {
                if let Some(patch) = command.annotation_patch() {
                    self.annotations.apply(patch);
                }
            }
            RehearsalCommand::SetTempo { tempo, relative } => {
                let Some(scheduler) = self.scheduler.as_mut() else {
                    warn!("tempo command without a loaded score");
                    return;
                };
                let bpm = TempoChange::resolve(tempo, relative).apply(scheduler.base_tempo());
                if bpm.is_finite() && bpm > 0.0 {
                    scheduler.set_base_tempo(bpm);
                } else {
                    warn!(bpm, "ignoring non-positive tempo");
                }
            }
            RehearsalCommand::Reset => {
                if let Some(loaded) = self.loaded.as_ref() {
                    self.annotations.reset_to(&loaded.annotations);
                    let tempo = loaded.tempo;
                    if let Some(scheduler) = self.scheduler.as_mut() {
                        scheduler.set_base_tempo(tempo);
                    }
                }
            }
        }
        self.role = self.annotations.resolve_role(self.current_measure);
        info!(?command, "rehearsal command applied");
        self.publish();
    }

    /// Silences a part. Unknown indices are kept and simply match no notes.
    pub fn mute_part(&mut self, part_index: usize) {
        self.muted.insert(part_index);
    }

    pub fn unmute_part(&mut self, part_index: usize) {
        self.muted.remove(&part_index);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("now_ms", &self.now_ms)
            .field("measure", &self.current_measure)
            .field("role", &self.role)
            .field("muted", &self.muted)
            .finish_non_exhaustive()
    }
}
