//! Real-time driver: owns an [`Engine`] on a dedicated thread.
//!
//! The thread wakes on every command and on a fixed ticker, advancing the
//! engine clock to the elapsed wall time before handling either.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender};
use tracing::{debug, error, info};

use duetto_core::ParsedScore;
use duetto_input::{MotionCue, PerformerEvent, RehearsalCommand};

use crate::engine::EngineSnapshot;
use crate::{Engine, Error, Result};

/// Commands sent to the engine thread.
pub enum EngineCommand {
    LoadScore(Box<ParsedScore>, Sender<Result<()>>),
    Start,
    Stop,
    Note(PerformerEvent),
    Motion(MotionCue),
    Rehearsal(RehearsalCommand),
    Mute(usize),
    Unmute(usize),
    Subscribe(Sender<EngineSnapshot>),
    Shutdown,
}

pub struct EngineRunner {
    commands: Sender<EngineCommand>,
    handle: Option<JoinHandle<()>>,
}

impl EngineRunner {
    pub fn spawn(engine: Engine) -> Result<Self> {
        let (commands, command_receiver) = unbounded();
        let period = Duration::from_secs_f64(engine.config().tick_interval_ms / 1000.0);

        let handle = thread::Builder::new()
            .name("duetto-engine".to_string())
            .spawn(move || Self::engine_thread(engine, command_receiver, period))?;

        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    fn engine_thread(mut engine: Engine, commands: Receiver<EngineCommand>, period: Duration) {
        let origin = Instant::now();
        let ticker = tick(period);
        let elapsed_ms = || origin.elapsed().as_secs_f64() * 1000.0;

        info!("engine thread started");
        loop {
            select! {
                recv(commands) -> msg => {
                    engine.poll(elapsed_ms());
                    match msg {
                        Ok(EngineCommand::Shutdown) | Err(_) => break,
                        Ok(command) => Self::apply(&mut engine, command),
                    }
                }
                recv(ticker) -> _ => engine.poll(elapsed_ms()),
            }
        }
        engine.stop();
        info!("engine thread stopped");
    }

    fn apply(engine: &mut Engine, command: EngineCommand) {
        match command {
            EngineCommand::LoadScore(score, reply) => {
                let result = engine.load_score(&score);
                if let Err(e) = &result {
                    error!("score rejected: {e}");
                }
                let _ = reply.send(result);
            }
            EngineCommand::Start => engine.start(),
            EngineCommand::Stop => engine.stop(),
            EngineCommand::Note(event) => {
                engine.process_note(&event);
            }
            EngineCommand::Motion(cue) => engine.process_motion(&cue),
            EngineCommand::Rehearsal(command) => engine.apply_command(&command),
            EngineCommand::Mute(part) => engine.mute_part(part),
            EngineCommand::Unmute(part) => engine.unmute_part(part),
            EngineCommand::Subscribe(tx) => engine.add_subscriber(tx),
            EngineCommand::Shutdown => debug!("shutdown handled by the thread loop"),
        }
    }

    pub fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::RunnerStopped)
    }

    /// Loads a score and waits for the engine to accept or reject it.
    pub fn load_score(&self, score: ParsedScore) -> Result<()> {
        let (reply, response) = bounded(1);
        self.send(EngineCommand::LoadScore(Box::new(score), reply))?;
        response.recv().map_err(|_| Error::RunnerStopped)?
    }

    pub fn start(&self) -> Result<()> {
        self.send(EngineCommand::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(EngineCommand::Stop)
    }

    pub fn note(&self, event: PerformerEvent) -> Result<()> {
        self.send(EngineCommand::Note(event))
    }

    pub fn motion(&self, cue: MotionCue) -> Result<()> {
        self.send(EngineCommand::Motion(cue))
    }

    pub fn command(&self, command: RehearsalCommand) -> Result<()> {
        self.send(EngineCommand::Rehearsal(command))
    }

    pub fn mute_part(&self, part_index: usize) -> Result<()> {
        self.send(EngineCommand::Mute(part_index))
    }

    pub fn unmute_part(&self, part_index: usize) -> Result<()> {
        self.send(EngineCommand::Unmute(part_index))
    }

    pub fn subscribe(&self) -> Result<Receiver<EngineSnapshot>> {
        let (tx, rx) = unbounded();
        self.send(EngineCommand::Subscribe(tx))?;
        Ok(rx)
    }

    /// Stops playback and joins the engine thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.commands.send(EngineCommand::Shutdown);
        handle.join().map_err(|_| Error::RunnerStopped)
    }
}

impl Drop for EngineRunner {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            error!("engine thread panicked: {e}");
        }
    }
}
