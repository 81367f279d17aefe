//! Builder for configuring and constructing an [`Engine`].

use duetto_core::{EngineConfig, NoteSink, PlaybackMode};

use crate::{Engine, EngineRunner, Result};

/// Every setting has a usable default, so `Engine::builder().build()` works
/// out of the box with a silent note sink.
///
/// # Example
///
/// ```ignore
/// use duetto::prelude::*;
///
/// let mut engine = Engine::builder()
///     .mode(PlaybackMode::Adaptive)
///     .listening_delay_ms(300.0)
///     .note_sink(|note: &NoteEvent, delay_ms: f64| {
///         println!("pitch {} in {delay_ms:.0} ms", note.pitch);
///     })
///     .build()?;
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    sink: Option<Box<dyn NoteSink + Send>>,
}

impl EngineBuilder {
    /// Replaces every setting at once.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: [`PlaybackMode::Adaptive`]
    pub fn mode(mut self, mode: PlaybackMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Default: 50 ms
    pub fn tick_interval_ms(mut self, ms: f64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    /// Default: 400 ms
    pub fn listening_delay_ms(mut self, ms: f64) -> Self {
        self.config.listening_delay_ms = ms;
        self
    }

    /// Default: 200 ms
    pub fn publish_interval_ms(mut self, ms: f64) -> Self {
        self.config.publish_interval_ms = ms;
        self
    }

    /// Default: 0.3
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    /// Where scheduled accompaniment notes go.
    pub fn note_sink(mut self, sink: impl NoteSink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Engine> {
        match self.sink {
            Some(sink) => Engine::with_sink(self.config, sink),
            None => Engine::new(self.config),
        }
    }

    /// Builds the engine and moves it onto its own clock thread.
    pub fn spawn(self) -> Result<EngineRunner> {
        EngineRunner::spawn(self.build()?)
    }
}
