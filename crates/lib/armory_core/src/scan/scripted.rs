//! Deterministic decoder for exercising the scan controller without a camera.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::decoder::{
    Decoder, DecoderConfig, DecoderError, DecoderEvent, DecoderEvents, ScanRegion,
};

/// What the scripted decoder does on one `start`.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// `start` itself fails.
    FailStart(DecoderError),
    /// Start, then immediately report a decoded code.
    Decode(String),
    /// Start, then immediately report a scan error.
    Error(String),
    /// Start and stay quiet until stopped or driven through the monitor.
    Silent,
    /// Acquire the camera but never finish starting.
    StallStart,
}

#[derive(Debug, Default)]
struct MonitorState {
    starts: u32,
    stops: u32,
    active: bool,
    regions: Vec<String>,
    events: Option<DecoderEvents>,
}

/// Shared view of a [`ScriptedDecoder`]'s activity.
#[derive(Debug, Clone, Default)]
pub struct DecoderMonitor(Arc<Mutex<MonitorState>>);

impl DecoderMonitor {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of `start` calls, successful or not.
    pub fn starts(&self) -> u32 {
        self.lock().starts
    }

    /// Number of `stop` calls.
    pub fn stops(&self) -> u32 {
        self.lock().stops
    }

    /// Whether the simulated camera is currently held.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Region ids passed to `start`, in order.
    pub fn regions(&self) -> Vec<String> {
        self.lock().regions.clone()
    }

    /// Deliver an event on the live callback channel.
    ///
    /// Returns `false` when the decoder has been stopped or the controller no
    /// longer listens.
    pub fn emit(&self, event: DecoderEvent) -> bool {
        match &self.lock().events {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

/// Decoder that follows a fixed script, one step per `start`.
///
/// Once the script runs out every further start behaves like
/// [`ScriptStep::Silent`].
#[derive(Debug)]
pub struct ScriptedDecoder {
    script: VecDeque<ScriptStep>,
    monitor: DecoderMonitor,
}

impl ScriptedDecoder {
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: script.into_iter().collect(),
            monitor: DecoderMonitor::default(),
        }
    }

    pub fn monitor(&self) -> DecoderMonitor {
        self.monitor.clone()
    }
}

#[async_trait]
impl Decoder for ScriptedDecoder {
    async fn start(
        &mut self,
        region: &ScanRegion,
        _config: &DecoderConfig,
        events: DecoderEvents,
    ) -> Result<(), DecoderError> {
        let step = self.script.pop_front().unwrap_or(ScriptStep::Silent);
        {
            let mut state = self.monitor.lock();
            state.starts += 1;
            state.regions.push(region.id.clone());
            if let ScriptStep::StallStart = step {
                state.active = true;
            }
        }
        if let ScriptStep::StallStart = step {
            return std::future::pending().await;
        }

        let mut state = self.monitor.lock();
        let event = match step {
            ScriptStep::FailStart(e) => return Err(e),
            ScriptStep::StallStart => None,
            ScriptStep::Decode(text) => Some(DecoderEvent::Decoded(text)),
            ScriptStep::Error(message) => Some(DecoderEvent::Error(message)),
            ScriptStep::Silent => None,
        };
        state.active = true;
        if let Some(event) = event {
            let _ = events.send(event);
        }
        state.events = Some(events);
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.monitor.lock();
        state.stops += 1;
        state.active = false;
        state.events = None;
    }

    fn is_active(&self) -> bool {
        self.monitor.is_active()
    }
}
