//! QR scan controller.
//!
//! Drives one decoding session to completion:
//!
//! ```text
//! Idle → Initializing → Scanning → Decoded
//!             ↑            │
//!             └── retry ───┤ (error, retry_count <= max_retries)
//!                          └→ Failed
//! ```
//!
//! A start failure (no camera, permission denied) is terminal without retry.
//! Every exit from `Initializing` or `Scanning` releases the decoder, and a
//! teardown request from any state releases it and returns to `Idle`.

pub mod decoder;
mod line;
mod scripted;

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ScanSettings;

pub use decoder::{
    Decoder, DecoderConfig, DecoderError, DecoderEvent, DecoderEvents,
    INVENTORY_REGION, LOGIN_REGION, QrBox, ScanRegion,
};
pub use line::LineDecoder;
pub use scripted::{DecoderMonitor, ScriptStep, ScriptedDecoder};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Initializing,
    Scanning,
    Decoded,
    Failed,
}

/// Terminal scan failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("No camera devices found on this system.")]
    NoCamera,

    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Could not start camera: {0}")]
    StartFailed(String),

    #[error("Scanning failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl From<DecoderError> for ScanError {
    fn from(e: DecoderError) -> Self {
        match e {
            DecoderError::NoCamera => ScanError::NoCamera,
            DecoderError::PermissionDenied(m) => ScanError::PermissionDenied(m),
            DecoderError::Start(m) => ScanError::StartFailed(m),
        }
    }
}

/// How a scan run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Decoded(String),
    Failed(ScanError),
    /// Torn down before a result was produced.
    Cancelled,
}

/// External reasons to release the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownSignal {
    /// User closed the scanner.
    ManualClose,
    /// Owning view went away.
    Unmount,
    /// Navigation to another view.
    Navigation,
    /// Page or process is exiting.
    PageUnload,
}

impl fmt::Display for TeardownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TeardownSignal::ManualClose => "manual close",
            TeardownSignal::Unmount => "unmount",
            TeardownSignal::Navigation => "navigation",
            TeardownSignal::PageUnload => "page unload",
        };
        f.write_str(name)
    }
}

enum Step<T> {
    Continue(T),
    TornDown,
}

/// Scan session state machine over a [`Decoder`].
pub struct ScanController<D: Decoder> {
    decoder: D,
    region: ScanRegion,
    config: DecoderConfig,
    settings: ScanSettings,
    state: ScanState,
    retry_count: u32,
    attempts: u32,
    last_error: Option<String>,
}

impl<D: Decoder> fmt::Debug for ScanController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanController")
            .field("region", &self.region.id)
            .field("state", &self.state)
            .field("retry_count", &self.retry_count)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl<D: Decoder> ScanController<D> {
    pub fn new(decoder: D, region: ScanRegion, settings: ScanSettings) -> Self {
        Self {
            decoder,
            region,
            config: DecoderConfig::default(),
            settings,
            state: ScanState::Idle,
            retry_count: 0,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Scan errors seen in the current run.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Decoder initializations in the current run.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    fn release(&mut self) {
        self.decoder.stop();
    }

    fn torn_down(&mut self) -> ScanOutcome {
        self.release();
        self.state = ScanState::Idle;
        info!(region = %self.region.id, "scan cancelled");
        ScanOutcome::Cancelled
    }

    /// Release the camera in response to an external teardown signal and go back to `Idle`.
    pub fn teardown(&mut self, signal: TeardownSignal) {
        debug!(region = %self.region.id, state = ?self.state, %signal, "scan teardown");
        self.reset();
    }

    /// Release the camera and return to `Idle`, ready for another run.
    pub fn reset(&mut self) {
        self.release();
        self.state = ScanState::Idle;
    }

    /// Run a scan session until a code is decoded, a terminal error occurs or
    /// `teardown` is cancelled.
    ///
    /// Calling this again after `Decoded` or `Failed` starts over from `Idle`.
    pub async fn run(&mut self, teardown: &CancellationToken) -> ScanOutcome {
        self.state = ScanState::Idle;
        self.retry_count = 0;
        self.attempts = 0;
        self.last_error = None;

        loop {
            let Step::Continue(started) = self.initialize(teardown).await else {
                return self.torn_down();
            };
            let events = match started {
                Ok(rx) => rx,
                Err(e) => {
                    self.release();
                    self.state = ScanState::Failed;
                    self.last_error = Some(e.to_string());
                    warn!(region = %self.region.id, error = %e, "decoder failed to start");
                    return ScanOutcome::Failed(e.into());
                }
            };

            let Step::Continue(event) = self.scan(events, teardown).await else {
                return self.torn_down();
            };

            match event {
                DecoderEvent::Decoded(text) => {
                    self.release();
                    self.state = ScanState::Decoded;
                    info!(region = %self.region.id, attempts = self.attempts, "code decoded");
                    return ScanOutcome::Decoded(text);
                }
                DecoderEvent::Error(message) => {
                    self.retry_count += 1;
                    self.release();
                    warn!(
                        region = %self.region.id,
                        retry = self.retry_count,
                        max_retries = self.settings.max_retries,
                        error = %message,
                        "scan error"
                    );
                    self.last_error = Some(message.clone());
                    if self.retry_count > self.settings.max_retries {
                        self.state = ScanState::Failed;
                        return ScanOutcome::Failed(ScanError::RetriesExhausted {
                            attempts: self.attempts,
                            last_error: message,
                        });
                    }
                    let waited = tokio::select! {
                        biased;
                        _ = teardown.cancelled() => Step::TornDown,
                        _ = tokio::time::sleep(self.settings.retry_delay) => Step::Continue(()),
                    };
                    if let Step::TornDown = waited {
                        return self.torn_down();
                    }
                }
            }
        }
    }

    /// `Initializing`: drop any prior handle, then start the decoder on a fresh channel.
    async fn initialize(
        &mut self,
        teardown: &CancellationToken,
    ) -> Step<Result<mpsc::UnboundedReceiver<DecoderEvent>, DecoderError>> {
        self.release();
        self.state = ScanState::Initializing;
        self.attempts += 1;
        debug!(region = %self.region.id, attempt = self.attempts, "initializing decoder");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::select! {
            biased;
            _ = teardown.cancelled() => Step::TornDown,
            started = self.decoder.start(&self.region, &self.config, tx) => {
                Step::Continue(started.map(|()| rx))
            }
        }
    }

    /// `Scanning`: wait for the first event of this attempt.
    async fn scan(
        &mut self,
        mut events: mpsc::UnboundedReceiver<DecoderEvent>,
        teardown: &CancellationToken,
    ) -> Step<DecoderEvent> {
        self.state = ScanState::Scanning;
        tokio::select! {
            biased;
            _ = teardown.cancelled() => Step::TornDown,
            event = events.recv() => Step::Continue(
                event.unwrap_or_else(|| DecoderEvent::Error("decoder stopped unexpectedly".into()))
            ),
        }
    }
}

impl<D: Decoder> Drop for ScanController<D> {
    fn drop(&mut self) {
        if self.decoder.is_active() {
            self.decoder.stop();
        }
    }
}

impl ScanOutcome {
    pub fn decoded(&self) -> Option<&str> {
        match self {
            ScanOutcome::Decoded(text) => Some(text),
            _ => None,
        }
    }
}
