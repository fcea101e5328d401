//! Decoder capability driven by the scan controller.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Display region used by the QR login view.
pub const LOGIN_REGION: &str = "qr-reader-region";
/// Display region used by the inventory scanner.
pub const INVENTORY_REGION: &str = "qr-scanner-region";

/// Callback channel handed to a decoder on start.
pub type DecoderEvents = mpsc::UnboundedSender<DecoderEvent>;

/// Something the decoder observed while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    Decoded(String),
    Error(String),
}

/// Why a decoder could not be started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecoderError {
    #[error("No camera devices found on this system.")]
    NoCamera,

    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Could not start camera: {0}")]
    Start(String),
}

/// Element the decoder renders its preview into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRegion {
    pub id: String,
}

impl ScanRegion {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Scan box dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrBox {
    pub width: u32,
    pub height: u32,
}

/// Decoder settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    pub fps: u32,
    pub qrbox: QrBox,
    pub aspect_ratio: f32,
    pub disable_flip: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            qrbox: QrBox {
                width: 250,
                height: 250,
            },
            aspect_ratio: 1.0,
            disable_flip: false,
        }
    }
}

/// A QR decoding engine bound to some capture device.
///
/// `start` acquires the device and begins delivering [`DecoderEvent`]s on
/// `events`; `stop` releases the device and must be safe to call at any time,
/// including repeatedly.
#[async_trait]
pub trait Decoder: Send {
    async fn start(
        &mut self,
        region: &ScanRegion,
        config: &DecoderConfig,
        events: DecoderEvents,
    ) -> Result<(), DecoderError>;

    fn stop(&mut self);

    fn is_active(&self) -> bool;
}
