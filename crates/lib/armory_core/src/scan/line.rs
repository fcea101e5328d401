//! Decoder for hardware scanners that type decoded codes as text lines.
//!
//! Handheld QR readers in keyboard-wedge mode emit each code followed by a
//! newline. Each `start` reads lines until a non-blank one arrives and
//! reports it as decoded; end of input or a read failure is a scan error.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use super::decoder::{
    Decoder, DecoderConfig, DecoderError, DecoderEvent, DecoderEvents, ScanRegion,
};

pub struct LineDecoder<R> {
    source: Arc<Mutex<R>>,
    task: Option<JoinHandle<()>>,
}

impl<R> std::fmt::Debug for LineDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineDecoder")
            .field("reading", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl<R> LineDecoder<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            source: Arc::new(Mutex::new(reader)),
            task: None,
        }
    }

    /// Decoder over a reader other parts of the program also read from.
    pub fn shared(source: Arc<Mutex<R>>) -> Self {
        Self { source, task: None }
    }
}

async fn read_code<R>(source: Arc<Mutex<R>>, events: DecoderEvents)
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut reader = source.lock().await;
    let mut line = String::new();
    loop {
        line.clear();
        let event = match reader.read_line(&mut line).await {
            Ok(0) => DecoderEvent::Error("input closed".into()),
            Ok(_) => match line.trim() {
                "" => continue,
                code => DecoderEvent::Decoded(code.to_string()),
            },
            Err(e) => DecoderEvent::Error(e.to_string()),
        };
        let _ = events.send(event);
        return;
    }
}

#[async_trait]
impl<R> Decoder for LineDecoder<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn start(
        &mut self,
        region: &ScanRegion,
        config: &DecoderConfig,
        events: DecoderEvents,
    ) -> Result<(), DecoderError> {
        self.stop();
        debug!(region = %region.id, fps = config.fps, "reading codes from input");
        self.task = Some(tokio::spawn(read_code(Arc::clone(&self.source), events)));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}
