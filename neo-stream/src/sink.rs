//! Destinations for polled events
//!
//! The polling loop hands every poll result to an [`EventSink`]. A sink error
//! is logged by the loop and never stops it.

use async_trait::async_trait;
use neo_api::{DeviceEvent, DeviceEventEnvelope};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{Result, StreamError};

/// Receives the result of each successful poll, including empty ones
#[async_trait]
pub trait EventSink: Send {
    async fn deliver(&mut self, envelope: &DeviceEventEnvelope) -> Result<()>;
}

/// Logs each event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl LoggingSink {
    fn log_event(event: &DeviceEvent) {
        let path = event
            .path
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        match event.samples.first() {
            Some(top) => info!(
                event_type = %event.event_type,
                id = event.id.as_deref().unwrap_or(""),
                path = %path,
                level = %top.level,
                avg_bit_rate = top.avg_bit_rate,
                inst_bit_rate = top.inst_bit_rate,
                streams = top.streams().len(),
                "Device event"
            ),
            None => info!(
                event_type = %event.event_type,
                id = event.id.as_deref().unwrap_or(""),
                path = %path,
                "Device event"
            ),
        }
    }
}

#[async_trait]
impl EventSink for LoggingSink {
    async fn deliver(&mut self, envelope: &DeviceEventEnvelope) -> Result<()> {
        if envelope.is_empty() {
            debug!(pending = envelope.pending_events, "No events");
            return Ok(());
        }

        for event in &envelope.events {
            Self::log_event(event);
        }
        Ok(())
    }
}

/// Forwards each poll result over a tokio mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<DeviceEventEnvelope>,
    skip_empty: bool,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<DeviceEventEnvelope>) -> Self {
        Self {
            sender,
            skip_empty: false,
        }
    }

    /// Create a sink and the receiver paired with it
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<DeviceEventEnvelope>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(sender), receiver)
    }

    /// Drop polls that returned no events instead of forwarding them
    pub fn skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn deliver(&mut self, envelope: &DeviceEventEnvelope) -> Result<()> {
        if self.skip_empty && envelope.is_empty() {
            return Ok(());
        }
        self.sender
            .send(envelope.clone())
            .await
            .map_err(|_| StreamError::SinkClosed)
    }
}

/// Writes each event as one JSON object per line
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for JsonLinesSink<W> {
    async fn deliver(&mut self, envelope: &DeviceEventEnvelope) -> Result<()> {
        for event in &envelope.events {
            let mut line = serde_json::to_vec(event)?;
            line.push(b'\n');
            self.writer.write_all(&line).await?;
        }
        self.writer.flush().await?;
        Ok(())
    }
}
