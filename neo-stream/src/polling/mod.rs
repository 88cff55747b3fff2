//! Timed get/event polling
//!
//! [`run_polling_loop`] polls an [`EventSource`] on a fixed interval until a
//! deadline passes or a cancellation token fires, handing each result to an
//! [`EventSink`](crate::EventSink).

pub mod scheduler;

use async_trait::async_trait;
use neo_api::{DeviceEventEnvelope, NeoClient};
use neo_transport::Transport;

pub use scheduler::{run_polling_loop, PollingSummary, StopReason};

/// Anything that can be asked for the events buffered since the last poll
#[async_trait]
pub trait EventSource: Send {
    async fn poll_events(&mut self) -> neo_api::Result<DeviceEventEnvelope>;
}

#[async_trait]
impl<T: Transport> EventSource for NeoClient<T> {
    async fn poll_events(&mut self) -> neo_api::Result<DeviceEventEnvelope> {
        self.poll_once().await
    }
}
