//! Client for the neo transcoder XML device-management protocol
//!
//! Neo controllers accept XML `<request>` envelopes over HTTP POST and answer
//! with `<response>` envelopes. This crate builds and parses those envelopes
//! and drives a session through its lifecycle:
//!
//! ```rust,ignore
//! use neo_api::{Credential, NeoClient, SessionMode, SubscriptionRequestSpec, SubscriptionTarget};
//! use neo_transport::TransportConfig;
//!
//! let mut client = NeoClient::connect(TransportConfig::new("https://10.0.0.5/neoreq/"))?;
//!
//! client.login(&Credential::new("Admin", "", SessionMode::Pull)).await?;
//! client
//!     .subscribe(SubscriptionRequestSpec::new(SubscriptionTarget::mux("ME-7000-2", "4", "4/3", "0000")))
//!     .await?;
//!
//! let events = client.poll_once().await?;
//! for event in events.bit_rate_events() {
//!     println!("{}: {} samples", event.id.as_deref().unwrap_or(""), event.samples.len());
//! }
//!
//! // Removes the subscription and ends the session, logging any failure
//! client.teardown().await;
//! ```
//!
//! Each command/category pair is an operation type implementing
//! [`NeoOperation`]; the client runs all of them through one exchange path.

pub mod client;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod events;
pub mod operation;
pub mod operations;
pub mod session;
pub mod subscription;

pub use client::{ClientConfig, ClientState, NeoClient};
pub use codec::{CodecConfig, EmptyElementStyle, XmlCodec, XmlElement};
pub use envelope::{Category, Command, Reason, RequestEnvelope, ResponseEnvelope};
pub use error::{ApiError, Result};
pub use events::{BitRateSample, DeviceEvent, DeviceEventEnvelope, EventPath, EventType};
pub use operation::NeoOperation;
pub use session::{Credential, Session, SessionMode};
pub use subscription::{SubscriptionRequestSpec, SubscriptionTarget};
