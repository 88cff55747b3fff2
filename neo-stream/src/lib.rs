//! Bit-rate event collection for neo devices
//!
//! Builds on `neo-api` to run a whole collection session: log in, subscribe
//! to bit-rate events, poll on a fixed interval until a deadline or
//! cancellation, and always unsubscribe and log out afterwards.
//!
//! ```rust,ignore
//! use neo_api::{Credential, NeoClient, SessionMode, SubscriptionRequestSpec, SubscriptionTarget};
//! use neo_stream::{run_session, LoggingSink, PollingConfig};
//! use neo_transport::TransportConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut client = NeoClient::connect(TransportConfig::new("https://10.0.0.5/neoreq/"))?;
//! let spec = SubscriptionRequestSpec::new(SubscriptionTarget::mux("ME-7000-2", "4", "4/3", "0000"));
//!
//! let summary = run_session(
//!     &mut client,
//!     &Credential::new("Admin", "", SessionMode::Pull),
//!     spec,
//!     &PollingConfig::default(),
//!     &mut LoggingSink,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! ```

pub mod config;
pub mod error;
pub mod polling;
pub mod session;
pub mod sink;

pub use config::PollingConfig;
pub use error::{Result, StreamError};
pub use polling::{run_polling_loop, EventSource, PollingSummary, StopReason};
pub use session::run_session;
pub use sink::{ChannelSink, EventSink, JsonLinesSink, LoggingSink};
