use std::fmt;

use chrono::{Local, SecondsFormat};
use neo_transport::{HttpTransport, Transport, TransportConfig};
use tracing::{debug, info, warn, Level};

use crate::codec::{CodecConfig, XmlCodec};
use crate::envelope::{Category, Command, EnvelopeHeader, RequestEnvelope};
use crate::events::DeviceEventEnvelope;
use crate::operation::NeoOperation;
use crate::operations::{
    AddSubscriptionOperation, GetEventOperation, LoginOperation, LogoutOperation,
    RemoveSubscriptionOperation,
};
use crate::session::{Credential, Session};
use crate::subscription::SubscriptionRequestSpec;
use crate::{ApiError, Result};

/// Lifecycle state of a [`NeoClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    Unauthenticated,
    Authenticated,
    Subscribed,
    Polling,
    Unsubscribing,
    LoggedOut,
    /// Subscribing failed; only teardown remains
    Failed,
}

impl ClientState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::Unauthenticated => "unauthenticated",
            ClientState::Authenticated => "authenticated",
            ClientState::Subscribed => "subscribed",
            ClientState::Polling => "polling",
            ClientState::Unsubscribing => "unsubscribing",
            ClientState::LoggedOut => "logged-out",
            ClientState::Failed => "failed",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope identity and rendering settings for a [`NeoClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `origin` attribute on every request
    /// Default: "transcoder-collector"
    pub origin: String,

    /// `destination` attribute on every request
    /// Default: "device"
    pub destination: String,

    /// Default: "2.1"
    pub protocol_version: String,

    /// Default: "neo"
    pub platform_name: String,

    /// Request ids are this prefix followed by a counter
    /// Default: "G"
    pub request_id_prefix: String,

    /// First value of the request id counter
    /// Default: 1000
    pub request_id_start: u64,

    pub codec: CodecConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: "transcoder-collector".to_string(),
            destination: "device".to_string(),
            protocol_version: "2.1".to_string(),
            platform_name: "neo".to_string(),
            request_id_prefix: "G".to_string(),
            request_id_start: 1000,
            codec: CodecConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn with_platform_name(mut self, name: impl Into<String>) -> Self {
        self.platform_name = name.into();
        self
    }

    pub fn with_request_ids(mut self, prefix: impl Into<String>, start: u64) -> Self {
        self.request_id_prefix = prefix.into();
        self.request_id_start = start;
        self
    }

    pub fn with_codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }
}

/// Client for one neo device session
///
/// Drives the session lifecycle in order: login, subscribe, poll, unsubscribe,
/// logout. The client owns the session id and the active subscription; no
/// other component sees or stores them.
///
/// Every exchanging method takes `&mut self`, so only one request is ever
/// outstanding for the session.
///
/// # Example
/// ```rust,ignore
/// use neo_api::{Credential, NeoClient, SessionMode, SubscriptionRequestSpec, SubscriptionTarget};
/// use neo_transport::TransportConfig;
///
/// let mut client = NeoClient::connect(TransportConfig::new("https://10.0.0.5/neoreq/"))?;
/// client.login(&Credential::new("Admin", "", SessionMode::Pull)).await?;
///
/// let target = SubscriptionTarget::mux("ME-7000-2", "4", "4/3", "0000");
/// client.subscribe(SubscriptionRequestSpec::new(target)).await?;
///
/// let events = client.poll_once().await?;
/// println!("{} events, {} pending", events.len(), events.pending_events);
///
/// client.teardown().await;
/// ```
#[derive(Debug)]
pub struct NeoClient<T: Transport> {
    transport: T,
    codec: XmlCodec,
    config: ClientConfig,
    next_request_id: u64,
    state: ClientState,
    history: Vec<ClientState>,
    session: Option<Session>,
    subscription: Option<SubscriptionRequestSpec>,
}

impl NeoClient<HttpTransport> {
    /// Build an HTTP transport from `config` and wrap it in a client
    pub fn connect(config: TransportConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport> NeoClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            codec: XmlCodec::new(config.codec.clone()),
            next_request_id: config.request_id_start,
            config,
            state: ClientState::Unauthenticated,
            history: vec![ClientState::Unauthenticated],
            session: None,
            subscription: None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Every state the client has entered, oldest first
    pub fn state_history(&self) -> &[ClientState] {
        &self.history
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The subscription teardown would remove
    pub fn subscription(&self) -> Option<&SubscriptionRequestSpec> {
        self.subscription.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticate and store the session
    ///
    /// Only valid from `Unauthenticated`. A rejection leaves the state
    /// unchanged and is reported as [`ApiError::Auth`] with the device's code
    /// and message.
    pub async fn login(&mut self, credential: &Credential) -> Result<&Session> {
        if self.state != ClientState::Unauthenticated {
            return Err(ApiError::InvalidState(format!(
                "login requires an unauthenticated client, state is {}",
                self.state
            )));
        }

        let session = match self.execute::<LoginOperation>(credential).await {
            Ok(session) => session,
            Err(e) => {
                if let ApiError::Auth { code, message } = &e {
                    warn!(code = %code, message = %message, "Login rejected by device");
                }
                return Err(e);
            }
        };

        if let Some(warning) = &session.warning {
            warn!(warning = %warning, "Device attached a warning to the session");
        }
        info!(
            sid = %session.session_id,
            farmer_id = %session.farmer_id,
            activity_timeout_ms = session.activity_timeout_ms,
            "Logged in"
        );

        self.transition(ClientState::Authenticated);
        Ok(self.session.insert(session))
    }

    /// Subscribe to bit-rate events at the request's target
    ///
    /// Only valid from `Authenticated`. The request is recorded before the
    /// exchange so teardown removes it even if the device half-created it. Any
    /// failure of the exchange moves the client to `Failed`.
    pub async fn subscribe(&mut self, spec: SubscriptionRequestSpec) -> Result<()> {
        if self.state != ClientState::Authenticated {
            return Err(ApiError::InvalidState(format!(
                "subscribe requires an authenticated client, state is {}",
                self.state
            )));
        }
        spec.target.validate()?;

        let spec = self.subscription.insert(spec).clone();
        match self.execute::<AddSubscriptionOperation>(&spec).await {
            Ok(()) => {
                info!(path = %spec.target, "Subscribed to bit-rate events");
                self.transition(ClientState::Subscribed);
                Ok(())
            }
            Err(e) => {
                self.transition(ClientState::Failed);
                Err(e)
            }
        }
    }

    /// Fetch the events buffered on the device
    ///
    /// Only valid from `Subscribed` or `Polling`, on a pull session. A failed
    /// poll leaves the state unchanged.
    pub async fn poll_once(&mut self) -> Result<DeviceEventEnvelope> {
        if !matches!(self.state, ClientState::Subscribed | ClientState::Polling) {
            return Err(ApiError::InvalidState(format!(
                "poll requires an active subscription, state is {}",
                self.state
            )));
        }
        if !self.session.as_ref().map_or(false, Session::is_pull) {
            return Err(ApiError::InvalidState(
                "poll requires a pull session".to_string(),
            ));
        }

        let events = self.execute::<GetEventOperation>(&()).await?;
        self.transition(ClientState::Polling);

        debug!(
            events = events.len(),
            pending = events.pending_events,
            "Poll completed"
        );
        Ok(events)
    }

    /// Remove the recorded subscription
    ///
    /// A no-op when nothing was subscribed or there is no session. The record
    /// is dropped whatever the outcome, so the remove is sent at most once.
    pub async fn unsubscribe(&mut self) -> Result<()> {
        let Some(spec) = self.subscription.take() else {
            debug!("No subscription to remove");
            return Ok(());
        };
        if self.session.is_none() {
            debug!(path = %spec.target, "No session, dropping subscription record");
            return Ok(());
        }

        self.transition(ClientState::Unsubscribing);
        self.execute::<RemoveSubscriptionOperation>(&spec.target).await?;
        info!(path = %spec.target, "Unsubscribed");
        Ok(())
    }

    /// End the session
    ///
    /// A no-op without a session. Otherwise the session is cleared and the
    /// client is `LoggedOut` whatever the device answers.
    pub async fn logout(&mut self) -> Result<()> {
        if self.session.is_none() {
            debug!("No session to log out");
            return Ok(());
        }

        let result = self.execute::<LogoutOperation>(&()).await;
        self.session = None;
        self.transition(ClientState::LoggedOut);

        if result.is_ok() {
            info!("Logged out");
        }
        result
    }

    /// Unsubscribe then log out, logging and swallowing failures
    pub async fn teardown(&mut self) {
        if let Err(e) = self.unsubscribe().await {
            warn!(error = %e, "Unsubscribe failed during teardown");
        }
        if let Err(e) = self.logout().await {
            warn!(error = %e, "Logout failed during teardown");
        }
    }

    async fn execute<Op: NeoOperation>(&mut self, request: &Op::Request) -> Result<Op::Response> {
        let sid = if Op::REQUIRES_SESSION {
            match self.session.as_ref() {
                Some(session) if !session.session_id.is_empty() => Some(session.session_id.clone()),
                _ => {
                    return Err(ApiError::InvalidState(format!(
                        "{} requires an authenticated session",
                        Op::NAME
                    )))
                }
            }
        } else {
            None
        };

        let body = Op::build_body(request)?;
        let header = self.next_header(Op::COMMAND, Op::CATEGORY, sid);
        let request_id = header.id.clone();
        let envelope = RequestEnvelope::new(header, body);
        let xml = self.codec.encode(&envelope)?;

        if tracing::enabled!(Level::DEBUG) {
            let logged = self.codec.encode_redacted(&envelope)?;
            debug!(operation = Op::NAME, request_id = %request_id, request = %logged, "Sending request");
        }
        let raw = self.transport.post(xml).await?;
        debug!(operation = Op::NAME, request_id = %request_id, response = %raw, "Received response");

        let response = self.codec.decode::<Op::ResponseBody>(&raw)?;
        Op::parse_response(response)
    }

    fn next_header(&mut self, command: Command, category: Category, sid: Option<String>) -> EnvelopeHeader {
        let id = format!("{}{}", self.config.request_id_prefix, self.next_request_id);
        self.next_request_id += 1;

        EnvelopeHeader {
            id,
            origin: self.config.origin.clone(),
            destination: self.config.destination.clone(),
            command,
            category,
            time: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            protocol_version: self.config.protocol_version.clone(),
            platform_name: self.config.platform_name.clone(),
            sid,
        }
    }

    fn transition(&mut self, next: ClientState) {
        if self.state == next {
            return;
        }
        info!(from = %self.state, to = %next, "Client state changed");
        self.state = next;
        self.history.push(next);
    }
}
