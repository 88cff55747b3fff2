//! Login credential and the session it produces

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::codec::XmlElement;
use crate::{ApiError, Result};

/// How the device delivers events for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Device streams events over a held-open channel
    Push,
    /// Device buffers events until the client asks for them with get/event
    Pull,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Push => "push",
            SessionMode::Pull => "pull",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(SessionMode::Push),
            "pull" => Ok(SessionMode::Pull),
            other => Err(ApiError::InvalidParameter(format!(
                "Unknown session mode '{}', expected push or pull",
                other
            ))),
        }
    }
}

const REDACTED: &str = "<redacted>";

/// The single static credential used to log in
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
    pub mode: SessionMode,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>, mode: SessionMode) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            mode,
        }
    }

    /// `<user name="Admin" password="" type="pull"/>`
    pub fn to_element(&self) -> XmlElement {
        self.user_element(&self.password)
    }

    /// The `<user>` element with the password masked, for logging
    pub fn to_redacted_element(&self) -> XmlElement {
        self.user_element(REDACTED)
    }

    fn user_element(&self, password: &str) -> XmlElement {
        XmlElement::new("user")
            .with_attr("name", self.username.as_str())
            .with_attr("password", password)
            .with_attr("type", self.mode.as_str())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("mode", &self.mode)
            .finish()
    }
}

/// An authenticated session, as returned by a successful login
///
/// ```xml
/// <session sid="949098745790" type="pull" activity-timeout="300000" auth-method="local"
///     farmer-id="Neo-180" client-ip="10.45.0.154" warning="Client time is ahead of controller time"/>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub session_id: String,
    pub session_type: Option<SessionMode>,
    /// Idle time after which the device drops the session
    pub activity_timeout_ms: u64,
    pub auth_method: String,
    pub farmer_id: String,
    pub client_ip: String,
    pub warning: Option<String>,
}

impl Session {
    /// Parse a `<session>` element
    ///
    /// An empty `sid` is returned as-is; deciding whether that is acceptable
    /// is left to the login operation.
    pub fn from_element(element: &Element) -> Result<Self> {
        let attr = |key: &str| element.attributes.get(key).cloned();

        let activity_timeout_ms = match element.attributes.get("activity-timeout") {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                ApiError::MalformedResponse(format!("Invalid activity-timeout value '{}'", value))
            })?,
            None => 0,
        };

        let session_type = match element.attributes.get("type") {
            Some(value) => Some(value.parse::<SessionMode>().map_err(|_| {
                ApiError::MalformedResponse(format!("Invalid session type '{}'", value))
            })?),
            None => None,
        };

        Ok(Self {
            session_id: attr("sid").unwrap_or_default(),
            session_type,
            activity_timeout_ms,
            auth_method: attr("auth-method").unwrap_or_default(),
            farmer_id: attr("farmer-id").unwrap_or_default(),
            client_ip: attr("client-ip").unwrap_or_default(),
            warning: attr("warning").filter(|w| !w.is_empty()),
        })
    }

    pub fn activity_timeout(&self) -> Duration {
        Duration::from_millis(self.activity_timeout_ms)
    }

    /// Whether events must be fetched with get/event
    pub fn is_pull(&self) -> bool {
        self.session_type != Some(SessionMode::Push)
    }
}
