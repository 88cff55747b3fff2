//! Request and response envelopes
//!
//! Every message on the wire is a `<request>` or `<response>` element carrying
//! the same attribute set, with a command-specific body as its children:
//!
//! ```xml
//! <request id="G1201" origin="transcoder-collector" destination="device" command="add"
//!     category="subscription" time="2016-02-09T11:30:20.508-06:00" protocol-version="2.1"
//!     platform-name="neo" sid="9223370581815793597">
//!   <path>...</path>
//!   <event-list>...</event-list>
//! </request>
//! ```
//!
//! The body type parameter replaces one record type per command.

use std::fmt;

use xmltree::Element;

use crate::codec::XmlElement;
use crate::{ApiError, Result};

/// Reason code the device uses for success
pub const REASON_OK: &str = "OK";

/// Request verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Add,
    Remove,
    Get,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Add => "add",
            Command::Remove => "remove",
            Command::Get => "get",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object class the command applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Login,
    Subscription,
    Event,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Login => "login",
            Category::Subscription => "subscription",
            Category::Event => "event",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes shared by every outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub command: Command,
    pub category: Category,
    pub time: String,
    pub protocol_version: String,
    pub platform_name: String,
    /// Session id, present on every request after login
    pub sid: Option<String>,
}

impl EnvelopeHeader {
    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("request")
            .with_attr("id", self.id.as_str())
            .with_attr("origin", self.origin.as_str())
            .with_attr("destination", self.destination.as_str())
            .with_attr("command", self.command.as_str())
            .with_attr("category", self.category.as_str())
            .with_attr("time", self.time.as_str())
            .with_attr("protocol-version", self.protocol_version.as_str())
            .with_attr("platform-name", self.platform_name.as_str());

        if let Some(sid) = &self.sid {
            element.push_attr("sid", sid.as_str());
        }

        element
    }
}

/// Command-specific children of a `<request>`
pub trait RequestBody {
    fn children(&self) -> Vec<XmlElement>;

    /// Children as they may appear in logs
    ///
    /// Bodies that carry secrets override this to mask them.
    fn redacted_children(&self) -> Vec<XmlElement> {
        self.children()
    }
}

/// Typed view of a `<response>` document
pub trait ResponseBody: Sized {
    /// Extract the body from the `<response>` root element
    fn from_response(root: &Element) -> Result<Self>;
}

/// Body for commands that carry nothing beyond the header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyBody;

impl RequestBody for EmptyBody {
    fn children(&self) -> Vec<XmlElement> {
        Vec::new()
    }
}

impl ResponseBody for EmptyBody {
    fn from_response(_root: &Element) -> Result<Self> {
        Ok(EmptyBody)
    }
}

/// An outbound request: shared header plus a typed body
#[derive(Debug, Clone)]
pub struct RequestEnvelope<B> {
    pub header: EnvelopeHeader,
    pub body: B,
}

impl<B: RequestBody> RequestEnvelope<B> {
    pub fn new(header: EnvelopeHeader, body: B) -> Self {
        Self { header, body }
    }

    pub fn to_element(&self) -> XmlElement {
        self.header.to_element().with_children(self.body.children())
    }

    pub fn to_redacted_element(&self) -> XmlElement {
        self.header.to_element().with_children(self.body.redacted_children())
    }
}

/// `<reason error-code="...">message</reason>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reason {
    /// Error code; older firmware spells the attribute `err-code`
    pub code: Option<String>,
    pub message: String,
}

impl Reason {
    pub fn from_element(element: &Element) -> Self {
        let code = element
            .attributes
            .get("error-code")
            .or_else(|| element.attributes.get("err-code"))
            .cloned();
        let message = element
            .get_text()
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        Self { code, message }
    }

    /// No code, or the `OK` code
    pub fn is_ok(&self) -> bool {
        self.code.as_deref().map_or(true, |code| code == REASON_OK)
    }
}

/// Attributes of an inbound `<response>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub command: String,
    pub category: String,
    pub time: String,
    pub protocol_version: String,
    pub platform_name: String,
    pub sw_version: Option<String>,
    pub sw_build: Option<String>,
    /// `status="error"` marks a failed exchange
    pub status: Option<String>,
    pub sid: Option<String>,
    /// Events still buffered on the device after a get-event
    pub pending_events: Option<u32>,
}

impl ResponseHeader {
    pub fn from_element(root: &Element) -> Result<Self> {
        let attr = |key: &str| root.attributes.get(key).cloned();

        let pending_events = match root.attributes.get("pending-events") {
            Some(value) => Some(value.trim().parse::<u32>().map_err(|_| {
                ApiError::MalformedResponse(format!("Invalid pending-events value '{}'", value))
            })?),
            None => None,
        };

        Ok(Self {
            id: attr("id").unwrap_or_default(),
            origin: attr("origin").unwrap_or_default(),
            destination: attr("destination").unwrap_or_default(),
            command: attr("command").unwrap_or_default(),
            category: attr("category").unwrap_or_default(),
            time: attr("time").unwrap_or_default(),
            protocol_version: attr("protocol-version").unwrap_or_default(),
            platform_name: attr("platform-name").unwrap_or_default(),
            sw_version: attr("sw-version"),
            sw_build: attr("sw-build"),
            status: attr("status"),
            sid: attr("sid"),
            pending_events,
        })
    }
}

/// An inbound response: header, optional reason and a typed body
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<B> {
    pub header: ResponseHeader,
    pub reason: Option<Reason>,
    pub body: B,
}

impl<B> ResponseEnvelope<B> {
    /// The device's rejection, if this response reports one
    ///
    /// A non-OK reason code is a failure. `status="error"` is a failure even
    /// without a reason element.
    pub fn failure(&self) -> Option<Reason> {
        if let Some(reason) = &self.reason {
            if !reason.is_ok() {
                return Some(reason.clone());
            }
        }

        if self.header.status.as_deref() == Some("error") {
            return Some(Reason {
                code: Some(
                    self.reason
                        .as_ref()
                        .and_then(|r| r.code.clone())
                        .unwrap_or_else(|| "Unknown_Error".to_string()),
                ),
                message: self
                    .reason
                    .as_ref()
                    .map(|r| r.message.clone())
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "device reported status=error".to_string()),
            });
        }

        None
    }

    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::XmlCodec;

    fn header(sid: Option<&str>) -> EnvelopeHeader {
        EnvelopeHeader {
            id: "G1037".to_string(),
            origin: "transcoder-collector".to_string(),
            destination: "device".to_string(),
            command: Command::Remove,
            category: Category::Login,
            time: "2015-03-09T17:38:29.783-06:00".to_string(),
            protocol_version: "2.1".to_string(),
            platform_name: "neo".to_string(),
            sid: sid.map(str::to_string),
        }
    }

    #[test]
    fn test_header_attribute_order() {
        let envelope = RequestEnvelope::new(header(Some("949098745790")), EmptyBody);
        let xml = XmlCodec::default().encode(&envelope).unwrap();

        assert_eq!(
            xml,
            r#"<request id="G1037" origin="transcoder-collector" destination="device" command="remove" category="login" time="2015-03-09T17:38:29.783-06:00" protocol-version="2.1" platform-name="neo" sid="949098745790"/>"#
        );
    }

    #[test]
    fn test_header_without_session_has_no_sid() {
        let envelope = RequestEnvelope::new(header(None), EmptyBody);
        assert_eq!(envelope.to_element().attr("sid"), None);
    }

    #[test]
    fn test_reason_parsing_with_cdata() {
        let xml = r#"<response id="beacham" status="error"><reason error-code="Unknown_Error"><![CDATA[Number of sessions exceeded the maximum of 8.]]></reason></response>"#;
        let envelope = XmlCodec::default().decode::<EmptyBody>(xml).unwrap();

        let failure = envelope.failure().unwrap();
        assert_eq!(failure.code.as_deref(), Some("Unknown_Error"));
        assert_eq!(failure.message, "Number of sessions exceeded the maximum of 8.");
    }

    #[test]
    fn test_legacy_err_code_attribute() {
        let xml = r#"<response id="G1037" command="remove" category="login"><reason err-code="OK">succeeded</reason></response>"#;
        let envelope = XmlCodec::default().decode::<EmptyBody>(xml).unwrap();

        assert!(envelope.is_success());
        assert_eq!(envelope.reason.unwrap().code.as_deref(), Some("OK"));
    }

    #[test]
    fn test_missing_reason_is_success() {
        let xml = r#"<response id="G1111" command="get" category="event" pending-events="0"/>"#;
        let envelope = XmlCodec::default().decode::<EmptyBody>(xml).unwrap();

        assert!(envelope.is_success());
        assert_eq!(envelope.header.pending_events, Some(0));
    }

    #[test]
    fn test_error_status_without_reason_is_failure() {
        let xml = r#"<response id="G1" status="error"/>"#;
        let envelope = XmlCodec::default().decode::<EmptyBody>(xml).unwrap();

        let failure = envelope.failure().unwrap();
        assert_eq!(failure.code.as_deref(), Some("Unknown_Error"));
        assert_eq!(failure.message, "device reported status=error");
    }

    #[test]
    fn test_invalid_pending_events_is_malformed() {
        let xml = r#"<response id="G1" pending-events="many"/>"#;
        let result = XmlCodec::default().decode::<EmptyBody>(xml);
        assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
    }

    #[test]
    fn test_response_header_fields() {
        let xml = r#"<response id="G1204" origin="device" destination="gui" command="remove" category="subscription" time="2016-02-09T17:32:20.256Z" protocol-version="2.3" platform-name="neo" sw-version="me7k.2.2.0" sw-build="1" sid="9223370581815793597"><reason error-code="OK"><![CDATA[unsuscribe completed.]]></reason></response>"#;
        let envelope = XmlCodec::default().decode::<EmptyBody>(xml).unwrap();

        assert_eq!(envelope.header.command, "remove");
        assert_eq!(envelope.header.category, "subscription");
        assert_eq!(envelope.header.sw_version.as_deref(), Some("me7k.2.2.0"));
        assert_eq!(envelope.header.sid.as_deref(), Some("9223370581815793597"));
        assert!(envelope.is_success());
    }
}
