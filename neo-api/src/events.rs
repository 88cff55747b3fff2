//! Events returned by get/event polls
//!
//! A pull session's poll response carries the buffered events in an
//! `<event-list>`. Bit-rate events repeat the subscription path and then nest
//! samples by hardware level:
//!
//! ```xml
//! <event type="bit-rate-event" id="1505838270680" time="2017-09-19T22:15:44.879Z">
//!   <path>...</path>
//!   <gige-output-mux id="0000" avg-bit-rate="0" inst-bit-rate="0" overhead="0">
//!     <output-program id="1" avg-bit-rate="0" inst-bit-rate="0">
//!       <stream id="32" avg-bit-rate="0" inst-bit-rate="0" std-dev="0"/>
//!     </output-program>
//!     <passed-pids id="65536" avg-bit-rate="0" inst-bit-rate="0"/>
//!   </gige-output-mux>
//! </event>
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use xmltree::Element;

use crate::envelope::ResponseBody;
use crate::subscription::{SubscriptionTarget, BIT_RATE_EVENT, BOARD, FARMER, LINE, MUX, PROGRAM};
use crate::{ApiError, Result};

/// Event type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    BitRate,
    AlarmAdded,
    AlarmCleared,
    AlarmDeleted,
    Heartbeat,
    Other(String),
}

impl EventType {
    pub fn parse(tag: &str) -> Self {
        match tag {
            BIT_RATE_EVENT => EventType::BitRate,
            "alarm-added-event" => EventType::AlarmAdded,
            "alarm-cleared-event" => EventType::AlarmCleared,
            "alarm-deleted-event" => EventType::AlarmDeleted,
            "heartbeat-event" => EventType::Heartbeat,
            other => EventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::BitRate => BIT_RATE_EVENT,
            EventType::AlarmAdded => "alarm-added-event",
            EventType::AlarmCleared => "alarm-cleared-event",
            EventType::AlarmDeleted => "alarm-deleted-event",
            EventType::Heartbeat => "heartbeat-event",
            EventType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One level of bit-rate measurements (mux, program, stream, passed-pids, ...)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BitRateSample {
    /// Element name, e.g. `gige-output-mux` or `stream`
    pub level: String,
    pub id: String,
    pub avg_bit_rate: Option<u64>,
    pub inst_bit_rate: Option<u64>,
    pub overhead: Option<u64>,
    pub std_dev: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BitRateSample>,
}

impl BitRateSample {
    fn from_element(element: &Element) -> Result<Self> {
        let children = element
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .map(BitRateSample::from_element)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            level: element.name.clone(),
            id: element.attributes.get("id").cloned().unwrap_or_default(),
            avg_bit_rate: parse_number(element, "avg-bit-rate")?,
            inst_bit_rate: parse_number(element, "inst-bit-rate")?,
            overhead: parse_number(element, "overhead")?,
            std_dev: parse_number(element, "std-dev")?,
            children,
        })
    }

    /// Depth-first search for a sample by level and id
    pub fn find(&self, level: &str, id: &str) -> Option<&BitRateSample> {
        if self.level == level && self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(level, id))
    }

    /// Every `stream` sample below this one
    pub fn streams(&self) -> Vec<&BitRateSample> {
        let mut out = Vec::new();
        self.collect_level("stream", &mut out);
        out
    }

    fn collect_level<'a>(&'a self, level: &str, out: &mut Vec<&'a BitRateSample>) {
        for child in &self.children {
            if child.level == level {
                out.push(child);
            }
            child.collect_level(level, out);
        }
    }
}

fn parse_number<T: std::str::FromStr>(element: &Element, key: &str) -> Result<Option<T>> {
    match element.attributes.get(key) {
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ApiError::MalformedResponse(format!(
                "Invalid {} value '{}' on <{}>",
                key, value, element.name
            ))
        }),
        None => Ok(None),
    }
}

/// Hardware path carried by an event
///
/// Bit-rate events repeat their subscription path down to a line, mux, or
/// program. Device-wide events such as alarms may stop at the farmer, so every
/// level is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventPath {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
}

impl EventPath {
    pub fn from_element(path: &Element) -> Self {
        let id_of = |name: &str| {
            path.get_child(name)
                .and_then(|child| child.attributes.get("id"))
                .cloned()
        };

        Self {
            farmer_id: id_of(FARMER),
            board_id: id_of(BOARD),
            line_id: id_of(LINE),
            mux_id: id_of(MUX),
            program_id: id_of(PROGRAM),
        }
    }

    /// The subscription target this path names, if it reaches a line
    pub fn target(&self) -> Option<SubscriptionTarget> {
        Some(SubscriptionTarget {
            farmer_id: self.farmer_id.clone()?,
            board_id: self.board_id.clone()?,
            line_id: self.line_id.clone()?,
            mux_id: self.mux_id.clone(),
            program_id: self.program_id.clone(),
        })
    }

    fn levels(&self) -> impl Iterator<Item = &str> {
        [
            &self.farmer_id,
            &self.board_id,
            &self.line_id,
            &self.mux_id,
            &self.program_id,
        ]
        .into_iter()
        .filter_map(|id| id.as_deref())
    }
}

impl From<&SubscriptionTarget> for EventPath {
    fn from(target: &SubscriptionTarget) -> Self {
        Self {
            farmer_id: Some(target.farmer_id.clone()),
            board_id: Some(target.board_id.clone()),
            line_id: Some(target.line_id.clone()),
            mux_id: target.mux_id.clone(),
            program_id: target.program_id.clone(),
        }
    }
}

impl fmt::Display for EventPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.levels().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(id)?;
        }
        Ok(())
    }
}

/// A single device event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEvent {
    pub event_type: EventType,
    pub id: Option<String>,
    pub time: Option<String>,
    /// Every attribute on the `<event>` element, including the ones above
    pub attributes: BTreeMap<String, String>,
    /// Hardware path, when the event carries one
    pub path: Option<EventPath>,
    /// Measurements nested by hardware level
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<BitRateSample>,
}

impl DeviceEvent {
    pub fn from_element(element: &Element) -> Result<Self> {
        let event_type = element
            .attributes
            .get("type")
            .map(|tag| EventType::parse(tag))
            .ok_or_else(|| ApiError::MalformedResponse("Event is missing its type attribute".to_string()))?;

        let mut path = None;
        let mut samples = Vec::new();
        for child in element.children.iter().filter_map(|node| node.as_element()) {
            if child.name == "path" {
                path = Some(EventPath::from_element(child));
            } else {
                samples.push(BitRateSample::from_element(child)?);
            }
        }

        Ok(Self {
            event_type,
            id: element.attributes.get("id").cloned(),
            time: element.attributes.get("time").cloned(),
            attributes: element
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            path,
            samples,
        })
    }

    pub fn is_bit_rate(&self) -> bool {
        self.event_type == EventType::BitRate
    }
}

/// The events returned by one poll
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceEventEnvelope {
    /// Events still buffered on the device after this response
    pub pending_events: u32,
    pub events: Vec<DeviceEvent>,
}

impl DeviceEventEnvelope {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn bit_rate_events(&self) -> impl Iterator<Item = &DeviceEvent> {
        self.events.iter().filter(|event| event.is_bit_rate())
    }
}

impl ResponseBody for DeviceEventEnvelope {
    fn from_response(root: &Element) -> Result<Self> {
        let pending_events = parse_number::<u32>(root, "pending-events")?.unwrap_or(0);

        let events = match root.get_child("event-list") {
            Some(list) => list
                .children
                .iter()
                .filter_map(|node| node.as_element())
                .filter(|element| element.name == "event")
                .map(DeviceEvent::from_element)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self { pending_events, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIT_RATE_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?><response id="beacham" origin="device" destination="transcoder-collector" command="get" category="event" time="2017-09-19T22:15:45.286Z" protocol-version="2.1" platform-name="neo" sw-version="me7k.2.1.2" sw-build="0" pending-events="0"><event-list><event type="bit-rate-event" id="1505838270680" time="2017-09-19T22:15:44.879Z">
<path>
  <farmer id="ME-7000-1"/>
  <board id="4"/>
  <gige-line id="4/3"/>
  <gige-output-mux id="0000"/>
</path>
<gige-output-mux id="0000" avg-bit-rate="1200" inst-bit-rate="1350" overhead="12">
  <output-program id="1" avg-bit-rate="1100" inst-bit-rate="1250">
    <stream id="32" avg-bit-rate="900" inst-bit-rate="1000" std-dev="3"/>
    <stream id="33" avg-bit-rate="128" inst-bit-rate="128" std-dev="0"/>
    <stream id="34" avg-bit-rate="72" inst-bit-rate="122" std-dev="1.5"/>
  </output-program>
  <passed-pids id="65536" avg-bit-rate="0" inst-bit-rate="0"/>
</gige-output-mux>
</event></event-list></response>"#;

    fn parse(xml: &str) -> Result<DeviceEventEnvelope> {
        let root = Element::parse(xml.as_bytes()).unwrap();
        DeviceEventEnvelope::from_response(&root)
    }

    #[test]
    fn test_parse_bit_rate_event() {
        let envelope = parse(BIT_RATE_RESPONSE).unwrap();

        assert_eq!(envelope.len(), 1);
        assert_eq!(envelope.pending_events, 0);

        let event = &envelope.events[0];
        assert!(event.is_bit_rate());
        assert_eq!(event.id.as_deref(), Some("1505838270680"));
        assert_eq!(event.time.as_deref(), Some("2017-09-19T22:15:44.879Z"));
        let path = event.path.as_ref().unwrap();
        assert_eq!(
            path.target(),
            Some(SubscriptionTarget::mux("ME-7000-1", "4", "4/3", "0000"))
        );
        assert_eq!(path.to_string(), "ME-7000-1/4/4/3/0000");

        assert_eq!(event.samples.len(), 1);
        let mux = &event.samples[0];
        assert_eq!(mux.level, "gige-output-mux");
        assert_eq!(mux.avg_bit_rate, Some(1200));
        assert_eq!(mux.inst_bit_rate, Some(1350));
        assert_eq!(mux.overhead, Some(12));

        let streams = mux.streams();
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[2].std_dev, Some(1.5));

        let passed = mux.find("passed-pids", "65536").unwrap();
        assert_eq!(passed.inst_bit_rate, Some(0));
    }

    #[test]
    fn test_parse_empty_poll() {
        let envelope = parse(r#"<response id="G1111" command="get" category="event" pending-events="0"/>"#).unwrap();
        assert!(envelope.is_empty());
        assert_eq!(envelope.pending_events, 0);
    }

    #[test]
    fn test_parse_alarm_events() {
        let xml = r#"<response id="G1111" pending-events="3"><event-list><event type="alarm-deleted-event" id="1435265291353"/><event type="alarm-cleared-event" id="1435316297245" cleared-time="2015-06-26T16:38:02.513Z"/><event type="license-event" id="7"/></event-list></response>"#;
        let envelope = parse(xml).unwrap();

        assert_eq!(envelope.pending_events, 3);
        assert_eq!(envelope.len(), 3);
        assert_eq!(envelope.events[0].event_type, EventType::AlarmDeleted);
        assert_eq!(
            envelope.events[1].attributes.get("cleared-time").map(String::as_str),
            Some("2015-06-26T16:38:02.513Z")
        );
        assert_eq!(envelope.events[2].event_type, EventType::Other("license-event".to_string()));
        assert_eq!(envelope.bit_rate_events().count(), 0);
    }

    #[test]
    fn test_farmer_only_path_keeps_sibling_events() {
        let xml = r#"<response id="G1002" pending-events="0"><event-list><event type="bit-rate-event" id="1"><path><farmer id="ME-7000-2"/><board id="4"/><gige-line id="4/3"/><gige-output-mux id="0000"/></path><gige-output-mux id="0000" avg-bit-rate="1200" inst-bit-rate="1350"/></event><event type="alarm-added-event" id="2"><path><farmer id="ME-7000-2"/></path></event></event-list></response>"#;
        let envelope = parse(xml).unwrap();

        assert_eq!(envelope.len(), 2);
        assert_eq!(envelope.bit_rate_events().count(), 1);
        assert_eq!(envelope.events[0].samples[0].inst_bit_rate, Some(1350));

        let alarm = &envelope.events[1];
        assert_eq!(alarm.event_type, EventType::AlarmAdded);
        let path = alarm.path.as_ref().unwrap();
        assert_eq!(path.farmer_id.as_deref(), Some("ME-7000-2"));
        assert_eq!(path.board_id, None);
        assert_eq!(path.target(), None);
        assert_eq!(path.to_string(), "ME-7000-2");
    }

    #[test]
    fn test_path_missing_board_names_no_target() {
        let element = Element::parse(r#"<path><farmer id="ME-7000-1"/><gige-line id="4/3"/></path>"#.as_bytes()).unwrap();
        let path = EventPath::from_element(&element);

        assert_eq!(path.line_id.as_deref(), Some("4/3"));
        assert_eq!(path.target(), None);
    }

    #[test]
    fn test_event_without_type_is_malformed() {
        let xml = r#"<response id="G1"><event-list><event id="1"/></event-list></response>"#;
        assert!(matches!(parse(xml), Err(ApiError::MalformedResponse(_))));
    }

    #[test]
    fn test_non_numeric_bit_rate_is_malformed() {
        let xml = r#"<response id="G1"><event-list><event type="bit-rate-event"><gige-output-mux id="0" avg-bit-rate="fast"/></event></event-list></response>"#;
        assert!(matches!(parse(xml), Err(ApiError::MalformedResponse(_))));
    }

    #[test]
    fn test_event_serializes_type_as_tag() {
        let envelope = parse(BIT_RATE_RESPONSE).unwrap();
        let json = serde_json::to_value(&envelope.events[0]).unwrap();
        assert_eq!(json["event_type"], "bit-rate-event");
        assert_eq!(json["samples"][0]["children"][0]["level"], "output-program");
    }
}
