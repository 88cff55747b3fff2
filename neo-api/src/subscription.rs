//! Bit-rate subscription target and request flags
//!
//! Most device events are subscribed device-wide, but bit-rate events must be
//! directed at a line, a mux, or a program. The target is expressed as a
//! hardware path:
//!
//! ```xml
//! <path>
//!   <farmer id="ME-7000-2"/>
//!   <board id="4"/>
//!   <gige-line id="4/3"/>
//!   <gige-output-mux id="0000"/>
//! </path>
//! ```

use std::fmt;

use serde::Serialize;

use crate::codec::XmlElement;
use crate::{ApiError, Result};

/// Event type tag for bit-rate telemetry
pub const BIT_RATE_EVENT: &str = "bit-rate-event";

pub(crate) const FARMER: &str = "farmer";
pub(crate) const BOARD: &str = "board";
pub(crate) const LINE: &str = "gige-line";
pub(crate) const MUX: &str = "gige-output-mux";
pub(crate) const PROGRAM: &str = "output-program";

/// Hierarchical path to the hardware element a subscription applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionTarget {
    pub farmer_id: String,
    pub board_id: String,
    pub line_id: String,
    /// Absent for line-level targets
    pub mux_id: Option<String>,
    /// Present for program-level targets; requires a mux
    pub program_id: Option<String>,
}

impl SubscriptionTarget {
    /// A mux-level target
    pub fn mux(
        farmer_id: impl Into<String>,
        board_id: impl Into<String>,
        line_id: impl Into<String>,
        mux_id: impl Into<String>,
    ) -> Self {
        Self {
            farmer_id: farmer_id.into(),
            board_id: board_id.into(),
            line_id: line_id.into(),
            mux_id: Some(mux_id.into()),
            program_id: None,
        }
    }

    /// A line-level target
    pub fn line(
        farmer_id: impl Into<String>,
        board_id: impl Into<String>,
        line_id: impl Into<String>,
    ) -> Self {
        Self {
            farmer_id: farmer_id.into(),
            board_id: board_id.into(),
            line_id: line_id.into(),
            mux_id: None,
            program_id: None,
        }
    }

    /// Narrow a mux-level target to one output program
    pub fn with_program(mut self, program_id: impl Into<String>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }

    /// Name of the deepest level in the path
    pub fn level(&self) -> &'static str {
        if self.program_id.is_some() {
            PROGRAM
        } else if self.mux_id.is_some() {
            MUX
        } else {
            LINE
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            (FARMER, self.farmer_id.as_str()),
            (BOARD, self.board_id.as_str()),
            (LINE, self.line_id.as_str()),
        ];
        for (level, id) in required {
            if id.trim().is_empty() {
                return Err(ApiError::InvalidParameter(format!("{} id must not be empty", level)));
            }
        }

        if self.mux_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ApiError::InvalidParameter(format!("{} id must not be empty", MUX)));
        }

        match (&self.mux_id, &self.program_id) {
            (None, Some(_)) => Err(ApiError::InvalidParameter(
                "A program-level target requires a mux".to_string(),
            )),
            (_, Some(program)) if program.trim().is_empty() => Err(ApiError::InvalidParameter(
                format!("{} id must not be empty", PROGRAM),
            )),
            _ => Ok(()),
        }
    }

    /// Render as a `<path>` element
    pub fn to_path_element(&self) -> XmlElement {
        let level = |name: &str, id: &str| XmlElement::new(name).with_attr("id", id);

        let mut path = XmlElement::new("path")
            .with_child(level(FARMER, &self.farmer_id))
            .with_child(level(BOARD, &self.board_id))
            .with_child(level(LINE, &self.line_id));

        if let Some(mux) = &self.mux_id {
            path = path.with_child(level(MUX, mux));
        }
        if let Some(program) = &self.program_id {
            path = path.with_child(level(PROGRAM, program));
        }

        path
    }
}

impl fmt::Display for SubscriptionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.farmer_id, self.board_id, self.line_id)?;
        if let Some(mux) = &self.mux_id {
            write!(f, "/{}", mux)?;
        }
        if let Some(program) = &self.program_id {
            write!(f, "/{}", program)?;
        }
        Ok(())
    }
}

/// A bit-rate subscription: where, and which metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequestSpec {
    pub target: SubscriptionTarget,
    pub want_streams: bool,
    pub want_std_dev: bool,
    pub want_inst_bitrate: bool,
    pub want_avg_bitrate: bool,
    /// Only sent when set
    pub want_video_info: Option<bool>,
    /// Only sent when set
    pub want_audio_info: Option<bool>,
}

impl SubscriptionRequestSpec {
    /// Subscribe to every bit-rate metric at `target`
    pub fn new(target: SubscriptionTarget) -> Self {
        Self {
            target,
            want_streams: true,
            want_std_dev: true,
            want_inst_bitrate: true,
            want_avg_bitrate: true,
            want_video_info: None,
            want_audio_info: None,
        }
    }

    pub fn with_streams(mut self, enabled: bool) -> Self {
        self.want_streams = enabled;
        self
    }

    pub fn with_std_dev(mut self, enabled: bool) -> Self {
        self.want_std_dev = enabled;
        self
    }

    pub fn with_inst_bitrate(mut self, enabled: bool) -> Self {
        self.want_inst_bitrate = enabled;
        self
    }

    pub fn with_avg_bitrate(mut self, enabled: bool) -> Self {
        self.want_avg_bitrate = enabled;
        self
    }

    pub fn with_video_info(mut self, enabled: bool) -> Self {
        self.want_video_info = Some(enabled);
        self
    }

    pub fn with_audio_info(mut self, enabled: bool) -> Self {
        self.want_audio_info = Some(enabled);
        self
    }

    /// `<event-list><event type="bit-rate-event" get-streams=... /></event-list>`
    pub fn to_event_list_element(&self) -> XmlElement {
        let flag = |value: bool| if value { "true" } else { "false" };

        let mut event = XmlElement::new("event")
            .with_attr("type", BIT_RATE_EVENT)
            .with_attr("get-streams", flag(self.want_streams))
            .with_attr("get-std-dev", flag(self.want_std_dev))
            .with_attr("get-inst-br", flag(self.want_inst_bitrate))
            .with_attr("get-avg-br", flag(self.want_avg_bitrate));

        if let Some(video) = self.want_video_info {
            event.push_attr("get-video-info", flag(video));
        }
        if let Some(audio) = self.want_audio_info {
            event.push_attr("get-audio-info", flag(audio));
        }

        XmlElement::new("event-list").with_child(event)
    }
}

/// `<event-list><event type="bit-rate-event"/></event-list>`, as sent on removal
pub fn removal_event_list_element() -> XmlElement {
    XmlElement::new("event-list").with_child(XmlElement::new("event").with_attr("type", BIT_RATE_EVENT))
}
