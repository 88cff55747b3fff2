//! XML codec for the neo wire dialect
//!
//! Requests are built as [`XmlElement`] trees and rendered with `quick-xml`.
//! The controller's parser only accepts the self-closing form for childless
//! path and event elements (`<farmer id="X"/>`), so the renderer decides per
//! element whether to emit `<x/>` or `<x></x>` from [`CodecConfig`].
//!
//! Responses are parsed with `xmltree` and handed to the typed
//! [`ResponseBody`](crate::envelope::ResponseBody) implementations.

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use xmltree::Element;

use crate::envelope::{Reason, RequestBody, RequestEnvelope, ResponseBody, ResponseEnvelope, ResponseHeader};
use crate::{ApiError, Result};

/// How an element without children or text is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyElementStyle {
    /// `<farmer id="X"/>`
    SelfClosing,
    /// `<farmer id="X"></farmer>`
    ExplicitClose,
}

/// Rendering rules for [`XmlCodec`]
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Style used for childless elements unless overridden
    /// Default: SelfClosing
    pub empty_elements: EmptyElementStyle,

    /// Per-element-name overrides of `empty_elements`
    pub overrides: HashMap<String, EmptyElementStyle>,

    /// Prefix requests with `<?xml version="1.0" encoding="UTF-8"?>`
    /// Default: false
    pub xml_declaration: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            empty_elements: EmptyElementStyle::SelfClosing,
            overrides: HashMap::new(),
            xml_declaration: false,
        }
    }
}

impl CodecConfig {
    pub fn with_empty_elements(mut self, style: EmptyElementStyle) -> Self {
        self.empty_elements = style;
        self
    }

    pub fn with_override(mut self, element: impl Into<String>, style: EmptyElementStyle) -> Self {
        self.overrides.insert(element.into(), style);
        self
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    /// The style that applies to an element called `name`
    pub fn style_for(&self, name: &str) -> EmptyElementStyle {
        self.overrides
            .get(name)
            .copied()
            .unwrap_or(self.empty_elements)
    }
}

/// A request element tree, attributes kept in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: Option<String>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set an attribute, replacing an existing value with the same key
    pub fn push_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// No child elements and no text
    pub fn is_childless(&self) -> bool {
        self.children.is_empty() && self.text.as_deref().map_or(true, str::is_empty)
    }
}

/// Encoder/decoder for neo request and response envelopes
#[derive(Debug, Clone, Default)]
pub struct XmlCodec {
    config: CodecConfig,
}

impl XmlCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Serialize a request envelope to wire XML
    pub fn encode<B: RequestBody>(&self, envelope: &RequestEnvelope<B>) -> Result<String> {
        self.render(&envelope.to_element())
    }

    /// Encode a request with secrets masked, for logging
    pub fn encode_redacted<B: RequestBody>(&self, envelope: &RequestEnvelope<B>) -> Result<String> {
        self.render(&envelope.to_redacted_element())
    }

    /// Render an element tree to XML text
    pub fn render(&self, element: &XmlElement) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        if self.config.xml_declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(|e| ApiError::Codec(e.to_string()))?;
        }

        self.write_element(&mut writer, element)?;

        String::from_utf8(writer.into_inner()).map_err(|e| ApiError::Codec(e.to_string()))
    }

    fn write_element(&self, writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
        let mut start = BytesStart::new(element.name.as_str());
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if element.is_childless() && self.config.style_for(&element.name) == EmptyElementStyle::SelfClosing {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| ApiError::Codec(e.to_string()));
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| ApiError::Codec(e.to_string()))?;

        if let Some(text) = element.text.as_deref() {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| ApiError::Codec(e.to_string()))?;
        }

        for child in &element.children {
            self.write_element(writer, child)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(element.name.as_str())))
            .map_err(|e| ApiError::Codec(e.to_string()))
    }

    /// Parse a response document into a typed envelope
    pub fn decode<B: ResponseBody>(&self, xml: &str) -> Result<ResponseEnvelope<B>> {
        let root = Element::parse(xml.as_bytes())
            .map_err(|e| ApiError::MalformedResponse(format!("Invalid XML: {}", e)))?;

        if root.name != "response" {
            return Err(ApiError::MalformedResponse(format!(
                "Expected <response> root element, found <{}>",
                root.name
            )));
        }

        let header = ResponseHeader::from_element(&root)?;
        let reason = root.get_child("reason").map(Reason::from_element);
        let body = B::from_response(&root)?;

        Ok(ResponseEnvelope { header, reason, body })
    }
}
