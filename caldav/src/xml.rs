// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV processing.
//!
//! Request bodies are described as a small element tree and serialized in one
//! pass. Elements are written with a `D:` or `C:` prefix; both namespaces are
//! declared on the root element.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::CalDavError;

/// XML namespaces used in `CalDAV`.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";
}

/// Qualified element names in Clark notation (`{namespace}local`).
///
/// Property maps are keyed by these.
pub mod tag {
    /// `DAV:response`
    pub const RESPONSE: &str = "{DAV:}response";
    /// `DAV:href`
    pub const HREF: &str = "{DAV:}href";
    /// `DAV:status`
    pub const STATUS: &str = "{DAV:}status";
    /// `DAV:resourcetype`
    pub const RESOURCE_TYPE: &str = "{DAV:}resourcetype";
    /// `DAV:displayname`
    pub const DISPLAY_NAME: &str = "{DAV:}displayname";
    /// `DAV:getetag`
    pub const GET_ETAG: &str = "{DAV:}getetag";
    /// `DAV:current-user-principal`
    pub const CURRENT_USER_PRINCIPAL: &str = "{DAV:}current-user-principal";
    /// `DAV:collection`
    pub const COLLECTION: &str = "{DAV:}collection";
    /// `CALDAV:calendar`
    pub const CALENDAR: &str = "{urn:ietf:params:xml:ns:caldav}calendar";
    /// `CALDAV:calendar-data`
    pub const CALENDAR_DATA: &str = "{urn:ietf:params:xml:ns:caldav}calendar-data";
    /// `CALDAV:calendar-home-set`
    pub const CALENDAR_HOME_SET: &str = "{urn:ietf:params:xml:ns:caldav}calendar-home-set";
    /// `CALDAV:calendar-description`
    pub const CALENDAR_DESCRIPTION: &str = "{urn:ietf:params:xml:ns:caldav}calendar-description";
    /// `CALDAV:supported-calendar-component-set`
    pub const SUPPORTED_CALENDAR_COMPONENT_SET: &str =
        "{urn:ietf:params:xml:ns:caldav}supported-calendar-component-set";
}

/// Namespace of a prefix used by the builder.
fn prefix_namespace(prefix: &str) -> Option<&'static str> {
    match prefix {
        "D" => Some(ns::DAV),
        "C" => Some(ns::CALDAV),
        _ => None,
    }
}

/// Converts a prefixed builder name (`C:calendar-data`) to Clark notation.
#[must_use]
pub fn clark(prefixed: &str) -> String {
    match prefixed.split_once(':') {
        Some((prefix, local)) => match prefix_namespace(prefix) {
            Some(ns) => format!("{{{ns}}}{local}"),
            None => prefixed.to_string(),
        },
        None => prefixed.to_string(),
    }
}

/// An element of a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Creates an empty element, e.g. `XmlElement::new("D:prop")`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Sets the text content.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several child elements.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Returns the prefixed element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the element name in Clark notation.
    #[must_use]
    pub fn tag(&self) -> String {
        clark(&self.name)
    }

    /// Serializes the element as a complete UTF-8 document with XML declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if XML writing fails.
    pub fn to_document(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write(&mut writer, true)?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| CalDavError::Xml(format!("UTF-8 error: {e}")))
    }

    fn write(&self, writer: &mut Writer<Cursor<Vec<u8>>>, root: bool) -> Result<(), CalDavError> {
        let mut start = BytesStart::new(self.name.as_str());
        if root {
            start.push_attribute(("xmlns:D", ns::DAV));
            start.push_attribute(("xmlns:C", ns::CALDAV));
        }
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write(writer, false)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}
