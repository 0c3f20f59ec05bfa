// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! iCalendar text handling.
//!
//! Calendar object bodies are parsed with the `icalendar` crate's parser and
//! held as an owned component tree. [`CalendarData`] keeps the text and the
//! tree of one calendar object in sync.

use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::CalDavError;

/// Maximum length of a content line in octets, excluding the line break.
const MAX_LINE_OCTETS: usize = 75;

/// Kind of a calendar object resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// `VEVENT`
    Event,
    /// `VTODO`
    Todo,
    /// `VJOURNAL`
    Journal,
    /// `VFREEBUSY`
    FreeBusy,
}

impl ComponentKind {
    /// All kinds, in the order a calendar object is probed for them.
    pub const ALL: [Self; 4] = [Self::Event, Self::Todo, Self::Journal, Self::FreeBusy];

    /// Returns the component name, e.g. `VEVENT`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
        }
    }

    /// Looks a kind up by component name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content line: `NAME;PARAM=VALUE:value`.
///
/// The value is kept exactly as it appeared in the text, escapes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Parameters in document order; a parameter may lack a value.
    pub params: Vec<(String, Option<String>)>,
    /// Raw value.
    pub value: String,
}

impl Property {
    /// Creates a property without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    /// Returns the value of a parameter, ignoring ASCII case of the key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_deref())
    }

    fn from_parsed(prop: &icalendar::parser::Property<'_>) -> Self {
        Self {
            name: prop.name.to_string(),
            params: prop
                .params
                .iter()
                .map(|p| (p.key.to_string(), p.val.as_ref().map(ToString::to_string)))
                .collect(),
            value: prop.val.to_string(),
        }
    }

    fn write_to(&self, out: &mut String) {
        let mut line = self.name.clone();
        for (key, value) in &self.params {
            line.push(';');
            line.push_str(key);
            if let Some(value) = value {
                line.push('=');
                let needs_quotes = !value.starts_with('"') && value.contains([':', ';', ',']);
                if needs_quotes {
                    let _ = write!(line, "\"{value}\"");
                } else {
                    line.push_str(value);
                }
            }
        }
        line.push(':');
        line.push_str(&self.value);
        push_folded(out, &line);
    }
}

/// A `BEGIN:X` … `END:X` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Component name, e.g. `VEVENT`.
    pub name: String,
    /// Properties in document order.
    pub properties: Vec<Property>,
    /// Nested components, e.g. `VALARM`.
    pub components: Vec<Component>,
}

impl Component {
    /// Creates an empty component.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Returns the first property with the given name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns the raw value of the first property with the given name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.property(name).map(|p| p.value.as_str())
    }

    /// Replaces the first property with the given name, or appends it.
    ///
    /// A replaced property loses its parameters.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .properties
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(prop) => {
                prop.params.clear();
                prop.value = value;
            }
            None => self.properties.push(Property::new(name, value)),
        }
    }

    /// Removes every property with the given name.
    pub fn remove(&mut self, name: &str) {
        self.properties.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    fn from_parsed(comp: &icalendar::parser::Component<'_>) -> Self {
        Self {
            name: comp.name.to_string(),
            properties: comp.properties.iter().map(Property::from_parsed).collect(),
            components: comp.components.iter().map(Self::from_parsed).collect(),
        }
    }

    fn write_to(&self, out: &mut String) {
        push_folded(out, &format!("BEGIN:{}", self.name));
        for prop in &self.properties {
            prop.write_to(out);
        }
        for comp in &self.components {
            comp.write_to(out);
        }
        push_folded(out, &format!("END:{}", self.name));
    }
}

/// A parsed `VCALENDAR` document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VCalendar {
    /// Calendar-level properties such as `VERSION` and `PRODID`.
    pub properties: Vec<Property>,
    /// Top-level components.
    pub components: Vec<Component>,
}

impl VCalendar {
    /// Returns the first component of the first kind present, probing
    /// events, todos, journals and free/busy in that order.
    #[must_use]
    pub fn primary(&self) -> Option<&Component> {
        let kind = self.kind()?;
        self.components
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(kind.as_str()))
    }

    /// Mutable variant of [`VCalendar::primary`].
    pub fn primary_mut(&mut self) -> Option<&mut Component> {
        let kind = self.kind()?;
        self.components
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(kind.as_str()))
    }

    /// Returns the kind of the primary component.
    #[must_use]
    pub fn kind(&self) -> Option<ComponentKind> {
        ComponentKind::ALL.into_iter().find(|kind| {
            self.components
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(kind.as_str()))
        })
    }

    /// Returns all components of a kind, in document order.
    pub fn components_of(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(move |c| c.name.eq_ignore_ascii_case(kind.as_str()))
    }
}

impl FromStr for VCalendar {
    type Err = CalDavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unfolded = icalendar::parser::unfold(s);
        let parsed = icalendar::parser::read_calendar(&unfolded)
            .map_err(|e| CalDavError::Ical(e.to_string()))?;
        Ok(Self {
            properties: parsed.properties.iter().map(Property::from_parsed).collect(),
            components: parsed.components.iter().map(Component::from_parsed).collect(),
        })
    }
}

impl fmt::Display for VCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        push_folded(&mut out, "BEGIN:VCALENDAR");
        for prop in &self.properties {
            prop.write_to(&mut out);
        }
        for comp in &self.components {
            comp.write_to(&mut out);
        }
        push_folded(&mut out, "END:VCALENDAR");
        f.write_str(&out)
    }
}

/// Text and parsed form of one calendar object.
///
/// Both forms are derived from each other whenever one is replaced, so they
/// never diverge. The [`ComponentKind`] is determined once per parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarData {
    raw: String,
    parsed: VCalendar,
    kind: Option<ComponentKind>,
}

impl CalendarData {
    /// Builds the data from text, normalizing it with [`fix`] first.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Ical`] if the text cannot be parsed.
    pub fn from_raw(raw: &str) -> Result<Self, CalDavError> {
        let raw = fix(raw);
        let parsed: VCalendar = raw.parse()?;
        let kind = parsed.kind();
        Ok(Self { raw, parsed, kind })
    }

    /// Builds the data from a component tree, serializing it.
    #[must_use]
    pub fn from_parsed(parsed: VCalendar) -> Self {
        let raw = parsed.to_string();
        let kind = parsed.kind();
        Self { raw, parsed, kind }
    }

    /// Returns the text form.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed form.
    #[must_use]
    pub const fn parsed(&self) -> &VCalendar {
        &self.parsed
    }

    /// Returns the kind of the primary component.
    #[must_use]
    pub const fn kind(&self) -> Option<ComponentKind> {
        self.kind
    }

    /// Returns the UID of the primary component.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.parsed.primary().and_then(|c| c.value("UID"))
    }

    /// Edits the parsed form in place; the text form is re-serialized.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut VCalendar) -> R) -> R {
        let out = f(&mut self.parsed);
        self.raw = self.parsed.to_string();
        self.kind = self.parsed.kind();
        out
    }

    /// Writes `uid` into the primary component, adding the property if absent.
    ///
    /// Returns `false` if there is no primary component to carry it.
    pub fn set_uid(&mut self, uid: &str) -> bool {
        self.edit(|cal| match cal.primary_mut() {
            Some(comp) => {
                comp.set_value("UID", uid);
                true
            }
            None => false,
        })
    }

    /// Consumes the data, returning the text form.
    #[must_use]
    pub fn into_raw(self) -> String {
        self.raw
    }
}

impl FromStr for CalendarData {
    type Err = CalDavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_raw(s)
    }
}

/// Normalizes calendar text received from a server.
///
/// Line endings become CRLF, blank or whitespace-only lines are dropped, a
/// date-only `COMPLETED` value gets a noon UTC time, and the text ends with a
/// line break. Applying it twice gives the same result as applying it once.
#[must_use]
pub fn fix(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    for line in raw.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(line);
        if is_date_only_completed(line) {
            out.push_str("T120000Z");
        }
        out.push_str("\r\n");
    }
    out
}

fn is_date_only_completed(line: &str) -> bool {
    line.strip_prefix("COMPLETED:")
        .is_some_and(|v| v.len() == 8 && v.bytes().all(|b| b.is_ascii_digit()))
}

/// Checks the unfolded `UID:` line of calendar text against `uid`.
///
/// Servers may answer a UID text-match with substring hits, so this is the
/// authoritative comparison.
#[must_use]
pub fn uid_matches(raw: &str, uid: &str) -> bool {
    const RE: &str = r"\nUID:((?:.|\n[ \t])*)\n";
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let re = REGEX.get_or_init(|| Regex::new(RE).unwrap());

    let text = raw.replace("\r\n", "\n");
    re.captures(&text)
        .and_then(|c| c.get(1))
        .is_some_and(|m| unfold_value(m.as_str()) == uid)
}

fn unfold_value(value: &str) -> String {
    value.replace("\n ", "").replace("\n\t", "")
}

fn push_folded(out: &mut String, line: &str) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}
