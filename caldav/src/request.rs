// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for `CalDAV` operations.
//!
//! Each builder produces an [`XmlElement`] tree; [`XmlElement::to_document`]
//! turns it into the request body.

use crate::error::CalDavError;
use crate::ical::ComponentKind;
use crate::xml::XmlElement;

/// Properties to request in PROPFIND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// Display name.
    DisplayName,
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Current user principal.
    CurrentUserPrincipal,
    /// Calendar data.
    CalendarData,
    /// Calendar home set.
    CalendarHomeSet,
    /// Supported calendar components.
    SupportedCalendarComponents,
    /// Calendar description.
    CalendarDescription,
    /// Calendar timezone.
    CalendarTimezone,
}

impl Prop {
    /// Returns the prefixed element name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DisplayName => "D:displayname",
            Self::ResourceType => "D:resourcetype",
            Self::GetETag => "D:getetag",
            Self::CurrentUserPrincipal => "D:current-user-principal",
            Self::CalendarData => "C:calendar-data",
            Self::CalendarHomeSet => "C:calendar-home-set",
            Self::SupportedCalendarComponents => "C:supported-calendar-component-set",
            Self::CalendarDescription => "C:calendar-description",
            Self::CalendarTimezone => "C:calendar-timezone",
        }
    }

    /// Returns the qualified tag in Clark notation.
    #[must_use]
    pub fn tag(self) -> String {
        crate::xml::clark(self.name())
    }

    /// Returns an empty element naming this property.
    #[must_use]
    pub fn element(self) -> XmlElement {
        XmlElement::new(self.name())
    }
}

/// PROPFIND request builder.
#[derive(Debug, Default)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Returns the element tree; `None` when no property was added, in which
    /// case the request is sent without a body (an implicit `allprop`).
    #[must_use]
    pub fn element(&self) -> Option<XmlElement> {
        if self.props.is_empty() {
            return None;
        }
        let prop = XmlElement::new("D:prop").children(self.props.iter().map(|p| p.element()));
        Some(XmlElement::new("D:propfind").child(prop))
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        self.element()
            .map_or_else(|| Ok(String::new()), |root| root.to_document())
    }
}

/// PROPPATCH request builder; only `set` updates are supported.
#[derive(Debug, Default)]
pub struct PropPatchRequest {
    set: Vec<XmlElement>,
}

impl PropPatchRequest {
    /// Creates a new PROPPATCH request.
    #[must_use]
    pub fn new() -> Self {
        Self { set: Vec::new() }
    }

    /// Adds a property value, e.g. `XmlElement::new("D:displayname").text("Work")`.
    #[must_use]
    pub fn set(mut self, property: XmlElement) -> Self {
        self.set.push(property);
        self
    }

    /// Returns the element tree.
    #[must_use]
    pub fn element(&self) -> XmlElement {
        let prop = XmlElement::new("D:prop").children(self.set.iter().cloned());
        XmlElement::new("D:propertyupdate").child(XmlElement::new("D:set").child(prop))
    }
}

/// MKCALENDAR request builder.
#[derive(Debug, Default)]
pub struct MkCalendarRequest {
    display_name: Option<String>,
    components: Vec<ComponentKind>,
}

impl MkCalendarRequest {
    /// Creates a new MKCALENDAR request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[must_use]
    pub fn display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    /// Restricts the component types the calendar accepts.
    #[must_use]
    pub fn supported_components(mut self, components: &[ComponentKind]) -> Self {
        self.components = components.to_vec();
        self
    }

    /// Returns the element tree.
    #[must_use]
    pub fn element(&self) -> XmlElement {
        let mut prop = XmlElement::new("D:prop");
        if let Some(name) = &self.display_name {
            prop = prop.child(XmlElement::new("D:displayname").text(name.clone()));
        }
        if !self.components.is_empty() {
            let set = XmlElement::new("C:supported-calendar-component-set").children(
                self.components
                    .iter()
                    .map(|c| XmlElement::new("C:comp").attr("name", c.as_str())),
            );
            prop = prop.child(set);
        }
        XmlElement::new("C:mkcalendar").child(XmlElement::new("D:set").child(prop))
    }
}

/// Time range filter for calendar queries, as `YYYYMMDDTHHMMSSZ` stamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    /// Start date/time.
    pub start: String,
    /// End date/time.
    pub end: Option<String>,
}

impl TimeRange {
    fn element(&self, name: &str) -> XmlElement {
        let mut elem = XmlElement::new(name).attr("start", self.start.clone());
        if let Some(end) = &self.end {
            elem = elem.attr("end", end.clone());
        }
        elem
    }
}

/// Text match filter for calendar queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// Text to search for.
    pub text: String,
    /// Collation to use.
    pub collation: Option<String>,
    /// Whether to negate the match.
    pub negate: bool,
}

impl TextMatch {
    /// Creates a positive match with the server's default collation.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            collation: None,
            negate: false,
        }
    }

    /// Inverts the match.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negate = true;
        self
    }

    fn element(&self) -> XmlElement {
        let mut elem = XmlElement::new("C:text-match");
        if let Some(collation) = &self.collation {
            elem = elem.attr("collation", collation.clone());
        }
        if self.negate {
            elem = elem.attr("negate-condition", "yes");
        }
        elem.text(self.text.clone())
    }
}

/// A property filter inside a component filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropFilter {
    name: String,
    test: PropTest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PropTest {
    IsNotDefined,
    TextMatch(TextMatch),
}

impl PropFilter {
    /// Matches components lacking the property.
    #[must_use]
    pub fn is_not_defined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            test: PropTest::IsNotDefined,
        }
    }

    /// Matches components whose property value matches the text.
    #[must_use]
    pub fn text_match(name: impl Into<String>, text_match: TextMatch) -> Self {
        Self {
            name: name.into(),
            test: PropTest::TextMatch(text_match),
        }
    }

    fn element(&self) -> XmlElement {
        let test = match &self.test {
            PropTest::IsNotDefined => XmlElement::new("C:is-not-defined"),
            PropTest::TextMatch(m) => m.element(),
        };
        XmlElement::new("C:prop-filter")
            .attr("name", self.name.clone())
            .child(test)
    }
}

/// Calendar query request builder.
///
/// Filters are nested as `VCALENDAR` → component (if any) → time range and
/// property filters. Without a component the filters apply to `VCALENDAR`.
#[derive(Debug, Default)]
pub struct CalendarQueryRequest {
    component: Option<ComponentKind>,
    time_range: Option<TimeRange>,
    prop_filters: Vec<PropFilter>,
    expand: Option<TimeRange>,
}

impl CalendarQueryRequest {
    /// Creates a new calendar query request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            component: None,
            time_range: None,
            prop_filters: Vec::new(),
            expand: None,
        }
    }

    /// Sets the component filter (VEVENT, VTODO, etc.).
    #[must_use]
    pub const fn component(mut self, component: ComponentKind) -> Self {
        self.component = Some(component);
        self
    }

    /// Sets the time range filter.
    #[must_use]
    pub fn time_range(mut self, start: String, end: Option<String>) -> Self {
        self.time_range = Some(TimeRange { start, end });
        self
    }

    /// Adds a property filter.
    #[must_use]
    pub fn prop_filter(mut self, filter: PropFilter) -> Self {
        self.prop_filters.push(filter);
        self
    }

    /// Asks the server to expand recurrences over the given closed range.
    #[must_use]
    pub fn expand(mut self, start: String, end: String) -> Self {
        self.expand = Some(TimeRange {
            start,
            end: Some(end),
        });
        self
    }

    /// Returns the element tree.
    #[must_use]
    pub fn element(&self) -> XmlElement {
        let mut data = XmlElement::new("C:calendar-data");
        if let Some(expand) = &self.expand {
            data = data.child(expand.element("C:expand"));
        }
        let prop = XmlElement::new("D:prop").child(data);

        let mut filters = Vec::new();
        if let Some(tr) = &self.time_range {
            filters.push(tr.element("C:time-range"));
        }
        filters.extend(self.prop_filters.iter().map(PropFilter::element));

        let mut vcalendar = XmlElement::new("C:comp-filter").attr("name", "VCALENDAR");
        vcalendar = match self.component {
            Some(component) => vcalendar.child(
                XmlElement::new("C:comp-filter")
                    .attr("name", component.as_str())
                    .children(filters),
            ),
            None => vcalendar.children(filters),
        };

        XmlElement::new("C:calendar-query")
            .child(prop)
            .child(XmlElement::new("C:filter").child(vcalendar))
    }

    /// Builds the XML body for the calendar query request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        self.element().to_document()
    }
}

/// Calendar multiget request builder.
#[derive(Debug, Default)]
pub struct CalendarMultiGetRequest {
    hrefs: Vec<String>,
}

impl CalendarMultiGetRequest {
    /// Creates a new calendar multiget request.
    #[must_use]
    pub fn new() -> Self {
        Self { hrefs: Vec::new() }
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: String) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Returns the element tree.
    #[must_use]
    pub fn element(&self) -> XmlElement {
        let prop = XmlElement::new("D:prop")
            .child(Prop::GetETag.element())
            .child(Prop::CalendarData.element());
        XmlElement::new("C:calendar-multiget")
            .child(prop)
            .children(
                self.hrefs
                    .iter()
                    .map(|href| XmlElement::new("D:href").text(href.clone())),
            )
    }
}

/// Free/busy query request builder.
#[derive(Debug)]
pub struct FreeBusyQueryRequest {
    range: TimeRange,
}

impl FreeBusyQueryRequest {
    /// Creates a new free/busy query request.
    #[must_use]
    pub const fn new(start: String, end: String) -> Self {
        Self {
            range: TimeRange {
                start,
                end: Some(end),
            },
        }
    }

    /// Returns the element tree.
    #[must_use]
    pub fn element(&self) -> XmlElement {
        XmlElement::new("C:free-busy-query").child(self.range.element("C:time-range"))
    }
}
