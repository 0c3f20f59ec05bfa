// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request building tests.

use davcal_caldav::{
    CalendarMultiGetRequest, CalendarQueryRequest, ComponentKind, FreeBusyQueryRequest,
    MkCalendarRequest, Prop, PropFilter, PropFindRequest, PropPatchRequest, TextMatch, XmlElement,
};

#[test]
fn request_propfind_builds_xml() {
    let mut request = PropFindRequest::new();
    request.add_property(Prop::DisplayName);
    request.add_property(Prop::GetETag);
    request.add_property(Prop::ResourceType);

    let xml = request.build().expect("Failed to build PROPFIND XML");

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(xml.contains("<D:propfind"));
    assert!(xml.contains("<D:prop>"));
    assert!(xml.contains("<D:displayname/>"));
    assert!(xml.contains("<D:getetag/>"));
    assert!(xml.contains("<D:resourcetype/>"));
    assert!(xml.contains("</D:propfind>"));
}

#[test]
fn request_propfind_caldav_properties_includes_namespace() {
    let mut request = PropFindRequest::new();
    request.add_property(Prop::CalendarData);
    request.add_property(Prop::CalendarHomeSet);

    let xml = request.build().expect("Failed to build PROPFIND XML");

    assert!(xml.contains("xmlns:D=\"DAV:\""));
    assert!(xml.contains("xmlns:C=\"urn:ietf:params:xml:ns:caldav\""));
    assert!(xml.contains("<C:calendar-data/>"));
    assert!(xml.contains("<C:calendar-home-set/>"));
}

#[test]
fn request_propfind_without_properties_has_no_body() {
    let request = PropFindRequest::new();
    assert!(request.element().is_none());
    assert_eq!(request.build().unwrap(), "");
}

#[test]
fn request_proppatch_sets_display_name() {
    let xml = PropPatchRequest::new()
        .set(XmlElement::new("D:displayname").text("Work"))
        .element()
        .to_document()
        .unwrap();

    assert!(xml.contains("<D:propertyupdate"));
    assert!(xml.contains("<D:set>"));
    assert!(xml.contains("Work"));
    assert!(xml.contains("</D:displayname>"));
}

#[test]
fn request_mkcalendar_with_components() {
    let xml = MkCalendarRequest::new()
        .display_name(Some("Chores".to_string()))
        .supported_components(&[ComponentKind::Todo, ComponentKind::Event])
        .element()
        .to_document()
        .unwrap();

    assert!(xml.contains("<C:mkcalendar"));
    assert!(xml.contains("Chores"));
    assert!(xml.contains("<C:supported-calendar-component-set>"));
    assert!(xml.contains("<C:comp name=\"VTODO\"/>"));
    assert!(xml.contains("<C:comp name=\"VEVENT\"/>"));
}

#[test]
fn request_mkcalendar_minimal() {
    let xml = MkCalendarRequest::new().element().to_document().unwrap();

    assert!(xml.contains("<C:mkcalendar"));
    assert!(!xml.contains("displayname"));
    assert!(!xml.contains("supported-calendar-component-set"));
}

#[test]
fn request_calendar_query_with_time_range() {
    let xml = CalendarQueryRequest::new()
        .component(ComponentKind::Event)
        .time_range(
            "20250101T000000Z".to_string(),
            Some("20251231T235959Z".to_string()),
        )
        .build()
        .expect("Failed to build calendar-query XML");

    assert!(xml.contains("<C:calendar-query"));
    assert!(xml.contains("<C:comp-filter name=\"VCALENDAR\">"));
    assert!(xml.contains("<C:comp-filter name=\"VEVENT\">"));
    assert!(xml.contains("<C:time-range start=\"20250101T000000Z\" end=\"20251231T235959Z\"/>"));
    assert!(xml.contains("<C:calendar-data/>"));
}

#[test]
fn request_calendar_query_open_ended_range_with_expand() {
    let open = CalendarQueryRequest::new()
        .time_range("20250101T000000Z".to_string(), None)
        .build()
        .unwrap();
    assert!(open.contains("<C:time-range start=\"20250101T000000Z\"/>"));
    assert!(!open.contains("<C:expand"));

    let expanded = CalendarQueryRequest::new()
        .expand("20250101T000000Z".to_string(), "20250201T000000Z".to_string())
        .build()
        .unwrap();
    assert!(expanded.contains("<C:expand start=\"20250101T000000Z\" end=\"20250201T000000Z\"/>"));
}

#[test]
fn request_calendar_query_pending_todo_filters() {
    let xml = CalendarQueryRequest::new()
        .component(ComponentKind::Todo)
        .prop_filter(PropFilter::is_not_defined("COMPLETED"))
        .prop_filter(PropFilter::text_match(
            "STATUS",
            TextMatch::new("CANCELLED").negate(),
        ))
        .build()
        .unwrap();

    assert!(xml.contains("<C:comp-filter name=\"VTODO\">"));
    assert!(xml.contains("<C:prop-filter name=\"COMPLETED\">"));
    assert!(xml.contains("<C:is-not-defined/>"));
    assert!(xml.contains("<C:prop-filter name=\"STATUS\">"));
    assert!(xml.contains("negate-condition=\"yes\""));
    assert!(xml.contains("CANCELLED"));
}

#[test]
fn request_calendar_multiget_lists_hrefs() {
    let mut request = CalendarMultiGetRequest::new();
    request.add_href("/cal/a.ics".to_string());
    request.add_href("/cal/b.ics".to_string());

    let xml = request.element().to_document().unwrap();

    assert!(xml.contains("<C:calendar-multiget"));
    assert!(xml.contains("<D:getetag/>"));
    assert!(xml.contains("/cal/a.ics"));
    assert!(xml.contains("/cal/b.ics"));
}

#[test]
fn request_free_busy_query() {
    let xml = FreeBusyQueryRequest::new(
        "20250101T000000Z".to_string(),
        "20250102T000000Z".to_string(),
    )
    .element()
    .to_document()
    .unwrap();

    assert!(xml.contains("<C:free-busy-query"));
    assert!(xml.contains("<C:time-range start=\"20250101T000000Z\" end=\"20250102T000000Z\"/>"));
}

#[test]
fn request_prop_tags_are_clark_names() {
    assert_eq!(Prop::DisplayName.tag(), "{DAV:}displayname");
    assert_eq!(
        Prop::CalendarHomeSet.tag(),
        "{urn:ietf:params:xml:ns:caldav}calendar-home-set"
    );
}
