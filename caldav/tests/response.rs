// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsing tests.

use davcal_caldav::{
    CalDavError, DavResponse, Extract, Prop, PropertyMap, ensure_propstat_success, tag,
};

fn multistatus(body: &str) -> DavResponse {
    DavResponse {
        status: 207,
        reason: "Multi-Status".to_string(),
        headers: vec![("content-type".to_string(), "application/xml".to_string())],
        body: body.to_string(),
    }
}

const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/calendars/user/</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/></D:resourcetype>
        <D:displayname>Home</D:displayname>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/calendars/user/my%20work/</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
        <D:displayname>Work</D:displayname>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

#[test]
fn response_parse_listing_keys_by_unescaped_href() {
    let map = PropertyMap::from_response(
        &multistatus(LISTING),
        &[Prop::ResourceType, Prop::DisplayName],
        None,
        Extract::Tag,
    )
    .expect("Failed to parse multistatus");

    assert_eq!(map.len(), 2);
    let work = map.get("/dav/calendars/user/my work/").expect("missing entry");
    assert_eq!(
        work.get(tag::DISPLAY_NAME).cloned().flatten().as_deref(),
        Some("Work")
    );
    // Without a filter the first child is taken.
    assert_eq!(
        work.get(tag::RESOURCE_TYPE).cloned().flatten().as_deref(),
        Some(tag::COLLECTION)
    );
}

#[test]
fn response_parse_keeps_escaped_href_beside_the_key() {
    let map = PropertyMap::from_response(
        &multistatus(LISTING),
        &[Prop::DisplayName],
        None,
        Extract::Text,
    )
    .unwrap();

    assert_eq!(
        map.href("/dav/calendars/user/my work/"),
        Some("/dav/calendars/user/my%20work/")
    );

    let entries: Vec<_> = map.into_entries().map(|(path, href, _)| (path, href)).collect();
    assert_eq!(
        entries,
        vec![
            (
                "/dav/calendars/user/".to_string(),
                "/dav/calendars/user/".to_string()
            ),
            (
                "/dav/calendars/user/my work/".to_string(),
                "/dav/calendars/user/my%20work/".to_string()
            ),
        ]
    );
}

#[test]
fn response_parse_filters_resource_type_by_child_tag() {
    let map = PropertyMap::from_response(
        &multistatus(LISTING),
        &[Prop::ResourceType],
        Some(tag::CALENDAR),
        Extract::Tag,
    )
    .unwrap();

    let home = map.get("/dav/calendars/user/").unwrap();
    assert_eq!(home.get(tag::RESOURCE_TYPE), Some(&None));

    let work = map.get("/dav/calendars/user/my work/").unwrap();
    assert_eq!(
        work.get(tag::RESOURCE_TYPE).cloned().flatten().as_deref(),
        Some(tag::CALENDAR)
    );
}

#[test]
fn response_parse_nested_href_as_text() {
    let body = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/principals/user/</D:href>
    <D:propstat>
      <D:prop>
        <C:calendar-home-set><D:href>/dav/calendars/user/</D:href></C:calendar-home-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let map = PropertyMap::from_response(
        &multistatus(body),
        &[Prop::CalendarHomeSet],
        None,
        Extract::Text,
    )
    .unwrap();

    let props = map.get("/dav/principals/user/").unwrap();
    assert_eq!(
        props.get(tag::CALENDAR_HOME_SET).cloned().flatten().as_deref(),
        Some("/dav/calendars/user/")
    );
}

#[test]
fn response_parse_missing_property_is_none() {
    let body = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/</D:href>
    <D:propstat>
      <D:prop><D:displayname/></D:prop>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let map = PropertyMap::from_response(
        &multistatus(body),
        &[Prop::DisplayName, Prop::GetETag],
        None,
        Extract::Text,
    )
    .unwrap();

    let props = map.get("/cal/").unwrap();
    assert_eq!(props.get(tag::DISPLAY_NAME), Some(&None));
    assert_eq!(props.get(tag::GET_ETAG), Some(&None));
}

#[test]
fn response_parse_calendar_data() {
    let body = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/cal/event1.ics</D:href>
    <D:propstat>
      <D:prop>
        <C:calendar-data>BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:event1
END:VEVENT
END:VCALENDAR
</C:calendar-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let map =
        PropertyMap::from_response(&multistatus(body), &[Prop::CalendarData], None, Extract::Text)
            .unwrap();

    let data = map
        .get("/cal/event1.ics")
        .and_then(|p| p.get(tag::CALENDAR_DATA).cloned().flatten())
        .expect("missing calendar data");
    assert!(data.starts_with("BEGIN:VCALENDAR"));
    assert!(data.contains("UID:event1"));
}

#[test]
fn response_parse_rejects_disallowed_status() {
    let body = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/</D:href>
    <D:status>HTTP/1.1 403 Forbidden</D:status>
  </D:response>
</D:multistatus>"#;

    let err = PropertyMap::from_response(&multistatus(body), &[], None, Extract::Text)
        .expect_err("403 must be rejected");
    assert!(matches!(err, CalDavError::Report(_)));
}

#[test]
fn response_parse_rejects_missing_status() {
    let body = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/</D:href>
  </D:response>
</D:multistatus>"#;

    let err = PropertyMap::from_response(&multistatus(body), &[], None, Extract::Text).unwrap_err();
    assert!(matches!(err, CalDavError::Report(_)));
}

#[test]
fn response_parse_malformed_xml() {
    let err = PropertyMap::from_response(&multistatus("<D:multistatus"), &[], None, Extract::Text)
        .unwrap_err();
    assert!(matches!(err, CalDavError::Xml(_)));
}

#[test]
fn response_proppatch_success_and_failure() {
    let ok = r#"<?xml version="1.0" encoding="utf-8" ?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/</D:href>
    <D:propstat>
      <D:prop><D:displayname/></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
    ensure_propstat_success(&multistatus(ok)).expect("200 is success");

    let failed = ok.replace("200 OK", "403 Forbidden");
    let err = ensure_propstat_success(&multistatus(&failed)).unwrap_err();
    assert!(matches!(err, CalDavError::Propset(_)));
    assert_eq!(err.response().map(|r| r.status), Some(207));
}
