// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CalDAV` client for accessing and managing calendars on `CalDAV` servers (RFC 4791).
//!
//! A [`DavClient`] holds the session. From it, a [`Principal`] is discovered,
//! its [`CalendarSet`] lists [`Calendar`]s, and calendars hold
//! [`CalendarObjectResource`]s: events, todos and journal entries.
//!
//! ```ignore
//! let client = DavClient::new(CalDavConfig {
//!     base_url: "https://dav.example.com/".to_string(),
//!     ..CalDavConfig::default()
//! })?;
//! let mut principal = client.principal().await?;
//! for calendar in principal.calendars().await? {
//!     let todos = calendar.todos(DEFAULT_SORT_KEYS, false).await?;
//!     println!("{:?}: {} pending", calendar.name(), todos.len());
//! }
//! ```

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod calendar;
mod calendar_object;
mod calendar_set;
mod client;
mod config;
mod datetime;
mod dav_object;
mod error;
mod http;
mod ical;
mod principal;
mod request;
mod response;
mod server_url;
pub mod todo_sort;
mod xml;

pub use crate::calendar::Calendar;
pub use crate::calendar_object::{CalendarObjectResource, FreeBusy, ResourceState};
pub use crate::calendar_set::CalendarSet;
pub use crate::client::DavClient;
pub use crate::config::{AuthMethod, CalDavConfig};
pub use crate::datetime::{IntoUtc, utc_stamp};
pub use crate::dav_object::{Child, DavObject};
pub use crate::error::{CalDavError, ErrorResponse};
pub use crate::http::{DavRequest, DavResponse, HttpClient, Transport};
pub use crate::ical::{
    CalendarData, Component, ComponentKind, Property, VCalendar, fix, uid_matches,
};
pub use crate::principal::Principal;
pub use crate::request::{
    CalendarMultiGetRequest, CalendarQueryRequest, FreeBusyQueryRequest, MkCalendarRequest, Prop,
    PropFilter, PropFindRequest, PropPatchRequest, TextMatch, TimeRange,
};
pub use crate::response::{Extract, Properties, PropertyMap, ensure_propstat_success};
pub use crate::server_url::ServerUrl;
pub use crate::todo_sort::{DEFAULT_SORT_KEYS, sort_todos};
pub use crate::xml::{XmlElement, clark, ns, tag};
