// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar object resources: events, todos and journals stored in a
//! calendar, plus the synthetic free/busy reply.

use jiff::Timestamp;
use uuid::Uuid;

use crate::client::DavClient;
use crate::dav_object::DavObject;
use crate::datetime::{IntoUtc, parse_period, to_utc_stamp};
use crate::error::{CalDavError, ErrorResponse};
use crate::ical::{CalendarData, ComponentKind, VCalendar};
use crate::server_url::{ServerUrl, quote, unquote};

/// Suffix of calendar object resource names.
const ITEM_SUFFIX: &str = ".ics";

/// Where a resource stands relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// No URL; the data lives only in memory.
    Unbound,
    /// A URL is assigned but the server has not confirmed the resource.
    Bound,
    /// The server accepted the resource.
    Persisted,
    /// The data was fetched from the server.
    Loaded,
}

/// A calendar object resource (RFC 4791, section 4.1).
///
/// Text and parsed data are kept together in a [`CalendarData`]; replacing
/// either one with [`set_raw`](Self::set_raw) or [`set_parsed`](Self::set_parsed)
/// re-derives the other.
#[derive(Debug, Clone)]
pub struct CalendarObjectResource {
    object: DavObject,
    kind: ComponentKind,
    data: Option<CalendarData>,
    state: ResourceState,
}

impl CalendarObjectResource {
    /// Creates an unbound resource to be saved into the calendar at `parent`.
    ///
    /// The kind is taken from the data when it has a recognizable component.
    #[must_use]
    pub fn new(client: DavClient, parent: ServerUrl, kind: ComponentKind, data: CalendarData) -> Self {
        Self {
            kind: data.kind().unwrap_or(kind),
            object: DavObject::unbound(client, Some(parent)),
            data: Some(data),
            state: ResourceState::Unbound,
        }
    }

    /// Creates a handle for the resource at `url` without fetching it.
    #[must_use]
    pub const fn at(client: DavClient, url: ServerUrl, parent: Option<ServerUrl>, kind: ComponentKind) -> Self {
        Self {
            object: DavObject::bound(client, url, parent),
            kind,
            data: None,
            state: ResourceState::Bound,
        }
    }

    /// Wraps a resource returned by a calendar query.
    pub(crate) fn listed(
        client: DavClient,
        url: ServerUrl,
        parent: ServerUrl,
        kind: ComponentKind,
        raw: Option<&str>,
    ) -> Result<Self, CalDavError> {
        let mut resource = Self::at(client, url, Some(parent), kind);
        if let Some(raw) = raw {
            let data = CalendarData::from_raw(raw)?;
            resource.kind = data.kind().unwrap_or(kind);
            resource.data = Some(data);
            resource.state = ResourceState::Loaded;
        }
        Ok(resource)
    }

    /// Returns the underlying DAV resource.
    #[must_use]
    pub const fn dav(&self) -> &DavObject {
        &self.object
    }

    /// Returns the URL, if bound.
    #[must_use]
    pub const fn url(&self) -> Option<&ServerUrl> {
        self.object.url()
    }

    /// Returns the identifier the resource is stored under.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.object.id()
    }

    /// Sets the identifier; on save it is written into the UID.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.object.set_id(Some(id.into()));
    }

    /// Returns the URL without embedded credentials.
    #[must_use]
    pub fn canonical_url(&self) -> Option<String> {
        self.object.canonical_url()
    }

    /// Returns the component kind.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ResourceState {
        self.state
    }

    /// Returns the calendar data, if any is held.
    #[must_use]
    pub const fn data(&self) -> Option<&CalendarData> {
        self.data.as_ref()
    }

    /// Returns the text form of the data.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.data.as_ref().map(CalendarData::raw)
    }

    /// Returns the parsed form of the data.
    #[must_use]
    pub fn parsed(&self) -> Option<&VCalendar> {
        self.data.as_ref().map(CalendarData::parsed)
    }

    /// Replaces the data with text; the parsed form follows.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Ical`] if the text cannot be parsed; the
    /// previous data is kept in that case.
    pub fn set_raw(&mut self, raw: &str) -> Result<(), CalDavError> {
        self.replace_data(CalendarData::from_raw(raw)?);
        Ok(())
    }

    /// Replaces the data with a component tree; the text form follows.
    pub fn set_parsed(&mut self, parsed: VCalendar) {
        self.replace_data(CalendarData::from_parsed(parsed));
    }

    /// Edits the parsed data in place.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::InvalidState`] if the resource holds no data.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut VCalendar) -> R) -> Result<R, CalDavError> {
        let data = self.data.as_mut().ok_or_else(no_data)?;
        let out = data.edit(f);
        self.mark_modified();
        Ok(out)
    }

    fn replace_data(&mut self, data: CalendarData) {
        if let Some(kind) = data.kind() {
            self.kind = kind;
        }
        self.data = Some(data);
        self.mark_modified();
    }

    fn mark_modified(&mut self) {
        if self.state == ResourceState::Loaded {
            self.state = ResourceState::Persisted;
        }
    }

    /// Fetches the data from the server.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] on a 4xx reply,
    /// [`CalDavError::Server`] on a 5xx reply, and
    /// [`CalDavError::InvalidState`] for an unbound resource.
    #[tracing::instrument(skip(self), fields(url = ?self.url()))]
    pub async fn load(&mut self) -> Result<(), CalDavError> {
        let url = self.object.bound_url()?;
        let resp = self
            .object
            .client()
            .get(url, &[("Accept", "text/calendar")])
            .await?;
        match resp.status {
            400..500 => return Err(CalDavError::NotFound(ErrorResponse::from(&resp))),
            500.. => return Err(CalDavError::Server(ErrorResponse::from(&resp))),
            _ => {}
        }

        let data = CalendarData::from_raw(&resp.body)?;
        if let Some(kind) = data.kind() {
            self.kind = kind;
        }
        self.data = Some(data);
        self.state = ResourceState::Loaded;
        Ok(())
    }

    /// Writes the resource: created if unbound, updated otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Put`] if the server rejects the write or no
    /// identifier can be derived.
    pub async fn save(&mut self) -> Result<(), CalDavError> {
        let create = self.state == ResourceState::Unbound;
        self.put(create).await
    }

    /// Writes the resource, failing if it already exists on the server.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::InvalidState`] if the resource is already bound,
    /// and [`CalDavError::Put`] if the server rejects the write.
    pub async fn create(&mut self) -> Result<(), CalDavError> {
        if self.state != ResourceState::Unbound {
            return Err(CalDavError::InvalidState(
                "resource is already bound to a URL; use save() to update it".to_string(),
            ));
        }
        self.put(true).await
    }

    #[tracing::instrument(skip(self), fields(url = ?self.url(), id = ?self.id()))]
    async fn put(&mut self, create: bool) -> Result<(), CalDavError> {
        let parent = self.object.parent_url()?.clone();
        let path = self.object.url().map(|u| u.path().to_string());
        let mut id = self.object.id().map(ToString::to_string);
        let data = self.data.as_mut().ok_or_else(no_data)?;

        let stem = path
            .as_deref()
            .filter(|p| p.ends_with(ITEM_SUFFIX))
            .and_then(item_stem);
        if id.is_none()
            && let Some(stem) = stem
        {
            id = Some(stem);
        } else if let Some(id) = &id {
            if !data.set_uid(id) {
                tracing::warn!(id = %id, "calendar data has no component to carry the UID");
            }
        } else {
            id = data.uid().map(ToString::to_string);
        }

        let path = match (path, &id) {
            (Some(path), _) => path,
            (None, Some(id)) => format!("{}{ITEM_SUFFIX}", quote(id)),
            (None, None) => {
                return Err(CalDavError::Put(ErrorResponse::local(
                    "no identifier: the data has no UID and no id or path was given",
                )));
            }
        };
        let url = parent.ensure_trailing_slash().join(&path)?;

        let condition = if create {
            ("If-None-Match", "*")
        } else {
            ("If-Match", "*")
        };
        let resp = self
            .object
            .client()
            .put(&url, data.raw().to_string(), &[condition])
            .await?;

        let url = match resp.status {
            302 => {
                let location = resp
                    .header("location")
                    .ok_or_else(|| CalDavError::Put(ErrorResponse::from(&resp)))?;
                tracing::debug!(location, "server stored the resource elsewhere");
                url.join(location)?
            }
            201 | 204 => url,
            _ => return Err(CalDavError::Put(ErrorResponse::from(&resp))),
        };

        self.object.set_url(Some(url));
        self.object.set_id(id);
        self.state = ResourceState::Persisted;
        Ok(())
    }

    /// Deletes the resource from the server. The handle keeps its URL.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Delete`] if the server refuses.
    pub async fn delete(&mut self) -> Result<(), CalDavError> {
        self.object.delete().await?;
        self.state = ResourceState::Bound;
        Ok(())
    }

    /// Returns an unbound copy with the same data, optionally for another
    /// calendar. Unless `keep_id` is set the copy gets a fresh identifier.
    #[must_use]
    pub fn copy(&self, keep_id: bool, new_parent: Option<&ServerUrl>) -> Self {
        let mut object = unbind(self.object.clone());
        if let Some(parent) = new_parent {
            object.set_parent(Some(parent.clone()));
        }
        let id = if keep_id {
            self.object.id().map(ToString::to_string)
        } else {
            Some(Uuid::now_v7().to_string())
        };
        object.set_id(id);

        Self {
            object,
            kind: self.kind,
            data: self.data.clone(),
            state: ResourceState::Unbound,
        }
    }

    /// Marks a todo as completed at `at` and saves it.
    ///
    /// `STATUS` becomes `COMPLETED`; an existing `COMPLETED` time is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::InvalidState`] for anything but a todo with
    /// data, or the error of the update.
    pub async fn complete(&mut self, at: impl IntoUtc) -> Result<(), CalDavError> {
        if self.kind != ComponentKind::Todo {
            return Err(CalDavError::InvalidState(format!(
                "only todos can be completed, this is a {}",
                self.kind
            )));
        }

        let stamp = to_utc_stamp(at)?;
        let found = self.edit(|cal| match cal.primary_mut() {
            Some(todo) => {
                todo.set_value("STATUS", "COMPLETED");
                if todo.property("COMPLETED").is_none() {
                    todo.set_value("COMPLETED", stamp);
                }
                true
            }
            None => false,
        })?;
        if !found {
            return Err(no_data());
        }
        self.save().await
    }
}

/// Free/busy information for a time range, as aggregated by the server.
///
/// This is not a stored resource: it has no URL or identifier.
#[derive(Debug, Clone)]
pub struct FreeBusy {
    parent: ServerUrl,
    data: CalendarData,
}

impl FreeBusy {
    pub(crate) const fn new(parent: ServerUrl, data: CalendarData) -> Self {
        Self { parent, data }
    }

    /// Returns the calendar that was queried.
    #[must_use]
    pub const fn parent(&self) -> &ServerUrl {
        &self.parent
    }

    /// Returns the reply text.
    #[must_use]
    pub fn raw(&self) -> &str {
        self.data.raw()
    }

    /// Returns the parsed reply.
    #[must_use]
    pub const fn parsed(&self) -> &VCalendar {
        self.data.parsed()
    }

    /// Returns every `FREEBUSY` period in document order.
    ///
    /// Periods are reported as the server sent them; adjacent periods are not
    /// merged.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Time`] if a period is malformed.
    pub fn busy_periods(&self) -> Result<Vec<(Timestamp, Timestamp)>, CalDavError> {
        self.data
            .parsed()
            .components_of(ComponentKind::FreeBusy)
            .flat_map(|c| c.properties.iter())
            .filter(|p| p.name.eq_ignore_ascii_case("FREEBUSY"))
            .flat_map(|p| p.value.split(','))
            .map(parse_period)
            .collect()
    }
}

fn unbind(mut object: DavObject) -> DavObject {
    object.set_url(None);
    object
}

fn no_data() -> CalDavError {
    CalDavError::InvalidState("resource holds no calendar data".to_string())
}

/// File name of an item path without suffix, percent-decoded.
fn item_stem(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let stem = name.strip_suffix(ITEM_SUFFIX)?;
    Some(unquote(stem))
}
