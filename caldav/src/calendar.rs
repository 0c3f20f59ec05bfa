// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar collections and the calendar query layer (RFC 4791, section 7).

use uuid::Uuid;

use crate::calendar_object::{CalendarObjectResource, FreeBusy};
use crate::client::DavClient;
use crate::dav_object::{DavObject, Verb};
use crate::datetime::{IntoUtc, to_utc_stamp};
use crate::error::{CalDavError, ErrorResponse};
use crate::http::DavResponse;
use crate::ical::{CalendarData, ComponentKind, uid_matches};
use crate::request::{
    CalendarMultiGetRequest, CalendarQueryRequest, FreeBusyQueryRequest, MkCalendarRequest, Prop,
    PropFilter, TextMatch,
};
use crate::response::{Extract, Properties, PropertyMap};
use crate::server_url::{ServerUrl, quote};
use crate::todo_sort::sort_todos;
use crate::xml::{XmlElement, tag};

/// A path segment no server should have a calendar at.
const BOGUS_SEGMENT: &str = "ANYTHINGGOESHEREthisshouldforsurereturn404";

/// A calendar collection.
#[derive(Debug, Clone)]
pub struct Calendar {
    object: DavObject,
    supported_components: Vec<ComponentKind>,
}

impl Calendar {
    /// Creates a handle for the calendar at `url` without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be resolved.
    pub fn at(
        client: DavClient,
        url: &ServerUrl,
        parent: Option<ServerUrl>,
        name: Option<String>,
    ) -> Result<Self, CalDavError> {
        Ok(Self {
            object: DavObject::new(client, Some(url), parent)?.with_name(name),
            supported_components: Vec::new(),
        })
    }

    /// Describes a calendar to be created in the calendar set at `parent`
    /// by [`Calendar::save`].
    #[must_use]
    pub fn unsaved(
        client: DavClient,
        parent: ServerUrl,
        name: Option<String>,
        id: Option<String>,
        components: &[ComponentKind],
    ) -> Self {
        Self {
            object: DavObject::unbound(client, Some(parent))
                .with_name(name)
                .with_id(id),
            supported_components: components.to_vec(),
        }
    }

    pub(crate) fn with_id(mut self, id: &str) -> Self {
        self.object.set_id(Some(id.to_string()));
        self
    }

    /// Returns the underlying DAV resource.
    #[must_use]
    pub const fn dav(&self) -> &DavObject {
        &self.object
    }

    /// Returns the URL, once the calendar exists.
    #[must_use]
    pub const fn url(&self) -> Option<&ServerUrl> {
        self.object.url()
    }

    /// Returns the URL without embedded credentials.
    #[must_use]
    pub fn canonical_url(&self) -> Option<String> {
        self.object.canonical_url()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.object.name()
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.object.id()
    }

    /// Returns the component types requested at creation.
    #[must_use]
    pub fn supported_components(&self) -> &[ComponentKind] {
        &self.supported_components
    }

    /// Creates the calendar on the server unless it already has a URL.
    ///
    /// Afterwards the URL ends with a slash.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Mkcalendar`] unless the server answers 201, or
    /// the error of setting the display name, in which case the new calendar
    /// has been deleted again. Either way the calendar stays unsaved, and a
    /// later call retries the creation.
    pub async fn save(&mut self) -> Result<(), CalDavError> {
        if self.object.url().is_none() {
            self.create().await?;
        }
        if let Some(url) = self.object.url() {
            let url = url.ensure_trailing_slash();
            self.object.set_url(Some(url));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(name = ?self.name(), id = ?self.id()))]
    async fn create(&mut self) -> Result<(), CalDavError> {
        let parent = self.object.parent_url()?.ensure_trailing_slash();
        let generated = self.object.id().is_none();
        let id = self
            .object
            .id()
            .map_or_else(|| Uuid::now_v7().to_string(), ToString::to_string);
        let url = parent.join(&quote(&id))?;

        let name = self.object.name().map(ToString::to_string);
        let body = MkCalendarRequest::new()
            .display_name(name.clone())
            .supported_components(&self.supported_components);
        self.object
            .query(Some(body.element()), 0, Verb::Mkcalendar, Some(&url), Some(201))
            .await?;
        tracing::info!(url = %url, "created calendar");
        self.object.set_id(Some(id));
        self.object.set_url(Some(url));

        // Some servers ignore the display name in the MKCALENDAR body.
        if let Some(name) = &name {
            let display_name = Prop::DisplayName.element().text(name.clone());
            if let Err(e) = self.object.set_properties(vec![display_name]).await {
                if let Err(cleanup) = self.object.delete().await {
                    tracing::warn!(error = %cleanup, "failed to remove calendar after rename failure");
                }
                self.object.set_url(None);
                if generated {
                    self.object.set_id(None);
                }
                return Err(e);
            }

            self.probe_name_keyed_url(&parent, name).await?;
        }
        Ok(())
    }

    /// Detects servers that serve a new calendar under its display name
    /// rather than its identifier, and switches to that URL.
    async fn probe_name_keyed_url(&mut self, parent: &ServerUrl, name: &str) -> Result<(), CalDavError> {
        let client = self.object.client();
        let by_name = parent.join(&quote(name))?;
        if client.get(&by_name, &[]).await?.status == 404 {
            return Ok(());
        }

        // A server answering everything would look name-keyed as well.
        let bogus = parent.join(BOGUS_SEGMENT)?;
        if client.get(&bogus, &[]).await?.status == 404 {
            tracing::warn!(url = %by_name, "server keys calendars by name, using that URL");
            self.object.set_url(Some(by_name));
        }
        Ok(())
    }

    /// Deletes the calendar and everything in it.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Delete`] if the server refuses.
    pub async fn delete(&self) -> Result<(), CalDavError> {
        self.object.delete().await
    }

    /// Reads properties of the calendar.
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPFIND fails.
    pub async fn get_properties(
        &self,
        props: &[Prop],
    ) -> Result<Properties, CalDavError> {
        self.object.get_properties(props).await
    }

    /// Sets properties of the calendar.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Propset`] if any property is rejected.
    pub async fn set_properties(&self, props: Vec<XmlElement>) -> Result<(), CalDavError> {
        self.object.set_properties(props).await
    }

    /// Creates an event from calendar text; fails if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is invalid or the write is rejected.
    pub async fn add_event(&self, ical: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.add(ComponentKind::Event, ical).await
    }

    /// Creates a todo from calendar text; fails if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is invalid or the write is rejected.
    pub async fn add_todo(&self, ical: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.add(ComponentKind::Todo, ical).await
    }

    /// Creates a journal entry from calendar text; fails if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is invalid or the write is rejected.
    pub async fn add_journal(&self, ical: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.add(ComponentKind::Journal, ical).await
    }

    async fn add(&self, kind: ComponentKind, ical: &str) -> Result<CalendarObjectResource, CalDavError> {
        let data = CalendarData::from_raw(ical)?;
        let mut resource = CalendarObjectResource::new(
            self.object.client().clone(),
            self.object.bound_url()?.clone(),
            kind,
            data,
        );
        resource.create().await?;
        Ok(resource)
    }

    /// Loads the event at `href`.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is no such resource.
    pub async fn event_by_url(&self, href: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.object_by_url(ComponentKind::Event, href).await
    }

    /// Loads the todo at `href`.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is no such resource.
    pub async fn todo_by_url(&self, href: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.object_by_url(ComponentKind::Todo, href).await
    }

    /// Loads the journal entry at `href`.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is no such resource.
    pub async fn journal_by_url(&self, href: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.object_by_url(ComponentKind::Journal, href).await
    }

    async fn object_by_url(
        &self,
        kind: ComponentKind,
        href: &str,
    ) -> Result<CalendarObjectResource, CalDavError> {
        let calendar = self.object.bound_url()?;
        let mut resource = CalendarObjectResource::at(
            self.object.client().clone(),
            calendar.join(href)?,
            Some(calendar.clone()),
            kind,
        );
        resource.load().await?;
        Ok(resource)
    }

    /// Searches for objects overlapping `[start, end]`.
    ///
    /// `component` narrows the search to one type; `None` searches all. The
    /// server is asked to expand recurrences only when `end` is given.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if the calendar does not exist, or
    /// another error if the REPORT fails.
    #[tracing::instrument(skip(self, start, end), fields(url = ?self.url()))]
    pub async fn date_search(
        &self,
        start: impl IntoUtc,
        end: Option<impl IntoUtc>,
        component: Option<ComponentKind>,
    ) -> Result<Vec<CalendarObjectResource>, CalDavError> {
        let start = to_utc_stamp(start)?;
        let end = end.map(to_utc_stamp).transpose()?;

        let mut query = CalendarQueryRequest::new().time_range(start.clone(), end.clone());
        if let Some(end) = end {
            query = query.expand(start, end);
        }
        if let Some(component) = component {
            query = query.component(component);
        }

        let map = self.calendar_query(&query).await?;
        self.resources_from(map, component.unwrap_or(ComponentKind::Event))
    }

    /// Finds the object with exactly this UID, of any type.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if no object carries the UID.
    pub async fn object_by_uid(
        &self,
        uid: &str,
        component: Option<ComponentKind>,
    ) -> Result<CalendarObjectResource, CalDavError> {
        let mut query = CalendarQueryRequest::new()
            .prop_filter(PropFilter::text_match("UID", TextMatch::new(uid)));
        if let Some(component) = component {
            query = query.component(component);
        }

        let resp = self
            .object
            .query(Some(query.element()), 1, Verb::Report, None, None)
            .await?;
        let map = PropertyMap::from_response(&resp, &[Prop::CalendarData], None, Extract::Text)?;

        let calendar = self.object.bound_url()?;
        for (path, href, mut props) in map.into_entries() {
            let Some(raw) = props.remove(tag::CALENDAR_DATA).flatten() else {
                continue;
            };
            if !uid_matches(&raw, uid) {
                tracing::debug!(path, "discarding partial UID match");
                continue;
            }
            return CalendarObjectResource::listed(
                self.object.client().clone(),
                calendar.join(&href)?,
                calendar.clone(),
                component.unwrap_or(ComponentKind::Event),
                Some(&raw),
            );
        }
        Err(CalDavError::NotFound(ErrorResponse::from(&resp)))
    }

    /// Finds the event with this UID.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is none.
    pub async fn event_by_uid(&self, uid: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.object_by_uid(uid, Some(ComponentKind::Event)).await
    }

    /// Finds the todo with this UID.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is none.
    pub async fn todo_by_uid(&self, uid: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.object_by_uid(uid, Some(ComponentKind::Todo)).await
    }

    /// Finds the journal entry with this UID.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if there is none.
    pub async fn journal_by_uid(&self, uid: &str) -> Result<CalendarObjectResource, CalDavError> {
        self.object_by_uid(uid, Some(ComponentKind::Journal)).await
    }

    /// Lists all events.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails.
    pub async fn events(&self) -> Result<Vec<CalendarObjectResource>, CalDavError> {
        self.objects_of(ComponentKind::Event).await
    }

    /// Lists all journal entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails.
    pub async fn journals(&self) -> Result<Vec<CalendarObjectResource>, CalDavError> {
        self.objects_of(ComponentKind::Journal).await
    }

    async fn objects_of(&self, kind: ComponentKind) -> Result<Vec<CalendarObjectResource>, CalDavError> {
        let query = CalendarQueryRequest::new().component(kind);
        let map = self.calendar_query(&query).await?;
        self.resources_from(map, kind)
    }

    /// Lists todos sorted by `sort_keys` (see [`crate::todo_sort`]).
    ///
    /// Pending todos are those without `COMPLETED` whose status is either
    /// absent or not `CANCELLED`. Servers differ in how they match a missing
    /// status, so both cases are queried separately and merged.
    ///
    /// # Errors
    ///
    /// Returns an error if a REPORT fails.
    #[tracing::instrument(skip(self), fields(url = ?self.url()))]
    pub async fn todos(
        &self,
        sort_keys: &[&str],
        include_completed: bool,
    ) -> Result<Vec<CalendarObjectResource>, CalDavError> {
        let mut todos = if include_completed {
            self.objects_of(ComponentKind::Todo).await?
        } else {
            let not_cancelled = CalendarQueryRequest::new()
                .component(ComponentKind::Todo)
                .prop_filter(PropFilter::is_not_defined("COMPLETED"))
                .prop_filter(PropFilter::text_match(
                    "STATUS",
                    TextMatch::new("CANCELLED").negate(),
                ));
            let no_status = CalendarQueryRequest::new()
                .component(ComponentKind::Todo)
                .prop_filter(PropFilter::is_not_defined("COMPLETED"))
                .prop_filter(PropFilter::is_not_defined("STATUS"));

            let mut todos =
                self.resources_from(self.calendar_query(&not_cancelled).await?, ComponentKind::Todo)?;
            let extra =
                self.resources_from(self.calendar_query(&no_status).await?, ComponentKind::Todo)?;
            for todo in extra {
                if !todos.iter().any(|t| t.url() == todo.url()) {
                    todos.push(todo);
                }
            }
            todos
        };

        sort_todos(&mut todos, sort_keys);
        Ok(todos)
    }

    /// Fetches objects by href with a `calendar-multiget` REPORT.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails.
    pub async fn multiget(&self, hrefs: &[&str]) -> Result<Vec<CalendarObjectResource>, CalDavError> {
        let mut req = CalendarMultiGetRequest::new();
        for href in hrefs {
            req.add_href((*href).to_string());
        }
        let resp = self
            .object
            .query(Some(req.element()), 1, Verb::Report, None, None)
            .await?;
        let map = parse_calendar_data(&resp)?;
        self.resources_from(map, ComponentKind::Event)
    }

    /// Asks the server for free/busy information over `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails or the reply is not calendar text.
    #[tracing::instrument(skip(self, start, end), fields(url = ?self.url()))]
    pub async fn freebusy_request(
        &self,
        start: impl IntoUtc,
        end: impl IntoUtc,
    ) -> Result<FreeBusy, CalDavError> {
        let req = FreeBusyQueryRequest::new(to_utc_stamp(start)?, to_utc_stamp(end)?);
        let resp = self
            .object
            .query(Some(req.element()), 1, Verb::Report, None, None)
            .await?;
        let data = CalendarData::from_raw(&resp.body)?;
        Ok(FreeBusy::new(self.object.bound_url()?.clone(), data))
    }

    async fn calendar_query(&self, query: &CalendarQueryRequest) -> Result<PropertyMap, CalDavError> {
        let resp = self
            .object
            .query(Some(query.element()), 1, Verb::Report, None, None)
            .await?;
        parse_calendar_data(&resp)
    }

    fn resources_from(
        &self,
        map: PropertyMap,
        kind: ComponentKind,
    ) -> Result<Vec<CalendarObjectResource>, CalDavError> {
        let calendar = self.object.bound_url()?;
        map.into_entries()
            .map(|(_, href, mut props)| {
                let raw = props.remove(tag::CALENDAR_DATA).flatten();
                CalendarObjectResource::listed(
                    self.object.client().clone(),
                    calendar.join(&href)?,
                    calendar.clone(),
                    kind,
                    raw.as_deref(),
                )
            })
            .collect()
    }
}

fn parse_calendar_data(resp: &DavResponse) -> Result<PropertyMap, CalDavError> {
    PropertyMap::from_response(resp, &[Prop::CalendarData], None, Extract::Text)
}
