// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::calendar::Calendar;
use crate::calendar_set::CalendarSet;
use crate::client::DavClient;
use crate::dav_object::DavObject;
use crate::error::{CalDavError, ErrorResponse};
use crate::ical::ComponentKind;
use crate::request::Prop;
use crate::server_url::ServerUrl;
use crate::xml::tag;

/// The authenticated user's principal resource.
///
/// The calendar home set is looked up on first use and cached until
/// [`Principal::invalidate_calendar_home_set`] is called.
#[derive(Debug, Clone)]
pub struct Principal {
    object: DavObject,
    calendar_home_set: Option<CalendarSet>,
}

impl Principal {
    pub(crate) fn new(client: DavClient, url: ServerUrl) -> Self {
        Self {
            object: DavObject::bound(client, url, None),
            calendar_home_set: None,
        }
    }

    /// Finds the principal through `current-user-principal` on the base URL.
    pub(crate) async fn discover(client: DavClient) -> Result<Self, CalDavError> {
        let root = DavObject::new(client.clone(), Some(&client.base_url()), None)?;
        let props = root.get_properties(&[Prop::CurrentUserPrincipal]).await?;
        let href = props
            .get(tag::CURRENT_USER_PRINCIPAL)
            .cloned()
            .flatten()
            .ok_or_else(|| {
                CalDavError::Propfind(ErrorResponse::local(
                    "server did not report a current-user-principal",
                ))
            })?;

        let url = client.join(href.trim())?;
        tracing::debug!(url = %url, "discovered principal");
        Ok(Self::new(client, url))
    }

    /// Returns the underlying DAV resource.
    #[must_use]
    pub const fn dav(&self) -> &DavObject {
        &self.object
    }

    /// Returns the principal URL.
    #[must_use]
    pub const fn url(&self) -> Option<&ServerUrl> {
        self.object.url()
    }

    /// Returns the calendar home set, resolving it on first call.
    ///
    /// If the home set lives on another host, the session is retargeted to
    /// that host.
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPFIND fails or the property is missing.
    pub async fn calendar_home_set(&mut self) -> Result<&CalendarSet, CalDavError> {
        if self.calendar_home_set.is_none() {
            let props = self.object.get_properties(&[Prop::CalendarHomeSet]).await?;
            let href = props
                .get(tag::CALENDAR_HOME_SET)
                .cloned()
                .flatten()
                .ok_or_else(|| {
                    CalDavError::Propfind(ErrorResponse::local(
                        "server did not report a calendar-home-set",
                    ))
                })?;
            let set = self.home_set_from(href.trim())?;
            self.calendar_home_set = Some(set);
        }

        self.calendar_home_set
            .as_ref()
            .ok_or_else(|| CalDavError::InvalidState("calendar home set missing".to_string()))
    }

    /// Uses `url` as calendar home set instead of asking the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn set_calendar_home_set(&mut self, url: &str) -> Result<(), CalDavError> {
        self.calendar_home_set = Some(self.home_set_from(url)?);
        Ok(())
    }

    /// Forgets the cached calendar home set.
    pub fn invalidate_calendar_home_set(&mut self) {
        self.calendar_home_set = None;
    }

    fn home_set_from(&self, href: &str) -> Result<CalendarSet, CalDavError> {
        let client = self.object.client();
        let url = ServerUrl::objectify(href)?;
        let current = client.base_url();
        if let Some(host) = url.hostname()
            && current.hostname() != Some(host)
            && let Some(origin) = url.origin()
        {
            client.set_base_url(origin);
        }
        CalendarSet::new(client.clone(), &client.base_url().join_url(&url)?)
    }

    /// Lists the calendars in the calendar home set.
    ///
    /// # Errors
    ///
    /// Returns an error if the home set cannot be resolved or listed.
    pub async fn calendars(&mut self) -> Result<Vec<Calendar>, CalDavError> {
        self.calendar_home_set().await?.calendars().await
    }

    /// Creates a calendar in the calendar home set.
    ///
    /// # Errors
    ///
    /// Returns an error if the home set cannot be resolved or creation fails.
    pub async fn make_calendar(
        &mut self,
        name: Option<&str>,
        id: Option<&str>,
        components: &[ComponentKind],
    ) -> Result<Calendar, CalDavError> {
        self.calendar_home_set()
            .await?
            .make_calendar(name, id, components)
            .await
    }

    /// Returns a handle for calendar `id` in the home set; only the home set
    /// lookup may touch the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the home set cannot be resolved.
    pub async fn calendar(&mut self, name: Option<&str>, id: &str) -> Result<Calendar, CalDavError> {
        self.calendar_home_set().await?.calendar(name, id)
    }

    /// Deletes every calendar of this principal.
    ///
    /// # Errors
    ///
    /// Returns an error if a deletion fails; a missing home set is not an error.
    pub async fn prune(&mut self) -> Result<(), CalDavError> {
        let calendars = match self.calendars().await {
            Ok(calendars) => calendars,
            Err(CalDavError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        for calendar in calendars {
            match calendar.delete().await {
                Ok(()) | Err(CalDavError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
