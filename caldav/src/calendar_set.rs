// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::calendar::Calendar;
use crate::client::DavClient;
use crate::dav_object::DavObject;
use crate::error::CalDavError;
use crate::ical::ComponentKind;
use crate::server_url::{ServerUrl, quote};
use crate::xml::tag;

/// A collection of calendars, typically a principal's calendar home.
#[derive(Debug, Clone)]
pub struct CalendarSet {
    object: DavObject,
}

impl CalendarSet {
    /// Creates a handle for the calendar set at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be resolved.
    pub fn new(client: DavClient, url: &ServerUrl) -> Result<Self, CalDavError> {
        Ok(Self {
            object: DavObject::new(client, Some(url), None)?,
        })
    }

    /// Returns the underlying DAV resource.
    #[must_use]
    pub const fn dav(&self) -> &DavObject {
        &self.object
    }

    /// Returns the URL of the set.
    #[must_use]
    pub const fn url(&self) -> Option<&ServerUrl> {
        self.object.url()
    }

    /// Lists the calendars in this set; a missing set yields no calendars.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails for another reason.
    pub async fn calendars(&self) -> Result<Vec<Calendar>, CalDavError> {
        let children = match self.object.children(Some(tag::CALENDAR)).await {
            Ok(children) => children,
            Err(CalDavError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let parent = self.object.bound_url()?.clone();
        children
            .into_iter()
            .map(|child| {
                Calendar::at(
                    self.object.client().clone(),
                    &child.url,
                    Some(parent.clone()),
                    child.display_name,
                )
            })
            .collect()
    }

    /// Creates a calendar in this set.
    ///
    /// Without `id` a time-ordered identifier is generated. An empty
    /// `components` leaves the accepted component types to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails; see [`Calendar::save`].
    pub async fn make_calendar(
        &self,
        name: Option<&str>,
        id: Option<&str>,
        components: &[ComponentKind],
    ) -> Result<Calendar, CalDavError> {
        let mut calendar = Calendar::unsaved(
            self.object.client().clone(),
            self.object.bound_url()?.clone(),
            name.map(ToString::to_string),
            id.map(ToString::to_string),
            components,
        );
        calendar.save().await?;
        Ok(calendar)
    }

    /// Returns a handle for the calendar `id` in this set without contacting
    /// the server. The URL always ends with a slash.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn calendar(&self, name: Option<&str>, id: &str) -> Result<Calendar, CalDavError> {
        let url = self
            .object
            .bound_url()?
            .ensure_trailing_slash()
            .join(&quote(id))?
            .ensure_trailing_slash();
        let calendar = Calendar::at(
            self.object.client().clone(),
            &url,
            Some(self.object.bound_url()?.clone()),
            name.map(ToString::to_string),
        )?;
        Ok(calendar.with_id(id))
    }
}
