// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Generic DAV resource and the query executor shared by all resources.

use crate::client::DavClient;
use crate::error::{CalDavError, ErrorResponse};
use crate::http::DavResponse;
use crate::request::{Prop, PropFindRequest, PropPatchRequest};
use crate::response::{Extract, Properties, PropertyMap, ensure_propstat_success};
use crate::server_url::ServerUrl;
use crate::xml::{XmlElement, tag};

/// XML-bodied verbs issued through [`DavObject::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verb {
    Propfind,
    Report,
    Proppatch,
    Mkcalendar,
}

impl Verb {
    fn error(self, resp: &DavResponse) -> CalDavError {
        let resp = ErrorResponse::from(resp);
        match self {
            Self::Propfind => CalDavError::Propfind(resp),
            Self::Report => CalDavError::Report(resp),
            Self::Proppatch => CalDavError::Propset(resp),
            Self::Mkcalendar => CalDavError::Mkcalendar(resp),
        }
    }
}

/// A member of a collection, as listed by [`DavObject::children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// Absolute URL of the member.
    pub url: ServerUrl,
    /// Qualified tag of its resource type, e.g. `{urn:ietf:params:xml:ns:caldav}calendar`.
    pub resource_type: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// A resource on a DAV server.
///
/// The parent is held by URL only; parents and children never own each
/// other, and both share the session through [`DavClient`].
#[derive(Debug, Clone)]
pub struct DavObject {
    client: DavClient,
    url: Option<ServerUrl>,
    parent: Option<ServerUrl>,
    name: Option<String>,
    id: Option<String>,
}

impl DavObject {
    /// Creates a resource handle. A relative `url` is resolved against the
    /// session's base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be resolved.
    pub fn new(
        client: DavClient,
        url: Option<&ServerUrl>,
        parent: Option<ServerUrl>,
    ) -> Result<Self, CalDavError> {
        let url = url.map(|u| client.base_url().join_url(u)).transpose()?;
        Ok(Self {
            client,
            url,
            parent,
            name: None,
            id: None,
        })
    }

    /// Creates a handle for a resource not yet stored on the server.
    pub(crate) const fn unbound(client: DavClient, parent: Option<ServerUrl>) -> Self {
        Self {
            client,
            url: None,
            parent,
            name: None,
            id: None,
        }
    }

    /// Creates a handle for an already resolved URL.
    pub(crate) const fn bound(client: DavClient, url: ServerUrl, parent: Option<ServerUrl>) -> Self {
        Self {
            client,
            url: Some(url),
            parent,
            name: None,
            id: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Returns the session.
    #[must_use]
    pub const fn client(&self) -> &DavClient {
        &self.client
    }

    /// Returns the URL, if the resource is bound to one.
    #[must_use]
    pub const fn url(&self) -> Option<&ServerUrl> {
        self.url.as_ref()
    }

    /// Returns the URL of the parent collection.
    #[must_use]
    pub const fn parent(&self) -> Option<&ServerUrl> {
        self.parent.as_ref()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the URL without embedded credentials.
    #[must_use]
    pub fn canonical_url(&self) -> Option<String> {
        self.url.as_ref().map(ServerUrl::unauthenticated)
    }

    pub(crate) fn set_url(&mut self, url: Option<ServerUrl>) {
        self.url = url;
    }

    pub(crate) fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ServerUrl>) {
        self.parent = parent;
    }

    /// Returns the URL or fails for an unbound resource.
    pub(crate) fn bound_url(&self) -> Result<&ServerUrl, CalDavError> {
        self.url
            .as_ref()
            .ok_or_else(|| CalDavError::InvalidState("resource has no URL yet".to_string()))
    }

    /// Returns the parent URL or fails for a resource without parent.
    pub(crate) fn parent_url(&self) -> Result<&ServerUrl, CalDavError> {
        self.parent
            .as_ref()
            .ok_or_else(|| CalDavError::InvalidState("resource has no parent collection".to_string()))
    }

    /// Issues an XML-bodied verb and applies the status policy.
    ///
    /// Without explicit `url` the request targets this resource's URL with a
    /// trailing slash. A 404 is [`CalDavError::NotFound`]; any other status
    /// of 400 or above, or a status differing from `expected`, is the error
    /// kind of the verb.
    pub(crate) async fn query(
        &self,
        root: Option<XmlElement>,
        depth: u8,
        verb: Verb,
        url: Option<&ServerUrl>,
        expected: Option<u16>,
    ) -> Result<DavResponse, CalDavError> {
        let url = match url {
            Some(url) => url.clone(),
            None => self.bound_url()?.ensure_trailing_slash(),
        };
        let body = root.map(|r| r.to_document()).transpose()?;

        let resp = match verb {
            Verb::Propfind => self.client.propfind(&url, body, depth).await?,
            Verb::Report => {
                self.client
                    .report(&url, body.unwrap_or_default(), depth)
                    .await?
            }
            Verb::Proppatch => self.client.proppatch(&url, body.unwrap_or_default()).await?,
            Verb::Mkcalendar => self.client.mkcalendar(&url, body.unwrap_or_default()).await?,
        };

        if resp.status == 404 {
            return Err(CalDavError::NotFound(ErrorResponse::from(&resp)));
        }
        if expected.is_some_and(|e| e != resp.status) || resp.status >= 400 {
            return Err(verb.error(&resp));
        }
        Ok(resp)
    }

    /// Lists the members of this collection.
    ///
    /// With `resource_type` only members of that type (a qualified tag such
    /// as [`tag::CALENDAR`]) are returned. The collection itself is never
    /// part of the result, even when the server lists it.
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPFIND fails.
    #[tracing::instrument(skip(self), fields(url = ?self.url))]
    pub async fn children(&self, resource_type: Option<&str>) -> Result<Vec<Child>, CalDavError> {
        let props = [Prop::ResourceType, Prop::DisplayName];
        let mut req = PropFindRequest::new();
        for prop in props {
            req.add_property(prop);
        }

        let resp = self
            .query(req.element(), 1, Verb::Propfind, None, None)
            .await?;
        let map = PropertyMap::from_response(&resp, &props, resource_type, Extract::Tag)?;

        let own = self.bound_url()?.strip_trailing_slash();
        let mut children = Vec::new();
        for (_, href, mut values) in map.into_entries() {
            let found_type = values.remove(tag::RESOURCE_TYPE).flatten();
            if resource_type.is_some() && found_type.as_deref() != resource_type {
                continue;
            }

            let url = self.bound_url()?.join(&href)?;
            if url.strip_trailing_slash() == own {
                continue;
            }
            children.push(Child {
                url,
                resource_type: found_type,
                display_name: values.remove(tag::DISPLAY_NAME).flatten(),
            });
        }
        Ok(children)
    }

    /// Reads properties of this resource with a depth-0 PROPFIND.
    ///
    /// Servers key the reply by the path with or without trailing slash;
    /// either is accepted. Any other key is [`CalDavError::PathMismatch`].
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPFIND fails or the reply names another path.
    #[tracing::instrument(skip(self), fields(url = ?self.url))]
    pub async fn get_properties(&self, props: &[Prop]) -> Result<Properties, CalDavError> {
        let mut req = PropFindRequest::new();
        for prop in props {
            req.add_property(*prop);
        }

        let resp = self
            .query(req.element(), 0, Verb::Propfind, None, None)
            .await?;
        let mut map = PropertyMap::from_response(&resp, props, None, Extract::Text)?;

        let unquoted = self.bound_url()?.unquoted_path();
        let path = unquoted.strip_suffix('/').unwrap_or(&unquoted).to_string();
        let exchange = format!("{path}/");
        map.remove(&path)
            .or_else(|| map.remove(&exchange))
            .ok_or(CalDavError::PathMismatch { path })
    }

    /// Sets properties with a PROPPATCH; every property must be applied.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Propset`] if the server rejects any property.
    #[tracing::instrument(skip(self, props), fields(url = ?self.url))]
    pub async fn set_properties(&self, props: Vec<XmlElement>) -> Result<(), CalDavError> {
        let req = props
            .into_iter()
            .fold(PropPatchRequest::new(), PropPatchRequest::set);
        let resp = self
            .query(Some(req.element()), 0, Verb::Proppatch, None, None)
            .await?;
        ensure_propstat_success(&resp)
    }

    /// Deletes the resource. A 404 counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Delete`] for any status but 200, 204 and 404.
    #[tracing::instrument(skip(self), fields(url = ?self.url))]
    pub async fn delete(&self) -> Result<(), CalDavError> {
        let url = self.bound_url()?;
        let resp = self.client.delete(url).await?;
        match resp.status {
            200 | 204 => {
                tracing::info!(url = %url, "deleted resource");
                Ok(())
            }
            404 => {
                tracing::warn!(url = %url, "resource was already gone");
                Ok(())
            }
            _ => Err(CalDavError::Delete(ErrorResponse::from(&resp))),
        }
    }
}
