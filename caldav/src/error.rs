// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::http::DavResponse;

/// Status line and body of a server reply that was rejected.
///
/// Every protocol-level error carries one of these so callers can see what
/// the server actually said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase, empty when the transport didn't report one.
    pub reason: String,
    /// Raw response body.
    pub body: String,
}

impl ErrorResponse {
    /// Builds an error payload with no body, for failures detected locally.
    #[must_use]
    pub fn local(reason: impl Into<String>) -> Self {
        Self {
            status: 0,
            reason: reason.into(),
            body: String::new(),
        }
    }
}

impl From<&DavResponse> for ErrorResponse {
    fn from(resp: &DavResponse) -> Self {
        Self {
            status: resp.status,
            reason: resp.reason.clone(),
            body: resp.body.clone(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.reason)?;
        if !self.body.is_empty() {
            write!(f, "\n\n{}", self.body)?;
        }
        Ok(())
    }
}

/// `CalDAV` client errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CalDavError {
    /// Resource absent on the server.
    #[error("resource not found: {0}")]
    NotFound(ErrorResponse),

    /// A REPORT failed or a multistatus item carried a disallowed status.
    #[error("report failed: {0}")]
    Report(ErrorResponse),

    /// A PROPFIND was rejected.
    #[error("propfind failed: {0}")]
    Propfind(ErrorResponse),

    /// A PROPPATCH item was not applied.
    #[error("property update failed: {0}")]
    Propset(ErrorResponse),

    /// A MKCALENDAR was rejected.
    #[error("calendar creation failed: {0}")]
    Mkcalendar(ErrorResponse),

    /// A write was rejected, or there was nothing to key the write on.
    #[error("write failed: {0}")]
    Put(ErrorResponse),

    /// A DELETE returned something other than 200, 204 or 404.
    #[error("delete failed: {0}")]
    Delete(ErrorResponse),

    /// Loading a resource failed with a server-side error.
    #[error("server error: {0}")]
    Server(ErrorResponse),

    /// The depth-0 multistatus was keyed by neither form of the requested path.
    #[error("server returned properties for an unexpected path (wanted {path})")]
    PathMismatch {
        /// The path that was looked up, without trailing slash.
        path: String,
    },

    /// The operation is not valid in the resource's current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// HTTP layer error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// XML parsing/writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// iCalendar parsing error.
    #[error("iCalendar parsing error: {0}")]
    Ical(String),

    /// A URL could not be parsed or joined.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A date or time value could not be parsed or converted.
    #[error("invalid date/time: {0}")]
    Time(String),
}

impl CalDavError {
    /// Returns the server reply behind a protocol error, if any.
    #[must_use]
    pub const fn response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::NotFound(r)
            | Self::Report(r)
            | Self::Propfind(r)
            | Self::Propset(r)
            | Self::Mkcalendar(r)
            | Self::Put(r)
            | Self::Delete(r)
            | Self::Server(r) => Some(r),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CalDavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<roxmltree::Error> for CalDavError {
    fn from(e: roxmltree::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

/// The XML writer reports its failures as IO errors.
impl From<std::io::Error> for CalDavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("write error: {e}"))
    }
}

impl From<jiff::Error> for CalDavError {
    fn from(e: jiff::Error) -> Self {
        Self::Time(e.to_string())
    }
}

impl From<url::ParseError> for CalDavError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}
