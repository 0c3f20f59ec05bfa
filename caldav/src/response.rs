// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for WebDAV/CalDAV operations.

use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use crate::error::{CalDavError, ErrorResponse};
use crate::http::DavResponse;
use crate::request::Prop;
use crate::server_url::unquote;
use crate::xml::tag;

/// How a property with child elements is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extract {
    /// Text content of the selected child.
    #[default]
    Text,
    /// Qualified tag of the selected child, e.g. `{DAV:}collection`.
    Tag,
}

/// Property values of one resource, keyed by qualified tag.
pub type Properties = BTreeMap<String, Option<String>>;

/// Properties of every resource in a multistatus, keyed by unescaped href.
///
/// The href as the server sent it is kept next to each entry; URLs must be
/// built from that form, since unescaping can turn `%3F` into a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    props: BTreeMap<String, Properties>,
    hrefs: BTreeMap<String, String>,
}

impl PropertyMap {
    /// Decodes a multistatus reply.
    ///
    /// Each `<response>` must carry status 200, 207 or 404; anything else
    /// aborts the parse. Properties missing from a response map to `None`.
    /// With `child_tag`, a property with child elements is read from its first
    /// descendant of that tag instead of its first descendant of any kind.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Report`] on a disallowed or missing status, and
    /// [`CalDavError::Xml`] if the body is not well-formed.
    pub fn from_response(
        resp: &DavResponse,
        props: &[Prop],
        child_tag: Option<&str>,
        extract: Extract,
    ) -> Result<Self, CalDavError> {
        let doc = Document::parse(&resp.body)?;
        let mut map = Self::default();

        for response in doc
            .descendants()
            .filter(|n| n.is_element() && qualified(*n) == tag::RESPONSE)
        {
            let status = first_descendant(response, tag::STATUS)
                .and_then(|n| status_code(&text_of(n).unwrap_or_default()));
            if !matches!(status, Some(200 | 207 | 404)) {
                return Err(CalDavError::Report(ErrorResponse::from(resp)));
            }

            let href = first_descendant(response, tag::HREF)
                .and_then(text_of)
                .ok_or_else(|| CalDavError::Report(ErrorResponse::from(resp)))?;

            let values = props
                .iter()
                .map(|prop| {
                    let tag = prop.tag();
                    let value = first_descendant(response, &tag)
                        .and_then(|elem| property_value(elem, child_tag, extract));
                    (tag, value)
                })
                .collect();

            let href = href.trim();
            let path = unquote(href);
            map.hrefs.insert(path.clone(), href.to_string());
            map.props.insert(path, values);
        }

        Ok(map)
    }

    /// Returns the properties of the resource at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Properties> {
        self.props.get(path)
    }

    /// Returns the href of the resource at `path`, still percent-encoded.
    #[must_use]
    pub fn href(&self, path: &str) -> Option<&str> {
        self.hrefs.get(path).map(String::as_str)
    }

    /// Removes and returns the properties of the resource at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Properties> {
        self.hrefs.remove(path);
        self.props.remove(path)
    }

    /// Iterates over `(path, properties)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Properties)> {
        self.props.iter()
    }

    /// Consumes the map into `(path, href, properties)` triples in path
    /// order, where `href` is the percent-encoded form to resolve URLs from.
    pub fn into_entries(self) -> impl Iterator<Item = (String, String, Properties)> {
        let Self { props, mut hrefs } = self;
        props.into_iter().map(move |(path, values)| {
            let href = hrefs.remove(&path).unwrap_or_else(|| path.clone());
            (path, href, values)
        })
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.props.len()
    }

    /// Returns whether the multistatus listed no resource.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, Properties);
    type IntoIter = std::collections::btree_map::IntoIter<String, Properties>;

    fn into_iter(self) -> Self::IntoIter {
        self.props.into_iter()
    }
}

/// Checks that every status in a PROPPATCH multistatus reads 200.
///
/// # Errors
///
/// Returns [`CalDavError::Propset`] if any property was not applied.
pub fn ensure_propstat_success(resp: &DavResponse) -> Result<(), CalDavError> {
    let doc = Document::parse(&resp.body)?;
    let failed = doc
        .descendants()
        .filter(|n| n.is_element() && qualified(*n) == tag::STATUS)
        .any(|n| status_code(&text_of(n).unwrap_or_default()) != Some(200));
    if failed {
        return Err(CalDavError::Propset(ErrorResponse::from(resp)));
    }
    Ok(())
}

fn property_value(elem: Node<'_, '_>, child_tag: Option<&str>, extract: Extract) -> Option<String> {
    if !elem.children().any(|n| n.is_element()) {
        return text_of(elem);
    }

    let child = match child_tag {
        Some(wanted) => first_descendant(elem, wanted),
        None => elem.descendants().skip(1).find(Node::is_element),
    }?;

    match extract {
        Extract::Text => text_of(child),
        Extract::Tag => Some(qualified(child)),
    }
}

/// First element below `node` (excluding itself) with the given qualified tag.
fn first_descendant<'a, 'input>(node: Node<'a, 'input>, wanted: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|n| n.is_element() && qualified(*n) == wanted)
}

fn qualified(node: Node<'_, '_>) -> String {
    let name = node.tag_name();
    match name.namespace() {
        Some(ns) => format!("{{{ns}}}{}", name.name()),
        None => name.name().to_string(),
    }
}

/// Concatenated direct text content, `None` for an element without text.
fn text_of(node: Node<'_, '_>) -> Option<String> {
    let mut texts = node.children().filter(Node::is_text).peekable();
    texts.peek()?;
    Some(texts.filter_map(|n| n.text()).collect())
}

/// Extracts the code from a status line like `HTTP/1.1 200 OK`.
fn status_code(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_reads_second_token() {
        assert_eq!(status_code("HTTP/1.1 200 OK"), Some(200));
        assert_eq!(status_code("  HTTP/1.1 404 Not Found "), Some(404));
        assert_eq!(status_code("HTTP/1.1"), None);
        assert_eq!(status_code("garbage"), None);
    }
}
