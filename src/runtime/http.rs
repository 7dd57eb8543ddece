//! Request and response model shared by the runtime components

use crate::error::PwaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a request is for, as classified by the browser
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Document,
    Image,
    Audio,
    Video,
    Font,
    /// No destination; fetch()/XHR style requests, including page data
    Empty,
    Other(String),
}

impl Destination {
    pub fn parse(value: &str) -> Self {
        match value {
            "document" => Self::Document,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "font" => Self::Font,
            "" => Self::Empty,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Font => "font",
            Self::Empty => "",
            Self::Other(s) => s,
        }
    }
}

/// An outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub method: String,
    pub destination: Destination,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            destination: Destination::Empty,
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }
}

/// Response type as exposed to scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
    OpaqueRedirect,
    Error,
}

/// A response, either fetched or served from cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// Final URL differs from the requested one
    pub redirected: bool,
    pub kind: ResponseKind,
}

impl Response {
    /// 200 response with the given body
    pub fn ok(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            status_text: "OK".to_string(),
            headers: BTreeMap::new(),
            body: body.into(),
            redirected: false,
            kind: ResponseKind::Basic,
        }
    }

    pub fn with_status(mut self, status: u16, status_text: impl Into<String>) -> Self {
        self.status = status;
        self.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Generic network error, the equivalent of `Response.error()`
    pub fn error() -> Self {
        Self {
            url: String::new(),
            status: 0,
            status_text: String::new(),
            headers: BTreeMap::new(),
            body: Vec::new(),
            redirected: false,
            kind: ResponseKind::Error,
        }
    }

    /// Status in the 200-299 range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResponseKind::Error
    }

    /// Rebuild a redirected response as a plain 200 so it can be served for the original URL
    ///
    /// Body and headers are kept. Non-redirected responses pass through untouched.
    pub fn normalize_redirect(self) -> Self {
        if !self.redirected && self.kind != ResponseKind::OpaqueRedirect {
            return self;
        }
        Self {
            status: 200,
            status_text: "OK".to_string(),
            redirected: false,
            kind: ResponseKind::Basic,
            ..self
        }
    }
}

/// URL with query string and fragment removed
pub fn strip_search(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Network access for the page context
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a request; transport failures are errors, HTTP error statuses are not
    async fn fetch(&self, request: &Request) -> PwaResult<Response>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_parse() {
        assert_eq!(Destination::parse("document"), Destination::Document);
        assert_eq!(Destination::parse(""), Destination::Empty);
        assert_eq!(
            Destination::parse("script"),
            Destination::Other("script".to_string())
        );
        assert_eq!(Destination::parse("font").as_str(), "font");
    }

    #[test]
    fn redirected_response_normalized() {
        let mut response = Response::ok("/home", b"<html>".to_vec()).with_header("content-type", "text/html");
        response.redirected = true;
        response.status = 200;

        let normalized = response.normalize_redirect();
        assert_eq!(normalized.status, 200);
        assert_eq!(normalized.status_text, "OK");
        assert!(!normalized.redirected);
        assert_eq!(normalized.body, b"<html>");
        assert_eq!(normalized.headers["content-type"], "text/html");
    }

    #[test]
    fn opaque_redirect_normalized() {
        let mut response = Response::ok("/", Vec::new()).with_status(0, "");
        response.kind = ResponseKind::OpaqueRedirect;

        let normalized = response.normalize_redirect();
        assert_eq!(normalized.status, 200);
        assert_eq!(normalized.kind, ResponseKind::Basic);
    }

    #[test]
    fn plain_response_untouched() {
        let response = Response::ok("/a", Vec::new()).with_status(404, "Not Found");
        assert_eq!(response.clone().normalize_redirect(), response);
    }

    #[test]
    fn error_response() {
        let response = Response::error();
        assert!(response.is_error());
        assert!(!response.is_ok());
    }

    #[test]
    fn strip_search_variants() {
        assert_eq!(strip_search("/_offline?x=1"), "/_offline");
        assert_eq!(strip_search("/page#top"), "/page");
        assert_eq!(strip_search("/plain"), "/plain");
    }
}
