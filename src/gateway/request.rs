use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Method;
use url::Url;

use crate::domain::MediaUpload;
use crate::store::CacheEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` fields
    Form(Vec<(String, String)>),
    /// `multipart/form-data` with text fields and one file part
    Multipart {
        fields: Vec<(String, String)>,
        file_field: String,
        file: MediaUpload,
    },
}

/// An outbound request as seen by the gateway.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post(url: Url, body: RequestBody) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// Add a header. Values that are not valid header text are skipped.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn accept(self, value: &str) -> Self {
        self.header(ACCEPT, value)
    }

    /// Cache key for this request. Headers are not part of the identity.
    pub fn identity(&self) -> String {
        CacheEntry::request_key(self.method.as_str(), self.url.as_str())
    }

    /// Whether the declared `Accept` asks for a document.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Opaque,
    /// A network-level error response. Never cached.
    Error,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOrigin {
    Network,
    Cache,
    /// Last-resort root document served for a failed page request.
    Shell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub origin: ResponseOrigin,
}

impl Response {
    pub fn new(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            kind: ResponseKind::Basic,
            content_type,
            body,
            origin: ResponseOrigin::Network,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn from_entry(entry: CacheEntry, origin: ResponseOrigin) -> Self {
        Self {
            status: entry.status,
            kind: ResponseKind::Basic,
            content_type: entry.content_type,
            body: entry.body,
            origin,
        }
    }

    pub fn to_entry(&self, store: &str, request: &Request) -> CacheEntry {
        CacheEntry {
            store: store.to_string(),
            key: request.identity(),
            url: request.url.to_string(),
            status: self.status,
            content_type: self.content_type.clone(),
            body: self.body.clone(),
            cached_at: Utc::now(),
        }
    }
}
