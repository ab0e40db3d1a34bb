//! Backend payloads as they come off the wire.
//!
//! Only the fields the engine reads are typed; everything else is kept in
//! `extra` so a [`RawPost`] can be handed back to consumers unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Source;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanfouUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanfouPhoto {
    #[serde(default)]
    pub imageurl: Option<String>,
    #[serde(default)]
    pub thumburl: Option<String>,
    #[serde(default)]
    pub largeurl: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanfouStatus {
    pub id: String,
    /// `"Wed Apr 09 06:25:52 +0000 2025"`
    pub created_at: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: Option<FanfouUser>,
    #[serde(default)]
    pub photo: Option<FanfouPhoto>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MastodonAccount {
    pub id: String,
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MastodonMedia {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MastodonStatus {
    pub id: String,
    /// RFC 3339, e.g. `"2025-04-09T03:41:49.631Z"`
    pub created_at: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub account: Option<MastodonAccount>,
    #[serde(default)]
    pub media_attachments: Vec<MastodonMedia>,
    #[serde(default)]
    pub reblog: Option<Box<MastodonStatus>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A post or comment in its backend-native shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "payload", rename_all = "lowercase")]
pub enum RawPost {
    Fanfou(FanfouStatus),
    Mastodon(MastodonStatus),
}

impl RawPost {
    pub fn source(&self) -> Source {
        match self {
            RawPost::Fanfou(_) => Source::Fanfou,
            RawPost::Mastodon(_) => Source::Mastodon,
        }
    }

    pub fn native_id(&self) -> &str {
        match self {
            RawPost::Fanfou(status) => &status.id,
            RawPost::Mastodon(status) => &status.id,
        }
    }

    pub fn created_at(&self) -> &str {
        match self {
            RawPost::Fanfou(status) => &status.created_at,
            RawPost::Mastodon(status) => &status.created_at,
        }
    }
}

/// A comment thread as returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RawThread {
    /// Chronological list that includes the post itself.
    Flat(Vec<RawPost>),
    /// Threaded context around the post, excluding the post itself.
    Split {
        ancestors: Vec<RawPost>,
        descendants: Vec<RawPost>,
    },
}
