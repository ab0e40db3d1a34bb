//! # Confluence
//!
//! One chronological timeline for a Fanfou and a Mastodon account, with
//! comment threads and an offline response cache.
//!
//! ## Architecture
//!
//! ```text
//! Timeline / Threads / Composer → Source Adapters → Gateway → Network
//!                                                      ↕
//!                                                    Store
//! ```
//!
//! - [`timeline`]: merges and pages both home timelines
//! - [`thread`]: per-post comment threads with single-flight fetches
//! - [`adapter`]: Fanfou and Mastodon REST clients behind one trait
//! - [`gateway`]: network-first cache policy and generation lifecycle
//! - [`store`]: SQLite response cache and in-memory thread snapshots
//!
//! ## Quick Start
//!
//! ```bash
//! # Merged timeline, three pages deep
//! confluence timeline --pages 3
//!
//! # Only Mastodon
//! confluence timeline --filter mastodon
//!
//! # Comments of a post
//! confluence thread mast_110234
//!
//! # Post to both accounts
//! confluence post "hello" --media cat.png
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the gateway,
/// both adapters, the timeline, the thread manager and the composer.
pub mod app;

/// Configuration loaded from `~/.config/confluence/config.toml`.
pub mod config;

/// Command-line interface using clap.
///
/// - `timeline [--filter] [--pages]` - Print the merged feed
/// - `thread <post-id>` - Print a comment thread
/// - `reply <post-id> <content>` - Reply to a post
/// - `post <content> [--media]` - Post to both accounts
/// - `cache status|activate|uninstall` - Manage the offline cache
pub mod cli;

/// Core domain models.
///
/// - [`Post`](domain::Post): a timeline entry with a source-prefixed id
/// - [`Comment`](domain::Comment): one entry of a comment thread
/// - [`RawPost`](domain::RawPost): backend payload, kept verbatim
pub mod domain;

/// Backend adapters.
///
/// - [`SourceAdapter`](adapter::SourceAdapter): async trait over one backend
/// - [`FanfouAdapter`](adapter::FanfouAdapter): flat threads
/// - [`MastodonAdapter`](adapter::MastodonAdapter): split threads
pub mod adapter;

/// Cache-policy gateway in front of the network.
pub mod gateway;

/// Response cache and thread snapshot storage.
///
/// - [`Store`](store::Store): trait over named, generation-tagged stores
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

pub mod timeline;

pub mod thread;

/// Posting one message to both accounts.
pub mod compose;
