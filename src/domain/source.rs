use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two backends being aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Flat, chronological backend. Threads come back as one list.
    Fanfou,
    /// Threaded backend. Threads come back split into ancestors and descendants.
    Mastodon,
}

impl Source {
    /// Merge order used whenever both sources are concatenated.
    pub const ALL: [Source; 2] = [Source::Fanfou, Source::Mastodon];

    pub fn prefix(self) -> &'static str {
        match self {
            Source::Fanfou => "ff_",
            Source::Mastodon => "mast_",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Source::Fanfou => "fanfou",
            Source::Mastodon => "mastodon",
        }
    }

    /// Build the global id of a post from its backend-native id.
    pub fn global_id(self, native_id: &str) -> String {
        format!("{}{}", self.prefix(), native_id)
    }

    /// Strip this source's prefix from a global id. Ids without the prefix
    /// are returned unchanged.
    pub fn native_id(self, post_id: &str) -> &str {
        post_id.strip_prefix(self.prefix()).unwrap_or(post_id)
    }

    /// Infer the source of a global post id from its prefix.
    pub fn from_post_id(post_id: &str) -> Option<Source> {
        Self::ALL
            .into_iter()
            .find(|source| post_id.starts_with(source.prefix()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which sources the merged timeline shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineFilter {
    #[default]
    All,
    Fanfou,
    Mastodon,
}

impl TimelineFilter {
    pub fn includes(self, source: Source) -> bool {
        match self {
            TimelineFilter::All => true,
            TimelineFilter::Fanfou => source == Source::Fanfou,
            TimelineFilter::Mastodon => source == Source::Mastodon,
        }
    }
}

impl FromStr for TimelineFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(TimelineFilter::All),
            "fanfou" | "ff" => Ok(TimelineFilter::Fanfou),
            "mastodon" | "mast" => Ok(TimelineFilter::Mastodon),
            other => Err(format!(
                "Unknown filter: {}. Use 'all', 'fanfou' or 'mastodon'",
                other
            )),
        }
    }
}

impl fmt::Display for TimelineFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineFilter::All => f.write_str("all"),
            TimelineFilter::Fanfou => f.write_str("fanfou"),
            TimelineFilter::Mastodon => f.write_str("mastodon"),
        }
    }
}
