pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::TimelineFilter;

#[derive(Parser)]
#[command(name = "confluence")]
#[command(about = "One timeline for Fanfou and Mastodon, with an offline cache", long_about = None)]
pub struct Cli {
    /// Database path (default: <data dir>/confluence/cache.db)
    #[arg(long, global = true)]
    pub db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the merged home timeline
    Timeline {
        /// Which sources to show: all, fanfou, mastodon
        #[arg(short, long, default_value_t = TimelineFilter::All)]
        filter: TimelineFilter,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Print the comments of a post
    Thread {
        /// Global post id, e.g. ff_abc or mast_123
        post_id: String,
    },
    /// Reply to a post
    Reply {
        /// Global post id
        post_id: String,
        content: String,

        /// Author of the post (Fanfou only)
        #[arg(long)]
        reply_to_user: Option<String>,
    },
    /// Post the same message to both accounts
    Post {
        content: String,

        /// Attach an image
        #[arg(short, long)]
        media: Option<std::path::PathBuf>,
    },
    /// Inspect or manage the offline cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cache stores and entry counts
    Status,
    /// Activate the configured generation without waiting
    Activate,
    /// Delete every cache store
    Uninstall,
}
