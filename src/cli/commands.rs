use std::path::Path;

use tracing::warn;

use crate::app::{AppContext, ConfluenceError, Result};
use crate::domain::{Comment, MediaUpload, Post, PostDraft, Source, TimelineFilter};
use crate::gateway::{ControlMessage, Phase};
use crate::timeline::LoadOutcome;

/// Bring the cache up before serving a command. A failed install only
/// means requests go straight to the network.
pub async fn start_cache(ctx: &AppContext) -> Phase {
    match ctx.gateway.start().await {
        Ok(phase) => phase,
        Err(e) => {
            warn!("Offline cache unavailable: {}", e);
            ctx.gateway.phase()
        }
    }
}

/// This process was the last consumer of the previous generation, so a
/// waiting generation takes over once the command is done.
pub fn finish_cache(ctx: &AppContext) {
    if ctx.gateway.phase() != Phase::Waiting {
        return;
    }
    if let Err(e) = ctx.gateway.release_consumers() {
        warn!("Could not activate waiting cache: {}", e);
    }
}

pub async fn show_timeline(ctx: &AppContext, filter: TimelineFilter, pages: usize) -> Result<()> {
    let mut outcome = if filter == ctx.timeline.filter() {
        ctx.timeline.load().await
    } else {
        ctx.timeline.set_filter(filter).await
    };

    for _ in 1..pages {
        if !ctx.timeline.has_more() {
            break;
        }
        outcome = ctx.timeline.load_more().await;
    }

    if let LoadOutcome::Loaded(reports) = &outcome {
        for report in reports {
            if let Some(error) = &report.error {
                eprintln!("  Error loading {}: {}", report.source, error);
            }
        }
    }

    let posts = ctx.timeline.merged_view();
    if posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in &posts {
        print_post(post);
    }
    println!("{} posts", posts.len());
    Ok(())
}

pub async fn show_thread(ctx: &AppContext, post_id: &str) -> Result<()> {
    let source = source_of(post_id)?;
    let comments = ctx.threads.fetch_comments(post_id, source).await;

    if comments.is_empty() {
        println!("No comments");
        return Ok(());
    }

    for comment in &comments {
        print_comment(comment);
    }
    if let Some(thread) = ctx.threads.snapshot(post_id) {
        println!(
            "{} comments, fetched {}",
            thread.comments.len(),
            thread.fetched_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn reply(
    ctx: &AppContext,
    post_id: &str,
    content: &str,
    reply_to_user: Option<&str>,
) -> Result<()> {
    let source = source_of(post_id)?;
    let post = ctx
        .threads
        .send_comment(post_id, content, source, reply_to_user)
        .await?;
    println!("Replied: {}", post.id);

    if let Some(comments) = ctx.threads.cached_comments(post_id) {
        println!("Thread now has {} comments", comments.len());
    }
    Ok(())
}

pub async fn post(ctx: &AppContext, content: &str, media: Option<&Path>) -> Result<()> {
    let mut draft = PostDraft::new(content);
    if let Some(path) = media {
        draft = draft.with_media(MediaUpload::from_path(path)?);
    }

    let posted = ctx.composer.send_message(&draft).await?;
    println!("Posted {} and {}", posted.fanfou.id, posted.mastodon.id);
    Ok(())
}

pub fn cache_status(ctx: &AppContext) -> Result<()> {
    let generation = ctx.gateway.generation();
    println!(
        "Generation {} ({})",
        generation.static_store(),
        ctx.gateway.phase()
    );

    let stores = ctx.gateway.status()?;
    if stores.is_empty() {
        println!("No cache stores");
        return Ok(());
    }

    for store in stores {
        let marker = if store.current { "*" } else { " " };
        println!("{} {} ({} entries)", marker, store.name, store.entries);
    }
    Ok(())
}

pub async fn cache_activate(ctx: &AppContext) -> Result<()> {
    if start_cache(ctx).await == Phase::Active {
        println!("Already active");
        return Ok(());
    }

    let phase = ctx.gateway.handle_message(ControlMessage::ForceActivate)?;
    println!("Cache {}", phase);
    Ok(())
}

pub fn cache_uninstall(ctx: &AppContext) -> Result<()> {
    let deleted = ctx.gateway.uninstall()?;
    for name in &deleted {
        println!("Deleted {}", name);
    }
    println!("Removed {} stores", deleted.len());
    Ok(())
}

fn source_of(post_id: &str) -> Result<Source> {
    Source::from_post_id(post_id).ok_or_else(|| {
        ConfluenceError::Other(format!(
            "Unknown post id: {} (expected an ff_ or mast_ prefix)",
            post_id
        ))
    })
}

fn print_post(post: &Post) {
    println!(
        "{} [{}] {}  {}",
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.source,
        post.author(),
        post.id
    );
    println!("  {}", post.text());
    for media in post.media() {
        if let Some(url) = media.url.or(media.preview_url) {
            println!("  📎 {}", url);
        }
    }
}

fn print_comment(comment: &Comment) {
    let marker = if comment.is_ancestor { "↑" } else { "↳" };
    match Post::from_raw(comment.raw.clone()) {
        Ok(post) => println!(
            "{} {} {}: {}",
            marker,
            comment.created_at.format("%Y-%m-%d %H:%M"),
            post.author(),
            post.text()
        ),
        Err(_) => println!("{} {}", marker, comment.id),
    }
}
