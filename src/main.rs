use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use confluence::app::AppContext;
use confluence::cli::{commands, CacheAction, Cli, Commands};
use confluence::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config, cli.db)?;

    let serves_requests = !matches!(cli.command, Commands::Cache { .. });

    match cli.command {
        Commands::Timeline { filter, pages } => {
            commands::start_cache(&ctx).await;
            commands::show_timeline(&ctx, filter, pages).await?;
        }
        Commands::Thread { post_id } => {
            commands::start_cache(&ctx).await;
            commands::show_thread(&ctx, &post_id).await?;
        }
        Commands::Reply {
            post_id,
            content,
            reply_to_user,
        } => {
            commands::start_cache(&ctx).await;
            commands::reply(&ctx, &post_id, &content, reply_to_user.as_deref()).await?;
        }
        Commands::Post { content, media } => {
            commands::start_cache(&ctx).await;
            commands::post(&ctx, &content, media.as_deref()).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Status => commands::cache_status(&ctx)?,
            CacheAction::Activate => commands::cache_activate(&ctx).await?,
            CacheAction::Uninstall => commands::cache_uninstall(&ctx)?,
        },
    }

    if serves_requests {
        commands::finish_cache(&ctx);
    }
    Ok(())
}
