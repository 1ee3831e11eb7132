//! Meal planner binary: Telegram bot, recipe ingestion and clipping, one-off planning, usage
//! report and cleanup.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use meal_planner::bot::format_draft;
use meal_planner::components::{build_components, ghost_client};
use meal_planner::bot::format_clipped;
use meal_planner::clipper::ClipRequest;
use meal_planner::planner::{next_monday, week_start_of};
use meal_planner::telegram::{build_bot, run_dispatcher, TelegramTransport};
use meal_planner::{init_tracing, AppConfig, Cli, Commands};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let token = match &cli.command {
        Commands::Run { token } => token.clone(),
        _ => None,
    };
    let config = AppConfig::load(token)?;
    init_tracing(&config.base.log_file)?;
    config.validate()?;

    let components = build_components(&config).await?;
    let removed = components.sessions.cleanup_expired().await?;
    info!(removed, "step: startup cleanup done");

    match cli.command {
        Commands::Run { .. } => {
            let bot = build_bot(
                config.base.require_bot_token()?,
                config.base.telegram_api_url.as_deref(),
            );
            let transport = Arc::new(TelegramTransport::new(bot.clone()));
            let mut handler = components.conversation_handler(&config, transport);
            if let Some(clipper) = components.clipper(&config)? {
                handler = handler.with_clipper(Arc::new(clipper));
            }
            run_dispatcher(bot, Arc::new(handler)).await
        }
        Commands::Ingest { skip_unchanged } => {
            let posts = ghost_client(&config)?.fetch_posts().await?;
            let report = components
                .ingestor(&config)?
                .ingest_posts(&posts, skip_unchanged)
                .await;
            println!(
                "Ingested {} posts: {} extracted, {} unchanged, {} failed",
                posts.len(),
                report.processed,
                report.reused,
                report.failed
            );
            Ok(())
        }
        Commands::Plan { request, user, week } => {
            let week_start = week
                .map(week_start_of)
                .unwrap_or_else(|| next_monday(Utc::now().date_naive()));
            let generated = components
                .planner
                .generate_plan(user, &request, &config.planning.household, week_start)
                .await?;
            components.metrics.record_all(&generated.metas).await;
            let draft = components.lifecycle.replace_draft(generated.plan).await?;
            println!("{}", format_draft(&draft));
            Ok(())
        }
        Commands::Clip { url, tags } => {
            let clipper = components
                .clipper(&config)?
                .ok_or_else(|| anyhow::anyhow!("GHOST_API_URL and GHOST_ADMIN_API_KEY must be set for clipping"))?;
            let clipped = clipper.clip(&ClipRequest { url, tags }).await?;
            println!("{}", format_clipped(&clipped));
            Ok(())
        }
        Commands::Metrics { days } => {
            println!("{}", components.metrics.daily_report(days).await?);
            Ok(())
        }
        Commands::MetricsCleanup { days } => {
            let removed = components.metrics.cleanup(days).await?;
            println!("Removed {} usage records older than {} days", removed, days);
            Ok(())
        }
    }
}
