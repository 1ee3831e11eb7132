//! Command-line interface.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "meal-planner")]
#[command(about = "Household meal planner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Telegram bot
    Run {
        /// Bot token (overrides BOT_TOKEN)
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Import recipes from the Ghost blog
    Ingest {
        /// Reuse stored recipes whose post has not changed
        #[arg(long)]
        skip_unchanged: bool,
    },
    /// Generate a draft plan from the terminal
    Plan {
        /// What to eat, in plain words
        request: String,
        /// Owner of the plan
        #[arg(short, long, default_value_t = 0)]
        user: i64,
        /// Any day of the week to plan (YYYY-MM-DD); defaults to next week
        #[arg(short, long)]
        week: Option<chrono::NaiveDate>,
    },
    /// Save the recipe on a web page to the blog and the recipe corpus
    Clip {
        url: String,
        /// Extra tags, comma separated
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Print token usage per day
    Metrics {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
    /// Delete usage records older than the retention window
    MetricsCleanup {
        /// Keep records for the last N days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}
