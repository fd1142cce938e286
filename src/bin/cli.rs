use clap::{Parser, Subcommand};
use snow_chart::{Dashboard, Settings};

#[derive(Parser)]
#[command(name = "snow-chart")]
#[command(about = "Snowflake storage usage per day and database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Secrets file (defaults to $SNOW_CHART_SECRETS, then secrets.toml)
    #[arg(short, long)]
    secrets: Option<String>,

    /// SQLite cache file (overrides [cache].path)
    #[arg(short, long)]
    cache: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the usage query and print table and chart series
    Show {
        /// Date range in days (7, 14, 28 or 90)
        #[arg(short, long, default_value = "")]
        days: String,
    },

    /// Print the SQL for a date range without running it
    Sql {
        /// Date range in days (7, 14, 28 or 90)
        #[arg(short, long)]
        days: String,
    },

    /// Get cache statistics
    Stats,

    /// Drop expired cache entries
    Purge {
        /// Drop every entry, fresh or not
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // No secrets or network needed to print SQL
    if let Commands::Sql { days } = &cli.command {
        match Dashboard::sql_for(days)? {
            Some(sql) => println!("{}", sql),
            None => println!("👆 Please select a timeframe."),
        }
        return Ok(());
    }

    let mut settings = Settings::load(Settings::resolve_path(cli.secrets.as_deref()))?;
    if let Some(path) = cli.cache {
        settings.cache.path = Some(path);
    }

    // An in-memory cache is always empty in a fresh process
    if matches!(cli.command, Commands::Stats | Commands::Purge { .. }) {
        let path = settings.cache.persistent_path()?;
        println!("💾 Cache: {}", path);
    }

    let dashboard = Dashboard::from_settings(&settings).await?;

    match cli.command {
        Commands::Show { days } => {
            let view = dashboard.handle(&days).await?;

            if let Some(prompt) = &view.prompt {
                println!("👆 {}", prompt);
                return Ok(());
            }

            for line in &view.trace {
                println!("{}", line);
            }

            if let Some(error) = &view.error {
                println!("\n❌ {}", error);
            }

            if let Some(table) = &view.table {
                println!("\n{}", table.to_text());
            }

            if let Some(series) = &view.series {
                println!("\n📊 Total Storage Per Day by Database ({} databases):", series.databases().len());
                for point in &series.points {
                    println!(
                        "   {}  {:<30} {:>12.3} GB",
                        point.usage_date, point.database_name, point.total_bytes
                    );
                }
            }

            println!("\n   Cached: {}", view.from_cache);
            println!("   Latency: {:.2}ms", view.latency_ms);
        }

        Commands::Stats => {
            let stats = dashboard.cache_stats().await?;

            println!("📊 Cache Statistics:");
            println!("   TTL: {}s", settings.cache.ttl_secs);
            println!("   Total entries: {}", stats.total_entries);
            println!("   Total hits: {}", stats.total_hits);
            println!("   Avg hits/entry: {:.2}", stats.avg_hit_count);

            if let Some(oldest) = stats.oldest_entry {
                println!("   Oldest entry: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
            }

            if let Some(newest) = stats.newest_entry {
                println!("   Newest entry: {}", newest.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        Commands::Purge { all } => {
            let deleted = if all {
                println!("🧹 Clearing the cache...");
                dashboard.clear_cache().await?
            } else {
                println!("🧹 Dropping entries older than {}s...", settings.cache.ttl_secs);
                dashboard.purge_expired().await?
            };

            println!("✅ Deleted {} entries", deleted);
        }

        Commands::Sql { .. } => unreachable!("handled before loading settings"),
    }

    Ok(())
}
