use anyhow::{Context, Result};
use clap::Parser;
use comic_market_data::{
    BucketStrategy, Cli, Command, Compressor, OhlcAggregation, OhlcvPoint, RuntimeConfig,
    Timeframe, open_cache, spawn_sweeper,
};
use std::{sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> Result<()> {
    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Error)
    };

    let mut builder = env_logger::Builder::new();

    builder
        .filter(None, global_level)
        .filter(Some("comic_market_data"), my_code_level)
        .parse_default_env()
        .init();

    let args = Cli::parse();
    let mut config = RuntimeConfig::default();
    if let Some(db) = &args.db {
        config = config.with_db_path(db.clone());
    }

    let cache = Arc::new(
        open_cache(&config)
            .await
            .with_context(|| format!("Failed to open cache at {}", config.db_path))?,
    );

    match args.command {
        Command::Sweep => {
            let removed = cache.sweep().await?;
            println!("Removed {} stale entries", removed);
        }
        Command::Compress {
            input,
            symbol,
            timeframe,
            interval,
            candlestick,
        } => {
            let timeframe: Timeframe = timeframe.parse()?;
            let bytes = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read points from {}", input.display()))?;
            let points: Vec<OhlcvPoint> = serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse points in {}", input.display()))?;

            let strategy = if interval {
                BucketStrategy::Interval
            } else {
                config.strategy
            };
            let aggregation = if candlestick {
                OhlcAggregation::Candlestick
            } else {
                config.aggregation
            };

            let buckets = Compressor {
                strategy,
                aggregation,
                bypass_threshold: config.bypass_threshold,
            }
            .run(&points, timeframe)?;

            cache.put(&symbol, timeframe, &buckets).await?;
            log::info!("✅ Cached {} {}", symbol, timeframe);
            println!(
                "{} points -> {} buckets cached as {}-{}",
                points.len(),
                buckets.len(),
                symbol,
                timeframe
            );
        }
        Command::Watch { every_secs } => {
            if let Some(secs) = every_secs {
                config = config.with_sweep_interval(Duration::from_secs(secs));
            }
            log::info!(
                "Sweeping {} every {:.0}s, Ctrl-C to stop",
                config.db_path,
                config.sweep_interval.as_secs_f64()
            );
            let sweeper = spawn_sweeper(cache.clone(), config.sweep_interval);
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            sweeper.abort();
            println!("Sweeper stopped");
        }
        Command::Show { symbol, timeframe } => {
            let timeframe: Timeframe = timeframe.parse()?;
            match cache.get(&symbol, timeframe).await? {
                Some(buckets) => println!("{}", serde_json::to_string_pretty(&buckets)?),
                None => println!("No valid cache entry for {}-{}", symbol, timeframe),
            }
        }
    }

    cache.store().close().await;
    Ok(())
}
