use clap::{Parser, ValueEnum};
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proteq_backend::{
    config::Config,
    db::connection::create_pool,
    models::activity_log::ActivityLogQuery,
    services::{activity_log::activity_logs_csv, ActivityLogService},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

/// Export the activity log to stdout.
#[derive(Debug, Parser)]
#[command(name = "activity_log_export")]
struct Args {
    /// admin, staff, user or all
    #[arg(long, default_value = "all")]
    user_type: String,
    /// Case-insensitive substring of the action label
    #[arg(long, default_value = "all")]
    action: String,
    /// First day to include (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    date_from: String,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    date_to: String,
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proteq_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::load()?;
    let pool = create_pool(&config).await?;
    let service = ActivityLogService::new(pool, &config);

    let query = ActivityLogQuery {
        user_type: args.user_type,
        action: args.action,
        date_from: args.date_from,
        date_to: args.date_to,
        ..ActivityLogQuery::default()
    };
    let rows = service.export_activity_logs(&query).await?;
    tracing::info!(rows = rows.len(), "Exported activity logs");

    let mut stdout = std::io::stdout().lock();
    match args.format {
        Format::Csv => stdout.write_all(activity_logs_csv(&rows, &config.time_zone).as_bytes())?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut stdout, &rows)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
