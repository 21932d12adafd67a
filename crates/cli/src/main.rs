mod display;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use config::Config;
use model::{Trace, TraceId};
use search::{compile, TraceSearchQuery};
use std::time::Duration;
use storage::{PgSpanReader, SpanReader};
use tracing::info;

/// Trace search over a Promscale span store
#[derive(Parser, Debug)]
#[command(name = "trace-search")]
#[command(about = "Search and fetch traces stored in Postgres", long_about = None)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find traces with at least one matching span
    Find {
        #[command(flatten)]
        filters: SearchFilters,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print the IDs of matching traces
    Ids {
        #[command(flatten)]
        filters: SearchFilters,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Fetch every span of one trace
    Get {
        /// Trace ID as 32 hex digits
        trace_id: TraceId,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print the compiled SQL for a search without running it
    Sql {
        #[command(flatten)]
        filters: SearchFilters,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(ClapArgs, Debug)]
struct SearchFilters {
    /// Service name (resource attribute service.name)
    #[arg(long)]
    service: Option<String>,

    /// Span name
    #[arg(long)]
    operation: Option<String>,

    /// Span attribute as key=value; repeat for several
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    /// Earliest span start time (RFC 3339)
    #[arg(long, value_parser = parse_time)]
    start_min: Option<DateTime<Utc>>,

    /// Latest span start time (RFC 3339)
    #[arg(long, value_parser = parse_time)]
    start_max: Option<DateTime<Utc>>,

    /// Minimum span duration in milliseconds
    #[arg(long)]
    duration_min_ms: Option<u64>,

    /// Maximum span duration in milliseconds
    #[arg(long)]
    duration_max_ms: Option<u64>,

    /// Maximum number of traces (0 = no limit; defaults to search.default_num_traces)
    #[arg(long)]
    limit: Option<usize>,
}

fn parse_tag(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

fn parse_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{s}': {e}"))
}

impl SearchFilters {
    fn into_query(self, default_num_traces: usize) -> TraceSearchQuery {
        let mut query = TraceSearchQuery::new()
            .with_start_time_range(self.start_min, self.start_max)
            .with_duration_range(
                self.duration_min_ms.map(Duration::from_millis),
                self.duration_max_ms.map(Duration::from_millis),
            )
            .with_num_traces(self.limit.unwrap_or(default_num_traces));

        if let Some(service) = self.service {
            query = query.with_service_name(service);
        }
        if let Some(operation) = self.operation {
            query = query.with_operation_name(operation);
        }
        for (key, value) in self.tags {
            query = query.with_tag(key, value);
        }
        query
    }
}

fn print_traces(traces: &[Trace], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(traces)?),
        OutputFormat::Table => println!("{}", display::traces_table(traces)),
    }
    Ok(())
}

async fn connect(config: &Config) -> Result<PgSpanReader> {
    PgSpanReader::connect(config)
        .await
        .context("Failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with environment filter
    // Set RUST_LOG environment variable to control log level
    // Example: RUST_LOG=info or RUST_LOG=storage=debug,sqlx=warn
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let default_num_traces = config.search.default_num_traces;

    match args.command {
        Command::Sql { filters } => {
            let compiled = compile(&filters.into_query(default_num_traces));
            println!("{compiled}");
        }
        Command::Find { filters, format } => {
            let reader = connect(&config).await?;
            let query = filters.into_query(default_num_traces);
            let traces = reader.find_traces(&query).await.context("Trace search failed")?;
            print_traces(&traces, format)?;
        }
        Command::Ids { filters, format } => {
            let reader = connect(&config).await?;
            let query = filters.into_query(default_num_traces);
            let ids = reader
                .find_trace_ids(&query)
                .await
                .context("Trace ID search failed")?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
                OutputFormat::Table => println!("{}", display::trace_ids_table(&ids)),
            }
        }
        Command::Get { trace_id, format } => {
            let reader = connect(&config).await?;
            let lookup = reader.get_trace(trace_id).await;
            let Some(trace) = lookup.context("Trace lookup failed")? else {
                anyhow::bail!("trace {trace_id} not found");
            };
            info!(spans = trace.total_spans(), "fetched trace {}", trace_id);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trace)?),
                OutputFormat::Table => println!("{}", display::spans_table(&trace)),
            }
        }
    }

    Ok(())
}
