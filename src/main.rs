use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flightlens::analytics::{AnalysisResult, FlightAnalyzer, GroupBy, GroupSummary};
use flightlens::config::Config;
use flightlens::{Direction, FlightClient, FlightFilters, FlightQuery};

#[derive(Parser)]
#[command(name = "flightlens")]
#[command(about = "Flight data analytics over an aviationstack-style API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track one flight number over an inclusive date range
    Track {
        /// IATA flight code, e.g. AA100
        flight: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Exit with an error when any date failed to fetch
        #[arg(long)]
        strict: bool,
    },
    /// Analyze real-time flights, or historical flights when --date is given
    Analyze {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// airline, route, terminal, weekday, time-slot, delay-category,
        /// aircraft-type, flight-number or status
        #[arg(long)]
        group_by: Option<GroupBy>,
        /// On-time threshold in minutes
        #[arg(long)]
        threshold: Option<i64>,
        /// Groups listed per ranking
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Analyze an airport timetable, or its future schedule when --date is given
    Schedule {
        /// Airport IATA code
        airport: String,
        #[arg(long, value_enum, default_value_t = DirectionArg::Departure)]
        direction: DirectionArg,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only flights delayed by at least this many minutes
        #[arg(long, conflicts_with = "date")]
        min_delay: Option<i64>,
        #[arg(long)]
        group_by: Option<GroupBy>,
        /// Groups listed per ranking
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Compare historical flights of two dates
    Compare {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        date_a: NaiveDate,
        #[arg(long)]
        date_b: NaiveDate,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    airline: Option<String>,
    /// Departure airport IATA code
    #[arg(long)]
    dep: Option<String>,
    /// Arrival airport IATA code
    #[arg(long)]
    arr: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

impl From<FilterArgs> for FlightFilters {
    fn from(args: FilterArgs) -> Self {
        FlightFilters {
            airline_iata: args.airline,
            dep_iata: args.dep,
            arr_iata: args.arr,
            flight_status: args.status,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Departure,
    Arrival,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Departure => Direction::Departure,
            DirectionArg::Arrival => Direction::Arrival,
        }
    }
}

/// Analysis plus group rankings, which skip groups below the configured
/// minimum size
#[derive(Serialize)]
struct AnalysisReport<'a> {
    #[serde(flatten)]
    analysis: &'a AnalysisResult,
    top_groups: Vec<&'a GroupSummary>,
    most_delayed_groups: Vec<&'a GroupSummary>,
    best_on_time_groups: Vec<&'a GroupSummary>,
}

impl<'a> AnalysisReport<'a> {
    fn new(analyzer: &FlightAnalyzer, analysis: &'a AnalysisResult, n: usize) -> Self {
        Self {
            analysis,
            top_groups: analyzer.top_groups(analysis, n),
            most_delayed_groups: analyzer.most_delayed_groups(analysis, n),
            best_on_time_groups: analyzer.best_on_time_groups(analysis, n),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    if config.api.access_key.is_none() {
        warn!("FLIGHTLENS_API_ACCESS_KEY is not set, upstream requests will likely be rejected");
    }
    info!("Using upstream API at {}", config.api.base_url);

    let client = FlightClient::from_config(&config).context("failed to create flight client")?;

    match cli.command {
        Commands::Track {
            flight,
            start,
            end,
            strict,
        } => {
            let report = client.track_range(&flight, start, end).await?;
            print_json(&report)?;
            if let Some(err) = report.partial_failure() {
                if strict {
                    return Err(err.into());
                }
                warn!("{}", err);
            }
        }
        Commands::Analyze {
            filters,
            date,
            group_by,
            threshold,
            top,
        } => {
            let filters = FlightFilters::from(filters);
            let query = match date {
                Some(date) => FlightQuery::Historical { date, filters },
                None => FlightQuery::RealTime { filters },
            };
            let result = client.analyze(&query, group_by, threshold).await?;
            print_json(&AnalysisReport::new(client.analyzer(), &result, top))?;
        }
        Commands::Schedule {
            airport,
            direction,
            date,
            min_delay,
            group_by,
            top,
        } => {
            let direction = Direction::from(direction);
            let query = match (date, min_delay) {
                (Some(date), _) => FlightQuery::Future {
                    airport_iata: airport,
                    direction,
                    date,
                },
                (None, Some(minutes)) => FlightQuery::Delayed {
                    airport_iata: airport,
                    direction,
                    min_delay_minutes: minutes,
                },
                (None, None) => FlightQuery::Scheduled {
                    airport_iata: airport,
                    direction,
                    airline_iata: None,
                },
            };
            let result = client.analyze(&query, group_by, None).await?;
            print_json(&AnalysisReport::new(client.analyzer(), &result, top))?;
        }
        Commands::Compare {
            filters,
            date_a,
            date_b,
        } => {
            let filters = FlightFilters::from(filters);
            let query_a = FlightQuery::Historical {
                date: date_a,
                filters: filters.clone(),
            };
            let query_b = FlightQuery::Historical {
                date: date_b,
                filters,
            };
            let label_a = date_a.to_string();
            let label_b = date_b.to_string();
            let comparison = client
                .compare((&label_a, &query_a), (&label_b, &query_b))
                .await?;
            print_json(&comparison)?;
        }
    }

    Ok(())
}
