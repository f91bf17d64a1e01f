#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line client for the ASRS analytics API.
//!
//! ```text
//! asrs summary
//! asrs timeline --start-year 2012 --end-year 2024
//! asrs incidents --page 2 --limit 10 --severity high
//! asrs incident 1234567
//! asrs comparison --baseline-segment a --inference-segment b --view topics
//! ```
//!
//! The API location comes from `--config FILE` when given, otherwise from
//! `ASRS_API_URL` / `ASRS_API_BASE_PATH`; `--base-url` and `--base-path`
//! override either. Each command runs its query through a binding, waits
//! for it to settle and prints the data as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use asrs_api::{
    AnalyticsClient, EmergingPatternsQuery, FactorsQuery, FilterOptionsQuery,
    IncidentDetailQuery, IncidentsQuery, SummaryQuery, TimelineQuery, TopicKeywordsQuery,
    TopicNarrativesQuery, TopicsQuery, TrendComparisonQuery, TrendKpisQuery,
};
use asrs_api_models::{ComparisonView, PeriodBounds, Severity, TopicModel, TrendPeriods, TrendSegment};
use asrs_query::{Query, QueryError};
use asrs_query_models::ContractError;
use asrs_transport::{DeadlineTransport, HttpTransport, Transport, TransportConfig, TransportError};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "asrs", about = "Query the ASRS runway incursion analytics API")]
struct Cli {
    /// TOML file with `base_url` and `base_path`
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// API origin, e.g. `http://127.0.0.1:8000`
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Path prefix of the API routes
    #[arg(long, global = true)]
    base_path: Option<String>,
    /// Fail requests that take longer than this many milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Copy, Default)]
struct YearArgs {
    /// First year (inclusive)
    #[arg(long)]
    start_year: Option<i32>,
    /// Last year (inclusive)
    #[arg(long)]
    end_year: Option<i32>,
}

#[derive(Args, Debug, Clone, Copy, Default)]
struct PeriodArgs {
    /// Preset for the baseline period (A, B or C)
    #[arg(long)]
    baseline_segment: Option<TrendSegment>,
    /// Preset for the inference period (A, B or C)
    #[arg(long)]
    inference_segment: Option<TrendSegment>,
    /// First baseline year, overrides the preset
    #[arg(long)]
    baseline_start: Option<i32>,
    /// Last baseline year, overrides the preset
    #[arg(long)]
    baseline_end: Option<i32>,
    /// First inference year, overrides the preset
    #[arg(long)]
    inference_start: Option<i32>,
    /// Last inference year, overrides the preset
    #[arg(long)]
    inference_end: Option<i32>,
}

impl PeriodArgs {
    fn bounds(&self) -> PeriodBounds {
        let baseline = self.baseline_segment.map(TrendSegment::range);
        let inference = self.inference_segment.map(TrendSegment::range);
        PeriodBounds {
            baseline_start: self.baseline_start.or(baseline.map(|r| r.start)),
            baseline_end: self.baseline_end.or(baseline.map(|r| r.end)),
            inference_start: self.inference_start.or(inference.map(|r| r.start)),
            inference_end: self.inference_end.or(inference.map(|r| r.end)),
        }
    }

    /// Fully specified periods, or `None` if any bound is left to the
    /// server.
    fn periods(&self) -> Result<Option<TrendPeriods>, ContractError> {
        let bounds = self.bounds();
        match (
            bounds.baseline_start,
            bounds.baseline_end,
            bounds.inference_start,
            bounds.inference_end,
        ) {
            (Some(bs), Some(be), Some(is), Some(ie)) => {
                TrendPeriods::from_years(bs, be, is, ie).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Corpus summary statistics
    Summary,
    /// Filter options (factors, aircraft, states, years)
    Filters,
    /// Incidents per year
    Timeline {
        #[command(flatten)]
        years: YearArgs,
    },
    /// Contributing factors ranked by count
    Factors {
        #[command(flatten)]
        years: YearArgs,
        /// Number of factors
        #[arg(long)]
        limit: Option<u32>,
    },
    /// One page of incident reports
    Incidents {
        #[command(flatten)]
        years: YearArgs,
        /// Page number, starting at 1
        #[arg(long)]
        page: Option<u32>,
        /// Reports per page
        #[arg(long)]
        limit: Option<u32>,
        /// Airport code
        #[arg(long)]
        location: Option<String>,
        /// Severity (High, Medium or Low)
        #[arg(long)]
        severity: Option<Severity>,
    },
    /// A single incident with similar incidents
    Incident {
        /// Accession number
        acn: String,
    },
    /// Topic clusters
    Topics {
        /// Topic model (lda or bert)
        #[arg(long)]
        model: Option<TopicModel>,
        #[command(flatten)]
        years: YearArgs,
    },
    /// Weighted keywords of a topic
    TopicKeywords {
        /// Topic id
        id: i64,
        /// Number of keywords
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Representative narratives of a topic
    TopicNarratives {
        /// Topic id
        id: i64,
        /// Number of narratives
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Delta KPIs between baseline and inference periods
    Kpis {
        #[command(flatten)]
        periods: PeriodArgs,
    },
    /// Per-category comparison between baseline and inference periods
    Comparison {
        #[command(flatten)]
        periods: PeriodArgs,
        /// Category axis (factors or topics)
        #[arg(long)]
        view: Option<ComparisonView>,
        /// Number of categories
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Risk patterns that emerged in the inference period
    Emerging {
        #[command(flatten)]
        periods: PeriodArgs,
        /// Number of patterns
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Params(#[from] ContractError),

    #[error("Failed to render response: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Query settled without data")]
    NoData,
}

fn resolve_config(cli: &Cli) -> Result<TransportConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => TransportConfig::from_toml_file(path)?,
        None => TransportConfig::from_env(),
    };
    if let Some(url) = &cli.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(path) = &cli.base_path {
        config.base_path.clone_from(path);
    }
    Ok(config)
}

fn build_transport(cli: &Cli) -> Result<Arc<dyn Transport>, CliError> {
    let http = HttpTransport::new(resolve_config(cli)?);
    log::debug!(
        "Using API at {}{}",
        http.config().normalized_base_url(),
        http.config().normalized_base_path()
    );
    Ok(match cli.timeout_ms {
        Some(ms) => Arc::new(DeadlineTransport::new(http, Duration::from_millis(ms))),
        None => Arc::new(http),
    })
}

/// Binds `query`, waits for it to settle and returns its data as JSON.
async fn run_query<Q>(client: &AnalyticsClient, query: Q) -> Result<serde_json::Value, CliError>
where
    Q: Query,
    Q::Output: Serialize,
{
    let name = query.name();
    let binding = client.bind(query);
    let state = binding.settled().await;
    if !state.is_settled() {
        return Err(CliError::NoData);
    }
    log::debug!("{name}: settled at generation {}", state.generation);

    if let Some(err) = state.error {
        return Err(CliError::Query((*err).clone()));
    }
    let data = state.data.ok_or(CliError::NoData)?;
    Ok(serde_json::to_value(data.as_ref())?)
}

async fn run_periods<Q, F, G>(
    client: &AnalyticsClient,
    periods: &PeriodArgs,
    full: F,
    partial: G,
) -> Result<serde_json::Value, CliError>
where
    Q: Query,
    Q::Output: Serialize,
    F: FnOnce(TrendPeriods) -> Q,
    G: FnOnce(PeriodBounds) -> Result<Q, ContractError>,
{
    let query = match periods.periods()? {
        Some(p) => full(p),
        None => partial(periods.bounds())?,
    };
    run_query(client, query).await
}

async fn run(cli: Cli) -> Result<serde_json::Value, CliError> {
    let client = AnalyticsClient::new(build_transport(&cli)?);

    match cli.command {
        Commands::Summary => run_query(&client, SummaryQuery).await,
        Commands::Filters => run_query(&client, FilterOptionsQuery).await,
        Commands::Timeline { years } => {
            let query = TimelineQuery {
                start_year: years.start_year,
                end_year: years.end_year,
            };
            run_query(&client, query).await
        }
        Commands::Factors { years, limit } => {
            let query = FactorsQuery {
                start_year: years.start_year,
                end_year: years.end_year,
                limit,
            };
            run_query(&client, query).await
        }
        Commands::Incidents {
            years,
            page,
            limit,
            location,
            severity,
        } => {
            let query = IncidentsQuery {
                start_year: years.start_year,
                end_year: years.end_year,
                page,
                limit,
                location,
                severity,
            };
            run_query(&client, query).await
        }
        Commands::Incident { acn } => run_query(&client, IncidentDetailQuery::new(acn)?).await,
        Commands::Topics { model, years } => {
            let query = TopicsQuery {
                model,
                start_year: years.start_year,
                end_year: years.end_year,
            };
            run_query(&client, query).await
        }
        Commands::TopicKeywords { id, limit } => {
            run_query(&client, TopicKeywordsQuery { topic_id: id, limit }).await
        }
        Commands::TopicNarratives { id, limit } => {
            run_query(&client, TopicNarrativesQuery { topic_id: id, limit }).await
        }
        Commands::Kpis { periods } => {
            run_periods(&client, &periods, TrendKpisQuery::new, TrendKpisQuery::partial).await
        }
        Commands::Comparison {
            periods,
            view,
            limit,
        } => {
            let configure = |mut query: TrendComparisonQuery| {
                query.view = view;
                query.limit = limit;
                query
            };
            run_periods(
                &client,
                &periods,
                |p| configure(TrendComparisonQuery::new(p)),
                |b| TrendComparisonQuery::partial(b).map(configure),
            )
            .await
        }
        Commands::Emerging { periods, limit } => {
            let configure = |mut query: EmergingPatternsQuery| {
                query.limit = limit;
                query
            };
            run_periods(
                &client,
                &periods,
                |p| configure(EmergingPatternsQuery::new(p)),
                |b| EmergingPatternsQuery::partial(b).map(configure),
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match run(cli).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            log::debug!("Command failed: {e:?}");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("asrs").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_config_file() {
        let dir = std::env::temp_dir().join(format!("asrs-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("asrs.toml");
        std::fs::write(&file, "base_url = \"http://analytics:9000\"\nbase_path = \"/v1\"\n").unwrap();

        let cli = parse(&[
            "--config",
            file.to_str().unwrap(),
            "--base-path",
            "/v2",
            "summary",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.base_url, "http://analytics:9000");
        assert_eq!(config.base_path, "/v2");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/asrs.toml", "summary"]);
        assert!(matches!(
            resolve_config(&cli),
            Err(CliError::Transport(TransportError::Config { .. }))
        ));
    }

    #[test]
    fn parses_enum_flags_case_insensitively() {
        let cli = parse(&["incidents", "--severity", "high", "--page", "2"]);
        let Commands::Incidents { severity, page, .. } = cli.command else {
            panic!("expected incidents command");
        };
        assert_eq!(severity, Some(Severity::High));
        assert_eq!(page, Some(2));

        let cli = parse(&["topics", "--model", "BERT"]);
        let Commands::Topics { model, .. } = cli.command else {
            panic!("expected topics command");
        };
        assert_eq!(model, Some(TopicModel::Bert));
    }

    #[test]
    fn segments_fill_period_bounds() {
        let cli = parse(&[
            "comparison",
            "--baseline-segment",
            "a",
            "--inference-segment",
            "b",
            "--inference-end",
            "2024",
        ]);
        let Commands::Comparison { periods, .. } = cli.command else {
            panic!("expected comparison command");
        };
        let full = periods.periods().unwrap().unwrap();
        assert_eq!(full.baseline().to_string(), "2012-2017");
        assert_eq!(full.inference().to_string(), "2018-2024");
    }

    #[test]
    fn partial_periods_are_left_to_the_server() {
        let cli = parse(&["kpis", "--inference-start", "2019"]);
        let Commands::Kpis { periods } = cli.command else {
            panic!("expected kpis command");
        };
        assert!(periods.periods().unwrap().is_none());
        assert_eq!(periods.bounds().inference_start, Some(2019));
    }

    #[test]
    fn overlapping_periods_are_rejected() {
        let cli = parse(&["emerging", "--baseline-segment", "c", "--inference-segment", "b"]);
        let Commands::Emerging { periods, .. } = cli.command else {
            panic!("expected emerging command");
        };
        assert!(matches!(
            periods.periods(),
            Err(ContractError::InvalidParams { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_api_exits_with_network_error() {
        let cli = parse(&["--base-url", "http://127.0.0.1:9", "summary"]);
        let err = run(cli).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Query(QueryError::Transport(TransportError::Network { .. }))
        ));
    }
}
