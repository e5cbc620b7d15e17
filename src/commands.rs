use crate::render::{self, ViewState};
use analytics::{
    InstrumentSummary, Ranker, RankerConfig, SeriesCleaner, SortKey, ZScoreCalculator,
    sort_summaries, summarize,
};
use anyhow::Context;
use api_client::{SeriesRequest, YahooClient, fetch_all};
use clap::Args;
use configuration::{Catalog, Config, InstrumentGroup, Selection};
use core_types::{Instrument, Interval, Period, RankedEntry};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Options shared by every command that downloads and ranks series.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Bar size, e.g. "1d" or "15m". Defaults to `dashboard.interval`.
    #[arg(long)]
    pub interval: Option<Interval>,

    /// History to download, e.g. "1y" or "max". Defaults to `dashboard.period`.
    #[arg(long)]
    pub period: Option<Period>,

    /// Drop weekend and after-hours bars from intraday series.
    #[arg(long, conflicts_with = "include_afterhours")]
    pub exclude_afterhours: bool,

    /// Keep weekend and after-hours bars in intraday series.
    #[arg(long)]
    pub include_afterhours: bool,

    /// Only show these catalog instruments (by display name, repeatable).
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,

    /// Catalog groups to show. Defaults to `dashboard.groups`.
    #[arg(long, value_enum)]
    pub group: Vec<InstrumentGroup>,

    /// Extra tickers to add, comma separated (e.g. "AAPL,MSFT").
    #[arg(long, value_name = "SYMBOL", value_delimiter = ',')]
    pub extra: Vec<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// The settings of one dashboard run after command-line overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub request: SeriesRequest,
    pub exclude_afterhours: bool,
}

impl RunSettings {
    pub fn resolve(config: &Config, args: &DataArgs) -> Self {
        let exclude_afterhours = if args.include_afterhours {
            false
        } else {
            args.exclude_afterhours || config.dashboard.exclude_afterhours
        };
        Self {
            request: SeriesRequest {
                interval: args.interval.unwrap_or(config.dashboard.interval),
                period: args.period.unwrap_or(config.dashboard.period),
            },
            exclude_afterhours,
        }
    }

    pub fn ranker(&self, config: &Config) -> Ranker {
        Ranker::new(
            RankerConfig {
                interval_is_intraday: self.request.interval.is_intraday(),
                exclude_afterhours: self.exclude_afterhours,
            },
            SeriesCleaner::with_session(config.dashboard.session()),
            ZScoreCalculator::new(config.dashboard.estimator),
        )
    }
}

pub fn selection(config: &Config, args: &DataArgs) -> Selection {
    let groups = if args.group.is_empty() {
        config.dashboard.groups.clone()
    } else {
        args.group.clone()
    };
    Selection {
        names: args.only.clone(),
        groups,
        extra_symbols: args.extra.clone(),
    }
}

/// Downloads every instrument and ranks the result.
async fn fetch_and_rank(
    config: &Config,
    settings: RunSettings,
    instruments: Vec<Instrument>,
) -> anyhow::Result<Vec<RankedEntry>> {
    let client = YahooClient::new(&config.data_source).context("Failed to build the market-data client")?;

    tracing::info!(
        instruments = instruments.len(),
        interval = %settings.request.interval,
        period = %settings.request.period,
        exclude_afterhours = settings.exclude_afterhours,
        "Downloading price series."
    );

    let progress_bar = ProgressBar::new(instruments.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let downloaded = fetch_all(
        &client,
        instruments,
        settings.request,
        config.data_source.max_concurrency,
        Duration::from_secs(config.data_source.timeout_secs),
        |instrument, _| {
            progress_bar.set_message(instrument.symbol.clone());
            progress_bar.inc(1);
        },
    )
    .await;
    progress_bar.finish_and_clear();

    let missing = downloaded.iter().filter(|(_, series)| series.is_empty()).count();
    if missing > 0 {
        tracing::warn!(missing, "Some instruments have no data and will be ranked last.");
    }

    let ranked = settings.ranker(config).rank(downloaded)?;
    Ok(ranked)
}

async fn load(config: &Config, args: &DataArgs) -> anyhow::Result<Vec<RankedEntry>> {
    let catalog = Catalog::from_entries_or_builtin(&config.catalog)?;
    let instruments = catalog.select(&selection(config, args))?;
    fetch_and_rank(config, RunSettings::resolve(config, args), instruments).await
}

fn print_json(summaries: &[InstrumentSummary]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summaries)?);
    Ok(())
}

fn summaries(ranked: &[RankedEntry]) -> Vec<InstrumentSummary> {
    ranked.iter().map(summarize).collect()
}

pub async fn handle_rank(config: &Config, args: DataArgs, expand: Option<String>) -> anyhow::Result<()> {
    let ranked = load(config, &args).await?;
    let summaries = summaries(&ranked);
    if args.json {
        return print_json(&summaries);
    }

    let state = ViewState { expanded: expand };
    println!("{}", render::ranking_table(&ranked, &state));
    print_expanded(&ranked, &summaries, &state);
    Ok(())
}

pub async fn handle_snapshot(
    config: &Config,
    args: DataArgs,
    sort: Option<SortKey>,
    expand: Option<String>,
) -> anyhow::Result<()> {
    let ranked = load(config, &args).await?;
    let mut summaries = summaries(&ranked);
    sort_summaries(&mut summaries, sort.unwrap_or(config.dashboard.sort_by));
    if args.json {
        return print_json(&summaries);
    }

    let state = ViewState { expanded: expand };
    println!("{}", render::snapshot_table(&summaries));
    print_expanded(&ranked, &summaries, &state);
    Ok(())
}

pub async fn handle_returns(config: &Config, args: DataArgs) -> anyhow::Result<()> {
    let ranked = load(config, &args).await?;
    let mut summaries = summaries(&ranked);
    sort_summaries(&mut summaries, SortKey::Return);
    if args.json {
        return print_json(&summaries);
    }

    println!("{}", render::returns_table(&summaries));
    Ok(())
}

/// Downloads a single instrument and prints its expanded view.
pub async fn handle_detail(config: &Config, symbol: String, args: DataArgs) -> anyhow::Result<()> {
    let catalog = Catalog::from_entries_or_builtin(&config.catalog)?;
    let instrument = catalog
        .find_by_symbol(&symbol)
        .map(|entry| entry.instrument())
        .unwrap_or_else(|| Instrument::from_symbol(symbol.trim()));

    let state = ViewState::expanded(instrument.symbol.clone());
    let ranked = fetch_and_rank(config, RunSettings::resolve(config, &args), vec![instrument]).await?;
    let summaries = summaries(&ranked);
    if args.json {
        return print_json(&summaries);
    }

    let detail = render::render_detail(&ranked, &summaries, &state)
        .with_context(|| format!("No result for {}", symbol))?;
    println!("{}", detail);
    Ok(())
}

pub fn handle_catalog(config: &Config, groups: Vec<InstrumentGroup>) -> anyhow::Result<()> {
    let catalog = Catalog::from_entries_or_builtin(&config.catalog)?;
    let shown = if groups.is_empty() {
        catalog
    } else {
        let entries = catalog
            .entries()
            .iter()
            .filter(|entry| groups.contains(&entry.group))
            .cloned()
            .collect();
        Catalog::new(entries)?
    };
    println!("{}", render::catalog_table(&shown));
    Ok(())
}

fn print_expanded(ranked: &[RankedEntry], summaries: &[InstrumentSummary], state: &ViewState) {
    let Some(symbol) = state.expanded.as_deref() else {
        return;
    };
    match render::render_detail(ranked, summaries, state) {
        Some(detail) => println!("{}", detail),
        None => tracing::warn!(symbol, "Expanded instrument is not part of this view."),
    }
}
