use std::collections::BTreeMap;

use chrono::NaiveDate;
use clap::{arg, value_parser, ArgMatches, Command};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color as TColor, ContentArrangement, Table};
use eyre::{eyre, Result, WrapErr};
use piechart::{Chart, Color};
use tokio_util::sync::CancellationToken;

use portfolio_bench::config::Config;
use portfolio_bench::performance::{PerformanceEngine, PerformanceResult, Warning};
use portfolio_bench::refresh::{position_symbols, refresh_prices};
use portfolio_bench::sample::sample_positions;
use portfolio_bench::source::build_source;
use portfolio_bench::weights::PortfolioView;
use portfolio_bench::{NewPosition, PositionStore, TimePeriod};

fn cli() -> Command {
    Command::new("portfolio_bench")
        .about("Track stock positions and compare them against a benchmark")
        .arg_required_else_help(true)
        .subcommand(Command::new("config").about("Print the path to the config file"))
        .subcommand(Command::new("list").about("Show positions with value and weight"))
        .subcommand(
            Command::new("add")
                .about("Add a position")
                .arg(arg!(<SYMBOL> "Ticker symbol"))
                .arg(arg!(<SHARES> "Number of shares").value_parser(value_parser!(f64)))
                .arg(arg!(<PRICE> "Purchase price per share").value_parser(value_parser!(f64)))
                .arg(arg!(<DATE> "Purchase date, YYYY-MM-DD"))
                .arg(arg!(--name <NAME> "Company name").required(true))
                .arg(arg!(--sector <SECTOR> "Sector").required(true)),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a position by id")
                .arg(arg!(<ID> "Position id").value_parser(value_parser!(u64))),
        )
        .subcommand(Command::new("clear").about("Remove all positions"))
        .subcommand(Command::new("sample").about("Load sample positions into an empty store"))
        .subcommand(
            Command::new("benchmark")
                .about("Show or change the benchmark symbol")
                .arg(arg!([SYMBOL] "New benchmark symbol")),
        )
        .subcommand(Command::new("refresh").about("Fetch current prices for all positions"))
        .subcommand(Command::new("allocation").about("Show the sector allocation"))
        .subcommand(
            Command::new("performance")
                .about("Compare portfolio and benchmark returns")
                .arg(arg!([PERIOD] "1W, 1M, 3M, YTD, 1Y or ALL").default_value("1M"))
                .arg(arg!(--benchmark <SYMBOL> "Benchmark for this run only"))
                .arg(arg!(--json "Print the result as JSON")),
        )
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("portfolio_bench=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let matches = cli().get_matches();

    if matches.subcommand_matches("config").is_some() {
        println!(
            "Your config file is located here: \n{}",
            Config::path()?.display()
        );
        return Ok(());
    }

    let store = PositionStore::open(&cfg.database_path)
        .wrap_err_with(|| format!("opening database at {}", cfg.database_path))?;

    match matches.subcommand() {
        Some(("list", _)) => print_positions(&store)?,
        Some(("add", m)) => add_position(&store, m)?,
        Some(("remove", m)) => {
            let id = *m.get_one::<u64>("ID").ok_or_else(|| eyre!("missing id"))?;
            let removed = store.remove(id)?;
            println!("Removed {} ({})", removed.get_symbol(), id);
        }
        Some(("clear", _)) => {
            store.clear()?;
            println!("All positions removed");
        }
        Some(("sample", _)) => {
            if store.seed_if_empty(sample_positions())? {
                println!("Sample positions added");
            } else {
                println!("Store is not empty, nothing added");
            }
        }
        Some(("benchmark", m)) => match m.get_one::<String>("SYMBOL") {
            Some(symbol) => println!("Benchmark set to {}", store.set_benchmark(symbol)?),
            None => println!("{}", current_benchmark(&store, &cfg)?),
        },
        Some(("refresh", _)) => refresh(&store, &cfg).await?,
        Some(("allocation", _)) => {
            let positions = store.list()?;
            let view = PortfolioView::from_positions(&positions);
            draw_pie_chart(&view);
            print_allocation(&view);
        }
        Some(("performance", m)) => performance(&store, &cfg, m).await?,
        _ => cli().print_help()?,
    }
    Ok(())
}

// the stored benchmark wins over the configured default
fn current_benchmark(store: &PositionStore, cfg: &Config) -> Result<String> {
    Ok(store
        .stored_benchmark()?
        .unwrap_or_else(|| cfg.benchmark.clone()))
}

fn add_position(store: &PositionStore, m: &ArgMatches) -> Result<()> {
    let get = |name: &str| m.get_one::<String>(name).cloned().unwrap_or_default();
    let new = NewPosition {
        symbol: get("SYMBOL"),
        company_name: get("name"),
        shares: m.get_one::<f64>("SHARES").copied().unwrap_or_default(),
        purchase_price: m.get_one::<f64>("PRICE").copied().unwrap_or_default(),
        purchase_date: get("DATE"),
        sector: get("sector"),
    };
    let position = store.add(new)?;
    println!(
        "Added {} x {} (id {})",
        position.get_shares(),
        position.get_symbol(),
        position.get_id()
    );
    Ok(())
}

async fn refresh(store: &PositionStore, cfg: &Config) -> Result<()> {
    let positions = store.list()?;
    let source = build_source(cfg.provider, cfg.api_key.as_deref(), cfg.history_output_size)?;
    let cancel = cancel_on_ctrl_c();

    let report = refresh_prices(
        &source,
        position_symbols(&positions),
        &cfg.fetch_policy(),
        &cancel,
    )
    .await?;
    let updated = store.update_prices(&report.prices)?;

    println!("Updated {updated} positions");
    for (symbol, error) in &report.failures {
        println!("{} {symbol}: {error} (previous price kept)", "failed".red());
    }
    print_positions(store)
}

async fn performance(store: &PositionStore, cfg: &Config, m: &ArgMatches) -> Result<()> {
    let positions = store.list()?;
    let benchmark = match m.get_one::<String>("benchmark") {
        Some(symbol) => symbol.clone(),
        None => current_benchmark(store, cfg)?,
    };
    let period = m.get_one::<String>("PERIOD").map(String::as_str).unwrap_or("1M");

    let source = build_source(cfg.provider, cfg.api_key.as_deref(), cfg.history_output_size)?;
    let engine = PerformanceEngine::new(source).with_policy(cfg.fetch_policy());
    let cancel = cancel_on_ctrl_c();

    let result = match engine
        .compute_performance(&positions, &benchmark, period, &cancel)
        .await
    {
        Ok(result) => result,
        Err(e) if e.is_insufficient_data() => {
            println!("{} {e}", "Not enough data:".yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if m.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_performance(&result, &benchmark);
    }
    Ok(())
}

// a second request would supersede this one; on the command line that is Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

fn colorize_pct(v: f64) -> Cell {
    let c = if v >= 0.0 { TColor::Green } else { TColor::Red };
    Cell::new(format!("{v:.2}%")).set_alignment(CellAlignment::Right).fg(c)
}

fn pct_cell_opt(v: Option<f64>) -> Cell {
    match v {
        Some(v) => colorize_pct(v),
        None => Cell::new("-").set_alignment(CellAlignment::Right),
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn print_positions(store: &PositionStore) -> Result<()> {
    let positions = store.list()?;
    let view = PortfolioView::from_positions(&positions);

    let mut table = new_table(&[
        "Id", "Symbol", "Company", "Sector", "Shares", "Bought", "Cost", "Price", "Value", "Weight", "Return",
    ]);
    for holding in &view.holdings {
        let p = holding.position;
        table.add_row(vec![
            Cell::new(p.get_id()),
            Cell::new(p.get_symbol()).add_attribute(Attribute::Bold),
            Cell::new(p.get_company_name()),
            Cell::new(p.get_sector()),
            Cell::new(format!("{:.4}", p.get_shares())).set_alignment(CellAlignment::Right),
            Cell::new(p.get_purchase_date()),
            Cell::new(format!("{:.2}", p.get_purchase_price())).set_alignment(CellAlignment::Right),
            Cell::new(
                p.get_current_price()
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
            )
            .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", holding.value)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}%", holding.weight)).set_alignment(CellAlignment::Right),
            pct_cell_opt(p.total_return_percent()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(format!("{:.2}", view.total_value))
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
        pct_cell_opt(view.total_return_percent()),
    ]);

    println!("{table}");
    Ok(())
}

// Print the allocation in descending order %-wise
fn print_allocation(view: &PortfolioView) {
    println!("====================================");
    for (sector, percentage) in view.sorted_sector_allocation() {
        println!("{sector: >20} | {percentage: >10.2}");
    }
}

fn draw_pie_chart(view: &PortfolioView) {
    let colors = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Cyan,
        Color::White,
        Color::Purple,
        Color::Black,
    ];

    let data: Vec<_> = view
        .sorted_sector_allocation()
        .into_iter()
        .enumerate()
        .map(|(i, (sector, percentage))| piechart::Data {
            label: sector,
            value: percentage as f32,
            color: Some(colors[i % colors.len()].into()),
            fill: '•',
        })
        .collect();

    Chart::new()
        .legend(true)
        .radius(9)
        .aspect_ratio(3)
        .draw(&data);
}

fn period_choices() -> String {
    let choices: Vec<_> = TimePeriod::all().iter().map(|p| p.as_str()).collect();
    choices.join(", ")
}

fn print_performance(result: &PerformanceResult, benchmark: &str) {
    for warning in &result.warnings {
        match warning {
            Warning::InvalidPeriod { token, fallback } => {
                println!(
                    "{} unknown period '{token}', showing {fallback} (one of {})",
                    "warning:".yellow(),
                    period_choices()
                )
            }
            Warning::SymbolUnavailable { symbol, reason } => {
                println!("{} {symbol} left out: {reason}", "warning:".yellow())
            }
        }
    }

    let mut rows: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for point in &result.portfolio {
        rows.entry(point.date).or_default().0 = Some(point.percent_change);
    }
    for point in &result.benchmark {
        rows.entry(point.date).or_default().1 = Some(point.percent_change);
    }

    let benchmark_header = benchmark.to_uppercase();
    let mut table = new_table(&["Date", "Portfolio", &benchmark_header]);
    for (date, (portfolio, bench)) in rows {
        table.add_row(vec![Cell::new(date), pct_cell_opt(portfolio), pct_cell_opt(bench)]);
    }
    println!("{table}");

    let fmt = |v: Option<f64>| match v {
        Some(v) if v >= 0.0 => format!("{v:.2}%").green(),
        Some(v) => format!("{v:.2}%").red(),
        None => "-".normal(),
    };
    println!(
        "{} since {}: portfolio {}, {} {}, difference {}",
        result.period.to_string().bold(),
        result.benchmark.first().map(|p| p.date).unwrap_or(result.cutoff),
        fmt(result.portfolio_return()),
        benchmark_header,
        fmt(result.benchmark_return()),
        fmt(result.excess_return()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli() {
        let matches = cli().get_matches_from(vec!["portfolio_bench", "performance", "YTD", "--json"]);
        let (name, m) = matches.subcommand().unwrap();
        assert_eq!(name, "performance");
        assert_eq!(m.get_one::<String>("PERIOD").unwrap(), "YTD");
        assert!(m.get_flag("json"));
    }

    #[test]
    fn test_cli_add() {
        let matches = cli().get_matches_from(vec![
            "portfolio_bench",
            "add",
            "aapl",
            "10",
            "175.25",
            "2023-01-15",
            "--name",
            "Apple Inc.",
            "--sector",
            "Technology",
        ]);
        let (_, m) = matches.subcommand().unwrap();
        assert_eq!(m.get_one::<f64>("SHARES"), Some(&10.0));
        assert_eq!(m.get_one::<String>("name").unwrap(), "Apple Inc.");
    }

    #[test]
    fn test_period_choices() {
        assert_eq!(period_choices(), "1W, 1M, 3M, YTD, 1Y, ALL");
    }

    #[test]
    fn test_performance_defaults_to_one_month() {
        let matches = cli().get_matches_from(vec!["portfolio_bench", "performance"]);
        let (_, m) = matches.subcommand().unwrap();
        assert_eq!(m.get_one::<String>("PERIOD").unwrap(), "1M");
        assert!(m.get_one::<String>("benchmark").is_none());
    }
}
