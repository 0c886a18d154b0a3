use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use usage_lens::{ConsoleClient, ConsoleConfig, UsageLookup, stats};

/// Look up a token's quota and usage log on a relay gateway.
#[derive(Debug, Parser)]
#[command(name = "usage-lens", version, about)]
struct Cli {
    /// Token to look up.
    token: String,

    /// Gateway base URL, e.g. https://relay.example.com.
    #[arg(long)]
    base_url: Option<String>,

    /// TOML file with connection settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Usage log page to show.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Usage log page size.
    #[arg(long)]
    page_size: Option<u32>,

    /// Emit the collected state as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "usage_lens=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> usage_lens::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig::default(),
    };
    config.apply_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = Some(base_url);
    }

    let quota_per_unit = config.quota_per_unit();
    let page_size = cli.page_size.unwrap_or_else(|| config.page_size());
    let client = ConsoleClient::from_config(&config)?;
    let mut lookup = UsageLookup::new(client).with_default_page_size(page_size);

    lookup.submit(&cli.token).await;
    if cli.page > 1 {
        lookup.change_page(cli.page).await;
    }

    if cli.json {
        let report = serde_json::json!({
            "queried_token": lookup.queried_token(),
            "summary": lookup.summary(),
            "stats": lookup
                .summary()
                .map(|summary| stats::summary_rows(summary, quota_per_unit)),
            "logs": lookup.logs(),
            "errors": lookup.outcome(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&lookup, quota_per_unit);
    }

    let outcome = lookup.outcome();
    let both_failed = !outcome.usage_error.is_empty() && !outcome.logs_error.is_empty();
    Ok(if both_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_report<A>(lookup: &UsageLookup<A>, quota_per_unit: u64) {
    let outcome = lookup.outcome();
    if !outcome.is_clean() {
        eprintln!("warning: {}", outcome.banner());
    }

    println!("token: {}", lookup.queried_token());
    match lookup.summary() {
        Some(summary) => {
            if let Some(name) = summary.name.as_deref().filter(|name| !name.is_empty()) {
                println!("name: {name}");
            }
            for row in stats::summary_rows(summary, quota_per_unit) {
                println!("{:>10}  {}", row.label, row.value);
            }
        }
        None => println!("no usage data"),
    }

    let logs = lookup.logs();
    println!();
    println!(
        "usage log: page {} (size {}), {} total",
        logs.page, logs.page_size, logs.total
    );
    for row in &logs.rows {
        println!(
            "{:<19}  {:<8}  {:<24}  {:>10}  {}",
            stats::log_time_cell(&row.entry),
            stats::log_kind_cell(&row.entry),
            stats::log_model_cell(&row.entry),
            stats::log_quota_cell(&row.entry, quota_per_unit),
            stats::log_ip_cell(&row.entry),
        );
    }
}
