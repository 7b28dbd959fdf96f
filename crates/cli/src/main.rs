//! scrape-svc - asynchronous HTTP scraping service.
//!
//! Run as a server (`serve`), or use as a thin client against a running
//! instance (`submit` / `status`).

mod client;
mod serve;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrape_core::Config;

#[derive(Debug, Parser)]
#[command(name = "scrape-svc", version, about = "Asynchronous HTTP scraping service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API server.
    Serve,
    /// Submit a scrape job to a running server.
    Submit {
        /// Server base URL.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// Explicit URLs to fetch. Mutually exclusive with --site-url.
        #[arg(long = "url")]
        urls: Vec<String>,
        /// Seed URL to paginate from. Mutually exclusive with --url.
        #[arg(long)]
        site_url: Option<String>,
        #[arg(long, default_value_t = 10)]
        max_pages: u32,
    },
    /// Poll the status of a previously submitted job.
    Status {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrape_svc=info,scrape_executor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let config = Config::from_env()?;
            serve::run(config).await
        }
        Command::Submit { server, urls, site_url, max_pages } => {
            client::submit(&server, urls, site_url, max_pages).await
        }
        Command::Status { server, job_id } => client::status(&server, &job_id).await,
    }
}
