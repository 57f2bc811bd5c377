use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;

use kindle_digest::config::Config;
use kindle_digest::delivery::Mailx;
use kindle_digest::digest::Percollate;
use kindle_digest::pipeline::{self, Outcome, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "kindle-digest",
    version,
    about = "Generate a Kindle-friendly RSS digest from an OPML file and mail it to your Kindle"
)]
struct Args {
    /// Path to the OPML file containing RSS feeds
    #[arg(long, value_name = "FILE")]
    opml: PathBuf,

    /// Your Kindle email address
    #[arg(long)]
    email: String,

    /// Number of days back to fetch articles [default: 1]
    #[arg(long, value_name = "DAYS", value_parser = clap::value_parser!(u32).range(1..))]
    period: Option<u32>,

    /// Directory to save the output HTML [default: current directory]
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Config file [default: ~/.config/kindle-digest/config.toml]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Digest title and mail subject [default: "Kindle RSS"]
    #[arg(long)]
    title: Option<String>,

    /// Only list the links that would be bundled; build and send nothing
    #[arg(long)]
    dry_run: bool,
}

/// Merges command-line flags over the config file.
fn resolve_settings(args: Args, config: &Config) -> Result<Settings> {
    let output_dir = match args.out.or_else(|| config.output_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    Ok(Settings {
        opml: args.opml,
        email: args.email,
        period_days: args.period.unwrap_or(config.period_days),
        output_dir,
        title: args.title.unwrap_or_else(|| config.title.clone()),
        file_prefix: config.file_prefix.clone(),
        fetch_concurrency: config.fetch_concurrency,
        dry_run: args.dry_run,
    })
}

fn build_client(config: &Config) -> Result<reqwest::Client> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("kindle-digest/{}", env!("CARGO_PKG_VERSION")));
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindle_digest=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };

    let settings = resolve_settings(args, &config)?;
    let client = build_client(&config)?;
    let generator = Percollate::new(&config.digest_command);
    let mailer = Mailx::new(&config.mail_command);

    match pipeline::run(&settings, &client, &generator, &mailer, Local::now()).await {
        Ok(Outcome::Skipped { feeds, failed }) => {
            if failed > 0 {
                eprintln!("Warning: {} of {} feeds could not be fetched", failed, feeds);
            }
            println!("No articles found in the selected time period.");
        }
        Ok(Outcome::DryRun { links, failed }) => {
            if failed > 0 {
                eprintln!("Warning: {} feeds could not be fetched", failed);
            }
            for link in &links {
                println!("{}", link);
            }
            println!("{} articles would be included.", links.len());
        }
        Ok(Outcome::Delivered { document, failed }) => {
            if failed > 0 {
                eprintln!("Warning: {} feeds could not be fetched", failed);
            }
            println!(
                "Sent '{}' ({} articles) to {}",
                document.path.display(),
                document.articles,
                settings.email
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}
