use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use etracking::{Tracker, TrackerConfig, TrackingQuery};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "etracking")]
#[command(about = "A 7-ELEVEN E-Tracking parcel status lookup", long_about = None)]
struct Cli {
    #[arg(help = "Tracking number of the parcel, e.g. J99170695484")]
    tracking_number: String,

    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text",
        help = "Output format"
    )]
    format: OutputFormat,

    #[arg(
        long,
        value_name = "PATH",
        default_value = "codeImg.jpg",
        help = "Where to save the captcha image (overwritten on every run)"
    )]
    image_path: PathBuf,

    #[arg(long, help = "Keep the captcha image after the query finishes")]
    keep_image: bool,

    #[arg(
        long,
        default_value = "utf-8",
        help = "Charset used to decode pages, overriding the declared one (try big5 if the output is garbled)"
    )]
    encoding: String,

    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Request timeout in seconds"
    )]
    timeout: u64,

    #[arg(long, value_name = "URL", help = "Override the E-Tracking base URL")]
    base_url: Option<String>,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

/// Asks until the operator types something; `None` once stdin is closed.
fn prompt_captcha() -> io::Result<Option<String>> {
    let stdin = io::stdin();
    loop {
        print!("Enter the captcha code: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let code = line.trim();
        if !code.is_empty() {
            return Ok(Some(code.to_string()));
        }
        log::warn!("Captcha code is required");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let mut config = TrackerConfig::default()
        .with_image_path(cli.image_path)
        .with_encoding(cli.encoding)
        .with_timeout(Duration::from_secs(cli.timeout));
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }

    let tracker = Tracker::with_config(config).unwrap_or_else(|e| {
        log::error!("Error creating tracker: {}", e);
        process::exit(1);
    });

    let session = tracker.acquire().await.unwrap_or_else(|e| {
        log::error!("Error fetching captcha: {}", e);
        process::exit(1);
    });

    let image_path =
        std::path::absolute(&session.image_path).unwrap_or_else(|_| session.image_path.clone());
    println!("Captcha image saved to {}", image_path.display());

    let code = match prompt_captcha() {
        Ok(Some(code)) => code,
        Ok(None) => {
            log::error!("No captcha code entered");
            process::exit(1);
        }
        Err(e) => {
            log::error!("Error reading captcha code: {}", e);
            process::exit(1);
        }
    };

    let query = TrackingQuery::new(cli.tracking_number, code);
    let result = tracker.submit(&query, &session).await;

    if !cli.keep_image
        && let Err(e) = session.discard_image()
    {
        log::warn!("Failed to remove captcha image {}: {}", image_path.display(), e);
    }

    let result = result.unwrap_or_else(|e| {
        log::error!("Error querying {}: {}", query.tracking_number, e);
        process::exit(1);
    });

    match cli.format {
        OutputFormat::Json => serialize_json(&result),
        OutputFormat::Text => print!("{}", result),
    }
}
