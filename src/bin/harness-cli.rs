use std::num::NonZeroU32;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use reload_harness::health::ReadinessProbe;

#[derive(Parser)]
#[command(name = "harness-cli")]
#[command(about = "Client for a running reload-harness process", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show lifecycle status (start, readiness, drain outcome)
    Status,
    /// Show the health endpoint body
    Health,
    /// Poll /health from outside until it answers or attempts run out
    Wait {
        #[arg(long, default_value_t = 10)]
        attempts: u32,

        #[arg(long, default_value_t = 100)]
        interval_ms: u64,

        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()?;

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Wait {
            attempts,
            interval_ms,
            timeout_ms,
        } => {
            let attempts = NonZeroU32::new(attempts).ok_or("--attempts must be at least 1")?;
            let probe = ReadinessProbe::new(attempts, Duration::from_millis(interval_ms));
            let url = format!("{}/health", cli.url);
            let timeout = Duration::from_millis(timeout_ms);

            let started = std::time::Instant::now();
            let result = probe
                .probe(|| {
                    let request = client.get(&url).timeout(timeout).send();
                    async move {
                        matches!(request.await, Ok(res) if res.status().is_success())
                    }
                })
                .await;

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "succeeded": result.succeeded,
                    "attempts": result.attempts,
                    "elapsed_ms": started.elapsed().as_millis() as u64,
                }))?
            );
            if !result.succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: harness returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
