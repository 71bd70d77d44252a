//! CLI for ICMP traceroute.

mod runner;

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use traceroute_core::{TracerouteConfig, TracerouteParams};
use tracing_subscriber::EnvFilter;

/// Print the route packets take to a network host.
#[derive(Parser, Debug)]
#[command(name = "traceroute")]
#[command(version)]
#[command(about = "Print the route ICMP echo packets take to a network host")]
pub struct Args {
    /// Target hostname or IP address.
    #[arg(required = true)]
    pub target: String,

    /// Maximum TTL.
    #[arg(short = 'm', long = "max-hops", default_value = "30")]
    pub max_hops: u8,

    /// Probes per hop.
    #[arg(short = 'q', long = "queries", default_value = "3")]
    pub queries: u8,

    /// Time to wait for each response, in milliseconds.
    #[arg(short = 'w', long = "wait", default_value = "1000")]
    pub wait: u64,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Convert CLI args to TracerouteConfig.
    fn to_config(&self) -> TracerouteConfig {
        TracerouteConfig {
            hostname: self.target.clone(),
            params: TracerouteParams {
                max_hops: self.max_hops,
                retries: self.queries,
                timeout: Duration::from_millis(self.wait),
            },
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.to_config();

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        cancel_clone.cancel();
    });

    match runner::run_traceroute(&config, &cancel).await {
        Ok(result) => {
            if args.json {
                match result.to_json() {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Failed to serialize results: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print!("{}", result.to_text());
            }
            if result.interrupted() {
                tracing::warn!("Traceroute interrupted");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("traceroute: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_params_default() {
        let args = Args::try_parse_from(["traceroute", "example.com"]).unwrap();
        let config = args.to_config();
        let defaults = TracerouteParams::default();

        assert_eq!(config.hostname, "example.com");
        assert_eq!(config.params.max_hops, defaults.max_hops);
        assert_eq!(config.params.retries, defaults.retries);
        assert_eq!(config.params.timeout, defaults.timeout);
        assert!(!args.json);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "traceroute", "-m", "12", "-q", "1", "-w", "250", "--json", "-v", "10.0.0.1",
        ])
        .unwrap();
        let config = args.to_config();

        assert_eq!(config.params.max_hops, 12);
        assert_eq!(config.params.retries, 1);
        assert_eq!(config.params.timeout, Duration::from_millis(250));
        assert!(args.json);
        assert!(args.verbose);
    }

    #[test]
    fn test_target_required() {
        assert!(Args::try_parse_from(["traceroute"]).is_err());
        assert!(Args::try_parse_from(["traceroute", "-m", "300", "host"]).is_err());
    }
}
