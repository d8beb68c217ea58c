use std::path::PathBuf;

use clap::{Parser, Subcommand};

use market::signal::{DEFAULT_THRESHOLD_PERCENT, DEFAULT_WINDOW_LENGTH};

#[derive(Debug, Parser)]
#[clap(name = "monitor", version, about = "Moving-average stock alert monitor")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate configured alerts every check interval until Ctrl-C
    Run {
        #[clap(long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Scan the ticker universe once and write the results as JSON
    Scan {
        /// Extra tickers to include (comma-separated)
        #[clap(long)]
        custom: Option<String>,

        #[clap(long, default_value = "stocks_data.json")]
        output: PathBuf,

        /// Optional config supplying fetch settings
        #[clap(long)]
        config: Option<PathBuf>,
    },

    /// Replace the config's alerts with one near-MA alert per universe ticker
    GenConfig {
        #[clap(long, default_value = "config.yaml")]
        config: PathBuf,

        #[clap(long, default_value_t = DEFAULT_WINDOW_LENGTH)]
        ma_period: usize,

        #[clap(long, default_value_t = DEFAULT_THRESHOLD_PERCENT)]
        threshold: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_to_config_yaml() {
        let cli = Cli::parse_from(["monitor", "run"]);
        match cli.command {
            Command::Run { config } => assert_eq!(config, PathBuf::from("config.yaml")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn scan_takes_custom_list() {
        let cli = Cli::parse_from(["monitor", "scan", "--custom", "TSLA,NVDA"]);
        match cli.command {
            Command::Scan { custom, output, config } => {
                assert_eq!(custom.as_deref(), Some("TSLA,NVDA"));
                assert_eq!(output, PathBuf::from("stocks_data.json"));
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn gen_config_parses_overrides() {
        let cli = Cli::parse_from([
            "monitor",
            "gen-config",
            "--ma-period",
            "200",
            "--threshold",
            "2.5",
        ]);
        match cli.command {
            Command::GenConfig {
                ma_period,
                threshold,
                ..
            } => {
                assert_eq!(ma_period, 200);
                assert_eq!(threshold, 2.5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
