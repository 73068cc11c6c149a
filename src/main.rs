mod classify;
mod config;
mod monitor;
mod notify;
mod process;
mod stats;

use clap::Parser;
use config::MonitorConfig;
use monitor::{Monitor, Outcome};
use notify::TelegramNotifier;
use process::FuzzerProcessController;
use std::path::PathBuf;

/// Watches an AFL++ fuzzing campaign through its stats file, reports
/// progress to Telegram, and stops the fuzzer once it goes too long
/// without finding new paths.
#[derive(Parser, Debug)]
#[command(name = "fuzzmon", version, about)]
pub struct Cli {
    /// Directory for fuzzer output (overrides config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Fuzzer stats filename inside the output directory (overrides config)
    #[arg(short, long)]
    stats_file: Option<String>,

    /// Max seconds without new paths before stopping the fuzzer (overrides config)
    #[arg(long)]
    max_time_without_finds: Option<u64>,

    /// Seconds between checks on fuzzer status (overrides config)
    #[arg(long)]
    check_interval: Option<u64>,

    /// Command-line substring used to locate fuzzer processes (overrides config)
    #[arg(long)]
    process_pattern: Option<String>,

    /// Config file path
    #[arg(short, long, default_value = "monitor.toml")]
    config: PathBuf,

    /// Validate config and print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,
}

/// Merge CLI flags over the loaded config.
fn apply_overrides(config: &mut MonitorConfig, cli: &Cli) {
    if let Some(dir) = &cli.output_dir {
        config.fuzzer.output_dir = dir.clone();
    }
    if let Some(file) = &cli.stats_file {
        config.fuzzer.stats_file = file.clone();
    }
    if let Some(pattern) = &cli.process_pattern {
        config.fuzzer.process_pattern = pattern.clone();
    }
    if let Some(secs) = cli.max_time_without_finds {
        config.watchdog.max_time_without_finds_secs = secs;
    }
    if let Some(secs) = cli.check_interval {
        config.watchdog.check_interval_secs = secs;
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let mut config = match MonitorConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    apply_overrides(&mut config, &cli);

    // Credentials leave the environment exactly once, here.
    let telegram = config::telegram_from_env();
    let notifier = match TelegramNotifier::new(telegram) {
        Ok(notifier) => notifier,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    if cli.dry_run {
        println!("fuzzmon v{}", env!("CARGO_PKG_VERSION"));
        println!("Stats file:             {}", config.stats_path().display());
        println!("Process pattern:        {}", config.fuzzer.process_pattern);
        println!(
            "Max time without finds: {}s",
            config.watchdog.max_time_without_finds_secs
        );
        println!(
            "Check interval:         {}s",
            config.watchdog.check_interval_secs
        );
        println!(
            "Notifications:          {}",
            if notifier.enabled() { "enabled" } else { "disabled" }
        );
        return;
    }
    let controller = FuzzerProcessController::new(config.fuzzer.process_pattern.clone());

    let mut monitor = Monitor::new(&config, notifier, controller);
    match monitor.run().await {
        Outcome::Stagnation => {
            tracing::info!("monitor finished, fuzzer stopped after stagnation");
        }
        Outcome::StatsUnavailable => {
            tracing::info!("monitor finished, stats file unavailable");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides_replaces_set_flags_only() {
        let mut config = MonitorConfig::default();
        let cli = Cli {
            output_dir: Some(PathBuf::from("/fuzz/out")),
            stats_file: None,
            max_time_without_finds: Some(1800),
            check_interval: None,
            process_pattern: Some("honggfuzz".to_string()),
            config: PathBuf::from("monitor.toml"),
            dry_run: false,
        };

        apply_overrides(&mut config, &cli);
        assert_eq!(config.fuzzer.output_dir, PathBuf::from("/fuzz/out"));
        assert_eq!(config.fuzzer.stats_file, "fuzzer_stats");
        assert_eq!(config.fuzzer.process_pattern, "honggfuzz");
        assert_eq!(config.watchdog.max_time_without_finds_secs, 1800);
        assert_eq!(config.watchdog.check_interval_secs, 60);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["fuzzmon"]);
        assert_eq!(cli.config, PathBuf::from("monitor.toml"));
        assert!(cli.output_dir.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_parses_all_flags() {
        let cli = Cli::parse_from([
            "fuzzmon",
            "--output-dir",
            "/fuzz/out",
            "--stats-file",
            "stats",
            "--max-time-without-finds",
            "7200",
            "--check-interval",
            "30",
            "--process-pattern",
            "afl-fuzz",
            "--dry-run",
        ]);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/fuzz/out")));
        assert_eq!(cli.stats_file.as_deref(), Some("stats"));
        assert_eq!(cli.max_time_without_finds, Some(7200));
        assert_eq!(cli.check_interval, Some(30));
        assert!(cli.dry_run);
    }
}
