use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scoutsec")]
#[command(version, about = "Distributed DAST engine: payload fuzzing and signature detection")]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML config file; SCOUTSEC_* variables and flags override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fuzz a single target locally
    Scan {
        #[arg(short, long)]
        url: String,

        #[arg(short, long)]
        workers: Option<usize>,

        /// Outbound requests per second
        #[arg(short, long)]
        rate: Option<u32>,

        #[arg(long)]
        retries: Option<u32>,

        #[arg(short, long)]
        timeout: Option<u64>,

        /// Also probe well-known admin consoles
        #[arg(short, long)]
        middleware: bool,

        /// Write a JSON report
        #[arg(short, long)]
        output: Option<String>,

        #[arg(long)]
        progress: bool,
    },

    /// Serve tasks to workers and collect their findings
    Master {
        #[arg(short, long)]
        bind: Option<String>,

        /// Target to enqueue; repeatable
        #[arg(short, long = "target")]
        targets: Vec<String>,

        #[arg(short, long, default_value = "active")]
        scan_type: String,

        /// Re-queue tasks held longer than this
        #[arg(long)]
        lease_secs: Option<u64>,
    },

    /// Poll a master and run assigned tasks
    Worker {
        #[arg(short, long)]
        master_url: Option<String>,

        #[arg(short, long)]
        poll_interval: Option<u64>,

        #[arg(long)]
        worker_id: Option<String>,

        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// List built-in payloads and their mutations
    Payloads {
        #[arg(long)]
        class: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan() {
        let cli = Cli::parse_from(["scoutsec", "scan", "-u", "http://t/?id=1", "-w", "8", "--middleware"]);
        match cli.command {
            Commands::Scan { url, workers, middleware, .. } => {
                assert_eq!(url, "http://t/?id=1");
                assert_eq!(workers, Some(8));
                assert!(middleware);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_master_targets() {
        let cli = Cli::parse_from([
            "scoutsec", "master", "-t", "http://a/", "-t", "http://b/", "--scan-type", "middleware",
        ]);
        match cli.command {
            Commands::Master { targets, scan_type, lease_secs, .. } => {
                assert_eq!(targets, vec!["http://a/", "http://b/"]);
                assert_eq!(scan_type, "middleware");
                assert!(lease_secs.is_none());
            }
            _ => panic!("expected master"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["scoutsec", "worker", "--config", "scoutsec.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("scoutsec.toml")));
    }
}
