use std::time::Duration;

use clap::Parser;

/// Worker-pool configuration (spec.md §6: `worker_count`, `job_queue_size`,
/// `shutdown_timeout`), sourced from env vars the same way
/// `task_queue::config::Config` was before this crate's generalization.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
	#[arg(long, env = "WORKER_COUNT", default_value = "3", help = "Number of workers draining the job queue")]
	pub worker_count: usize,

	#[arg(long, env = "JOB_QUEUE_SIZE", default_value = "100", help = "Bounded job queue capacity")]
	pub job_queue_size: usize,

	#[arg(
        long,
        env = "SHUTDOWN_TIMEOUT_SECS",
        default_value = "30",
        value_parser = parse_duration,
        help = "Graceful shutdown budget in seconds"
    )]
	pub shutdown_timeout: Duration,
}

impl Config {
	#[must_use]
	pub fn new() -> Self {
		Self::parse()
	}

	#[cfg(test)]
	#[must_use]
	pub fn test() -> Self {
		Self {
			worker_count: 2,
			job_queue_size: 4,
			shutdown_timeout: Duration::from_secs(1),
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			worker_count: 3,
			job_queue_size: 100,
			shutdown_timeout: Duration::from_secs(30),
		}
	}
}

fn parse_duration(s: &str) -> Result<Duration, std::num::ParseIntError> {
	s.parse::<u64>().map(Duration::from_secs)
}
