use dotenv::dotenv;
use std::env;

const JOURNAL_RETRY_LIMIT: &str = "JOURNAL_RETRY_LIMIT";
const JOURNAL_CHANNEL_CAPACITY: &str = "JOURNAL_CHANNEL_CAPACITY";
const TRADE_LOG_CAPACITY: &str = "TRADE_LOG_CAPACITY";

/// Environment-driven configuration for the exchange's ambient concerns: how
/// hard the journal writer retries a transient failure, how deep its pending
/// queue is allowed to grow, and how many recent trades each book caches.
#[derive(Debug, Clone)]
pub struct Config {
    pub journal_retry_limit: u32,
    pub journal_channel_capacity: usize,
    pub trade_log_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            journal_retry_limit: 4,
            journal_channel_capacity: 4096,
            trade_log_capacity: 1024,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, optionally via a
    /// `.env` file. Every variable is optional; missing ones fall back to the
    /// defaults above rather than failing startup.
    pub fn from_env() -> Config {
        dotenv().ok();
        let defaults = Config::default();

        let journal_retry_limit = env::var(JOURNAL_RETRY_LIMIT)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.journal_retry_limit);
        let journal_channel_capacity = env::var(JOURNAL_CHANNEL_CAPACITY)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.journal_channel_capacity);
        let trade_log_capacity = env::var(TRADE_LOG_CAPACITY)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.trade_log_capacity);

        Config {
            journal_retry_limit,
            journal_channel_capacity,
            trade_log_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_retry_bound() {
        let config = Config::default();
        assert_eq!(config.journal_retry_limit, 4);
    }
}
