use std::env;
use std::path::PathBuf;

use crate::executor::retry::RetryPolicy;

/// Engine configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub solana_rpc_urls: Vec<String>,
    /// Delegate authority granted SPL token allowances for automated swaps.
    pub autoswap_authority: String,
    pub jupiter_api_url: String,
    pub raydium_api_url: String,
    /// Seconds between orchestration cycles for an active wallet.
    pub poll_interval_secs: u64,
    /// Maximum history entries retained per wallet, oldest evicted.
    pub history_limit: usize,
    pub retry: RetryPolicy,
    pub sign_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    /// JSON file backing the key-value store; in-memory when unset.
    pub storage_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let solana_rpc_urls = Self::parse_rpc_urls(&env::var("SOLANA_RPC_URLS")?)?;

        let autoswap_authority = env::var("AUTOSWAP_AUTHORITY")?;

        let jupiter_api_url = env::var("JUPITER_API_URL")
            .unwrap_or_else(|_| "https://quote-api.jup.ag/v6".to_string());
        let raydium_api_url = env::var("RAYDIUM_API_URL")
            .unwrap_or_else(|_| "https://api.raydium.io/v2".to_string());

        let poll_interval_secs = Self::env_u64("POLL_INTERVAL_SECS", 300)?;
        let history_limit = Self::env_u64("HISTORY_LIMIT", 50)? as usize;

        let retry = RetryPolicy {
            max_retries: Self::env_u64("SWAP_MAX_RETRIES", 3)? as u32,
            initial_delay_ms: Self::env_u64("SWAP_INITIAL_DELAY_MS", 1000)?,
            max_delay_ms: Self::env_u64("SWAP_MAX_DELAY_MS", 10000)?,
            backoff_factor: Self::env_u64("SWAP_BACKOFF_FACTOR", 2)? as u32,
        };

        if retry.max_retries == 0 {
            return Err("SWAP_MAX_RETRIES must be at least 1".into());
        }

        let sign_timeout_secs = Self::env_u64("SIGN_TIMEOUT_SECS", 120)?;
        let submit_timeout_secs = Self::env_u64("SUBMIT_TIMEOUT_SECS", 30)?;
        let confirm_timeout_secs = Self::env_u64("CONFIRM_TIMEOUT_SECS", 60)?;

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        let storage_path = env::var("STORAGE_PATH").ok().map(PathBuf::from);

        Ok(Config {
            solana_rpc_urls,
            autoswap_authority,
            jupiter_api_url,
            raydium_api_url,
            poll_interval_secs,
            history_limit,
            retry,
            sign_timeout_secs,
            submit_timeout_secs,
            confirm_timeout_secs,
            server_host,
            server_port,
            storage_path,
        })
    }

    fn parse_rpc_urls(value: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let urls: Vec<String> = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if urls.is_empty() {
            return Err("SOLANA_RPC_URLS must contain at least one URL".into());
        }

        for url in &urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("Invalid RPC URL: {}", url).into());
            }
        }

        Ok(urls)
    }

    fn env_u64(key: &str, default: u64) -> Result<u64, Box<dyn std::error::Error>> {
        match env::var(key) {
            Ok(value) =>
                value
                    .parse::<u64>()
                    .map_err(|_| format!("{} must be a non-negative integer", key).into()),
            Err(_) => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_rpc_urls() {
        let urls = Config::parse_rpc_urls(
            "https://api.mainnet-beta.solana.com, https://rpc.example.com"
        ).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1], "https://rpc.example.com");
    }

    #[test]
    fn rejects_empty_and_malformed_url_lists() {
        assert!(Config::parse_rpc_urls("  ,").is_err());
        assert!(Config::parse_rpc_urls("ftp://nope").is_err());
    }
}
