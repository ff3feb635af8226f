use dotenv::dotenv;
use std::env;

use common::utils::DEFAULT_PREMIUM_THRESHOLD;

#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Collaborators
    pub redis_url: String,
    pub rpc_url: String,
    pub neynar_api_url: String,
    pub neynar_api_key: String,

    /// Default whole-token balance that makes a wallet a premium holder,
    /// overridable per coin.
    pub premium_threshold: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("SERVER_PORT must be a valid port number");

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let rpc_url = env::var("RPC_URL")?;

        let neynar_api_url = env::var("NEYNAR_API_URL")
            .unwrap_or_else(|_| "https://api.neynar.com".to_string());
        let neynar_api_key = env::var("NEYNAR_API_KEY")?;

        let premium_threshold = env::var("PREMIUM_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_PREMIUM_THRESHOLD.to_string())
            .parse::<u64>()
            .expect("PREMIUM_THRESHOLD must be a valid number");

        Ok(Config {
            server_host,
            server_port,
            redis_url,
            rpc_url,
            neynar_api_url,
            neynar_api_key,
            premium_threshold,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
