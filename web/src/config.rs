use anyhow::Context;
use dotenv::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Database configuration; not needed when running on the in-memory store
    pub database_url: Option<String>,

    // Sessions are minted by the auth provider and verified here
    pub session_secret: String,
    pub session_audience: String,
    pub auth_provider_url: String,

    // Security
    pub allowed_origins: Vec<String>,
    pub rate_limit: usize, // requests per minute per client
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid port number")?;

        let database_url = env::var("DATABASE_URL").ok();

        let session_secret =
            env::var("SESSION_SECRET").context("SESSION_SECRET must be set to verify sessions")?;
        let session_audience =
            env::var("SESSION_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string());
        let auth_provider_url = env::var("AUTH_PROVIDER_URL")
            .unwrap_or_else(|_| "http://localhost:9999/auth/v1".to_string());

        let allowed_origins = parse_origins(
            &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        let rate_limit = env::var("RATE_LIMIT")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<usize>()
            .context("RATE_LIMIT must be a valid number")?;

        Ok(Config {
            server_host,
            server_port,
            database_url,
            session_secret,
            session_audience,
            auth_provider_url,
            allowed_origins,
            rate_limit,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
