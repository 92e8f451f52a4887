// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

use crate::models::score::RepeatAttemptPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub server_port: u16,
    /// What happens when a user submits the same quiz again.
    pub repeat_policy: RepeatAttemptPolicy,
    /// Include the correct labels in submission feedback.
    pub reveal_answers: bool,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let repeat_policy = env::var("REPEAT_ATTEMPT_POLICY")
            .map(|v| RepeatAttemptPolicy::from_str(&v).expect("Invalid REPEAT_ATTEMPT_POLICY"))
            .unwrap_or_default();

        let reveal_answers = flag("REVEAL_ANSWERS", true);
        let seed_demo_data = flag("SEED_DEMO_DATA", false);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            server_port,
            repeat_policy,
            reveal_answers,
            seed_demo_data,
        }
    }
}

fn flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
