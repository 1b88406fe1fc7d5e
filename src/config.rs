use std::env;

use crate::error::ConfigError;

/// Fallback secret used outside production so the service boots without a Supabase project.
const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DIAGRAM_CACHE_CAPACITY: usize = 256;

/// AppConfig
///
/// Holds the service configuration. It is loaded once at startup and then shared,
/// read-only, through the application state via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which secrets are mandatory.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the Supabase project (GoTrue lives under /auth/v1).
    pub supabase_url: String,
    // Public anon key sent as the `apikey` header on GoTrue calls.
    pub supabase_anon_key: String,
    // Secret used to verify Supabase-issued access tokens (HS256).
    pub jwt_secret: String,
    // Upper bound on cached diagrams before the oldest is evicted.
    pub diagram_cache_capacity: usize,
}

/// Env
///
/// Runtime context. Local enables fallbacks and human-readable logs; Production
/// requires every secret and emits JSON logs.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-failing values for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "local-anon-key".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            diagram_cache_capacity: DEFAULT_DIAGRAM_CACHE_CAPACITY,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Production fails fast on
    /// any missing Supabase secret; local runs fall back to development defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let local = Self::default();

        let (supabase_url, supabase_anon_key, jwt_secret) = match env {
            Env::Production => (
                required("SUPABASE_URL")?,
                required("SUPABASE_ANON_KEY")?,
                required("SUPABASE_JWT_SECRET")?,
            ),
            Env::Local => (
                env::var("SUPABASE_URL").unwrap_or(local.supabase_url),
                env::var("SUPABASE_ANON_KEY").unwrap_or(local.supabase_anon_key),
                env::var("SUPABASE_JWT_SECRET").unwrap_or(local.jwt_secret),
            ),
        };

        let diagram_cache_capacity = match env::var("DIAGRAM_CACHE_CAPACITY") {
            Ok(raw) => parse_capacity(&raw)?,
            Err(_) => DEFAULT_DIAGRAM_CACHE_CAPACITY,
        };

        Ok(Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or(local.bind_addr),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            jwt_secret,
            diagram_cache_capacity,
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::Missing(var))
}

fn parse_capacity(raw: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "DIAGRAM_CACHE_CAPACITY",
        reason,
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(invalid("must be greater than zero".to_string())),
        Ok(capacity) => Ok(capacity),
        Err(e) => Err(invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rejects_zero_and_garbage() {
        assert!(parse_capacity("0").is_err());
        assert!(parse_capacity("lots").is_err());
        assert_eq!(parse_capacity(" 64 "), Ok(64));
    }
}
