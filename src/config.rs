//! Process configuration, read once at startup from the environment.
//!
//! `main` calls `dotenv::dotenv()` first, so a local `.env` file can supply any
//! of the variables below.

use std::env;
use std::fmt;
use std::str::FromStr;

/// Hosting environment, controlling diagnostics and forwarded-header trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: value.to_string(),
            }),
        }
    }
}

/// Which cross-origin requests the CORS stage admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// Any origin, header and method.
    AllowAny,
    /// Only the listed origins. An empty list denies every cross-origin request.
    Origins(Vec<String>),
}

impl CorsPolicy {
    fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
        if origins.iter().any(|origin| origin == "*") {
            CorsPolicy::AllowAny
        } else {
            CorsPolicy::Origins(origins)
        }
    }

    /// Development stays permissive; production admits no cross-origin
    /// traffic unless origins are configured.
    fn default_for(environment: Environment) -> Self {
        match environment {
            Environment::Development => CorsPolicy::AllowAny,
            Environment::Production => CorsPolicy::Origins(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Longest accepted token lifetime: ten years.
pub const MAX_JWT_EXPIRATION_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// `None` when the in-memory store is selected.
    pub database_url: Option<String>,
    pub database_connect_attempts: u32,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
    pub cors: CorsPolicy,
    pub https_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV") {
            Some(value) => value.parse()?,
            None => Environment::Production,
        };

        let in_memory = parse_or(&lookup, "IN_MEMORY_STORE", false)?;
        let database_url = match lookup("DATABASE_URL") {
            _ if in_memory => None,
            Some(url) => Some(url),
            None => return Err(ConfigError::Missing("DATABASE_URL")),
        };

        let cors = lookup("CORS_ALLOWED_ORIGINS")
            .map(|value| CorsPolicy::parse(&value))
            .unwrap_or_else(|| CorsPolicy::default_for(environment));

        let jwt_expiration_hours = parse_or(&lookup, "JWT_EXPIRATION_HOURS", 24)?;
        if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&jwt_expiration_hours) {
            return Err(ConfigError::Invalid {
                key: "JWT_EXPIRATION_HOURS",
                value: jwt_expiration_hours.to_string(),
            });
        }

        let https_port = match lookup("HTTPS_PORT") {
            Some(value) => Some(parse_value("HTTPS_PORT", &value)?),
            None => None,
        };

        Ok(Self {
            environment,
            database_url,
            database_connect_attempts: parse_or(&lookup, "DATABASE_CONNECT_ATTEMPTS", 5)?,
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret: lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiration_hours,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            cors,
            https_port,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}
