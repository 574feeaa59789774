use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Outbound mail settings for the lead notifier.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub email: Option<String>,
    pub password: Option<String>,
    pub admin_email: Option<String>,
}

impl SmtpConfig {
    /// Credentials are optional; without them mail is only logged.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub frontend_origin: String,
    pub bcrypt_cost: u32,
    pub smtp: SmtpConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: raw,
            })?,
            Err(_) => bcrypt::DEFAULT_COST,
        };
        let port = match env::var("SMTP_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "SMTP_PORT",
                value: raw,
            })?,
            Err(_) => 587,
        };
        let email = env::var("SMTP_EMAIL").ok();

        Ok(Self {
            mongo_uri: required("MONGO_URI")?,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "bizdesk".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            bcrypt_cost,
            smtp: SmtpConfig {
                server: env::var("SMTP_SERVER").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port,
                admin_email: env::var("ADMIN_EMAIL").ok().or_else(|| email.clone()),
                email,
                password: env::var("SMTP_PASSWORD").ok(),
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}
