//! Configuration for the GoTo login demo
//!
//! Values are layered, later sources winning:
//! - Defaults
//! - Configuration file (goto-login.toml)
//! - Environment variables with the GOTO_LOGIN prefix, e.g. GOTO_LOGIN__GOTO__CLIENT_ID

use crate::host::PublicOrigin;
use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use ras_identity_goto::GoToAuthConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Main configuration struct for the demo server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// GoTo client registration and handshake settings
    pub goto: GoToAuthConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Config file the values were read from, if any
    #[serde(skip)]
    pub source: Option<String>,
}

/// Server network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: IpAddr,

    /// Port to bind to (default: 3000)
    pub port: u16,

    /// Externally visible base URL, used to build the GoTo callback URL
    pub public_url: String,
}

/// Sign-in session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,

    /// Secret the cookie encryption key is derived from. Without it a key is
    /// generated at startup and sessions end with the process.
    pub cookie_secret: Option<String>,

    /// Mark cookies `Secure`. Enable whenever the public URL is https.
    pub secure_cookies: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "goto_login.session".to_string(),
            cookie_secret: None,
            secure_cookies: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_path = std::env::var("GOTO_LOGIN_CONFIG_FILE")
            .unwrap_or_else(|_| "goto-login.toml".to_string());

        let source = std::path::Path::new(&config_path)
            .exists()
            .then_some(config_path);
        if let Some(path) = &source {
            builder = builder.add_source(File::with_name(path));
        }

        // e.g. GOTO_LOGIN__SERVER__PORT
        builder = builder.add_source(
            Environment::with_prefix("GOTO_LOGIN")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Config = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        settings.source = source;

        settings.validate()?;
        Ok(settings)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml(source: &str) -> Result<Self> {
        let settings: Config = ConfigBuilder::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.goto
            .validate()
            .context("Invalid GoTo configuration")?;

        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        PublicOrigin::parse(&self.server.public_url)?;

        if self.session.cookie_name.is_empty() {
            anyhow::bail!("Session cookie name cannot be empty");
        }

        if self
            .session
            .cookie_secret
            .as_ref()
            .is_some_and(|secret| secret.len() < 32)
        {
            anyhow::bail!("Session cookie secret must be at least 32 characters");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        let valid_formats = ["pretty", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            );
        }

        Ok(())
    }

    /// Settings that are valid but degrade the deployment. Logged at startup.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.session.cookie_secret.is_none() {
            warnings.push("No session cookie secret configured, sessions end on restart");
        }
        if self.goto.state_key.is_none() {
            warnings.push("No GoTo state key configured, pending sign-ins fail across restarts");
        }
        if !self.session.secure_cookies && self.server.public_url.starts_with("https://") {
            warnings.push("Serving over https without secure cookies");
        }
        warnings
    }
}
