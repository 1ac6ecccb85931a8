//! Configuration management for Tamarind server
//!
//! Settings are layered: built-in defaults, an optional YAML file,
//! `TAMARIND_*` environment variables, then command line flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use tamarind_auth::{
    AuthSettings, DEFAULT_ACCESS_TOKEN_EXPIRE_SECONDS, DEFAULT_ADMIN_PASSWORD,
    DEFAULT_BCRYPT_COST, DEFAULT_CLEANUP_INTERVAL_SECONDS, DEFAULT_RATE_LIMIT_MAX_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_SECONDS, DEFAULT_REFRESH_TOKEN_EXPIRE_SECONDS,
};
use tamarind_common::TamarindError;
use tamarind_config::service::watcher::DEFAULT_WATCH_TIMEOUT;

use crate::startup::LoggingConfig;

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8086;
pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";

pub const SERVER_ADDRESS_PROPERTY: &str = "server.address";
pub const SERVER_PORT_PROPERTY: &str = "server.port";
pub const TOKEN_SECRET_PROPERTY: &str = "auth.token.secret";
pub const DATABASE_URL_PROPERTY: &str = "db.url";

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "tamarind-server", version, about)]
pub struct Cli {
    /// HTTP listen port
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    /// Database DSN; the in-memory backend is used when absent
    #[arg(long = "dsn", env = "DATABASE_URL")]
    pub dsn: Option<String>,
    /// Secret used to sign tokens
    #[arg(long = "jwt-secret", env = "TAMARIND_AUTH_TOKEN_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,
    /// Path of the YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration for the running process
    pub fn new() -> anyhow::Result<Self> {
        Self::load(Cli::parse())
    }

    pub fn load(args: Cli) -> anyhow::Result<Self> {
        let config_file = args
            .config_file
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = Config::builder()
            .add_source(File::with_name(&config_file).required(false))
            .add_source(
                Environment::with_prefix("TAMARIND")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(v) = args.port {
            builder = builder.set_override(SERVER_PORT_PROPERTY, v)?;
        }
        if let Some(v) = args.dsn {
            builder = builder.set_override(DATABASE_URL_PROPERTY, v)?;
        }
        if let Some(v) = args.jwt_secret {
            builder = builder.set_override(TOKEN_SECRET_PROPERTY, v)?;
        }

        Ok(Configuration {
            config: builder.build()?,
        })
    }

    /// Wrap an already built `Config`
    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.config
            .get_int(key)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(default)
    }

    fn get_u32(&self, key: &str, default: u32) -> u32 {
        self.config
            .get_int(key)
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string(SERVER_ADDRESS_PROPERTY)
            .unwrap_or(DEFAULT_SERVER_ADDRESS.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT_PROPERTY)
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn watch_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("watch.timeout_seconds", DEFAULT_WATCH_TIMEOUT.as_secs()))
    }

    // ========================================================================
    // Auth Configuration
    // ========================================================================

    pub fn token_secret(&self) -> anyhow::Result<String> {
        match self.config.get_string(TOKEN_SECRET_PROPERTY) {
            Ok(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err(TamarindError::validation(format!(
                "{} must be set (--jwt-secret or TAMARIND_AUTH_TOKEN_SECRET)",
                TOKEN_SECRET_PROPERTY
            ))),
        }
    }

    pub fn auth_settings(&self) -> anyhow::Result<AuthSettings> {
        let mut settings = AuthSettings::new(&self.token_secret()?);

        settings.access_token_expire_seconds = self
            .config
            .get_int("auth.token.access_expire_seconds")
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRE_SECONDS);
        settings.refresh_token_expire_seconds = self
            .config
            .get_int("auth.token.refresh_expire_seconds")
            .unwrap_or(DEFAULT_REFRESH_TOKEN_EXPIRE_SECONDS);
        settings.rate_limit_max_requests = self
            .config
            .get_int("auth.rate_limit.max_requests")
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);
        settings.rate_limit_window = Duration::from_secs(self.get_u64(
            "auth.rate_limit.window_seconds",
            DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
        ));
        settings.cleanup_interval = Duration::from_secs(self.get_u64(
            "auth.cleanup_interval_seconds",
            DEFAULT_CLEANUP_INTERVAL_SECONDS,
        ));
        settings.bcrypt_cost = self
            .config
            .get_int("auth.bcrypt_cost")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(DEFAULT_BCRYPT_COST);

        Ok(settings)
    }

    pub fn initial_admin_password(&self) -> String {
        self.config
            .get_string("auth.admin.initial_password")
            .unwrap_or(DEFAULT_ADMIN_PASSWORD.to_string())
    }

    // ========================================================================
    // Database Configuration
    // ========================================================================

    pub fn database_url(&self) -> Option<String> {
        self.config
            .get_string(DATABASE_URL_PROPERTY)
            .ok()
            .filter(|url| !url.trim().is_empty())
    }

    pub fn connect_options(&self, url: String) -> ConnectOptions {
        let mut max_connections = self.get_u32("db.pool.max_connections", 25);
        let mut min_connections = self.get_u32("db.pool.min_connections", 5);
        // Every connection to an in-memory SQLite database opens a fresh one
        if url.starts_with("sqlite") && url.contains(":memory:") {
            max_connections = 1;
            min_connections = 1;
        }
        let connect_timeout = self.get_u64("db.pool.connect_timeout_seconds", 30);
        let acquire_timeout = self.get_u64("db.pool.acquire_timeout_seconds", 8);
        let idle_timeout = self.get_u64("db.pool.idle_timeout_seconds", 300);
        let max_lifetime = self.get_u64("db.pool.max_lifetime_seconds", 300);
        let sqlx_logging = self.config.get_bool("db.pool.sqlx_logging").unwrap_or(false);

        let mut opt = ConnectOptions::new(url);

        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .sqlx_logging(sqlx_logging)
            .sqlx_logging_level(tracing_log::log::LevelFilter::Debug);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            idle_timeout = idle_timeout,
            max_lifetime = max_lifetime,
            sqlx_logging = sqlx_logging,
            "Database connection pool configured"
        );

        opt
    }

    pub async fn database_connection(&self, url: String) -> anyhow::Result<DatabaseConnection> {
        let database_connection = Database::connect(self.connect_options(url)).await?;
        Ok(database_connection)
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("logging.dir").ok(),
            self.config.get_bool("logging.console").unwrap_or(true),
            self.config.get_bool("logging.file").unwrap_or(false),
            self.config
                .get_string("logging.level")
                .unwrap_or("info".to_string()),
        )
    }
}
