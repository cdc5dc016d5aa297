//! Settings - clap の引数（と環境変数）から組み立てる実行時設定

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Arg, ArgMatches};

use trackr_core::PipelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: String,
    pub bind: SocketAddr,
    pub jwt_secret: Option<String>,
    pub api_prefix: String,
    pub dispatchers: usize,
    pub dequeue_timeout: Duration,
    pub summary_ttl: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

/// 全サブコマンド共通の引数
pub fn global_args() -> Vec<Arg> {
    vec![
        Arg::new("database-url")
            .long("database-url")
            .env("TRACKR_DATABASE_URL")
            .value_name("URL")
            .help("SQLite database URL")
            .default_value("sqlite://trackr.db")
            .global(true),
        Arg::new("redis-url")
            .long("redis-url")
            .env("TRACKR_REDIS_URL")
            .value_name("URL")
            .help("Redis URL for the report queue and summary cache")
            .default_value("redis://127.0.0.1:6379")
            .global(true),
        Arg::new("bind")
            .long("bind")
            .env("TRACKR_BIND")
            .value_name("ADDR")
            .help("HTTP listen address")
            .default_value("127.0.0.1:8080")
            .value_parser(clap::value_parser!(SocketAddr))
            .global(true),
        Arg::new("jwt-secret")
            .long("jwt-secret")
            .env("TRACKR_JWT_SECRET")
            .value_name("SECRET")
            .help("HS256 secret for bearer tokens")
            .hide_env_values(true)
            .global(true),
        Arg::new("api-prefix")
            .long("api-prefix")
            .env("TRACKR_API_PREFIX")
            .value_name("PREFIX")
            .help("Path prefix the HTTP routes are mounted under")
            .default_value("/api")
            .global(true),
        Arg::new("dispatchers")
            .long("dispatchers")
            .env("TRACKR_DISPATCHERS")
            .value_name("N")
            .help("Dispatcher loops per process")
            .value_parser(clap::value_parser!(usize))
            .global(true),
        Arg::new("dequeue-timeout-secs")
            .long("dequeue-timeout-secs")
            .env("TRACKR_DEQUEUE_TIMEOUT_SECS")
            .value_name("SECS")
            .help("How long one dequeue blocks")
            .value_parser(clap::value_parser!(u64))
            .global(true),
        Arg::new("summary-ttl-secs")
            .long("summary-ttl-secs")
            .env("TRACKR_SUMMARY_TTL_SECS")
            .value_name("SECS")
            .help("Project summary cache TTL")
            .value_parser(clap::value_parser!(u64))
            .global(true),
        Arg::new("log-level")
            .short('l')
            .long("log-level")
            .value_name("LEVEL")
            .help("Logging level when RUST_LOG is not set")
            .default_value("info")
            .value_parser(["error", "warn", "info", "debug", "trace"])
            .global(true),
        Arg::new("log-format")
            .long("log-format")
            .env("TRACKR_LOG_FORMAT")
            .value_name("FORMAT")
            .help("Log output format")
            .default_value("text")
            .value_parser(["text", "json"])
            .global(true),
    ]
}

impl Settings {
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let defaults = PipelineConfig::default();
        let string = |id: &str| matches.get_one::<String>(id).cloned();

        Ok(Self {
            database_url: string("database-url").context("database url is required")?,
            redis_url: string("redis-url").context("redis url is required")?,
            bind: matches
                .get_one::<SocketAddr>("bind")
                .copied()
                .context("bind address is required")?,
            jwt_secret: string("jwt-secret").filter(|s| !s.is_empty()),
            api_prefix: string("api-prefix").unwrap_or_default(),
            dispatchers: matches
                .get_one::<usize>("dispatchers")
                .copied()
                .unwrap_or(defaults.dispatchers),
            dequeue_timeout: matches
                .get_one::<u64>("dequeue-timeout-secs")
                .map(|s| Duration::from_secs(*s))
                .unwrap_or(defaults.dequeue_timeout),
            summary_ttl: matches
                .get_one::<u64>("summary-ttl-secs")
                .map(|s| Duration::from_secs(*s))
                .unwrap_or(defaults.summary_ttl),
            log_level: string("log-level").unwrap_or_else(|| "info".to_string()),
            log_format: match string("log-format").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        })
    }

    pub fn jwt_secret(&self) -> anyhow::Result<&str> {
        self.jwt_secret
            .as_deref()
            .context("a JWT secret is required (--jwt-secret or TRACKR_JWT_SECRET)")
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            dispatchers: self.dispatchers,
            dequeue_timeout: self.dequeue_timeout,
            summary_ttl: self.summary_ttl,
            ..PipelineConfig::default()
        }
    }
}
