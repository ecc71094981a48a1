//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, ResendArgs, ServeArgs, ServeOverrides};

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "streamlog";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 1313;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_SITE_HOST: &str = "http://127.0.0.1:1313";
const DEFAULT_SITE_TITLE: &str = "Stream";
const DEFAULT_WEBMENTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEBMENTION_CONCURRENCY: u32 = 1;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub site: SiteSettings,
    pub websub: WebSubSettings,
    pub webmention: WebmentionSettings,
    pub admin: AdminSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// `None` selects the in-memory store.
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub host: Url,
    pub title: String,
    pub author: String,
    pub bridges: Vec<Url>,
    /// Federation bridge that host-meta and webfinger requests are sent to.
    pub fedsoc_bridge: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct WebSubSettings {
    pub hub_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct WebmentionSettings {
    pub enabled: bool,
    pub background: bool,
    pub timeout: Duration,
    pub concurrency: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub token: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("STREAMLOG")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("site.bridges")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Resend(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    site: RawSiteSettings,
    websub: RawWebSubSettings,
    webmention: RawWebmentionSettings,
    admin: RawAdminSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(host) = overrides.site_host.as_ref() {
            self.site.host = Some(host.clone());
        }
        if let Some(hub) = overrides.websub_hub_url.as_ref() {
            self.websub.hub_url = Some(hub.clone());
        }
        if let Some(enabled) = overrides.webmention_enabled {
            self.webmention.enabled = Some(enabled);
        }
        if let Some(background) = overrides.webmention_background {
            self.webmention.background = Some(background);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            site,
            websub,
            webmention,
            admin,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            site: build_site_settings(site)?,
            websub: build_websub_settings(websub)?,
            webmention: build_webmention_settings(webmention)?,
            admin: build_admin_settings(admin),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    let namespace = match database.namespace {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(LoadError::invalid(
                    "database.namespace",
                    "namespace must not be empty",
                ));
            }
            trimmed.to_string()
        }
        None => DEFAULT_NAMESPACE.to_string(),
    };

    Ok(DatabaseSettings {
        url,
        max_connections,
        namespace,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let host = parse_http_url(
        site.host.as_deref().unwrap_or(DEFAULT_SITE_HOST),
        "site.host",
    )?;

    let bridges = site
        .bridges
        .unwrap_or_default()
        .iter()
        .map(|value| parse_http_url(value, "site.bridges"))
        .collect::<Result<Vec<_>, _>>()?;

    let fedsoc_bridge = non_blank(site.fedsoc_bridge)
        .map(|value| parse_http_url(&value, "site.fedsoc_bridge"))
        .transpose()?;

    Ok(SiteSettings {
        host,
        title: non_blank(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        author: site.author.unwrap_or_default().trim().to_string(),
        bridges,
        fedsoc_bridge,
    })
}

fn build_websub_settings(websub: RawWebSubSettings) -> Result<WebSubSettings, LoadError> {
    let hub_url = non_blank(websub.hub_url)
        .map(|value| parse_http_url(&value, "websub.hub_url"))
        .transpose()?;
    Ok(WebSubSettings { hub_url })
}

fn build_webmention_settings(
    webmention: RawWebmentionSettings,
) -> Result<WebmentionSettings, LoadError> {
    let timeout_secs = webmention
        .timeout_seconds
        .unwrap_or(DEFAULT_WEBMENTION_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "webmention.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let concurrency = non_zero_u32(
        webmention
            .concurrency
            .unwrap_or(DEFAULT_WEBMENTION_CONCURRENCY)
            .into(),
        "webmention.concurrency",
    )?;

    Ok(WebmentionSettings {
        enabled: webmention.enabled.unwrap_or(true),
        background: webmention.background.unwrap_or(false),
        timeout: Duration::from_secs(timeout_secs),
        concurrency,
    })
}

fn build_admin_settings(admin: RawAdminSettings) -> AdminSettings {
    AdminSettings {
        token: non_blank(admin.token),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    host: Option<String>,
    title: Option<String>,
    author: Option<String>,
    bridges: Option<Vec<String>>,
    fedsoc_bridge: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWebSubSettings {
    hub_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWebmentionSettings {
    enabled: Option<bool>,
    background: Option<bool>,
    timeout_seconds: Option<u64>,
    concurrency: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    token: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value.trim())
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            key,
            format!("url `{value}` must use http or https"),
        ));
    }
    Ok(url)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
