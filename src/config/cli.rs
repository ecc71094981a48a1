use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the streamlog binary.
#[derive(Debug, Parser)]
#[command(name = "streamlog", version, about = "Personal stream with webmentions")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "STREAMLOG_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Send webmentions and the hub ping for an existing entry again.
    Resend(ResendArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct ResendArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Id of the entry whose notifications should be sent.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the public base URL of the site.
    #[arg(long = "site-host", value_name = "URL")]
    pub site_host: Option<String>,

    /// Override the WebSub hub URL.
    #[arg(long = "websub-hub-url", value_name = "URL")]
    pub websub_hub_url: Option<String>,

    /// Toggle outbound notifications after writes.
    #[arg(
        long = "webmention-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub webmention_enabled: Option<bool>,

    /// Run notifications in the background instead of before responding.
    #[arg(
        long = "webmention-background",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub webmention_background: Option<bool>,
}
