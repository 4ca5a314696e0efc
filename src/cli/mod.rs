mod client_cmd;
mod service;

use anyhow::{Context, Result, bail};
use console::style;
use std::path::PathBuf;

use crate::core::config::{MonitorConfig, TrackerConfig};
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Services")
        .command("tracker", "Run the activity tracker API")
        .command("monitor", "Run the board monitor (polls a tracker)")
        .print();

    GuideSection::new("Client")
        .command("client <server> health", "Tracker health")
        .command("client <server> status", "Tracker status and counters")
        .command("client <server> list", "List activities [--limit n] [--status s]")
        .command("client <server> get <id>", "Show one activity")
        .command(
            "client <server> create <type> <desc>",
            "Create an activity [--metadata json]",
        )
        .command(
            "client <server> update <id> <status>",
            "Update an activity [--result json]",
        )
        .command("client <server> clear", "Remove every activity")
        .command("client <server> process <task>", "Run a task [--data json]")
        .command("client <server> demo", "Walk through the API once")
        .print();

    GuideSection::new("Service flags")
        .command("--config <path>", "TOML config file")
        .command("--host <addr> / --port <n>", "Listen address")
        .command("--log-level <filter>", "Log filter, e.g. info or taskboard=debug")
        .command("--no-simulate", "tracker: disable background activity")
        .command("--track-requests", "tracker: log every request as an activity")
        .command("--tracker-host / --tracker-port", "monitor: tracker to poll")
        .command("--interval <ms>", "monitor: poll interval")
        .command("--db-path <path>", "monitor: SQLite file")
        .print();

    println!(
        "\n {} {} <command> [flags]\n",
        style("Usage:").bold(),
        style("taskboard").green()
    );
}

fn flag_value<'a>(args: &'a [String], i: usize) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", args[i]))
}

fn parse_number<T>(flag: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {} {:?}: {}", flag, raw, e))
}

/// Command-line overrides for `taskboard tracker`. Flags win over the
/// environment and the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TrackerFlags {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub no_simulate: bool,
    pub track_requests: bool,
}

impl TrackerFlags {
    pub(crate) fn apply(&self, config: &mut TrackerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.no_simulate {
            config.simulate = false;
        }
        if self.track_requests {
            config.track_requests = true;
        }
    }
}

pub(crate) fn parse_tracker_flags(args: &[String], start: usize) -> Result<TrackerFlags> {
    let mut flags = TrackerFlags::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                flags.config = Some(PathBuf::from(flag_value(args, i)?));
                i += 2;
            }
            "--host" => {
                flags.host = Some(flag_value(args, i)?.to_string());
                i += 2;
            }
            "--port" => {
                flags.port = Some(parse_number("--port", flag_value(args, i)?)?);
                i += 2;
            }
            "--log-level" => {
                flags.log_level = Some(flag_value(args, i)?.to_string());
                i += 2;
            }
            "--no-simulate" => {
                flags.no_simulate = true;
                i += 1;
            }
            "--track-requests" => {
                flags.track_requests = true;
                i += 1;
            }
            other => bail!("unknown tracker flag {:?}", other),
        }
    }
    Ok(flags)
}

/// Command-line overrides for `taskboard monitor`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MonitorFlags {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub tracker_host: Option<String>,
    pub tracker_port: Option<u16>,
    pub interval_ms: Option<u64>,
    pub db_path: Option<PathBuf>,
}

impl MonitorFlags {
    pub(crate) fn apply(&self, config: &mut MonitorConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(host) = &self.tracker_host {
            config.tracker_host = host.clone();
        }
        if let Some(port) = self.tracker_port {
            config.tracker_port = port;
        }
        if let Some(ms) = self.interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(path) = &self.db_path {
            config.db_path = path.clone();
        }
    }
}

pub(crate) fn parse_monitor_flags(args: &[String], start: usize) -> Result<MonitorFlags> {
    let mut flags = MonitorFlags::default();
    let mut i = start;
    while i < args.len() {
        let flag = args[i].as_str();
        if !matches!(
            flag,
            "--config"
                | "--host"
                | "--port"
                | "--log-level"
                | "--tracker-host"
                | "--tracker-port"
                | "--interval"
                | "--db-path"
        ) {
            bail!("unknown monitor flag {:?}", flag);
        }
        let value = flag_value(args, i)?;
        match flag {
            "--config" => flags.config = Some(PathBuf::from(value)),
            "--host" => flags.host = Some(value.to_string()),
            "--port" => flags.port = Some(parse_number(flag, value)?),
            "--log-level" => flags.log_level = Some(value.to_string()),
            "--tracker-host" => flags.tracker_host = Some(value.to_string()),
            "--tracker-port" => flags.tracker_port = Some(parse_number(flag, value)?),
            "--interval" => flags.interval_ms = Some(parse_number(flag, value)?),
            _ => flags.db_path = Some(PathBuf::from(value)),
        }
        i += 2;
    }
    Ok(flags)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("");

    match cmd {
        "tracker" => service::run_tracker(parse_tracker_flags(&args, 2)?).await,
        "monitor" => service::run_monitor(parse_monitor_flags(&args, 2)?).await,
        "client" => client_cmd::run_client_command(&args[2..]).await,
        "" | "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            bail!("unknown command {:?}", other)
        }
    }
}
