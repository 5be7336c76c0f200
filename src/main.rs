/// Version injected at compile time via OSDK_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("OSDK_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::{StreamExt, TryStreamExt};
use osdk::config::Config;
use osdk::resource::{all_schema_keys, Attrs, Resource};
use osdk::Connection;
use serde_json::Value;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command line client for OpenStack-compatible clouds
#[derive(Parser, Debug)]
#[command(name = "osdk", version = VERSION, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: Output,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the known resource types
    Resources,
    /// List resources of a type
    List {
        /// Resource type, e.g. compute.server
        key: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
        /// Stop after this many resources
        #[arg(long)]
        limit: Option<usize>,
        /// Follow pagination past the first page
        #[arg(long)]
        all: bool,
    },
    /// Show one resource by name or id
    Show { key: String, name_or_id: String },
    /// Delete one resource by id
    Delete {
        key: String,
        id: String,
        #[arg(long)]
        ignore_missing: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    Ok((key.to_string(), value.to_string()))
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("osdk started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("osdk").join("osdk.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".osdk").join("osdk.log");
    }
    PathBuf::from("osdk.log")
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::load());
    };
    let mut config = Config::load_from(path)?;
    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

fn print(output: Output, value: &Value) -> Result<()> {
    let text = match output {
        Output::Json => serde_json::to_string_pretty(value)?,
        Output::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn render(res: &Resource) -> Result<Value> {
    Ok(Value::Object(res.to_dict(true, true, true)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Command::Resources = args.command {
        let keys: Vec<Value> = all_schema_keys().into_iter().map(Value::from).collect();
        return print(args.output, &Value::Array(keys));
    }

    let config = load_config(args.config.as_ref())?;
    let conn = Connection::new(config.session()?);
    let proxy = conn.proxy();

    match args.command {
        Command::Resources => {},
        Command::List {
            key,
            query,
            limit,
            all,
        } => {
            let params: Attrs = query
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            let stream = proxy.list(&key, all, params)?;
            let resources: Vec<Resource> = match limit {
                Some(n) => stream.take(n).try_collect().await?,
                None => stream.try_collect().await?,
            };
            tracing::info!("Listed {} {}", resources.len(), key);
            let items = resources.iter().map(render).collect::<Result<Vec<_>>>()?;
            print(args.output, &Value::Array(items))?;
        },
        Command::Show { key, name_or_id } => {
            let found = proxy
                .find(&key, &name_or_id, true, Attrs::new())
                .await
                .with_context(|| format!("Failed to look up {} `{}`", key, name_or_id))?;
            let Some(res) = found else {
                bail!("No {} found for {}", key, name_or_id);
            };
            print(args.output, &render(&res)?)?;
        },
        Command::Delete {
            key,
            id,
            ignore_missing,
        } => match proxy.delete(&key, id.as_str(), ignore_missing).await? {
            Some(_) => eprintln!("Deleted {} {}", key, id),
            None => eprintln!("{} {} not found", key, id),
        },
    }

    Ok(())
}
