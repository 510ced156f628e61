use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use panapi::{
    Address, AddressGroup, ApiSession, Config, Resource, Service, ServiceGroup, Session, Tag,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// Manage Prisma Access configuration objects
#[derive(Parser, Debug)]
#[command(name = "panapi", version, about, long_about = None)]
struct Cli {
    /// Path to the credentials file (default: ~/.panapi/config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Log file (default: panapi.log in the user config directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    output: Output,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List objects of a kind
    List(ObjectArgs),
    /// Read one object by id or name
    Read(ObjectArgs),
    /// Create an object
    Create(ObjectArgs),
    /// Update an object
    Update(ObjectArgs),
    /// Delete an object by id
    Delete(ObjectArgs),
}

#[derive(Args, Debug)]
struct ObjectArgs {
    /// Object kind
    #[arg(value_enum)]
    kind: Kind,

    /// Folder scope
    #[arg(short, long)]
    folder: Option<String>,

    /// Object name
    #[arg(short, long)]
    name: Option<String>,

    /// Object id
    #[arg(long)]
    id: Option<String>,

    /// JSON file with object attributes
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Address,
    AddressGroup,
    Tag,
    Service,
    ServiceGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Append log lines to `log_path`. Returns the appender guard, which must
/// live until exit, or `None` when logging is off or the file can't be opened.
fn setup_logging(
    level: LogLevel,
    log_path: &Path,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    if level == LogLevel::Off {
        return None;
    }

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .inspect_err(|err| eprintln!("Failed to open log file {}: {err}", log_path.display()))
        .ok()?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .init();

    tracing::info!("Logging at {:?} to {}", level, log_path.display());
    Some(guard)
}

/// `~/.config/panapi/panapi.log`, falling back to the home directory
fn default_log_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("panapi"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".panapi")))
        .unwrap_or_default()
        .join("panapi.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
    let _log_guard = setup_logging(cli.log_level, &log_path);

    let credentials = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .credentials()
        .context("Incomplete credentials; set them in ~/.panapi/config.yml or PANAPI_* variables")?;

    let mut session = ApiSession::new(credentials)?;

    let (action, args) = match cli.command {
        Command::List(args) => (Action::List, args),
        Command::Read(args) => (Action::Read, args),
        Command::Create(args) => (Action::Create, args),
        Command::Update(args) => (Action::Update, args),
        Command::Delete(args) => (Action::Delete, args),
    };

    let result = match args.kind {
        Kind::Address => execute::<Address>(action, &args, &mut session, cli.output).await,
        Kind::AddressGroup => {
            execute::<AddressGroup>(action, &args, &mut session, cli.output).await
        }
        Kind::Tag => execute::<Tag>(action, &args, &mut session, cli.output).await,
        Kind::Service => execute::<Service>(action, &args, &mut session, cli.output).await,
        Kind::ServiceGroup => {
            execute::<ServiceGroup>(action, &args, &mut session, cli.output).await
        }
    };

    if let Err(err) = &result {
        tracing::error!("{:?} failed: {:#}", action, err);
        if let Some(response) = session.response() {
            eprintln!("Last response: {} {}", response.status, response.body);
        }
    }
    result
}

async fn execute<R: Resource>(
    action: Action,
    args: &ObjectArgs,
    session: &mut ApiSession,
    output: Output,
) -> Result<()> {
    let object: R = build_object(args)?;

    match action {
        Action::List => print(&object.list(session).await?, output),
        Action::Read => print(&object.read(session).await?, output),
        Action::Create => {
            let mut object = object;
            object.create(session).await?;
            print(&object, output)
        }
        Action::Update => {
            object.update(session).await?;
            let body: Value = match session.response() {
                Some(response) => response.json()?,
                None => Value::Null,
            };
            print(&body, output)
        }
        Action::Delete => {
            object.delete(session).await?;
            eprintln!("Deleted {}", object.id().unwrap_or_default());
            Ok(())
        }
    }
}

/// Merge the attribute file with the identifying flags
fn build_object<R: Resource>(args: &ObjectArgs) -> Result<R> {
    let mut attributes = match &args.file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str::<Value>(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("{} must contain a JSON object", path.display()),
            }
        }
        None => Map::new(),
    };

    for (key, value) in [("id", &args.id), ("name", &args.name), ("folder", &args.folder)] {
        if let Some(value) = value {
            attributes.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    Ok(R::from_attributes(attributes)?)
}

fn print<T: Serialize>(value: &T, output: Output) -> Result<()> {
    let rendered = match output {
        Output::Json => serde_json::to_string_pretty(value)?,
        Output::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
