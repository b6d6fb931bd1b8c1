//! cfgstack CLI
//!
//! Entry point for the `cfgstack` command-line tool.

use clap::{Args, Parser, Subcommand};
use cfgstack::{ConfigError, ConfigLevel, ConfigStore, ConfigValue, ErrorKind, SearchPaths};
use std::path::{Path, PathBuf};
use std::process;

/// File attached at the local level when no location flag is given.
const LOCAL_CONFIG_FILE: &str = ".cfgstack";

/// Environment variable read for the log filter.
const LOG_ENV_VAR: &str = "CFGSTACK_LOG";

#[derive(Parser)]
#[command(name = "cfgstack")]
#[command(about = "Query and edit layered git-style config files", version)]
struct Cli {
    #[command(flatten)]
    location: Location,

    /// TOML file listing the global/xdg/system config paths
    #[arg(long)]
    paths: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(multiple = false)]
struct Location {
    /// Use only the given config file
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// Use only the global config file
    #[arg(long)]
    global: bool,

    /// Use only the system config file
    #[arg(long)]
    system: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective value of a key
    Get { key: String },

    /// Print every value of a multivar, optionally filtered by regex
    GetAll { key: String, regex: Option<String> },

    /// Set a single value
    Set {
        key: String,
        value: String,

        /// Store the value as a canonical integer
        #[arg(long = "int", conflicts_with = "as_bool")]
        as_int: bool,

        /// Store the value as a canonical boolean
        #[arg(long = "bool")]
        as_bool: bool,
    },

    /// Remove a single value
    Unset { key: String },

    /// Append a value to a multivar
    Add { key: String, value: String },

    /// Replace every value matching regex (append if none match)
    ReplaceAll {
        key: String,
        regex: String,
        value: String,
    },

    /// Remove every value matching regex
    UnsetAll { key: String, regex: Option<String> },

    /// List every entry in the stack, shadowed ones included
    List {
        /// Prefix each entry with its level
        #[arg(long)]
        show_level: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = match load_search_paths(cli.paths.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error loading search paths: {}", e);
            process::exit(2);
        }
    };

    let result = open_store(&cli.location, &paths).and_then(|mut store| {
        let outcome = run(cli.command, &mut store, cli.json);
        store.close();
        outcome
    });

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(exit_code(&e));
    }
}

/// Filter directive for a -v count. The library logs at debug and trace only.
fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Set up stderr logging.
///
/// `CFGSTACK_LOG` wins when set; otherwise -v flags pick the level.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbose)));

    // A second initialization is harmless; ignore it.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn load_search_paths(path: Option<&Path>) -> Result<SearchPaths, cfgstack::SearchPathsError> {
    match path {
        Some(path) => SearchPaths::load(path),
        None => Ok(SearchPaths::from_env()),
    }
}

fn open_store(location: &Location, paths: &SearchPaths) -> Result<ConfigStore, ConfigError> {
    let mut store = ConfigStore::new();

    if let Some(ref file) = location.file {
        store.add_file(file, ConfigLevel::Local, false)?;
    } else if location.global {
        let path = paths
            .global
            .as_ref()
            .ok_or(ConfigError::DiscoveryNotFound(ConfigLevel::Global))?;
        store.add_file(path, ConfigLevel::Global, false)?;
    } else if location.system {
        let path = paths
            .system
            .as_ref()
            .ok_or(ConfigError::DiscoveryNotFound(ConfigLevel::System))?;
        store.add_file(path, ConfigLevel::System, false)?;
    } else {
        store = ConfigStore::open_default(paths)?;
        store.add_file(LOCAL_CONFIG_FILE, ConfigLevel::Local, false)?;
    }

    Ok(store)
}

fn run(command: Commands, store: &mut ConfigStore, json: bool) -> Result<(), ConfigError> {
    match command {
        Commands::Get { key } => {
            let value = store.get(&key)?;
            if json {
                print_json(&value);
            } else {
                println!("{}", value);
            }
        }
        Commands::GetAll { key, regex } => {
            let values = store.get_multivar(&key, regex.as_deref())?;
            if values.is_empty() {
                return Err(ConfigError::KeyNotFound(key));
            }
            if json {
                print_json(&values);
            } else {
                for value in values {
                    println!("{}", value);
                }
            }
        }
        Commands::Set {
            key,
            value,
            as_int,
            as_bool,
        } => {
            let typed = typed_input(&key, &value, as_int, as_bool)?;
            store.set(&key, typed)?;
        }
        Commands::Unset { key } => store.delete(&key)?,
        Commands::Add { key, value } => store.add_multivar(&key, &value)?,
        Commands::ReplaceAll { key, regex, value } => store.set_multivar(&key, &regex, &value)?,
        Commands::UnsetAll { key, regex } => {
            store.delete_multivar(&key, regex.as_deref().unwrap_or(".*"))?;
        }
        Commands::List { show_level } => {
            if json {
                let entries = store.entries()?.collect::<Result<Vec<_>, _>>()?;
                print_json(&entries);
            } else if show_level {
                for entry in store.entries()? {
                    let entry = entry?;
                    println!("{}\t{}={}", entry.level, entry.name, entry.value);
                }
            } else {
                store.foreach(|name, value| {
                    println!("{}={}", name, value);
                    Ok::<_, ConfigError>(0)
                })?;
            }
        }
    }
    Ok(())
}

/// Resolve the typed form of a `set` argument once, at the call site.
fn typed_input(
    key: &str,
    value: &str,
    as_int: bool,
    as_bool: bool,
) -> Result<ConfigValue, ConfigError> {
    let mismatch = |expected| ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
        value: value.to_string(),
    };

    if as_int {
        cfgstack_backend::parse_int64(value)
            .map(ConfigValue::Integer)
            .map_err(|_| mismatch("integer"))
    } else if as_bool {
        cfgstack_backend::parse_bool(value)
            .map(ConfigValue::Boolean)
            .map_err(|_| mismatch("boolean"))
    } else {
        Ok(ConfigValue::String(value.to_string()))
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(2);
        }
    }
}

fn exit_code(err: &ConfigError) -> i32 {
    match err.kind() {
        ErrorKind::NotFound => 1,
        _ => 2,
    }
}
