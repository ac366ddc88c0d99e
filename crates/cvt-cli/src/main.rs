//! Command-line interface for the CVT current value table.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cvt_core::config::defaults;
use cvt_core::keys::RECEIVED_TIMESECONDS;
use cvt_core::{codec, CvtConfig, HashStore, ItemValue, TargetRegistry, ValueType, ValueTypeSet};
use cvt_engine::{CvtEngine, ItemRecord, PacketValueSet};
use cvt_storage::{create_backend, ScanTargetRegistry, StoreTargetRegistry};

/// CVT - Inspect and drive the telemetry current value table.
#[derive(Parser, Debug)]
#[command(name = "cvt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file.
    #[arg(short, long, global = true, default_value = defaults::CONFIG_FILE)]
    config: PathBuf,

    /// Tenant scope every operation runs in.
    #[arg(short, long, global = true, default_value = "DEFAULT")]
    scope: String,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Replace a packet's values with a JSON object of suffixed keys.
    Set {
        target: String,
        packet: String,
        /// Flat object, e.g. '{"TEMP1":1000,"TEMP1__C":25.5}'. NaN and Infinity are accepted.
        values: String,
        /// Stamp RECEIVED_TIMESECONDS with the current time.
        #[arg(long)]
        stamp: bool,
    },
    /// Update one item of an existing packet.
    SetItem {
        target: String,
        packet: String,
        item: String,
        /// JSON value; anything that is not valid JSON is stored as a string.
        value: String,
        /// RAW, CONVERTED, FORMATTED, WITH_UNITS or ALL.
        #[arg(short = 't', long = "type", default_value = "ALL")]
        value_type: ValueTypeSet,
    },
    /// Read one item, honouring overrides and fallbacks.
    GetItem {
        target: String,
        packet: String,
        item: String,
        /// RAW, CONVERTED, FORMATTED or WITH_UNITS.
        #[arg(short = 't', long = "type", default_value = "CONVERTED")]
        value_type: ValueType,
    },
    /// Print a packet's stored values.
    Get { target: String, packet: String },
    /// Delete a packet's values.
    Del { target: String, packet: String },
    /// Force an item's value.
    Override {
        target: String,
        packet: String,
        item: String,
        /// JSON value; anything that is not valid JSON is stored as a string.
        value: String,
        /// RAW, CONVERTED, FORMATTED, WITH_UNITS or ALL.
        #[arg(short = 't', long = "type", default_value = "ALL")]
        value_type: ValueTypeSet,
    },
    /// Remove an item's override.
    Normalize {
        target: String,
        packet: String,
        item: String,
        /// RAW, CONVERTED, FORMATTED, WITH_UNITS or ALL.
        #[arg(short = 't', long = "type", default_value = "ALL")]
        value_type: ValueTypeSet,
    },
    /// List every override in the scope.
    Overrides {
        /// Only report targets added with `targets add`.
        #[arg(long)]
        registered: bool,
    },
    /// Batch lookup of TARGET__PACKET__ITEM__TYPE specifiers.
    Values {
        #[arg(required = true)]
        items: Vec<String>,
        /// Staleness threshold in seconds (defaults to the configured value).
        #[arg(long)]
        stale_time: Option<f64>,
    },
    /// List packets of a target that have live values.
    Packets { target: String },
    /// Target registry management.
    Targets {
        #[command(subcommand)]
        targets_cmd: TargetsCommand,
    },
}

/// Target registry subcommands.
#[derive(Subcommand, Debug)]
enum TargetsCommand {
    /// Register a target.
    Add { name: String },
    /// Unregister a target.
    Remove { name: String },
    /// List registered targets.
    List,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = CvtConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    init_logging(&config, args.verbose);

    let store = create_backend(&config.storage.backend, &config.backend_settings())
        .with_context(|| format!("Failed to open '{}' storage", config.storage.backend))?;

    run(args.command, &args.scope, &config, store)
}

fn init_logging(config: &CvtConfig, verbose: bool) {
    let default_filter = if verbose {
        "cvt=debug"
    } else {
        config.logging.filter.as_str()
    };

    // RUST_LOG wins over the configured filter
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run(command: Command, scope: &str, config: &CvtConfig, store: Arc<dyn HashStore>) -> Result<()> {
    let registry = StoreTargetRegistry::new(store.clone());
    let targets: Arc<dyn TargetRegistry> = match &command {
        Command::Overrides { registered: true } => Arc::new(registry.clone()),
        _ => Arc::new(ScanTargetRegistry::new(store.clone())),
    };
    let engine = CvtEngine::new(store, targets);

    match command {
        Command::Set {
            target,
            packet,
            values,
            stamp,
        } => {
            let flat = codec::decode_map(values.as_bytes()).context("Invalid packet values")?;
            let mut values = PacketValueSet::from_flat(flat);
            if stamp {
                values.insert(RECEIVED_TIMESECONDS, ItemRecord::new(now_secs()));
            }
            engine.set(&values, &target, &packet, scope)?;
            print_value(&ItemValue::from(values.len() as u64))
        }
        Command::SetItem {
            target,
            packet,
            item,
            value,
            value_type,
        } => {
            engine.set_item(&target, &packet, &item, parse_value(&value), value_type, scope)?;
            Ok(())
        }
        Command::GetItem {
            target,
            packet,
            item,
            value_type,
        } => {
            let value = engine.get_item(&target, &packet, &item, value_type, scope)?;
            print_value(&value.unwrap_or(ItemValue::Null))
        }
        Command::Get { target, packet } => match engine.get(&target, &packet, scope)? {
            Some(values) => print_value(&ItemValue::Object(values.to_flat())),
            None => anyhow::bail!("Packet '{} {}' does not exist", target, packet),
        },
        Command::Del { target, packet } => {
            let removed = engine.del(&target, &packet, scope)?;
            print_value(&ItemValue::Bool(removed))
        }
        Command::Override {
            target,
            packet,
            item,
            value,
            value_type,
        } => {
            engine.override_item(&target, &packet, &item, parse_value(&value), value_type, scope)?;
            Ok(())
        }
        Command::Normalize {
            target,
            packet,
            item,
            value_type,
        } => {
            let removed = engine.normalize(&target, &packet, &item, value_type, scope)?;
            print_value(&ItemValue::Bool(removed))
        }
        Command::Overrides { .. } => {
            let entries = engine.overrides(scope)?;
            print_value(&ItemValue::Array(
                entries.iter().map(|entry| entry.to_item_value()).collect(),
            ))
        }
        Command::Values { items, stale_time } => {
            let stale_time = stale_time.unwrap_or(config.cvt.stale_time_secs);
            let values = engine.get_tlm_values(items.as_slice(), stale_time, scope)?;
            print_value(&ItemValue::Array(
                values.iter().map(|value| value.to_item_value()).collect(),
            ))
        }
        Command::Packets { target } => {
            let names = engine.packet_names(&target, scope)?;
            print_value(&ItemValue::from(
                names.into_iter().map(ItemValue::from).collect::<Vec<_>>(),
            ))
        }
        Command::Targets { targets_cmd } => match targets_cmd {
            TargetsCommand::Add { name } => {
                registry.register(scope, &name)?;
                Ok(())
            }
            TargetsCommand::Remove { name } => {
                let removed = registry.unregister(scope, &name)?;
                print_value(&ItemValue::Bool(removed))
            }
            TargetsCommand::List => {
                let names = registry.names(scope)?;
                print_value(&ItemValue::from(
                    names.into_iter().map(ItemValue::from).collect::<Vec<_>>(),
                ))
            }
        },
    }
}

/// JSON when it parses, otherwise the raw text as a string.
fn parse_value(text: &str) -> ItemValue {
    codec::decode_value(text).unwrap_or_else(|_| ItemValue::from(text))
}

fn print_value(value: &ItemValue) -> Result<()> {
    println!("{}", codec::encode_value(value)?);
    Ok(())
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
