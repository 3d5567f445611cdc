//! `ormeta` command-line tool

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indexmap::IndexMap;
use ormeta_core::{EngineConfig, HintReport, MetadataEngine, ResolutionReport};
use ormeta_model::ResolutionModes;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let config = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Engine configuration file (YAML or JSON)");

    Command::new("ormeta")
        .version(ormeta_core::VERSION)
        .about("Resolve entity metadata from declarations and override documents")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("resolve")
                .about("Resolve types and print the resulting metadata as JSON")
                .arg(
                    Arg::new("types")
                        .long("types")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Declaration table file"),
                )
                .arg(
                    Arg::new("document")
                        .long("document")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(PathBuf))
                        .help("Override document; repeat to load several in order"),
                )
                .arg(
                    Arg::new("type")
                        .long("type")
                        .action(ArgAction::Append)
                        .help("Resolve only this type; defaults to every persistent type"),
                )
                .arg(
                    Arg::new("modes")
                        .long("modes")
                        .default_value("all")
                        .value_parser(value_parser!(ResolutionModes))
                        .help("Comma-separated modes: meta, mapping, query, or all"),
                )
                .arg(
                    Arg::new("override")
                        .long("override")
                        .action(ArgAction::SetTrue)
                        .help("Let document values replace in-code ones"),
                )
                .arg(
                    Arg::new("metadata-complete")
                        .long("metadata-complete")
                        .action(ArgAction::SetTrue)
                        .help("Ignore in-code directives for types a document describes"),
                )
                .arg(config.clone()),
        )
        .subcommand(
            Command::new("hints")
                .about("Apply a hint map and print the effective fetch configuration")
                .arg(
                    Arg::new("hints")
                        .long("hints")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Hint map file (YAML or JSON object)"),
                )
                .arg(
                    Arg::new("transaction")
                        .long("transaction")
                        .action(ArgAction::SetTrue)
                        .help("Start a transaction afterwards so pending lock modes apply"),
                )
                .arg(config),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(args: &ArgMatches) -> Result<EngineConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn load_hints(path: &Path) -> Result<IndexMap<String, Value>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let hints: IndexMap<String, Value> = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?,
    };
    Ok(hints)
}

fn resolve(args: &ArgMatches) -> Result<()> {
    let mut config = load_config(args)?;
    if args.get_flag("override") {
        config.resolver.override_mode = true;
    }
    if args.get_flag("metadata-complete") {
        config.resolver.metadata_complete = true;
    }
    let Some(types) = args.get_one::<PathBuf>("types") else {
        bail!("--types is required");
    };
    let modes = args
        .get_one::<ResolutionModes>("modes")
        .copied()
        .unwrap_or(ResolutionModes::ALL);

    let engine = MetadataEngine::from_table_file(types, config)?;
    for document in args.get_many::<PathBuf>("document").into_iter().flatten() {
        engine.load_document_file(document)?;
    }

    let entities = match args.get_many::<String>("type") {
        Some(names) => {
            let mut resolved = Vec::new();
            for name in names {
                match engine.resolve(name, modes)? {
                    Some(entity) => resolved.push(entity),
                    None => tracing::warn!(entity = %name, "type has no persistence metadata"),
                }
            }
            resolved
        }
        None => engine.resolve_all(modes)?,
    };

    let report = ResolutionReport::collect(&engine, entities);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn hints(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let Some(path) = args.get_one::<PathBuf>("hints") else {
        bail!("--hints is required");
    };
    let hints = load_hints(path)?;
    let table = std::sync::Arc::default();
    let engine = MetadataEngine::new(table, config);

    let mut application = engine.apply_hints(&hints);
    if args.get_flag("transaction") {
        application.config.begin_transaction();
    }
    let report = HintReport::from(application);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("resolve", args)) => resolve(args),
        Some(("hints", args)) => hints(args),
        _ => unreachable!("subcommand required"),
    }
}
