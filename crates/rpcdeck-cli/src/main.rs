// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;

use anyhow::{Context, Result};
use config::Config;
use rpcdeck_app::{Dispatcher, NoHistory, PayloadHistory, Session};
use rpcdeck_grpc::ReflectionGateway;
use rpcdeck_store::Store;
use rpcdeck_tui::Theme;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

fn main() {
    if let Err(error) = run() {
        eprintln!("rpcdeck: {error:#}");
        if error.downcast_ref::<UsageError>().is_some() {
            eprintln!("Try 'rpcdeck --help' for more information.");
            std::process::exit(2);
        }
        std::process::exit(1);
    }
}

/// Bad command line; reported with exit status 2.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UsageError(String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

fn usage(message: impl Into<String>) -> anyhow::Error {
    UsageError(message.into()).into()
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1))?;
    if options.show_help {
        print_help();
        return Ok(());
    }
    if options.show_version {
        println!("rpcdeck {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let config_path = resolve_config_path(options.config_path.clone(), Config::default_path)?;
    if options.print_config_path {
        println!("{}", config_path.display());
        return Ok(());
    }
    if options.print_example {
        print!("{}", Config::example_config(&config_path));
        return Ok(());
    }
    let Some(address) = options.address.as_deref() else {
        return Err(usage("missing server address"));
    };

    let config = Config::load(&config_path).with_context(|| {
        format!(
            "load config {}; run `rpcdeck --print-example-config` for a template",
            config_path.display()
        )
    })?;
    let keys = config.keymap()?;
    let connect = config.connect_options(options.insecure, options.connect_timeout)?;

    let cache_dir = rpcdeck_store::payload_cache_dir();
    if let Ok(dir) = &cache_dir
        && let Err(error) = logging::init(dir)
    {
        eprintln!("rpcdeck: logging disabled: {error:#}");
    }
    tracing::info!(address, method = ?options.method, "starting");

    let gateway = ReflectionGateway::connect(address, &connect)?;

    let store = if config.remember_payloads() {
        match Store::open(address) {
            Ok(store) => Some(Arc::new(store)),
            Err(error) => {
                tracing::warn!("payload cache disabled: {error:#}");
                None
            }
        }
    } else {
        None
    };
    let history: Arc<dyn PayloadHistory> = match &store {
        Some(store) => Arc::clone(store) as Arc<dyn PayloadHistory>,
        None => Arc::new(NoHistory),
    };

    let (tx, rx) = mpsc::channel();
    let mut dispatcher = Dispatcher::new(Arc::new(gateway), history, tx);
    let mut session = Session::new(options.method.clone());
    let result = rpcdeck_tui::run_app(
        &mut session,
        &mut dispatcher,
        &rx,
        &keys,
        &Theme::default(),
    );

    dispatcher.shutdown();
    if let Some(store) = &store
        && let Err(error) = store.flush()
    {
        tracing::warn!("save payload cache: {error:#}");
    }
    tracing::info!("exiting");
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    /// `--config`; the default location is only looked up when no flag was given.
    config_path: Option<PathBuf>,
    address: Option<String>,
    method: Option<String>,
    insecure: bool,
    connect_timeout: Option<Duration>,
    print_config_path: bool,
    print_example: bool,
    show_help: bool,
    show_version: bool,
}

fn resolve_config_path(
    explicit: Option<PathBuf>,
    default_path: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => default_path(),
    }
}

fn parse_cli_args<I, S>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: None,
        address: None,
        method: None,
        insecure: false,
        connect_timeout: None,
        print_config_path: false,
        print_example: false,
        show_help: false,
        show_version: false,
    };
    let mut positional = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_owned())),
            _ => (arg, None),
        };
        let mut value = |name: &str| -> Result<String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => iter
                    .next()
                    .map(|value| value.as_ref().to_owned())
                    .ok_or_else(|| usage(format!("{name} requires a value"))),
            }
        };
        match flag {
            "--config" => options.config_path = Some(PathBuf::from(value("--config")?)),
            "--connect-timeout" => {
                let raw = value("--connect-timeout")?;
                let timeout = config::positive_duration("--connect-timeout", &raw)
                    .map_err(|error| usage(format!("{error:#}")))?;
                options.connect_timeout = Some(timeout);
            }
            "--insecure" | "-insecure" => options.insecure = true,
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example = true,
            "--help" | "-h" => options.show_help = true,
            "--version" | "-V" => options.show_version = true,
            unknown if unknown.starts_with('-') && unknown.len() > 1 => {
                return Err(usage(format!("unknown flag {unknown:?}")));
            }
            _ => positional.push(arg.to_owned()),
        }
    }

    let mut positional = positional.into_iter();
    options.address = positional.next();
    options.method = positional.next();
    if positional.next().is_some() {
        return Err(usage("too many arguments; expected <address> [method]"));
    }
    Ok(options)
}

fn print_help() {
    println!("rpcdeck {}", env!("CARGO_PKG_VERSION"));
    println!("Browse and call gRPC services through server reflection.");
    println!();
    println!("usage: rpcdeck [flags] <address> [package.Service/Method]");
    println!();
    println!("  --insecure               Use plaintext HTTP/2 instead of TLS");
    println!("  --connect-timeout <dur>  Give up connecting after <N>ms, <N>s or <N>m");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --version                Show the version");
    println!("  --help                   Show this help");
    println!();
    println!("Set {} to control log verbosity (default warn).", logging::LOG_ENV);
}
