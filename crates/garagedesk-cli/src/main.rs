// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;
mod session;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use garagedesk_api::{AuthSession, Client};
use garagedesk_app::EntityKind;
use garagedesk_testkit::DemoCatalog;
use logging::LogConfig;
use runtime::{ListArgs, Runtime, read_form};
use session::FileSession;
use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `garagedesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    logging::init_logging(&LogConfig::from_verbosity(
        options.verbosity,
        config.log_level(),
    ))?;

    let session = Arc::new(FileSession::new(config.token_path()?));
    match &options.command {
        Some(Command::TokenSet(token)) => {
            session.set_token(token)?;
            println!("token saved to {}", session.path().display());
            return Ok(());
        }
        Some(Command::TokenClear) => {
            session.clear_token()?;
            println!("token removed");
            return Ok(());
        }
        _ => {}
    }

    let debounce = config.debounce()?;
    let runtime = if options.demo {
        Runtime::demo(DemoCatalog::default(), config.page_size(), debounce)
    } else {
        let client = Client::new(config.base_url(), config.timeout()?, session.clone())
            .with_context(|| {
                format!(
                    "invalid [api] config in {}; fix base_url/timeout values",
                    options.config_path.display()
                )
            })?;
        Runtime::remote(client, config.page_size(), debounce)
    };
    if options.check_only {
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    match options.command {
        Some(Command::List { entity, args }) => runtime.list(entity, &args, &mut stdout),
        Some(Command::Validate { entity, file }) => {
            let values = read_form(&file)?;
            if !runtime.validate(entity, values, &mut stdout)? {
                bail!("{} failed validation", file.display());
            }
            Ok(())
        }
        Some(Command::Submit { entity, file }) => {
            let values = read_form(&file)?;
            if !runtime.submit(entity, values, &mut stdout)? {
                bail!("{} failed validation; nothing was sent", file.display());
            }
            Ok(())
        }
        Some(Command::TokenSet(_) | Command::TokenClear) => Ok(()),
        None => bail!("missing command; run with --help to see supported commands"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List { entity: EntityKind, args: ListArgs },
    Validate { entity: EntityKind, file: PathBuf },
    Submit { entity: EntityKind, file: PathBuf },
    TokenSet(String),
    TokenClear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    verbosity: u8,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
        verbosity: 0,
        command: None,
    };
    let mut positionals = Vec::new();
    let mut list_args = ListArgs::default();
    let mut list_flag_seen = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--verbose" | "-v" => {
                options.verbosity = options.verbosity.saturating_add(1);
            }
            "-vv" => {
                options.verbosity = options.verbosity.saturating_add(2);
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires a value"))?;
                list_args.search = value.as_ref().to_owned();
                list_flag_seen = true;
            }
            "--page" => {
                let value = iter.next().ok_or_else(|| anyhow!("--page requires a number"))?;
                list_args.page = parse_positive("--page", value.as_ref())?;
                list_flag_seen = true;
            }
            "--limit" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--limit requires a number"))?;
                list_args.limit = Some(parse_positive("--limit", value.as_ref())?);
                list_flag_seen = true;
            }
            unknown if unknown.starts_with('-') && unknown.len() > 1 => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
            positional => positionals.push(positional.to_owned()),
        }
    }

    options.command = parse_command(&positionals, list_args)?;
    if list_flag_seen && !matches!(options.command, Some(Command::List { .. })) {
        bail!("--search, --page and --limit only apply to the list command");
    }
    Ok(options)
}

fn parse_command(positionals: &[String], list_args: ListArgs) -> Result<Option<Command>> {
    let Some((name, rest)) = positionals.split_first() else {
        return Ok(None);
    };
    let command = match (name.as_str(), rest) {
        ("list", [entity]) => Command::List {
            entity: parse_entity(entity)?,
            args: list_args,
        },
        ("validate", [entity, file]) => Command::Validate {
            entity: parse_entity(entity)?,
            file: PathBuf::from(file),
        },
        ("submit", [entity, file]) => Command::Submit {
            entity: parse_entity(entity)?,
            file: PathBuf::from(file),
        },
        ("token", [action, token]) if action == "set" => Command::TokenSet(token.clone()),
        ("token", [action]) if action == "clear" => Command::TokenClear,
        ("list", _) => bail!("usage: garagedesk list <entity> [--search TEXT] [--page N] [--limit N]"),
        ("validate" | "submit", _) => bail!("usage: garagedesk {name} <entity> <file.json>"),
        ("token", _) => bail!("usage: garagedesk token set <TOKEN> | garagedesk token clear"),
        (other, _) => {
            bail!("unknown command {other:?}; run with --help to see supported commands")
        }
    };
    Ok(Some(command))
}

fn parse_entity(raw: &str) -> Result<EntityKind> {
    EntityKind::parse(raw).ok_or_else(|| {
        let known = EntityKind::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("unknown entity {raw:?}; expected one of: {known}")
    })
}

fn parse_positive(flag: &str, raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("{flag} must be a positive whole number, got {raw:?}"),
    }
}

fn print_help() {
    println!("garagedesk [options] <command>");
    println!();
    println!("commands:");
    println!("  list <entity> [--search TEXT] [--page N] [--limit N]");
    println!("                           Page through a collection");
    println!("  validate <entity> <file.json>");
    println!("                           Check a record against the entity's rules");
    println!("  submit <entity> <file.json>");
    println!("                           Validate, then create (or update when it has an id)");
    println!("  token set <TOKEN>        Store the API token");
    println!("  token clear              Forget the API token");
    println!();
    println!("entities: part, vehicle, garage, service, service_package, manufacturer, fuel_type");
    println!();
    println!("options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Use the built-in demo catalog instead of the API");
    println!("  --check                  Validate config and startup dependencies");
    println!("  -v, --verbose            More logging on stderr (repeatable)");
    println!("  --help                   Show this help");
}
