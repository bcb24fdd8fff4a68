use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod delivery;
mod lookup;
mod plate;
mod registry;
mod reply;
mod schedule;
mod staging;
mod sweep;
#[cfg(test)]
mod test_support;

use cli::{Command, RootArgs, SweepArgs};
use config::{apply_env_overrides, load_config_file, validate_config, Config};
use delivery::{DiscordMessenger, LogMessenger, Messenger};
use lookup::HttpLookup;
use registry::{OwnerId, Registry, SharedRegistry};
use sweep::{run_sweep, SweepContext, SweepSummary, ThreadPacer};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let config = resolve_config(&args)?;
    let registry = open_registry(&config)?;

    match &args.command {
        Command::Check(check) => {
            let lookup = http_lookup(&config);
            emit(&commands::check(&lookup, &check.plate), args.json)
        }
        Command::Register(register) => {
            let reply = commands::register(&registry, OwnerId(register.user), &register.plate)?;
            emit(&reply, args.json)
        }
        Command::List(list) => emit(&commands::list(&registry, OwnerId(list.user)), args.json),
        Command::Remove(remove) => {
            let reply = commands::remove(&registry, OwnerId(remove.user), &remove.plate)?;
            emit(&reply, args.json)
        }
        Command::Sweep(sweep_args) => cmd_sweep(&config, &registry, sweep_args, args.json),
        Command::Serve(_) => cmd_serve(&config, &registry),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "platewatch=debug"
    } else {
        "platewatch=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(args: &RootArgs) -> Result<Config> {
    let mut config = load_config_file(args.config.as_deref())?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    if let Some(data_file) = &args.data_file {
        config.data_file = data_file.clone();
    }
    validate_config(&config)?;
    Ok(config)
}

fn open_registry(config: &Config) -> Result<SharedRegistry> {
    let registry = Registry::load(&config.data_file, config.max_plates_per_owner)
        .context("registry could not be loaded; refusing to start")?;
    tracing::debug!(
        path = %registry.path().display(),
        plates = registry.entries().len(),
        "registry loaded"
    );
    Ok(SharedRegistry::new(registry))
}

fn http_lookup(config: &Config) -> HttpLookup {
    HttpLookup::new(&config.api_endpoint, config.http_timeout())
}

fn messenger(config: &Config) -> Box<dyn Messenger> {
    match config.discord_token.as_deref() {
        Some(token) => Box::new(DiscordMessenger::new(
            &config.discord_api_base,
            token,
            config.http_timeout(),
        )),
        None => {
            tracing::warn!("PLATEWATCH_DISCORD_TOKEN is not set; reports will only be logged");
            Box::new(LogMessenger)
        }
    }
}

fn cmd_sweep(
    config: &Config,
    registry: &SharedRegistry,
    args: &SweepArgs,
    json: bool,
) -> Result<()> {
    let mut schedule = config.schedule()?;
    let today = Local::now().date_naive();
    if args.any_day {
        schedule.weekday = today.weekday();
    }
    let lookup = http_lookup(config);
    let messenger = messenger(config);
    let ctx = SweepContext {
        lookup: &lookup,
        messenger: messenger.as_ref(),
        pacer: &ThreadPacer,
        pause: config.sweep_pause(),
    };
    let summary = run_sweep(&registry.snapshot(), today, &schedule, &ctx);
    if json {
        print_json(&summary)
    } else {
        println!("{}", summary_line(&summary));
        Ok(())
    }
}

fn cmd_serve(config: &Config, registry: &SharedRegistry) -> Result<()> {
    let schedule = config.schedule()?;
    let lookup = http_lookup(config);
    let messenger = messenger(config);
    let ctx = SweepContext {
        lookup: &lookup,
        messenger: messenger.as_ref(),
        pacer: &ThreadPacer,
        pause: config.sweep_pause(),
    };
    tracing::info!(
        weekday = ?schedule.weekday,
        at = %schedule.at,
        "weekly sweep scheduled"
    );
    sweep::serve(registry, &schedule, &ctx)
}

fn summary_line(summary: &SweepSummary) -> String {
    if !summary.ran {
        return "Not the scheduled sweep day; nothing checked (use --any-day to force).".to_string();
    }
    format!(
        "Checked {} plate(s): {} clean, {} with violations ({} delivered, {} refused, {} failed), {} lookup failure(s).",
        summary.checked,
        summary.clean,
        summary.reported,
        summary.delivered,
        summary.refused,
        summary.failed_deliveries,
        summary.failed_lookups
    )
}

fn emit(reply: &reply::Reply, json: bool) -> Result<()> {
    if json {
        return print_json(reply);
    }
    print!("{}", reply.to_text());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_explains_a_skipped_sweep() {
        let line = summary_line(&SweepSummary::default());
        assert!(line.contains("--any-day"));
    }

    #[test]
    fn summary_line_counts_outcomes() {
        let summary = SweepSummary {
            ran: true,
            checked: 3,
            clean: 1,
            reported: 2,
            delivered: 1,
            refused: 1,
            failed_lookups: 0,
            failed_deliveries: 0,
        };
        assert_eq!(
            summary_line(&summary),
            "Checked 3 plate(s): 1 clean, 2 with violations (1 delivered, 1 refused, 0 failed), 0 lookup failure(s)."
        );
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let args = RootArgs::try_parse_from([
            "platewatch",
            "register",
            "--user",
            "42",
            "--plate",
            "30A12345",
            "--data-file",
            "/tmp/plates.json",
            "--json",
        ])
        .expect("parse");
        assert!(args.json);
        assert_eq!(
            args.data_file.as_deref(),
            Some(std::path::Path::new("/tmp/plates.json"))
        );
        let Command::Register(register) = args.command else {
            panic!("expected register");
        };
        assert_eq!(register.user, 42);
    }
}
