use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ArgMatches;
use warden_core::AgentConfig;

use crate::commands;

/// Route parsed arguments to a command, returning the process exit code.
///
/// # Errors
///
/// Returns an error for configuration problems or supervisor
/// infrastructure failures; work failures come back as exit codes.
pub fn dispatch(matches: &ArgMatches) -> Result<i32> {
    match matches.subcommand() {
        Some(("run", sub_m)) => handle_run(matches, sub_m),
        Some(("enable", _)) => handle_enable(matches),
        Some(("disable", sub_m)) => handle_disable(matches, sub_m),
        Some(("status", _)) => handle_status(matches),
        Some(("child-run", sub_m)) => Ok(commands::child_run::run(&child_run_options(sub_m))),
        _ => anyhow::bail!("Unknown command. Run 'warden --help' for usage."),
    }
}

fn load_config(matches: &ArgMatches) -> Result<AgentConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => Ok(AgentConfig::load(Path::new(path))?),
        None => Ok(AgentConfig::default()),
    }
}

fn handle_run(matches: &ArgMatches, sub_m: &ArgMatches) -> Result<i32> {
    let mut config = load_config(matches)?;

    if let Some(path) = sub_m.get_one::<String>("lockfile") {
        config.lockfile = PathBuf::from(path);
    }
    if let Some(path) = sub_m.get_one::<String>("disabled-lockfile") {
        config.disabled_lockfile = PathBuf::from(path);
    }
    if let Some(timeout) = sub_m.get_one::<u64>("runtimeout") {
        config.runtimeout = *timeout;
    }
    if sub_m.get_flag("no-splay") {
        config.splay = false;
    }
    if sub_m.get_flag("no-isolate") {
        config.isolate = false;
    }
    if let Some(command) = sub_m.get_many::<String>("command") {
        config.apply_command = command.cloned().collect();
    }
    config.validate()?;

    commands::run::run(&commands::run::RunOptions { config })
}

fn handle_enable(matches: &ArgMatches) -> Result<i32> {
    let config = load_config(matches)?;
    commands::enable::run(&config)
}

fn handle_disable(matches: &ArgMatches, sub_m: &ArgMatches) -> Result<i32> {
    let config = load_config(matches)?;
    let message = sub_m
        .get_one::<String>("message")
        .map_or("disabled by administrator", String::as_str);
    commands::disable::run(&config, message)
}

fn handle_status(matches: &ArgMatches) -> Result<i32> {
    let config = load_config(matches)?;
    commands::status::run(&config)
}

fn child_run_options(sub_m: &ArgMatches) -> commands::child_run::ChildRunOptions {
    commands::child_run::ChildRunOptions {
        lockfile: sub_m
            .get_one::<String>("lockfile")
            .map(PathBuf::from)
            .unwrap_or_default(),
        runtimeout: sub_m.get_one::<u64>("runtimeout").copied().unwrap_or(0),
        command: sub_m
            .get_many::<String>("command")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
    }
}
