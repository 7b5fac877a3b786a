pub mod handlers;

use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("warden")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Supervised configuration runs - one at a time, stale holders reclaimed")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .help("Path to the TOML configuration file"),
        )
        .subcommand(cmd_run())
        .subcommand(cmd_enable())
        .subcommand(cmd_disable())
        .subcommand(cmd_status())
        .subcommand(cmd_child_run())
}

fn cmd_run() -> Command {
    Command::new("run")
        .about("Perform one supervised configuration run")
        .arg(
            Arg::new("lockfile")
                .long("lockfile")
                .value_name("PATH")
                .help("Override the run lock path"),
        )
        .arg(
            Arg::new("disabled-lockfile")
                .long("disabled-lockfile")
                .value_name("PATH")
                .help("Override the disablement artifact path"),
        )
        .arg(
            Arg::new("runtimeout")
                .long("runtimeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("Seconds a lock holder may run before being reclaimed (0 = never)"),
        )
        .arg(
            Arg::new("no-splay")
                .long("no-splay")
                .action(ArgAction::SetTrue)
                .help("Skip the randomized startup delay"),
        )
        .arg(
            Arg::new("no-isolate")
                .long("no-isolate")
                .action(ArgAction::SetTrue)
                .help("Run the work in this process instead of an isolated child"),
        )
        .arg(
            Arg::new("command")
                .value_name("COMMAND")
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .help("Apply command to run (overrides the configured one)"),
        )
}

fn cmd_enable() -> Command {
    Command::new("enable").about("Re-enable a disabled agent")
}

fn cmd_disable() -> Command {
    Command::new("disable")
        .about("Disable the agent so no runs start")
        .arg(
            Arg::new("message")
                .short('m')
                .long("message")
                .value_name("REASON")
                .default_value("disabled by administrator")
                .help("Reason recorded in the disablement artifact"),
        )
}

fn cmd_status() -> Command {
    Command::new("status").about("Show disablement and run-lock state")
}

// Internal child role for isolated runs; spawned by `run`, never by hand.
fn cmd_child_run() -> Command {
    Command::new("child-run")
        .hide(true)
        .arg(
            Arg::new("lockfile")
                .long("lockfile")
                .value_name("PATH")
                .required(true),
        )
        .arg(
            Arg::new("runtimeout")
                .long("runtimeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("command")
                .value_name("COMMAND")
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
}
