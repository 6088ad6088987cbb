/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! restool: create, inspect, link and destroy DPAA2 objects through the MC portal.

use {
    crate::context::Restool,
    clap::ArgMatches,
    colored::Colorize,
    flib::mc::DevicePortal,
    std::{
        io::{self, IsTerminal},
        path::PathBuf,
        process::ExitCode,
    },
    tracing_subscriber::EnvFilter,
};

mod cli;
mod commands;
mod context;
mod error;
mod output;
mod parse;

pub(crate) type Result<T, E = error::Error> = std::result::Result<T, E>;

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RESTOOL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Also installs the bridge for flib's `log` records.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let device = matches
        .get_one::<PathBuf>("device")
        .unwrap_or_else(|| unreachable!("`device` has a default value"));
    let portal = DevicePortal::open(device)?;

    let script = matches.get_flag("script");
    let mut ctx = Restool::open(portal, io::stdout(), script)?;
    let result = cli::dispatch(&mut ctx, matches);
    let root = ctx.root;
    match ctx.close() {
        Err(err) if result.is_ok() => Err(err.into()),
        Err(err) => {
            log::warn!("Cannot close {root}: {err}");
            result
        }
        Ok(()) => result,
    }
}

fn main() -> ExitCode {
    let matches = cli::command_parser().get_matches();
    init_logging(matches.get_flag("debug"));
    if matches.get_flag("script") || !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(error::exit_status(&err))
        }
    }
}
