/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Global options and the dispatch from object name to its command module.

use {
    crate::{commands::*, context::Restool, error::NoObjectSnafu},
    anyhow::Result,
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    flib::mc::{DevicePortal, Portal},
    std::{io::Write, path::PathBuf},
};

pub fn command_parser() -> Command {
    Command::new("restool")
        .about("Manage DPAA2 objects through the Management Complex firmware")
        .version(env!("CARGO_PKG_VERSION"))
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("Print the restool version")
                .action(ArgAction::Version),
        )
        .arg(
            Arg::new("mc-version")
                .short('m')
                .long("mc-version")
                .help("Print the MC firmware version")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("script")
                .short('s')
                .long("script")
                .help("Print bare values, for use in scripts")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Log every command exchanged with the MC")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .help("MC portal device")
                .env("RESTOOL_DEVICE")
                .default_value(DevicePortal::DEFAULT_PATH)
                .value_parser(value_parser!(PathBuf)),
        )
        .subcommand(dprc::subcommand_parser())
        .subcommand(dpni::subcommand_parser())
        .subcommand(dpio::subcommand_parser())
        .subcommand(dpbp::subcommand_parser())
        .subcommand(dpsw::subcommand_parser())
        .subcommand(dpdmux::subcommand_parser())
        .subcommand(dpci::subcommand_parser())
        .subcommand(dpcon::subcommand_parser())
        .subcommand(dpseci::subcommand_parser())
        .subcommand(dpmac::subcommand_parser())
        .arg_required_else_help(true)
}

/// Runs what the command line asks for on an open context.
pub fn dispatch<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("mc-version") {
        let version = ctx.mc_version;
        if ctx.script {
            writeln!(ctx.out, "{version}")?;
        } else {
            writeln!(ctx.out, "MC firmware version: {version}")?;
        }
        return Ok(());
    }

    let Some((object, matches)) = matches.subcommand() else {
        return Err(NoObjectSnafu.build().into());
    };
    match object {
        "dprc" => dprc::run(ctx, matches),
        "dpni" => dpni::run(ctx, matches),
        "dpio" => dpio::run(ctx, matches),
        "dpbp" => dpbp::run(ctx, matches),
        "dpsw" => dpsw::run(ctx, matches),
        "dpdmux" => dpdmux::run(ctx, matches),
        "dpci" => dpci::run(ctx, matches),
        "dpcon" => dpcon::run(ctx, matches),
        "dpseci" => dpseci::run(ctx, matches),
        "dpmac" => dpmac::run(ctx, matches),
        _ => unreachable!("unexpected object: {object:?}"),
    }
}
