/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    super::{
        container_arg, destroy_command, enabled_line, info_command, info_header, target, value,
    },
    crate::{context::Restool, output::field},
    anyhow::Result,
    clap::{value_parser, Arg, ArgMatches, Command},
    flib::{
        dpio::{self, ChannelMode, DpioCfg},
        mc::Portal,
        object, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpio;

pub fn subcommand_parser() -> Command {
    let channel_mode = Arg::new("channel-mode")
        .long("channel-mode")
        .help("DPIO_LOCAL_CHANNEL or DPIO_NO_CHANNEL")
        .value_parser(|s: &str| s.parse::<ChannelMode>())
        .default_value("DPIO_LOCAL_CHANNEL");
    let num_priorities = Arg::new("num-priorities")
        .long("num-priorities")
        .help("Number of priorities of the local channel, 1 to 8")
        .value_parser(value_parser!(u8))
        .default_value("8");

    Command::new("dpio")
        .about("Software portals to the queue and buffer managers")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(
            Command::new("create")
                .about("Create an I/O portal")
                .arg(channel_mode)
                .arg(num_priorities)
                .arg(container_arg()),
        )
        .subcommand(destroy_command(TY))
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => {
            let cfg = DpioCfg {
                channel_mode: value(matches, "channel-mode"),
                num_priorities: value(matches, "num-priorities"),
            };
            super::create(ctx, matches, TY, |io, token| dpio::create(io, token, &cfg))?;
            Ok(())
        }
        Some(("destroy", matches)) => super::destroy(ctx, matches, TY),
        _ => unreachable!("subcommand is required"),
    }
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled) = ctx.with_object(name, |io, token| {
        let attr = dpio::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version, object::is_enabled(io, token)?))
    })?;
    info_header(ctx, name, version)?;
    let out = &mut ctx.out;
    enabled_line(out, enabled)?;
    field(out, "qbman portal id", attr.qbman_portal_id)?;
    match attr.channel_mode {
        Ok(mode) => field(out, "channel mode", mode)?,
        Err(raw) => field(out, "channel mode", format!("unknown ({raw})"))?,
    }
    field(out, "number of priorities", attr.num_priorities)?;
    field(
        out,
        "qbman portal cache enabled area offset",
        format_args!("{:#x}", attr.qbman_portal_ce_offset),
    )?;
    field(
        out,
        "qbman portal cache inhibited area offset",
        format_args!("{:#x}", attr.qbman_portal_ci_offset),
    )?;
    if let Some(qbman_version) = attr.qbman_version {
        field(out, "qbman version", format_args!("{qbman_version:#x}"))?;
    }
    Ok(())
}
