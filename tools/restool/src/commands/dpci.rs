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
        dpci::{self, DpciCfg},
        mc::Portal,
        object, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpci;

pub fn subcommand_parser() -> Command {
    Command::new("dpci")
        .about("Communication interfaces between two software contexts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(
            Command::new("create")
                .about("Create a communication interface")
                .arg(
                    Arg::new("num-priorities")
                        .long("num-priorities")
                        .help("Number of priorities, 1 or 2")
                        .value_parser(value_parser!(u8))
                        .default_value("1"),
                )
                .arg(container_arg()),
        )
        .subcommand(destroy_command(TY))
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => {
            let cfg = DpciCfg {
                num_of_priorities: value(matches, "num-priorities"),
            };
            super::create(ctx, matches, TY, |io, token| dpci::create(io, token, &cfg))?;
            Ok(())
        }
        Some(("destroy", matches)) => super::destroy(ctx, matches, TY),
        _ => unreachable!("subcommand is required"),
    }
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled) = ctx.with_object(name, |io, token| {
        let attr = dpci::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version, object::is_enabled(io, token)?))
    })?;
    info_header(ctx, name, version)?;
    enabled_line(&mut ctx.out, enabled)?;
    field(&mut ctx.out, "number of priorities", attr.num_of_priorities)?;
    Ok(())
}
