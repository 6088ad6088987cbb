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
        dpcon::{self, DpconCfg},
        mc::Portal,
        object, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpcon;

pub fn subcommand_parser() -> Command {
    let num_priorities = Arg::new("num-priorities")
        .long("num-priorities")
        .help("Number of priorities, 1 to 8")
        .value_parser(value_parser!(u8))
        .default_value("1");

    Command::new("dpcon")
        .about("Concentrators")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(
            Command::new("create")
                .about("Create a concentrator")
                .arg(num_priorities)
                .arg(container_arg()),
        )
        .subcommand(destroy_command(TY))
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => {
            let cfg = DpconCfg {
                num_priorities: value(matches, "num-priorities"),
            };
            super::create(ctx, matches, TY, |io, token| dpcon::create(io, token, &cfg))?;
            Ok(())
        }
        Some(("destroy", matches)) => super::destroy(ctx, matches, TY),
        _ => unreachable!("subcommand is required"),
    }
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled) = ctx.with_object(name, |io, token| {
        let attr = dpcon::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version, object::is_enabled(io, token)?))
    })?;
    info_header(ctx, name, version)?;
    enabled_line(&mut ctx.out, enabled)?;
    field(&mut ctx.out, "qbman channel id", attr.qbman_ch_id)?;
    field(&mut ctx.out, "number of priorities", attr.num_priorities)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        crate::commands::testing::{restool, run, V10_1, V9},
        flib::emulator::Emulator,
    };

    #[test]
    fn priorities_round_trip() {
        for version in [V9, V10_1] {
            let mut ctx = restool(Emulator::new(version));
            run(&mut ctx, &["dpcon", "create", "--num-priorities", "6"]).unwrap();
            let info = run(&mut ctx, &["dpcon", "info", "dpcon.0"]).unwrap();
            assert!(info.contains("number of priorities: 6\n"), "{info}");
            assert!(info.contains("qbman channel id: 32\n"), "{info}");
        }
    }

    #[test]
    fn out_of_range_priorities_are_invalid() {
        let mut ctx = restool(Emulator::new(V10_1));
        let err = run(&mut ctx, &["dpcon", "create", "--num-priorities", "9"]).unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::EINVAL) as u8);
        assert!(ctx.io.portal().find(0x908).is_none());
    }
}
