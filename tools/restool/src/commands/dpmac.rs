/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    super::{container_arg, destroy_command, endpoint_line, info_command, info_header, target},
    crate::{context::Restool, output::field},
    anyhow::Result,
    clap::{value_parser, Arg, ArgMatches, Command},
    flib::{
        dpmac::{self, DpmacCfg},
        mc::Portal,
        object, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpmac;

pub fn subcommand_parser() -> Command {
    Command::new("dpmac")
        .about("MAC objects, one per physical Ethernet port")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(
            Command::new("create")
                .about("Create the MAC object of a port")
                .arg(
                    Arg::new("mac-id")
                        .long("mac-id")
                        .help("Physical port number, counted from 1")
                        .value_parser(value_parser!(u32))
                        .required(true),
                )
                .arg(container_arg()),
        )
        .subcommand(destroy_command(TY))
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => {
            let cfg = DpmacCfg {
                mac_id: super::value(matches, "mac-id"),
            };
            super::create(ctx, matches, TY, |io, token| dpmac::create(io, token, &cfg))?;
            Ok(())
        }
        Some(("destroy", matches)) => super::destroy(ctx, matches, TY),
        _ => unreachable!("subcommand is required"),
    }
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version) = ctx.with_object(name, |io, token| {
        let attr = dpmac::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version))
    })?;
    let parent = info_header(ctx, name, version)?;
    endpoint_line(ctx, parent, name)?;
    let out = &mut ctx.out;
    field(out, "link type", attr.link_type)?;
    field(out, "ethernet interface", attr.eth_if)?;
    field(out, "maximum rate", format_args!("{} Mbps", attr.max_rate))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        crate::commands::testing::{restool, run, V10_1, V9},
        flib::emulator::Emulator,
    };

    #[test]
    fn the_object_is_named_after_its_port() {
        for version in [V9, V10_1] {
            let mut ctx = restool(Emulator::new(version));
            assert_eq!(
                run(&mut ctx, &["dpmac", "create", "--mac-id=4"]).unwrap(),
                "dpmac.4 is created under dprc.1\n"
            );
            let info = run(&mut ctx, &["dpmac", "info", "dpmac.4"]).unwrap();
            assert!(info.contains("link type: DPMAC_LINK_TYPE_BACKPLANE\n"), "{info}");
            assert!(info.contains("ethernet interface: DPMAC_ETH_IF_XFI\n"), "{info}");
            assert!(info.contains("maximum rate: 10000 Mbps\n"), "{info}");
            assert!(info.contains("endpoint: no object associated\n"), "{info}");
        }
    }

    #[test]
    fn mac_id_is_required() {
        let mut ctx = restool(Emulator::new(V10_1));
        assert!(run(&mut ctx, &["dpmac", "create"]).is_err());
    }
}
