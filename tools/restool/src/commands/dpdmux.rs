/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    super::{
        container_arg, destroy_command, enabled_line, info_command, info_header, target, value,
    },
    crate::{
        context::Restool,
        output::{self, field},
        parse,
    },
    anyhow::Result,
    clap::{value_parser, Arg, ArgMatches, Command},
    flib::{
        dpdmux::{self, DpdmuxCfg, DpdmuxOptions, Manip, Method},
        mc::Portal,
        object, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpdmux;

fn create_command() -> Command {
    Command::new("create")
        .about("Create a demux between one uplink and several downlinks")
        .arg(
            Arg::new("num-ifs")
                .long("num-ifs")
                .help("Number of downlink interfaces")
                .value_parser(value_parser!(u16))
                .default_value("2"),
        )
        .arg(
            Arg::new("method")
                .long("method")
                .help("DPDMUX_METHOD_* classification; S_VLAN and CUSTOM need 10.1 firmware")
                .value_parser(|s: &str| s.parse::<Method>())
                .default_value("DPDMUX_METHOD_C_VLAN_MAC"),
        )
        .arg(
            Arg::new("manip")
                .long("manip")
                .help("Uplink frame manipulation")
                .value_parser(|s: &str| s.parse::<Manip>())
                .default_value("DPDMUX_MANIP_NONE"),
        )
        .arg(
            Arg::new("max-dmat-entries")
                .long("max-dmat-entries")
                .help("Number of demux table entries")
                .value_parser(value_parser!(u16))
                .default_value("64"),
        )
        .arg(
            Arg::new("max-mc-groups")
                .long("max-mc-groups")
                .help("Number of multicast groups")
                .value_parser(value_parser!(u16))
                .default_value("32"),
        )
        .arg(
            Arg::new("max-vlan-ids")
                .long("max-vlan-ids")
                .help("Number of VLAN ids per interface, 10.1 firmware and later")
                .value_parser(value_parser!(u16))
                .default_value("0"),
        )
        .arg(
            Arg::new("options")
                .long("options")
                .value_name("list")
                .help("Comma separated DPDMUX_OPT_* names"),
        )
        .arg(container_arg())
}

pub fn subcommand_parser() -> Command {
    Command::new("dpdmux")
        .about("Ethernet demuxes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(create_command())
        .subcommand(destroy_command(TY))
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => create(ctx, matches),
        Some(("destroy", matches)) => super::destroy(ctx, matches, TY),
        _ => unreachable!("subcommand is required"),
    }
}

fn create<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let options = match matches.get_one::<String>("options") {
        Some(list) => parse::flags("options", list, &DpdmuxOptions::NAMES)?,
        None => DpdmuxOptions::empty(),
    };
    let cfg = DpdmuxCfg {
        method: value(matches, "method"),
        manip: value(matches, "manip"),
        num_ifs: value(matches, "num-ifs"),
        options,
        max_dmat_entries: value(matches, "max-dmat-entries"),
        max_mc_groups: value(matches, "max-mc-groups"),
        max_vlan_ids: value(matches, "max-vlan-ids"),
    };
    super::create(ctx, matches, TY, |io, token| dpdmux::create(io, token, &cfg))?;
    Ok(())
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled) = ctx.with_object(name, |io, token| {
        let attr = dpdmux::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version, object::is_enabled(io, token)?))
    })?;
    info_header(ctx, name, version)?;
    let out = &mut ctx.out;
    enabled_line(out, enabled)?;
    let names = output::option_names(&DpdmuxOptions::NAMES, |flag| attr.options.contains(flag));
    output::options(out, attr.options.bits(), &names)?;
    match attr.method {
        Ok(method) => field(out, "method", method)?,
        Err(raw) => field(out, "method", format_args!("unknown ({raw})"))?,
    }
    match attr.manip {
        0 => field(out, "manipulation type", Manip::None)?,
        raw => field(out, "manipulation type", format_args!("unknown ({raw})"))?,
    }
    field(out, "number of downlinks", attr.num_ifs)?;
    field(out, "frame storage memory size", attr.mem_size)?;
    if let Some(max_vlan_ids) = attr.max_vlan_ids {
        field(out, "max VLAN ids", max_vlan_ids)?;
    }
    Ok(())
}
