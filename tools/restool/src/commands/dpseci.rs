/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    super::{container_arg, destroy_command, enabled_line, info_command, info_header, target},
    crate::{
        context::Restool,
        output::{self, field},
        parse,
    },
    anyhow::Result,
    clap::{value_parser, Arg, ArgMatches, Command},
    flib::{
        dpseci::{self, DpseciCfg, DpseciOptions},
        mc::Portal,
        object, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpseci;

pub fn subcommand_parser() -> Command {
    let priorities = Arg::new("priorities")
        .long("priorities")
        .value_name("list")
        .help("Priority of each rx queue, 1 to 8, comma separated; one queue per entry")
        .required(true);
    let num_tx_queues = Arg::new("num-tx-queues")
        .long("num-tx-queues")
        .help("Number of tx queues [default: the number of rx queues]")
        .value_parser(value_parser!(u8));
    let options = Arg::new("options")
        .long("options")
        .value_name("list")
        .help("Comma separated DPSECI_OPT_* names, 10.1 firmware and later");

    Command::new("dpseci")
        .about("Interfaces to the SEC crypto accelerator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(
            Command::new("create")
                .about("Create a SEC interface")
                .arg(priorities)
                .arg(num_tx_queues)
                .arg(options)
                .arg(container_arg()),
        )
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
    let priorities = matches
        .get_one::<String>("priorities")
        .unwrap_or_else(|| unreachable!("`priorities` is a required argument"));
    let options = match matches.get_one::<String>("options") {
        Some(list) => parse::flags("options", list, &DpseciOptions::NAMES)?,
        None => DpseciOptions::empty(),
    };
    let cfg = DpseciCfg {
        priorities: parse::number_list("priorities", priorities)?,
        num_tx_queues: matches.get_one::<u8>("num-tx-queues").copied().unwrap_or(0),
        options,
    };
    super::create(ctx, matches, TY, |io, token| dpseci::create(io, token, &cfg))?;
    Ok(())
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled) = ctx.with_object(name, |io, token| {
        let attr = dpseci::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version, object::is_enabled(io, token)?))
    })?;
    info_header(ctx, name, version)?;
    let out = &mut ctx.out;
    enabled_line(out, enabled)?;
    field(out, "number of transmit queues", attr.num_tx_queues)?;
    field(out, "number of receive queues", attr.num_rx_queues)?;
    if let Some(options) = attr.options {
        let names = output::option_names(&DpseciOptions::NAMES, |flag| options.contains(flag));
        output::options(out, options.bits().into(), &names)?;
    }
    Ok(())
}
