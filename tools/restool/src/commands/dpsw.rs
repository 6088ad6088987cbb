/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    super::{
        container_arg, destroy_command, enabled_line, info_command, info_header, object_arg,
        target, value,
    },
    crate::{
        context::Restool,
        output::{self, field},
        parse,
    },
    anyhow::Result,
    clap::{value_parser, Arg, ArgMatches, Command},
    flib::{
        dpsw::{self, ComponentType, DpswCfg, DpswOptions},
        mc::Portal,
        object, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpsw;

fn limit(id: &'static str, help: &'static str, default: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .value_parser(value_parser!(u16))
        .default_value(default)
}

fn create_command() -> Command {
    Command::new("create")
        .about("Create an Ethernet switch")
        .arg(limit("num-ifs", "Number of interfaces", "4"))
        .arg(
            Arg::new("max-fdbs")
                .long("max-fdbs")
                .help("Number of forwarding databases")
                .value_parser(value_parser!(u8))
                .default_value("1"),
        )
        .arg(
            Arg::new("max-meters-per-if")
                .long("max-meters-per-if")
                .help("Number of meters per interface")
                .value_parser(value_parser!(u8))
                .default_value("0"),
        )
        .arg(limit("max-vlans", "Number of VLANs", "16"))
        .arg(limit(
            "max-fdb-entries",
            "Number of entries in each forwarding database",
            "1024",
        ))
        .arg(limit("fdb-aging-time", "Forwarding entry aging time, seconds", "300"))
        .arg(limit(
            "max-fdb-mc-groups",
            "Number of multicast groups in each forwarding database",
            "32",
        ))
        .arg(
            Arg::new("options")
                .long("options")
                .value_name("list")
                .help("Comma separated DPSW_OPT_* names"),
        )
        .arg(
            Arg::new("component-type")
                .long("component-type")
                .help("DPSW_COMPONENT_TYPE_C_VEB or DPSW_COMPONENT_TYPE_F_VEPA, 10.1 firmware and later")
                .value_parser(|s: &str| s.parse::<ComponentType>())
                .default_value("DPSW_COMPONENT_TYPE_C_VEB"),
        )
        .arg(container_arg())
}

pub fn subcommand_parser() -> Command {
    Command::new("dpsw")
        .about("Ethernet switches")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(create_command())
        .subcommand(destroy_command(TY))
        .subcommand(
            Command::new("update")
                .about("Change the configuration of a switch interface")
                .arg(object_arg(TY))
                .arg(
                    Arg::new("if-id")
                        .long("if-id")
                        .help("Interface to change")
                        .value_parser(value_parser!(u16))
                        .required(true),
                )
                .arg(
                    Arg::new("max-frame-length")
                        .long("max-frame-length")
                        .help("Largest frame the interface accepts, bytes")
                        .value_parser(value_parser!(u16))
                        .required(true),
                ),
        )
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => create(ctx, matches),
        Some(("destroy", matches)) => super::destroy(ctx, matches, TY),
        Some(("update", matches)) => update(ctx, matches),
        _ => unreachable!("subcommand is required"),
    }
}

fn create<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let options = match matches.get_one::<String>("options") {
        Some(list) => parse::flags("options", list, &DpswOptions::NAMES)?,
        None => DpswOptions::empty(),
    };
    let cfg = DpswCfg {
        num_ifs: value(matches, "num-ifs"),
        max_fdbs: value(matches, "max-fdbs"),
        max_meters_per_if: value(matches, "max-meters-per-if"),
        component_type: value(matches, "component-type"),
        max_vlans: value(matches, "max-vlans"),
        max_fdb_entries: value(matches, "max-fdb-entries"),
        fdb_aging_time: value(matches, "fdb-aging-time"),
        max_fdb_mc_groups: value(matches, "max-fdb-mc-groups"),
        options,
    };
    super::create(ctx, matches, TY, |io, token| dpsw::create(io, token, &cfg))?;
    Ok(())
}

fn update<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let if_id: u16 = value(matches, "if-id");
    let frame_length: u16 = value(matches, "max-frame-length");
    ctx.with_object(name, |io, token| {
        dpsw::if_set_max_frame_length(io, token, if_id, frame_length)
    })?;
    Ok(())
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled) = ctx.with_object(name, |io, token| {
        let attr = dpsw::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version, object::is_enabled(io, token)?))
    })?;
    info_header(ctx, name, version)?;
    let out = &mut ctx.out;
    enabled_line(out, enabled)?;
    let names = output::option_names(&DpswOptions::NAMES, |flag| attr.options.contains(flag));
    output::options(out, attr.options.bits(), &names)?;
    field(out, "max VLANs", attr.max_vlans)?;
    field(out, "max FDBs", attr.max_fdbs)?;
    field(out, "max FDB entries", attr.max_fdb_entries)?;
    field(out, "FDB aging time", attr.fdb_aging_time)?;
    field(out, "max FDB multicast groups", attr.max_fdb_mc_groups)?;
    field(out, "max meters per interface", attr.max_meters_per_if)?;
    field(out, "number of interfaces", attr.num_ifs)?;
    field(out, "current number of VLANs", attr.num_vlans)?;
    field(out, "current number of FDBs", attr.num_fdbs)?;
    if let Some(component_type) = attr.component_type {
        field(out, "component type", component_type)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        crate::commands::testing::{restool, run, V10_0, V10_1, V9},
        flib::{emulator::Emulator, ObjectName, ObjectType},
    };

    #[test]
    fn limits_and_options_reach_the_firmware() {
        for version in [V9, V10_0, V10_1] {
            let mut ctx = restool(Emulator::new(version));
            run(
                &mut ctx,
                &[
                    "dpsw",
                    "create",
                    "--num-ifs=6",
                    "--max-vlans=32",
                    "--options=DPSW_OPT_FLOODING_DIS,DPSW_OPT_METERING_EN",
                ],
            )
            .unwrap();
            let info = run(&mut ctx, &["dpsw", "info", "dpsw.0"]).unwrap();
            assert!(info.contains("number of interfaces: 6\n"), "{info}");
            assert!(info.contains("max VLANs: 32\n"), "{info}");
            assert!(
                info.contains("options: 0x41\n\tDPSW_OPT_FLOODING_DIS\n\tDPSW_OPT_METERING_EN\n"),
                "{info}"
            );
            assert_eq!(info.contains("component type"), version == V10_1, "{info}");
        }
    }

    #[test]
    fn component_type_needs_10_1() {
        let args = ["dpsw", "create", "--component-type=DPSW_COMPONENT_TYPE_F_VEPA"];
        let mut ctx = restool(Emulator::new(V10_0));
        assert!(run(&mut ctx, &args).is_err());

        let mut ctx = restool(Emulator::new(V10_1));
        run(&mut ctx, &args).unwrap();
        let info = run(&mut ctx, &["dpsw", "info", "dpsw.0"]).unwrap();
        assert!(info.contains("component type: DPSW_COMPONENT_TYPE_F_VEPA\n"), "{info}");
    }

    #[test]
    fn update_sets_the_frame_length_of_one_interface() {
        let mut ctx = restool(Emulator::new(V10_1));
        run(&mut ctx, &["dpsw", "create"]).unwrap();
        run(
            &mut ctx,
            &["dpsw", "update", "dpsw.0", "--if-id=2", "--max-frame-length=9000"],
        )
        .unwrap();
        let switch = ObjectName::new(ObjectType::Dpsw, 0);
        assert_eq!(ctx.io.portal().max_frame_length(switch, 2), Some(9000));

        let err = run(
            &mut ctx,
            &["dpsw", "update", "dpsw.0", "--if-id=4", "--max-frame-length=9000"],
        )
        .unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::ENXIO) as u8);
    }
}
