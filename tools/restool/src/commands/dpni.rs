/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Network interfaces. The two firmware generations configure them with disjoint sets
//! of limits; the command line carries both and refuses those of the other generation.

use {
    super::{
        container_arg, destroy_command, enabled_line, endpoint_line, info_command, info_header,
        object_arg, target,
    },
    crate::{
        context::Restool,
        error::InvalidOptionSnafu,
        output::{self, field},
        parse,
    },
    anyhow::Result,
    clap::{value_parser, Arg, ArgMatches, Command},
    flib::{
        dpni::{
            self, DpniAttr, DpniAttrV10, DpniAttrV9, DpniCfg, DpniCfgV10, DpniCfgV9,
            DpniOptions, DpniOptionsV9, MAX_TCS,
        },
        mc::{Abi, Generation, Portal},
        object, MacAddr, ObjectName, ObjectType,
    },
    log::warn,
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpni;

/// Limits only 9.x firmware takes.
const V9_LIMITS: [&str; 9] = [
    "max-senders",
    "max-tcs",
    "max-dist-per-tc",
    "max-unicast-filters",
    "max-multicast-filters",
    "max-vlan-filters",
    "max-qos-entries",
    "max-qos-key-size",
    "max-dist-key-size",
];

/// Limits only 10.x firmware takes.
const V10_LIMITS: [&str; 8] = [
    "num-queues",
    "num-tcs",
    "mac-filter-entries",
    "vlan-filter-entries",
    "qos-entries",
    "fs-entries",
    "num-cgs",
    "num-channels",
];

fn limit(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .value_parser(value_parser!(u8))
}

fn mac_addr_arg() -> Arg {
    Arg::new("mac-addr")
        .long("mac-addr")
        .value_name("xx:xx:xx:xx:xx:xx")
        .help("Primary MAC address")
        .value_parser(parse::mac_addr)
}

fn create_command() -> Command {
    Command::new("create")
        .about("Create a network interface")
        .arg(mac_addr_arg())
        .arg(
            Arg::new("options")
                .long("options")
                .value_name("list")
                .help("Comma separated DPNI_OPT_* names of the running firmware generation"),
        )
        .arg(limit("max-senders", "9.x: number of senders"))
        .arg(limit("max-tcs", "9.x: number of traffic classes, 1 to 8"))
        .arg(
            Arg::new("max-dist-per-tc")
                .long("max-dist-per-tc")
                .value_name("list")
                .help("9.x: distribution size of each traffic class, comma separated"),
        )
        .arg(limit("max-unicast-filters", "9.x: unicast filter entries"))
        .arg(limit("max-multicast-filters", "9.x: multicast filter entries"))
        .arg(limit("max-vlan-filters", "9.x: VLAN filter entries"))
        .arg(limit("max-qos-entries", "9.x: QoS table entries"))
        .arg(limit("max-qos-key-size", "9.x: QoS key size, bytes"))
        .arg(limit("max-dist-key-size", "9.x: distribution key size, bytes"))
        .arg(limit("num-queues", "10.x: number of queues, 1 to 16"))
        .arg(limit("num-tcs", "10.x: number of traffic classes, 1 to 8"))
        .arg(limit("mac-filter-entries", "10.x: MAC filter entries"))
        .arg(limit("vlan-filter-entries", "10.x: VLAN filter entries"))
        .arg(limit("qos-entries", "10.x: QoS table entries"))
        .arg(
            Arg::new("fs-entries")
                .long("fs-entries")
                .help("10.x: flow steering entries")
                .value_parser(value_parser!(u16)),
        )
        .arg(limit("num-cgs", "10.1: number of congestion groups"))
        .arg(limit("num-channels", "10.1: number of channels"))
        .arg(container_arg())
}

pub fn subcommand_parser() -> Command {
    Command::new("dpni")
        .about("Network interfaces")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(create_command())
        .subcommand(destroy_command(TY))
        .subcommand(
            Command::new("update")
                .about("Change the configuration of a network interface")
                .arg(object_arg(TY))
                .arg(mac_addr_arg().required(true)),
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

/// Overrides `field` with the argument `id` when given.
fn set<T: Copy + Send + Sync + 'static>(matches: &ArgMatches, id: &str, field: &mut T) {
    if let Some(value) = matches.get_one::<T>(id) {
        *field = *value;
    }
}

fn refuse_limits(matches: &ArgMatches, ids: &[&'static str], abi: Abi) -> crate::Result<()> {
    match ids.iter().find(|id| matches.contains_id(id)) {
        Some(id) => InvalidOptionSnafu {
            option: *id,
            reason: format!("not taken by MC firmware {abi}"),
        }
        .fail(),
        None => Ok(()),
    }
}

fn config_v9(matches: &ArgMatches) -> crate::Result<DpniCfgV9> {
    let mut cfg = DpniCfgV9::default();
    set(matches, "mac-addr", &mut cfg.mac_addr);
    set(matches, "max-senders", &mut cfg.max_senders);
    set(matches, "max-tcs", &mut cfg.max_tcs);
    set(matches, "max-unicast-filters", &mut cfg.max_unicast_filters);
    set(matches, "max-multicast-filters", &mut cfg.max_multicast_filters);
    set(matches, "max-vlan-filters", &mut cfg.max_vlan_filters);
    set(matches, "max-qos-entries", &mut cfg.max_qos_entries);
    set(matches, "max-qos-key-size", &mut cfg.max_qos_key_size);
    set(matches, "max-dist-key-size", &mut cfg.max_dist_key_size);
    if let Some(list) = matches.get_one::<String>("max-dist-per-tc") {
        let sizes = parse::number_list("max-dist-per-tc", list)?;
        if sizes.len() > MAX_TCS {
            return InvalidOptionSnafu {
                option: "max-dist-per-tc",
                reason: format!("at most {MAX_TCS} traffic classes"),
            }
            .fail();
        }
        cfg.max_dist_per_tc = [0; MAX_TCS];
        cfg.max_dist_per_tc[..sizes.len()].copy_from_slice(&sizes);
    }
    if let Some(list) = matches.get_one::<String>("options") {
        cfg.options = parse::flags("options", list, &DpniOptionsV9::NAMES)?;
    }
    Ok(cfg)
}

fn config_v10(matches: &ArgMatches) -> crate::Result<DpniCfgV10> {
    let mut cfg = DpniCfgV10::default();
    set(matches, "num-queues", &mut cfg.num_queues);
    set(matches, "num-tcs", &mut cfg.num_tcs);
    set(matches, "mac-filter-entries", &mut cfg.mac_filter_entries);
    set(matches, "vlan-filter-entries", &mut cfg.vlan_filter_entries);
    set(matches, "qos-entries", &mut cfg.qos_entries);
    set(matches, "fs-entries", &mut cfg.fs_entries);
    set(matches, "num-cgs", &mut cfg.num_cgs);
    set(matches, "num-channels", &mut cfg.num_channels);
    if let Some(list) = matches.get_one::<String>("options") {
        cfg.options = parse::flags("options", list, &DpniOptions::NAMES)?;
    }
    Ok(cfg)
}

fn create<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let abi = ctx.abi();
    let cfg = match abi.generation() {
        Generation::V9 => {
            refuse_limits(matches, &V10_LIMITS, abi)?;
            DpniCfg::V9(config_v9(matches)?)
        }
        Generation::V10 => {
            refuse_limits(matches, &V9_LIMITS, abi)?;
            DpniCfg::V10(config_v10(matches)?)
        }
    };
    let container = ctx.create_target(matches.get_one::<ObjectName>("container").copied())?;
    let id = ctx.with_container(container, |io, token| dpni::create(io, token, &cfg))?;
    let name = ObjectName::new(TY, id);

    // 10.x create has no MAC address field.
    if let (DpniCfg::V10(_), Some(mac_addr)) = (&cfg, matches.get_one::<MacAddr>("mac-addr")) {
        let set = ctx.with_object(name, |io, token| {
            dpni::set_primary_mac_addr(io, token, mac_addr)
        });
        if let Err(err) = set {
            // No interface is left behind without its address.
            if let Err(undo) = ctx.destroy(name) {
                warn!("Cannot destroy {name}: {undo}");
            }
            return Err(err.into());
        }
    }
    ctx.report_created(name, container)?;
    Ok(())
}

fn update<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let mac_addr = matches
        .get_one::<MacAddr>("mac-addr")
        .copied()
        .unwrap_or_else(|| unreachable!("`mac-addr` is a required argument"));
    ctx.with_object(name, |io, token| {
        dpni::set_primary_mac_addr(io, token, &mac_addr)
    })?;
    Ok(())
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled, mac_addr) = ctx.with_object(name, |io, token| {
        let attr = dpni::get_attributes(io, token)?;
        let from_attributes = match &attr {
            DpniAttr::V9(attr) => Some(attr.version),
            DpniAttr::V10(_) => None,
        };
        let version = object::resolve_version(io, TY, from_attributes)?;
        let enabled = object::is_enabled(io, token)?;
        let mac_addr = dpni::get_primary_mac_addr(io, token)?;
        Ok((attr, version, enabled, mac_addr))
    })?;
    let parent = info_header(ctx, name, version)?;
    enabled_line(&mut ctx.out, enabled)?;
    field(&mut ctx.out, "mac address", mac_addr)?;
    endpoint_line(ctx, parent, name)?;
    match attr {
        DpniAttr::V9(attr) => print_v9(&mut ctx.out, &attr)?,
        DpniAttr::V10(attr) => print_v10(&mut ctx.out, &attr)?,
    }
    Ok(())
}

fn print_v9(out: &mut impl Write, attr: &DpniAttrV9) -> std::io::Result<()> {
    let names = output::option_names(&DpniOptionsV9::NAMES, |flag| attr.options.contains(flag));
    output::options(out, attr.options.bits().into(), &names)?;
    field(out, "max senders", attr.max_senders)?;
    field(out, "max traffic classes", attr.max_tcs)?;
    let per_tc: Vec<String> = attr.max_dist_per_tc[..usize::from(attr.max_tcs).min(MAX_TCS)]
        .iter()
        .map(u8::to_string)
        .collect();
    field(out, "max distribution per traffic class", per_tc.join(","))?;
    field(out, "max unicast filters", attr.max_unicast_filters)?;
    field(out, "max multicast filters", attr.max_multicast_filters)?;
    field(out, "max VLAN filters", attr.max_vlan_filters)?;
    field(out, "max QoS entries", attr.max_qos_entries)?;
    field(out, "max QoS key size", attr.max_qos_key_size)?;
    field(out, "max distribution key size", attr.max_dist_key_size)
}

fn print_v10(out: &mut impl Write, attr: &DpniAttrV10) -> std::io::Result<()> {
    let names = output::option_names(&DpniOptions::NAMES, |flag| attr.options.contains(flag));
    output::options(out, attr.options.bits().into(), &names)?;
    field(out, "number of queues", attr.num_queues)?;
    field(out, "number of traffic classes", attr.num_tcs)?;
    field(out, "MAC filter entries", attr.mac_filter_entries)?;
    field(out, "VLAN filter entries", attr.vlan_filter_entries)?;
    field(out, "QoS entries", attr.qos_entries)?;
    field(out, "FS entries", attr.fs_entries)?;
    field(out, "QoS key size", attr.qos_key_size)?;
    field(out, "FS key size", attr.fs_key_size)?;
    if let Some(num_cgs) = attr.num_cgs {
        field(out, "number of congestion groups", num_cgs)?;
    }
    if let Some(num_channels) = attr.num_channels {
        field(out, "number of channels", num_channels)?;
    }
    field(out, "WRIOP version", attr.wriop_version)
}

#[cfg(test)]
mod tests {
    use {
        super::TY,
        crate::commands::testing::{restool, run, V10_0, V10_1, V9},
        flib::{emulator::Emulator, mc::McStatus, MacAddr, ObjectName},
    };

    const MAC: &str = "00:04:9f:01:02:03";
    const FIRST: ObjectName = ObjectName::new(TY, 0);

    #[test]
    fn v9_takes_the_mac_address_at_create() {
        let mut ctx = restool(Emulator::new(V9));
        run(
            &mut ctx,
            &["dpni", "create", "--mac-addr", MAC, "--max-tcs=2", "--max-dist-per-tc=4,2"],
        )
        .unwrap();
        assert!(ctx.io.portal().find(0x211).is_none());
        assert_eq!(
            ctx.io.portal().object(FIRST).unwrap().mac,
            MAC.parse::<MacAddr>().unwrap()
        );

        let info = run(&mut ctx, &["dpni", "info", "dpni.0"]).unwrap();
        assert!(info.contains(&format!("mac address: {MAC}\n")), "{info}");
        assert!(info.contains("max distribution per traffic class: 4,2\n"), "{info}");
        assert!(info.contains("\tDPNI_OPT_UNICAST_FILTER\n"), "{info}");
        assert!(info.contains("dpni version: 3.1\n"), "{info}");
    }

    #[test]
    fn v10_sets_the_mac_address_after_create() {
        let mut ctx = restool(Emulator::new(V10_0));
        run(&mut ctx, &["dpni", "create", "--mac-addr", MAC, "--num-queues=4"]).unwrap();
        assert!(ctx.io.portal().find(0x211).is_some());

        let info = run(&mut ctx, &["dpni", "info", "dpni.0"]).unwrap();
        assert!(info.contains(&format!("mac address: {MAC}\n")), "{info}");
        assert!(info.contains("number of queues: 4\n"), "{info}");
        assert!(info.contains("WRIOP version: 1.0.0\n"), "{info}");
        assert!(!info.contains("congestion groups"), "{info}");
        assert_eq!(ctx.io.portal().open_sessions(), 1);
    }

    #[test]
    fn failing_to_set_the_mac_address_undoes_the_create() {
        let mut ctx = restool(Emulator::new(V10_1));
        ctx.io.portal_mut().fail_next(0x211, McStatus::Busy);
        let err = run(&mut ctx, &["dpni", "create", "--mac-addr", MAC]).unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::EBUSY) as u8);
        assert!(ctx.io.portal().object(FIRST).is_none());
        assert!(ctx.out.is_empty());
        assert_eq!(ctx.io.portal().open_sessions(), 1);
    }

    #[test]
    fn limits_of_the_other_generation_are_refused() {
        let mut ctx = restool(Emulator::new(V10_1));
        let err = run(&mut ctx, &["dpni", "create", "--max-senders=4"]).unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::EINVAL) as u8);

        let mut ctx = restool(Emulator::new(V9));
        assert!(run(&mut ctx, &["dpni", "create", "--num-queues=4"]).is_err());
        assert!(ctx.io.portal().find(0x901).is_none());
    }

    #[test]
    fn congestion_groups_are_reported_from_10_1() {
        let mut ctx = restool(Emulator::new(V10_1));
        run(
            &mut ctx,
            &["dpni", "create", "--num-cgs=4", "--options=DPNI_OPT_CUSTOM_CG"],
        )
        .unwrap();
        let info = run(&mut ctx, &["dpni", "info", "dpni.0"]).unwrap();
        assert!(info.contains("number of congestion groups: 4\n"), "{info}");
        assert!(info.contains("\tDPNI_OPT_CUSTOM_CG\n"), "{info}");
    }

    #[test]
    fn update_changes_the_primary_mac_address() {
        let mut ctx = restool(Emulator::new(V10_1));
        run(&mut ctx, &["dpni", "create"]).unwrap();
        run(&mut ctx, &["dpni", "update", "dpni.0", "--mac-addr", MAC]).unwrap();
        assert_eq!(
            ctx.io.portal().object(FIRST).unwrap().mac,
            MAC.parse::<MacAddr>().unwrap()
        );
        assert!(run(&mut ctx, &["dpni", "update", "dpni.0", "--mac-addr=00:11"]).is_err());
    }
}
