/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Containers: the object tree, moving objects between containers, labels and links.

use {
    super::{info_header, object_arg, target, value},
    crate::{
        context::{expect_type, Restool},
        error::InvalidOptionSnafu,
        output::{self, field},
        parse,
    },
    anyhow::Result,
    clap::{builder::BoolishValueParser, value_parser, Arg, ArgMatches, Command},
    flib::{
        dprc::{self, ConnectionCfg, DprcCfg, DprcOptions, ResReq},
        mc::Portal,
        object, Endpoint, ObjectName, ObjectType,
    },
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dprc;

fn container_arg(help: &'static str) -> Arg {
    Arg::new("container")
        .help(help)
        .value_name("dprc")
        .value_parser(parse::object_name)
        .required(true)
}

fn object_option() -> Arg {
    Arg::new("object")
        .long("object")
        .help("The object to move, e.g. dpni.0")
        .value_parser(parse::object_name)
        .required(true)
}

fn child_option() -> Arg {
    Arg::new("child")
        .long("child")
        .value_name("dprc")
        .help("Child container of <container>")
        .value_parser(parse::object_name)
}

fn rate(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .value_parser(value_parser!(u32))
        .default_value("0")
}

pub fn subcommand_parser() -> Command {
    Command::new("dprc")
        .about("Resource containers")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("Print the tree of containers"))
        .subcommand(
            Command::new("show")
                .about("List the objects of a container")
                .arg(container_arg("The container to list, e.g. dprc.1")),
        )
        .subcommand(
            Command::new("info")
                .about("Show the attributes of a container")
                .arg(object_arg(TY)),
        )
        .subcommand(
            Command::new("create")
                .about("Create a child container")
                .arg(container_arg("The parent container"))
                .arg(
                    Arg::new("options")
                        .long("options")
                        .value_name("list")
                        .help("Comma separated DPRC_CFG_OPT_* names"),
                )
                .arg(
                    Arg::new("label")
                        .long("label")
                        .help("Label of the new container, 15 characters at most"),
                )
                .arg(
                    Arg::new("portal-id")
                        .long("portal-id")
                        .help("MC portal of the new container [default: picked by the firmware]")
                        .value_parser(value_parser!(i32))
                        .default_value("-1"),
                ),
        )
        .subcommand(
            Command::new("destroy")
                .about("Destroy an empty child container")
                .arg(object_arg(TY)),
        )
        .subcommand(
            Command::new("assign")
                .about("Move an object to a child container, or plug it in place")
                .arg(container_arg("The container holding the object"))
                .arg(object_option())
                .arg(child_option())
                .arg(
                    Arg::new("plugged")
                        .long("plugged")
                        .help("Plugged state of the object once assigned, 1 or 0")
                        .value_parser(BoolishValueParser::new())
                        .default_value("1"),
                ),
        )
        .subcommand(
            Command::new("unassign")
                .about("Move an object from a child container back to its parent")
                .arg(container_arg("The parent container"))
                .arg(object_option())
                .arg(child_option().required(true)),
        )
        .subcommand(
            Command::new("set-label")
                .about("Label an object")
                .arg(
                    Arg::new("object")
                        .help("The object to label, e.g. dpni.0")
                        .value_parser(parse::object_name)
                        .required(true),
                )
                .arg(
                    Arg::new("label")
                        .long("label")
                        .help("15 characters at most, empty to clear")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("connect")
                .about("Link two endpoints, <type>.<id>[.<interface>]")
                .arg(
                    Arg::new("endpoint1")
                        .long("endpoint1")
                        .value_parser(parse::endpoint)
                        .required(true),
                )
                .arg(
                    Arg::new("endpoint2")
                        .long("endpoint2")
                        .value_parser(parse::endpoint)
                        .required(true),
                )
                .arg(rate("committed-rate", "Committed rate, Mbit/s, 0 for unlimited"))
                .arg(rate("max-rate", "Maximum rate, Mbit/s, 0 for unlimited")),
        )
        .subcommand(
            Command::new("disconnect")
                .about("Remove the link at an endpoint")
                .arg(
                    Arg::new("endpoint")
                        .long("endpoint")
                        .value_parser(parse::endpoint)
                        .required(true),
                ),
        )
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("list", _)) => list(ctx),
        Some(("show", matches)) => show(ctx, matches),
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => create(ctx, matches),
        Some(("destroy", matches)) => destroy(ctx, matches),
        Some(("assign", matches)) => assign(ctx, matches),
        Some(("unassign", matches)) => unassign(ctx, matches),
        Some(("set-label", matches)) => set_label(ctx, matches),
        Some(("connect", matches)) => connect(ctx, matches),
        Some(("disconnect", matches)) => disconnect(ctx, matches),
        _ => unreachable!("subcommand is required"),
    }
}

fn container(matches: &ArgMatches, id: &str) -> Result<Option<ObjectName>> {
    match matches.get_one::<ObjectName>(id) {
        Some(name) => Ok(Some(expect_type(*name, TY)?)),
        None => Ok(None),
    }
}

fn required_container(matches: &ArgMatches, id: &str) -> Result<ObjectName> {
    match container(matches, id)? {
        Some(name) => Ok(name),
        None => unreachable!("`{id}` is a required argument"),
    }
}

fn child_containers<P: Portal, W: Write>(ctx: &mut Restool<P, W>, id: u32) -> Result<Vec<u32>> {
    Ok(ctx
        .objects(id)?
        .into_iter()
        .filter(|desc| desc.name().map(|name| name.ty) == Some(TY))
        .map(|desc| desc.id)
        .collect())
}

fn list<P: Portal, W: Write>(ctx: &mut Restool<P, W>) -> Result<()> {
    let mut pending = vec![(ctx.root.id, 0)];
    while let Some((id, depth)) = pending.pop() {
        writeln!(ctx.out, "{:indent$}dprc.{id}", "", indent = depth * 4)?;
        let children = child_containers(ctx, id)?;
        pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }
    Ok(())
}

fn show<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = required_container(matches, "container")?;
    let objects = ctx.objects(name.id)?;
    if ctx.script {
        for desc in &objects {
            writeln!(ctx.out, "{}.{}", desc.ty, desc.id)?;
        }
        return Ok(());
    }
    let heading = format!("{name} contains {} objects:", objects.len());
    writeln!(ctx.out, "{}", output::heading(&heading, false))?;
    output::object_table(&objects).print(&mut ctx.out)?;
    Ok(())
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version) = ctx.with_object(name, |io, token| {
        let attr = dprc::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version))
    })?;
    if name == ctx.root {
        field(&mut ctx.out, "dprc version", version)?;
        field(&mut ctx.out, "dprc id", name.id)?;
    } else {
        let parent = info_header(ctx, name, version)?;
        field(&mut ctx.out, "parent container", format_args!("dprc.{parent}"))?;
    }
    let out = &mut ctx.out;
    field(out, "icid", attr.icid)?;
    field(out, "portal id", attr.portal_id)?;
    let names = output::option_names(&DprcOptions::NAMES, |flag| attr.options.contains(flag));
    output::options(out, attr.options.bits().into(), &names)?;
    Ok(())
}

fn create<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let parent = required_container(matches, "container")?;
    let mut cfg = DprcCfg {
        portal_id: value(matches, "portal-id"),
        ..Default::default()
    };
    if let Some(list) = matches.get_one::<String>("options") {
        cfg.options = parse::flags("options", list, &DprcOptions::NAMES)?;
    }
    if let Some(label) = matches.get_one::<String>("label") {
        cfg.label = label.clone();
    }
    let (id, _) = ctx.with_container(parent.id, |io, token| {
        dprc::create_container(io, token, &cfg)
    })?;
    ctx.report_created(ObjectName::new(TY, id), parent.id)?;
    Ok(())
}

fn destroy<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    if name == ctx.root {
        return Err(InvalidOptionSnafu {
            option: "object",
            reason: format!("{name} is the container restool runs in"),
        }
        .build()
        .into());
    }
    let (parent, _) = ctx.find_parent(name)?;
    ctx.with_container(parent, |io, token| {
        dprc::destroy_container(io, token, name.id)
    })?;
    ctx.report_destroyed(name)?;
    Ok(())
}

fn moved_object(matches: &ArgMatches) -> ObjectName {
    matches
        .get_one::<ObjectName>("object")
        .copied()
        .unwrap_or_else(|| unreachable!("`object` is a required argument"))
}

fn assign<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let parent = required_container(matches, "container")?;
    let object = moved_object(matches);
    let to = container(matches, "child")?.unwrap_or(parent);
    let req = ResReq::object(object, value(matches, "plugged"));
    ctx.with_container(parent.id, |io, token| {
        dprc::assign(io, token, to.id, &req)
    })?;
    Ok(())
}

fn unassign<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let parent = required_container(matches, "container")?;
    let child = required_container(matches, "child")?;
    let req = ResReq::object(moved_object(matches), false);
    ctx.with_container(parent.id, |io, token| {
        dprc::unassign(io, token, child.id, &req)
    })?;
    Ok(())
}

fn set_label<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = moved_object(matches);
    let label: String = value(matches, "label");
    let (parent, _) = ctx.find_parent(name)?;
    ctx.with_container(parent, |io, token| {
        dprc::set_obj_label(io, token, name, &label)
    })?;
    Ok(())
}

fn endpoint(matches: &ArgMatches, id: &str) -> Endpoint {
    matches
        .get_one::<Endpoint>(id)
        .copied()
        .unwrap_or_else(|| unreachable!("`{id}` is a required argument"))
}

fn connect<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let endpoint1 = endpoint(matches, "endpoint1");
    let endpoint2 = endpoint(matches, "endpoint2");
    let cfg = ConnectionCfg {
        committed_rate: value(matches, "committed-rate"),
        max_rate: value(matches, "max-rate"),
    };
    let root = ctx.root.id;
    ctx.with_container(root, |io, token| {
        dprc::connect(io, token, &endpoint1, &endpoint2, &cfg)
    })?;
    Ok(())
}

fn disconnect<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let endpoint = endpoint(matches, "endpoint");
    let root = ctx.root.id;
    ctx.with_container(root, |io, token| dprc::disconnect(io, token, &endpoint))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        crate::commands::testing::{restool, run, script, V10_0, V10_1, V9},
        flib::{emulator::Emulator, Endpoint, ObjectName, ObjectType},
    };

    fn name(ty: ObjectType, id: u32) -> ObjectName {
        ObjectName::new(ty, id)
    }

    #[test]
    fn list_prints_the_container_tree() {
        let mut emulator = Emulator::new(V10_1);
        emulator
            .add_object(name(ObjectType::Dprc, 2), 1)
            .add_object(name(ObjectType::Dprc, 4), 2)
            .add_object(name(ObjectType::Dprc, 3), 1)
            .add_object(name(ObjectType::Dpbp, 0), 2);
        let mut ctx = restool(emulator);
        assert_eq!(
            run(&mut ctx, &["dprc", "list"]).unwrap(),
            "dprc.1\n    dprc.2\n        dprc.4\n    dprc.3\n"
        );
    }

    #[test]
    fn show_lists_objects_with_their_state() {
        let mut emulator = Emulator::new(V10_0);
        emulator
            .add_object(name(ObjectType::Dpni, 0), 1)
            .add_object(name(ObjectType::Dpmac, 1), 1);
        let mut ctx = script(emulator);
        assert_eq!(
            run(&mut ctx, &["dprc", "show", "dprc.1"]).unwrap(),
            "dpni.0\ndpmac.1\n"
        );

        ctx.script = false;
        let out = run(&mut ctx, &["dprc", "show", "dprc.1"]).unwrap();
        assert!(out.contains("dprc.1 contains 2 objects:"), "{out}");
        assert!(out.contains("plugged"), "{out}");
        assert!(run(&mut ctx, &["dprc", "show", "dpni.0"]).is_err());
    }

    #[test]
    fn child_containers_take_objects_created_in_them() {
        let mut ctx = restool(Emulator::new(V10_1));
        assert_eq!(
            run(
                &mut ctx,
                &[
                    "dprc",
                    "create",
                    "dprc.1",
                    "--label=guest",
                    "--options=DPRC_CFG_OPT_OBJ_CREATE_ALLOWED,DPRC_CFG_OPT_ALLOC_ALLOWED",
                ],
            )
            .unwrap(),
            "dprc.2 is created under dprc.1\n"
        );
        assert_eq!(
            run(&mut ctx, &["dpbp", "create", "--container=dprc.2"]).unwrap(),
            "dpbp.0 is created under dprc.2\n"
        );
        assert_eq!(
            ctx.io.portal().parent_of(name(ObjectType::Dpbp, 0)),
            Some(2)
        );

        let info = run(&mut ctx, &["dprc", "info", "dprc.2"]).unwrap();
        assert!(info.contains("parent container: dprc.1\n"), "{info}");
        assert!(info.contains("label: guest\n"), "{info}");
        assert!(info.contains("\tDPRC_CFG_OPT_OBJ_CREATE_ALLOWED\n"), "{info}");

        // Destroying the bpool goes through its own parent, not the root.
        run(&mut ctx, &["dpbp", "destroy", "dpbp.0"]).unwrap();
        run(&mut ctx, &["dprc", "destroy", "dprc.2"]).unwrap();
        assert!(ctx.io.portal().object(name(ObjectType::Dprc, 2)).is_none());
        assert_eq!(ctx.io.portal().open_sessions(), 1);
    }

    #[test]
    fn root_info_and_destroy() {
        let mut ctx = restool(Emulator::new(V9));
        let info = run(&mut ctx, &["dprc", "info", "dprc.1"]).unwrap();
        assert!(info.contains("dprc version: 3.1\n"), "{info}");
        assert!(!info.contains("plugged state"), "{info}");
        assert!(info.contains("\tDPRC_CFG_OPT_SPAWN_ALLOWED\n"), "{info}");

        assert!(run(&mut ctx, &["dprc", "destroy", "dprc.1"]).is_err());
    }

    #[test]
    fn non_empty_containers_survive_destroy() {
        let mut emulator = Emulator::new(V10_1);
        emulator
            .add_object(name(ObjectType::Dprc, 2), 1)
            .add_object(name(ObjectType::Dpio, 0), 2);
        let mut ctx = restool(emulator);
        let err = run(&mut ctx, &["dprc", "destroy", "dprc.2"]).unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::ENODEV) as u8);
    }

    #[test]
    fn objects_move_between_containers() {
        let mut emulator = Emulator::new(V10_1);
        emulator
            .add_object(name(ObjectType::Dprc, 2), 1)
            .add_object(name(ObjectType::Dpni, 5), 1);
        let mut ctx = restool(emulator);
        let dpni = name(ObjectType::Dpni, 5);

        run(
            &mut ctx,
            &["dprc", "assign", "dprc.1", "--object=dpni.5", "--child=dprc.2", "--plugged=0"],
        )
        .unwrap();
        assert_eq!(ctx.io.portal().parent_of(dpni), Some(2));
        assert!(!ctx.io.portal().object(dpni).unwrap().plugged);

        run(&mut ctx, &["dprc", "assign", "dprc.2", "--object=dpni.5"]).unwrap();
        assert_eq!(ctx.io.portal().parent_of(dpni), Some(2));
        assert!(ctx.io.portal().object(dpni).unwrap().plugged);

        run(
            &mut ctx,
            &["dprc", "unassign", "dprc.1", "--object=dpni.5", "--child=dprc.2"],
        )
        .unwrap();
        assert_eq!(ctx.io.portal().parent_of(dpni), Some(1));
    }

    #[test]
    fn labels_are_set_through_the_parent() {
        let mut emulator = Emulator::new(V10_1);
        emulator
            .add_object(name(ObjectType::Dprc, 2), 1)
            .add_object(name(ObjectType::Dpcon, 1), 2);
        let mut ctx = restool(emulator);
        run(&mut ctx, &["dprc", "set-label", "dpcon.1", "--label=rx"]).unwrap();
        assert_eq!(
            ctx.io.portal().object(name(ObjectType::Dpcon, 1)).unwrap().label,
            "rx"
        );

        let err = run(
            &mut ctx,
            &["dprc", "set-label", "dpcon.1", "--label=a-label-far-too-long"],
        )
        .unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::EINVAL) as u8);
    }

    #[test]
    fn connect_and_disconnect() {
        let mut emulator = Emulator::new(V10_1);
        emulator
            .add_object(name(ObjectType::Dpni, 0), 1)
            .add_object(name(ObjectType::Dpmac, 1), 1);
        let mut ctx = restool(emulator);

        run(
            &mut ctx,
            &["dprc", "connect", "--endpoint1=dpni.0", "--endpoint2=dpmac.1"],
        )
        .unwrap();
        let dpni: Endpoint = "dpni.0".parse().unwrap();
        let dpmac: Endpoint = "dpmac.1".parse().unwrap();
        assert_eq!(ctx.io.portal().links(), &[(dpni, dpmac)]);

        let info = run(&mut ctx, &["dpmac", "info", "dpmac.1"]).unwrap();
        assert!(info.contains("endpoint: dpni.0, link is up\n"), "{info}");

        let err = run(
            &mut ctx,
            &["dprc", "connect", "--endpoint1=dpni.0", "--endpoint2=dpmac.1"],
        )
        .unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::ENODEV) as u8);

        run(&mut ctx, &["dprc", "disconnect", "--endpoint=dpmac.1"]).unwrap();
        assert!(ctx.io.portal().links().is_empty());
    }
}
