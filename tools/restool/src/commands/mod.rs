/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! One module per object type: its clap sub-command and the verb handlers behind it.
//!
//! Every module exposes `subcommand_parser()` and `run()`; [`crate::cli`] wires them to
//! the object names.

use {
    crate::{
        context::{expect_type, Restool},
        output::{field, plugged_state},
        parse,
    },
    anyhow::Result,
    clap::{Arg, ArgMatches, Command},
    flib::{
        dprc as fdprc,
        mc::{McIo, McStatus, Portal, Token},
        ApiVersion, Endpoint, ObjectName, ObjectType,
    },
    std::io::Write,
};

pub mod dpbp;
pub mod dpci;
pub mod dpcon;
pub mod dpdmux;
pub mod dpio;
pub mod dpmac;
pub mod dpni;
pub mod dprc;
pub mod dpseci;
pub mod dpsw;

/// The `<object>` positional of verbs acting on one existing object.
pub(crate) fn object_arg(ty: ObjectType) -> Arg {
    Arg::new("object")
        .help(format!("The {ty} to act on, e.g. {ty}.0"))
        .value_name("object")
        .value_parser(parse::object_name)
        .required(true)
}

pub(crate) fn container_arg() -> Arg {
    Arg::new("container")
        .long("container")
        .value_name("dprc")
        .help("Container to create the object in, 10.x firmware only [default: the root container]")
        .value_parser(parse::object_name)
}

pub(crate) fn info_command(ty: ObjectType) -> Command {
    Command::new("info")
        .about(format!("Show the attributes of a {ty}"))
        .arg(object_arg(ty))
}

pub(crate) fn destroy_command(ty: ObjectType) -> Command {
    Command::new("destroy")
        .about(format!("Destroy a {ty}"))
        .arg(object_arg(ty))
}

/// The object named by the `<object>` positional, checked to be a `ty`.
pub(crate) fn target(matches: &ArgMatches, ty: ObjectType) -> Result<ObjectName> {
    let name = matches
        .get_one::<ObjectName>("object")
        .copied()
        .unwrap_or_else(|| unreachable!("`object` is a required argument"));
    Ok(expect_type(name, ty)?)
}

/// Value of an argument declared with a default.
pub(crate) fn value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> T {
    matches
        .get_one::<T>(id)
        .cloned()
        .unwrap_or_else(|| unreachable!("`{id}` has a default value"))
}

/// Runs `f` on the container `--container` picks and reports the new object.
pub(crate) fn create<P, W>(
    ctx: &mut Restool<P, W>,
    matches: &ArgMatches,
    ty: ObjectType,
    f: impl FnOnce(&mut McIo<P>, Token) -> flib::Result<u32>,
) -> Result<ObjectName>
where
    P: Portal,
    W: Write,
{
    let container = ctx.create_target(matches.get_one::<ObjectName>("container").copied())?;
    let id = ctx.with_container(container, f)?;
    let name = ObjectName::new(ty, id);
    ctx.report_created(name, container)?;
    Ok(name)
}

pub(crate) fn destroy<P: Portal, W: Write>(
    ctx: &mut Restool<P, W>,
    matches: &ArgMatches,
    ty: ObjectType,
) -> Result<()> {
    let name = target(matches, ty)?;
    ctx.destroy(name)?;
    ctx.report_destroyed(name)?;
    Ok(())
}

/// The lines every `info` starts with: version, id and what the parent container says
/// about the object. Returns the parent container.
pub(crate) fn info_header<P: Portal, W: Write>(
    ctx: &mut Restool<P, W>,
    name: ObjectName,
    version: ApiVersion,
) -> Result<u32> {
    let (parent, desc) = ctx.find_parent(name)?;
    let out = &mut ctx.out;
    field(out, &format!("{} version", name.ty), version)?;
    field(out, &format!("{} id", name.ty), name.id)?;
    field(out, "plugged state", plugged_state(desc.state))?;
    if !desc.label.is_empty() {
        field(out, "label", &desc.label)?;
    }
    Ok(parent)
}

/// The far end of the only interface of `name`, asked from its parent container.
pub(crate) fn endpoint_line<P: Portal, W: Write>(
    ctx: &mut Restool<P, W>,
    parent: u32,
    name: ObjectName,
) -> Result<()> {
    let endpoint = Endpoint {
        object: name,
        interface: 0,
    };
    let far = match ctx.with_container(parent, |io, token| {
        fdprc::get_connection(io, token, &endpoint)
    }) {
        // Some firmware refuses the query for unconnected endpoints.
        Err(err) if err.mc_status() == Some(McStatus::NoResource) => None,
        other => other?,
    };
    match far {
        Some((far, state)) => {
            let state = if state == 1 { "up" } else { "down" };
            field(&mut ctx.out, "endpoint", format_args!("{far}, link is {state}"))?;
        }
        None => field(&mut ctx.out, "endpoint", "no object associated")?,
    }
    Ok(())
}

pub(crate) fn enabled_line(out: &mut impl Write, enabled: bool) -> std::io::Result<()> {
    field(out, "object is enabled", if enabled { "yes" } else { "no" })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Drives handlers end to end against the emulated firmware.

    use {
        crate::{cli, context::Restool},
        flib::{emulator::Emulator, mc::McVersion},
    };

    pub const V9: McVersion = McVersion {
        major: 9,
        minor: 1,
        revision: 4,
    };
    pub const V10_0: McVersion = McVersion {
        major: 10,
        minor: 0,
        revision: 0,
    };
    pub const V10_1: McVersion = McVersion {
        major: 10,
        minor: 18,
        revision: 0,
    };

    pub fn restool(emulator: Emulator) -> Restool<Emulator, Vec<u8>> {
        Restool::open(emulator, Vec::new(), false).unwrap()
    }

    pub fn script(emulator: Emulator) -> Restool<Emulator, Vec<u8>> {
        Restool::open(emulator, Vec::new(), true).unwrap()
    }

    /// Runs one command line, e.g. `["dpbp", "create"]`, and hands back its output.
    pub fn run(ctx: &mut Restool<Emulator, Vec<u8>>, args: &[&str]) -> anyhow::Result<String> {
        let matches = cli::command_parser()
            .try_get_matches_from(std::iter::once("restool").chain(args.iter().copied()))?;
        cli::dispatch(ctx, &matches)?;
        let out = String::from_utf8(std::mem::take(&mut ctx.out))?;
        Ok(out)
    }
}
