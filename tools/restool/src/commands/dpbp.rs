/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    super::{container_arg, destroy_command, enabled_line, info_command, info_header, target},
    crate::{context::Restool, output::field},
    anyhow::Result,
    clap::{ArgMatches, Command},
    flib::{dpbp, mc::Portal, object, ObjectType},
    std::io::Write,
};

const TY: ObjectType = ObjectType::Dpbp;

pub fn subcommand_parser() -> Command {
    Command::new("dpbp")
        .about("Buffer pools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(info_command(TY))
        .subcommand(
            Command::new("create")
                .about("Create a buffer pool")
                .arg(container_arg()),
        )
        .subcommand(destroy_command(TY))
}

pub fn run<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("info", matches)) => info(ctx, matches),
        Some(("create", matches)) => {
            super::create(ctx, matches, TY, |io, token| dpbp::create(io, token))?;
            Ok(())
        }
        Some(("destroy", matches)) => super::destroy(ctx, matches, TY),
        _ => unreachable!("subcommand is required"),
    }
}

fn info<P: Portal, W: Write>(ctx: &mut Restool<P, W>, matches: &ArgMatches) -> Result<()> {
    let name = target(matches, TY)?;
    let (attr, version, enabled) = ctx.with_object(name, |io, token| {
        let attr = dpbp::get_attributes(io, token)?;
        let version = object::resolve_version(io, TY, attr.version)?;
        Ok((attr, version, object::is_enabled(io, token)?))
    })?;
    info_header(ctx, name, version)?;
    enabled_line(&mut ctx.out, enabled)?;
    field(&mut ctx.out, "buffer pool id", attr.bpid)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        crate::commands::testing::{restool, run, script, V10_0, V9},
        flib::{emulator::Emulator, ObjectName, ObjectType},
    };

    #[test]
    fn create_info_destroy() {
        for version in [V9, V10_0] {
            let mut ctx = restool(Emulator::new(version));
            assert_eq!(
                run(&mut ctx, &["dpbp", "create"]).unwrap(),
                "dpbp.0 is created under dprc.1\n"
            );

            let info = run(&mut ctx, &["dpbp", "info", "dpbp.0"]).unwrap();
            assert!(info.contains("dpbp id: 0\n"), "{info}");
            assert!(info.contains("plugged state: plugged\n"), "{info}");
            assert!(info.contains("buffer pool id: 64\n"), "{info}");

            assert_eq!(
                run(&mut ctx, &["dpbp", "destroy", "dpbp.0"]).unwrap(),
                "dpbp.0 is destroyed\n"
            );
            assert!(ctx
                .io
                .portal()
                .object(ObjectName::new(ObjectType::Dpbp, 0))
                .is_none());
        }
    }

    #[test]
    fn script_create_prints_the_bare_name() {
        let mut ctx = script(Emulator::new(V10_0));
        assert_eq!(run(&mut ctx, &["dpbp", "create"]).unwrap(), "dpbp.0\n");
        assert_eq!(run(&mut ctx, &["dpbp", "destroy", "dpbp.0"]).unwrap(), "");
    }

    #[test]
    fn info_on_a_missing_object_fails() {
        let mut ctx = restool(Emulator::new(V10_0));
        let err = run(&mut ctx, &["dpbp", "info", "dpbp.3"]).unwrap_err();
        assert_eq!(crate::error::exit_status(&err), (-libc::ENXIO) as u8);
        assert_eq!(ctx.io.portal().open_sessions(), 1);
    }
}
