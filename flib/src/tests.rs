/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Object lifecycles across firmware generations.

use crate::{
    dpbp, dpci, dpcon, dpdmux, dpio, dpmac, dpni, dprc, dpseci, dpsw,
    emulator::Emulator,
    error::{Error, Result},
    mc::{Abi, McIo, McStatus, McVersion, Token},
    object::{self, ApiVersion, ObjectName, ObjectType},
};

const FIRMWARES: [McVersion; 3] = [
    McVersion {
        major: 9,
        minor: 1,
        revision: 4,
    },
    McVersion {
        major: 10,
        minor: 0,
        revision: 0,
    },
    McVersion {
        major: 10,
        minor: 18,
        revision: 0,
    },
];

fn probe(version: McVersion) -> McIo<Emulator> {
    McIo::probe(Emulator::new(version)).unwrap().0
}

/// Creates one object of `ty` with a default configuration, the way restool does on
/// either generation.
fn create_default(io: &mut McIo<Emulator>, ty: ObjectType) -> Result<u32> {
    let root = dprc::get_container_id(io)?;
    let abi = io.abi();
    object::with_open(io, ObjectName::new(ObjectType::Dprc, root), |io, token| {
        // 9.x ignores the container token and creates in the caller's container.
        match ty {
            ObjectType::Dpbp => dpbp::create(io, token),
            ObjectType::Dpcon => dpcon::create(io, token, &dpcon::DpconCfg { num_priorities: 2 }),
            ObjectType::Dpci => dpci::create(
                io,
                token,
                &dpci::DpciCfg {
                    num_of_priorities: 1,
                },
            ),
            ObjectType::Dpio => dpio::create(
                io,
                token,
                &dpio::DpioCfg {
                    channel_mode: dpio::ChannelMode::LocalChannel,
                    num_priorities: 8,
                },
            ),
            ObjectType::Dpmac => dpmac::create(io, token, &dpmac::DpmacCfg { mac_id: 3 }),
            ObjectType::Dpseci => dpseci::create(
                io,
                token,
                &dpseci::DpseciCfg {
                    priorities: vec![1, 2],
                    ..Default::default()
                },
            ),
            ObjectType::Dpsw => dpsw::create(io, token, &dpsw::DpswCfg::default()),
            ObjectType::Dpdmux => dpdmux::create(io, token, &dpdmux::DpdmuxCfg::default()),
            ObjectType::Dpni => dpni::create(io, token, &dpni::DpniCfg::default_for(abi)),
            ObjectType::Dprc => {
                dprc::create_container(io, token, &dprc::DprcCfg::default()).map(|(id, _)| id)
            }
        }
    })
}

/// Version of `name` the way `info` finds it: from the attributes on 9.x, from the
/// api version query on 10.x.
fn version_of(io: &mut McIo<Emulator>, name: ObjectName) -> Result<ApiVersion> {
    object::with_open(io, name, |io, token| {
        let from_attributes = match name.ty {
            ObjectType::Dpbp => dpbp::get_attributes(io, token)?.version,
            ObjectType::Dpcon => dpcon::get_attributes(io, token)?.version,
            ObjectType::Dpci => dpci::get_attributes(io, token)?.version,
            ObjectType::Dpio => dpio::get_attributes(io, token)?.version,
            ObjectType::Dpmac => dpmac::get_attributes(io, token)?.version,
            ObjectType::Dpseci => dpseci::get_attributes(io, token)?.version,
            ObjectType::Dpsw => dpsw::get_attributes(io, token)?.version,
            ObjectType::Dpdmux => dpdmux::get_attributes(io, token)?.version,
            ObjectType::Dprc => dprc::get_attributes(io, token)?.version,
            ObjectType::Dpni => match dpni::get_attributes(io, token)? {
                dpni::DpniAttr::V9(attr) => Some(attr.version),
                dpni::DpniAttr::V10(_) => None,
            },
        };
        object::resolve_version(io, name.ty, from_attributes)
    })
}

fn destroy_in(io: &mut McIo<Emulator>, root: ObjectName, name: ObjectName) -> Result<()> {
    object::with_open(io, root, |io, token| match name.ty {
        ObjectType::Dprc => dprc::destroy_container(io, token, name.id),
        _ => object::destroy(io, token, name),
    })
}

#[test]
fn every_object_type_lives_and_dies_on_every_generation() {
    for version in FIRMWARES {
        let mut io = probe(version);
        let root = ObjectName::new(ObjectType::Dprc, io.portal().root_container());

        for ty in ObjectType::ALL {
            let id = create_default(&mut io, ty).unwrap();
            let name = ObjectName::new(ty, id);
            assert_eq!(
                io.portal().parent_of(name),
                Some(root.id),
                "{name} on {version}"
            );
            assert_eq!(
                version_of(&mut io, name).unwrap(),
                crate::emulator::object_version(io.abi()),
                "{name} on {version}"
            );
            destroy_in(&mut io, root, name).unwrap();
            assert!(io.portal().object(name).is_none(), "{name} on {version}");
        }
        assert_eq!(io.portal().open_sessions(), 0, "leaked tokens on {version}");
    }
}

#[test]
fn commands_carry_the_version_of_the_detected_firmware() {
    // Objects whose create and get-attributes grew a second version in 10.1.
    const EXTENDED: [ObjectType; 4] = [
        ObjectType::Dpni,
        ObjectType::Dpsw,
        ObjectType::Dpdmux,
        ObjectType::Dpseci,
    ];

    for version in FIRMWARES {
        let mut io = probe(version);
        let abi = io.abi();
        let root = ObjectName::new(ObjectType::Dprc, io.portal().root_container());

        for ty in ObjectType::ALL {
            let first = io.portal().log().len();
            let name = ObjectName::new(ty, create_default(&mut io, ty).unwrap());
            version_of(&mut io, name).unwrap();
            destroy_in(&mut io, root, name).unwrap();

            for cmd in &io.portal().log()[first..] {
                // Read through the 10.x layout: 9.x headers leave the version bits clear.
                let id = cmd.cmd_id(Abi::V10_0);
                let extended = EXTENDED.contains(&ty)
                    && (id.id == ty.create_cmd().id || id.id == 0x004);
                let expected = match abi {
                    Abi::V9 => 0,
                    Abi::V10_1 if extended => 2,
                    Abi::V10_0 | Abi::V10_1 => 1,
                };
                assert_eq!(id.version, expected, "{id} for {name} on {version}");
            }
        }
    }
}

#[test]
fn unversioned_commands_are_refused_by_10x_firmware() {
    let mut io = probe(FIRMWARES[1]);
    let cmd = io.command(dprc::CMDID_GET_CONT_ID.with_version(0), Token::NONE);
    let err = io.send_command(cmd).unwrap_err();
    assert_eq!(err.mc_status(), Some(McStatus::UnsupportedOp));
}

#[test]
fn api_version_query_exists_from_10_0_on() {
    let mut io = probe(FIRMWARES[0]);
    assert!(matches!(
        object::get_api_version(&mut io, ObjectType::Dpni),
        Err(Error::UnsupportedOnAbi { abi: Abi::V9, .. })
    ));

    let mut io = probe(FIRMWARES[2]);
    let version = object::get_api_version(&mut io, ObjectType::Dpsw).unwrap();
    assert_eq!(version, crate::emulator::object_version(Abi::V10_1));
    let cmd = io.portal().find(0xa02).unwrap();
    assert_eq!(cmd.token(Abi::V10_1), Token::NONE);
}

#[test]
fn v9_create_closes_its_token_when_the_lookup_fails() {
    let mut io = probe(FIRMWARES[0]);
    io.portal_mut().fail_next(0x004, McStatus::Timeout);

    let err = dpbp::create(&mut io, Token::NONE).unwrap_err();
    assert_eq!(err.mc_status(), Some(McStatus::Timeout));
    assert_eq!(err.errno(), libc::ETIMEDOUT);
    assert_eq!(io.portal().open_sessions(), 0);
}

#[test]
fn with_open_reports_the_command_error_over_the_close_error() {
    let mut io = probe(FIRMWARES[1]);
    let root = ObjectName::new(ObjectType::Dprc, io.portal().root_container());
    io.portal_mut().fail_next(0x159, McStatus::Busy);

    let err = object::with_open(&mut io, root, |io, token| {
        // Closing early makes the final close fail as well.
        object::close(io, token)?;
        dprc::get_obj_count(io, token)
    })
    .unwrap_err();
    assert_eq!(err.mc_status(), Some(McStatus::Busy));
    assert_eq!(io.portal().open_sessions(), 0);
}

#[test]
fn pre_populated_objects_are_listed_in_type_order() {
    let mut emulator = Emulator::new(FIRMWARES[2]);
    emulator
        .add_object(ObjectName::new(ObjectType::Dpmac, 2), 1)
        .add_object(ObjectName::new(ObjectType::Dpmac, 1), 1)
        .add_object(ObjectName::new(ObjectType::Dpio, 0), 1);
    let (mut io, _) = McIo::probe(emulator).unwrap();

    let objects = object::with_open(&mut io, ObjectName::new(ObjectType::Dprc, 1), |io, token| {
        dprc::get_objects(io, token)
    })
    .unwrap();
    let names: Vec<String> = objects
        .iter()
        .map(|desc| format!("{}.{}", desc.ty, desc.id))
        .collect();
    assert_eq!(names, ["dpio.0", "dpmac.1", "dpmac.2"]);
}
