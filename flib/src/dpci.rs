/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Communication interface object (DPCI).

use {
    crate::{
        error::Result,
        mc::{Generation, McIo, Portal, Token},
        object::{self, ApiVersion, ObjectType},
    },
    tock_registers::register_bitfields,
};

register_bitfields! {
    u64,

    pub(crate) CREATE_CMD_0 [
        NUM_OF_PRIORITIES OFFSET(0) NUMBITS(8) [],
    ],
    pub(crate) ATTR_RSP_0 [
        ID OFFSET(0) NUMBITS(32) [],
        NUM_OF_PRIORITIES OFFSET(48) NUMBITS(8) [],
    ]
}

pub const PRIORITIES: core::ops::RangeInclusive<u8> = 1..=2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpciCfg {
    pub num_of_priorities: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DpciAttr {
    pub id: u32,
    pub num_of_priorities: u8,
    pub version: Option<ApiVersion>,
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpciCfg) -> Result<u32> {
    object::check_range("number of priorities", cfg.num_of_priorities, PRIORITIES)?;
    object::create(
        io,
        ObjectType::Dpci,
        container,
        1,
        |cmd| {
            cmd.write(
                0,
                CREATE_CMD_0::NUM_OF_PRIORITIES.val(cfg.num_of_priorities.into()),
            )
        },
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpciAttr> {
    let rsp = object::get_attributes(io, token, 1)?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    Ok(DpciAttr {
        id: word0.read(ATTR_RSP_0::ID) as u32,
        num_of_priorities: word0.read(ATTR_RSP_0::NUM_OF_PRIORITIES) as u8,
        version: match io.abi().generation() {
            Generation::V9 => Some(object::read_version_v9(&rsp, 1)),
            Generation::V10 => None,
        },
    })
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn emulate_attributes(
    abi: crate::mc::Abi,
    id: u32,
    create: &crate::mc::McCommand,
    rsp: &mut crate::mc::McCommand,
) {
    let priorities = create
        .param::<CREATE_CMD_0::Register>(0)
        .read(CREATE_CMD_0::NUM_OF_PRIORITIES);
    rsp.write(
        0,
        ATTR_RSP_0::ID.val(id.into()) + ATTR_RSP_0::NUM_OF_PRIORITIES.val(priorities),
    );
    if abi.generation() == Generation::V9 {
        object::write_version_v9(rsp, 1, crate::emulator::object_version(abi));
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{emulator::Emulator, error::Error, mc::McVersion, object::ObjectName},
    };

    #[test]
    fn v9_attributes_report_the_object_version() {
        let (mut io, _) = McIo::probe(Emulator::new(McVersion {
            major: 9,
            minor: 0,
            revision: 7,
        }))
        .unwrap();
        let id = create(
            &mut io,
            Token::NONE,
            &DpciCfg {
                num_of_priorities: 2,
            },
        )
        .unwrap();
        let attr = object::with_open(&mut io, ObjectName::new(ObjectType::Dpci, id), |io, token| {
            get_attributes(io, token)
        })
        .unwrap();
        assert_eq!(attr.num_of_priorities, 2);
        assert_eq!(attr.version, Some(crate::emulator::object_version(io.abi())));
    }

    #[test]
    fn at_most_two_priorities() {
        let (mut io, _) = McIo::probe(Emulator::new(McVersion {
            major: 10,
            minor: 0,
            revision: 0,
        }))
        .unwrap();
        let result = create(
            &mut io,
            Token(1),
            &DpciCfg {
                num_of_priorities: 3,
            },
        );
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }
}
