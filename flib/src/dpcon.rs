/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Concentrator object (DPCON).

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
        NUM_PRIORITIES OFFSET(0) NUMBITS(8) [],
    ],
    pub(crate) ATTR_RSP_0 [
        ID OFFSET(0) NUMBITS(32) [],
        QBMAN_CH_ID OFFSET(32) NUMBITS(16) [],
        NUM_PRIORITIES OFFSET(48) NUMBITS(8) [],
    ]
}

/// Priorities a concentrator channel can be built with.
pub const PRIORITIES: core::ops::RangeInclusive<u8> = 1..=8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpconCfg {
    pub num_priorities: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DpconAttr {
    pub id: u32,
    pub qbman_ch_id: u16,
    pub num_priorities: u8,
    pub version: Option<ApiVersion>,
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpconCfg) -> Result<u32> {
    object::check_range("number of priorities", cfg.num_priorities, PRIORITIES)?;
    object::create(
        io,
        ObjectType::Dpcon,
        container,
        1,
        |cmd| cmd.write(0, CREATE_CMD_0::NUM_PRIORITIES.val(cfg.num_priorities.into())),
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpconAttr> {
    let rsp = object::get_attributes(io, token, 1)?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    Ok(DpconAttr {
        id: word0.read(ATTR_RSP_0::ID) as u32,
        qbman_ch_id: word0.read(ATTR_RSP_0::QBMAN_CH_ID) as u16,
        num_priorities: word0.read(ATTR_RSP_0::NUM_PRIORITIES) as u8,
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
        .read(CREATE_CMD_0::NUM_PRIORITIES);
    rsp.write(
        0,
        ATTR_RSP_0::ID.val(id.into())
            + ATTR_RSP_0::QBMAN_CH_ID.val(u64::from(id) + 0x20)
            + ATTR_RSP_0::NUM_PRIORITIES.val(priorities),
    );
    if abi.generation() == Generation::V9 {
        object::write_version_v9(rsp, 1, crate::emulator::object_version(abi));
    }
}
