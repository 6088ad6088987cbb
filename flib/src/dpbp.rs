/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Buffer pool object (DPBP).

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

    pub(crate) ATTR_RSP_0 [
        BPID OFFSET(16) NUMBITS(16) [],
        ID OFFSET(32) NUMBITS(32) [],
    ]
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DpbpAttr {
    pub id: u32,
    /// Hardware buffer pool id.
    pub bpid: u16,
    /// Reported by 9.x only.
    pub version: Option<ApiVersion>,
}

/// A buffer pool has nothing to configure.
pub fn create<P: Portal>(io: &mut McIo<P>, container: Token) -> Result<u32> {
    object::create(
        io,
        ObjectType::Dpbp,
        container,
        1,
        |_| {},
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpbpAttr> {
    let rsp = object::get_attributes(io, token, 1)?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    Ok(DpbpAttr {
        id: word0.read(ATTR_RSP_0::ID) as u32,
        bpid: word0.read(ATTR_RSP_0::BPID) as u16,
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
    _create: &crate::mc::McCommand,
    rsp: &mut crate::mc::McCommand,
) {
    rsp.write(
        0,
        ATTR_RSP_0::ID.val(id.into()) + ATTR_RSP_0::BPID.val(u64::from(id) + 0x40),
    );
    if abi.generation() == Generation::V9 {
        object::write_version_v9(rsp, 1, crate::emulator::object_version(abi));
    }
}
