/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Firmware version and the command ABI it implies.

use {
    super::{CmdId, McIo, Portal, Token},
    crate::error::{Result, UnsupportedFirmwareSnafu},
    core::fmt,
    tock_registers::register_bitfields,
};

pub(crate) const DPMNG_CMDID_GET_VERSION: CmdId = CmdId::new(0x831);

register_bitfields! {
    u64,

    pub(crate) GET_VERSION_RSP_0 [
        REVISION OFFSET(0) NUMBITS(32) [],
        MAJOR OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) GET_VERSION_RSP_1 [
        MINOR OFFSET(0) NUMBITS(32) [],
    ]
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct McVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}

impl fmt::Display for McVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// Firmware protocol generation: header layout and create/destroy flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generation {
    V9,
    V10,
}

/// The command set a firmware speaks. Picked once from the firmware version, every
/// encoder consults it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Abi {
    V9,
    V10_0,
    /// 10.1 and anything newer.
    V10_1,
}

impl Abi {
    /// ABI used for the version probe. Both generations find the command id at bits
    /// 52..63 and 9.x ignores the version nibble under it.
    pub(crate) const PROBE: Abi = Abi::V10_0;

    pub fn from_version(version: &McVersion) -> Result<Self> {
        match (version.major, version.minor) {
            (9, _) => Ok(Abi::V9),
            (10, 0) => Ok(Abi::V10_0),
            (major, _) if major >= 10 => Ok(Abi::V10_1),
            _ => UnsupportedFirmwareSnafu { version: *version }.fail(),
        }
    }

    pub fn generation(self) -> Generation {
        match self {
            Abi::V9 => Generation::V9,
            Abi::V10_0 | Abi::V10_1 => Generation::V10,
        }
    }

    /// Command version of the create and get-attributes commands that grew fields in
    /// 10.1. Ignored by 9.x.
    pub(crate) fn extended_cmd_version(self) -> u8 {
        match self {
            Abi::V10_1 => 2,
            Abi::V9 | Abi::V10_0 => 1,
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Abi::V9 => write!(f, "9.x"),
            Abi::V10_0 => write!(f, "10.0"),
            Abi::V10_1 => write!(f, "10.1+"),
        }
    }
}

/// Queries the running firmware version.
pub fn get_version<P: Portal>(io: &mut McIo<P>) -> Result<McVersion> {
    let cmd = io.command(DPMNG_CMDID_GET_VERSION, Token::NONE);
    let rsp = io.send_command(cmd)?;

    let word0 = rsp.param::<GET_VERSION_RSP_0::Register>(0);
    let word1 = rsp.param::<GET_VERSION_RSP_1::Register>(1);
    Ok(McVersion {
        major: word0.read(GET_VERSION_RSP_0::MAJOR) as u32,
        minor: word1.read(GET_VERSION_RSP_1::MINOR) as u32,
        revision: word0.read(GET_VERSION_RSP_0::REVISION) as u32,
    })
}
