/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! I/O portal object (DPIO).

use {
    crate::{
        error::{InvalidArgumentSnafu, Result},
        mc::{Generation, McIo, Portal, Token},
        object::{self, ApiVersion, ObjectType},
    },
    core::{fmt, str::FromStr},
    tock_registers::register_bitfields,
};

register_bitfields! {
    u64,

    pub(crate) CREATE_CMD_0 [
        CHANNEL_MODE OFFSET(16) NUMBITS(2) [
            None = 0,
            LocalChannel = 1,
        ],
        NUM_PRIORITIES OFFSET(32) NUMBITS(8) [],
    ],
    pub(crate) ATTR_RSP_0 [
        ID OFFSET(0) NUMBITS(32) [],
        QBMAN_PORTAL_ID OFFSET(32) NUMBITS(16) [],
        NUM_PRIORITIES OFFSET(48) NUMBITS(8) [],
        CHANNEL_MODE OFFSET(56) NUMBITS(4) [],
    ],
    pub(crate) ATTR_RSP_3 [
        QBMAN_VERSION OFFSET(0) NUMBITS(32) [],
    ]
}

pub const PRIORITIES: core::ops::RangeInclusive<u8> = 1..=8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelMode {
    /// No channel is bound to the portal.
    None,
    #[default]
    LocalChannel,
}

impl ChannelMode {
    fn raw(self) -> u64 {
        match self {
            ChannelMode::None => 0,
            ChannelMode::LocalChannel => 1,
        }
    }

    fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(ChannelMode::None),
            1 => Some(ChannelMode::LocalChannel),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ChannelMode::None => "DPIO_NO_CHANNEL",
            ChannelMode::LocalChannel => "DPIO_LOCAL_CHANNEL",
        })
    }
}

impl FromStr for ChannelMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DPIO_NO_CHANNEL" => Ok(ChannelMode::None),
            "DPIO_LOCAL_CHANNEL" => Ok(ChannelMode::LocalChannel),
            _ => InvalidArgumentSnafu {
                what: "channel mode",
                reason: format!("{s:?}, expected DPIO_LOCAL_CHANNEL or DPIO_NO_CHANNEL"),
            }
            .fail(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpioCfg {
    pub channel_mode: ChannelMode,
    pub num_priorities: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpioAttr {
    pub id: u32,
    pub qbman_portal_id: u16,
    pub num_priorities: u8,
    /// Raw mode when the firmware reports one this library does not know.
    pub channel_mode: Result<ChannelMode, u8>,
    /// Cache-enabled area offset.
    pub qbman_portal_ce_offset: u64,
    /// Cache-inhibited area offset.
    pub qbman_portal_ci_offset: u64,
    /// 10.x only.
    pub qbman_version: Option<u32>,
    /// 9.x only.
    pub version: Option<ApiVersion>,
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpioCfg) -> Result<u32> {
    object::check_range("number of priorities", cfg.num_priorities, PRIORITIES)?;
    object::create(
        io,
        ObjectType::Dpio,
        container,
        1,
        |cmd| {
            cmd.write(
                0,
                CREATE_CMD_0::CHANNEL_MODE.val(cfg.channel_mode.raw())
                    + CREATE_CMD_0::NUM_PRIORITIES.val(cfg.num_priorities.into()),
            )
        },
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpioAttr> {
    let rsp = object::get_attributes(io, token, 1)?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    let mode = word0.read(ATTR_RSP_0::CHANNEL_MODE);
    let (qbman_version, version) = match io.abi().generation() {
        Generation::V9 => (None, Some(object::read_version_v9(&rsp, 3))),
        Generation::V10 => (
            Some(rsp.param::<ATTR_RSP_3::Register>(3).read(ATTR_RSP_3::QBMAN_VERSION) as u32),
            None,
        ),
    };
    Ok(DpioAttr {
        id: word0.read(ATTR_RSP_0::ID) as u32,
        qbman_portal_id: word0.read(ATTR_RSP_0::QBMAN_PORTAL_ID) as u16,
        num_priorities: word0.read(ATTR_RSP_0::NUM_PRIORITIES) as u8,
        channel_mode: ChannelMode::from_raw(mode).ok_or(mode as u8),
        qbman_portal_ce_offset: rsp.params[1],
        qbman_portal_ci_offset: rsp.params[2],
        qbman_version,
        version,
    })
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn emulate_attributes(
    abi: crate::mc::Abi,
    id: u32,
    create: &crate::mc::McCommand,
    rsp: &mut crate::mc::McCommand,
) {
    let cfg = create.param::<CREATE_CMD_0::Register>(0);
    rsp.write(
        0,
        ATTR_RSP_0::ID.val(id.into())
            + ATTR_RSP_0::QBMAN_PORTAL_ID.val(id.into())
            + ATTR_RSP_0::NUM_PRIORITIES.val(cfg.read(CREATE_CMD_0::NUM_PRIORITIES))
            + ATTR_RSP_0::CHANNEL_MODE.val(cfg.read(CREATE_CMD_0::CHANNEL_MODE)),
    );
    rsp.params[1] = u64::from(id) * 0x1_0000;
    rsp.params[2] = 0x400_0000 + u64::from(id) * 0x1_0000;
    match abi.generation() {
        Generation::V9 => object::write_version_v9(rsp, 3, crate::emulator::object_version(abi)),
        Generation::V10 => rsp.write(3, ATTR_RSP_3::QBMAN_VERSION.val(0x0410_0000)),
    }
}
