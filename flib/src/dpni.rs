/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Network interface object (DPNI).
//!
//! The only object whose configuration was redesigned between firmware generations:
//! 9.x sizes the interface by traffic classes, senders and filter tables, 10.x by queues,
//! traffic classes and flow steering entries. Both shapes are kept side by side as
//! [`DpniCfg`] and [`DpniAttr`] variants, and the variant must match the firmware.

use {
    crate::{
        error::{Result, UnsupportedOnAbiSnafu},
        mc::{Abi, CmdId, Generation, McCommand, McIo, Portal, Token},
        object::{self, ApiVersion, MacAddr, ObjectType},
    },
    bitflags::bitflags,
    core::fmt,
    tock_registers::register_bitfields,
};

pub(crate) const CMDID_SET_PRIMARY_MAC_ADDR: CmdId = CmdId::new(0x211);
pub(crate) const CMDID_GET_PRIMARY_MAC_ADDR: CmdId = CmdId::new(0x212);

register_bitfields! {
    u64,

    // MC 9.x; word 0 bits 16..63 carry the MAC address.
    pub(crate) V9_CREATE_CMD_0 [
        MAX_TCS OFFSET(0) NUMBITS(8) [],
        MAX_SENDERS OFFSET(8) NUMBITS(8) [],
    ],
    pub(crate) V9_CREATE_CMD_1 [
        OPTIONS OFFSET(0) NUMBITS(32) [],
        MAX_UNICAST_FILTERS OFFSET(32) NUMBITS(8) [],
        MAX_MULTICAST_FILTERS OFFSET(40) NUMBITS(8) [],
        MAX_VLAN_FILTERS OFFSET(48) NUMBITS(8) [],
        MAX_QOS_ENTRIES OFFSET(56) NUMBITS(8) [],
    ],
    pub(crate) V9_CREATE_CMD_2 [
        MAX_QOS_KEY_SIZE OFFSET(0) NUMBITS(8) [],
        MAX_DIST_KEY_SIZE OFFSET(8) NUMBITS(8) [],
    ],
    pub(crate) V9_ATTR_RSP_0 [
        ID OFFSET(0) NUMBITS(32) [],
        MAX_TCS OFFSET(32) NUMBITS(8) [],
        MAX_SENDERS OFFSET(40) NUMBITS(8) [],
        MAX_UNICAST_FILTERS OFFSET(48) NUMBITS(8) [],
        MAX_MULTICAST_FILTERS OFFSET(56) NUMBITS(8) [],
    ],
    pub(crate) V9_ATTR_RSP_1 [
        MAX_VLAN_FILTERS OFFSET(0) NUMBITS(8) [],
        MAX_QOS_ENTRIES OFFSET(8) NUMBITS(8) [],
        MAX_QOS_KEY_SIZE OFFSET(16) NUMBITS(8) [],
        MAX_DIST_KEY_SIZE OFFSET(24) NUMBITS(8) [],
        OPTIONS OFFSET(32) NUMBITS(32) [],
    ],

    // MC 10.x; attributes repeat the create layout in their first two words.
    pub(crate) V10_CFG_0 [
        OPTIONS OFFSET(0) NUMBITS(32) [],
        NUM_QUEUES OFFSET(32) NUMBITS(8) [],
        NUM_TCS OFFSET(40) NUMBITS(8) [],
        MAC_FILTER_ENTRIES OFFSET(48) NUMBITS(8) [],
    ],
    pub(crate) V10_CFG_1 [
        VLAN_FILTER_ENTRIES OFFSET(0) NUMBITS(8) [],
        QOS_ENTRIES OFFSET(16) NUMBITS(8) [],
        FS_ENTRIES OFFSET(32) NUMBITS(16) [],
        NUM_CGS OFFSET(48) NUMBITS(8) [],
        NUM_CHANNELS OFFSET(56) NUMBITS(8) [],
    ],
    pub(crate) V10_ATTR_RSP_2 [
        QOS_KEY_SIZE OFFSET(0) NUMBITS(8) [],
        FS_KEY_SIZE OFFSET(8) NUMBITS(8) [],
        WRIOP_VERSION OFFSET(16) NUMBITS(16) [],
    ]
}

/// Traffic classes a 9.x interface can be built with.
pub const MAX_TCS: usize = 8;

bitflags! {
    /// 9.x creation options.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DpniOptionsV9: u32 {
        const ALLOW_DIST_KEY_PER_TC = 0x0000_0001;
        const TX_CONF_DISABLED = 0x0000_0002;
        const PRIVATE_TX_CONF_ERR_DISABLED = 0x0000_0004;
        const DIST_HASH = 0x0000_0008;
        const DIST_FS = 0x0000_0010;
        const UNICAST_FILTER = 0x0000_0040;
        const MULTICAST_FILTER = 0x0000_0080;
        const VLAN_FILTER = 0x0000_0100;
        const IPR = 0x0000_0200;
        const IPF = 0x0000_0400;
        const VLAN_MANIPULATION = 0x0000_0800;
        const QOS_MASK_SUPPORT = 0x0000_1000;
        const FS_MASK_SUPPORT = 0x0000_2000;
    }
}

impl DpniOptionsV9 {
    pub const NAMES: [(&'static str, DpniOptionsV9); 13] = [
        ("DPNI_OPT_ALLOW_DIST_KEY_PER_TC", Self::ALLOW_DIST_KEY_PER_TC),
        ("DPNI_OPT_TX_CONF_DISABLED", Self::TX_CONF_DISABLED),
        (
            "DPNI_OPT_PRIVATE_TX_CONF_ERROR_DISABLED",
            Self::PRIVATE_TX_CONF_ERR_DISABLED,
        ),
        ("DPNI_OPT_DIST_HASH", Self::DIST_HASH),
        ("DPNI_OPT_DIST_FS", Self::DIST_FS),
        ("DPNI_OPT_UNICAST_FILTER", Self::UNICAST_FILTER),
        ("DPNI_OPT_MULTICAST_FILTER", Self::MULTICAST_FILTER),
        ("DPNI_OPT_VLAN_FILTER", Self::VLAN_FILTER),
        ("DPNI_OPT_IPR", Self::IPR),
        ("DPNI_OPT_IPF", Self::IPF),
        ("DPNI_OPT_VLAN_MANIPULATION", Self::VLAN_MANIPULATION),
        ("DPNI_OPT_QOS_MASK_SUPPORT", Self::QOS_MASK_SUPPORT),
        ("DPNI_OPT_FS_MASK_SUPPORT", Self::FS_MASK_SUPPORT),
    ];
}

bitflags! {
    /// 10.x creation options.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DpniOptions: u32 {
        const TX_FRM_RELEASE = 0x0000_0001;
        const NO_MAC_FILTER = 0x0000_0002;
        const HAS_POLICING = 0x0000_0004;
        const SHARED_CONGESTION = 0x0000_0008;
        const HAS_KEY_MASKING = 0x0000_0010;
        const NO_FS = 0x0000_0020;
        /// 10.1 and later from here on.
        const HAS_OPR = 0x0000_0040;
        const OPR_PER_TC = 0x0000_0080;
        const SINGLE_SENDER = 0x0000_0100;
        const CUSTOM_CG = 0x0000_0200;
    }
}

impl DpniOptions {
    pub const NAMES: [(&'static str, DpniOptions); 10] = [
        ("DPNI_OPT_TX_FRM_RELEASE", Self::TX_FRM_RELEASE),
        ("DPNI_OPT_NO_MAC_FILTER", Self::NO_MAC_FILTER),
        ("DPNI_OPT_HAS_POLICING", Self::HAS_POLICING),
        ("DPNI_OPT_SHARED_CONGESTION", Self::SHARED_CONGESTION),
        ("DPNI_OPT_HAS_KEY_MASKING", Self::HAS_KEY_MASKING),
        ("DPNI_OPT_NO_FS", Self::NO_FS),
        ("DPNI_OPT_HAS_OPR", Self::HAS_OPR),
        ("DPNI_OPT_OPR_PER_TC", Self::OPR_PER_TC),
        ("DPNI_OPT_SINGLE_SENDER", Self::SINGLE_SENDER),
        ("DPNI_OPT_CUSTOM_CG", Self::CUSTOM_CG),
    ];

    pub fn supported(abi: Abi) -> Self {
        match abi {
            Abi::V9 => Self::empty(),
            Abi::V10_0 => Self::from_bits_truncate(0x3f),
            Abi::V10_1 => Self::all(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpniCfgV9 {
    pub mac_addr: MacAddr,
    pub max_senders: u8,
    pub max_tcs: u8,
    /// Distribution size of each traffic class, only the first `max_tcs` are used.
    pub max_dist_per_tc: [u8; MAX_TCS],
    pub max_unicast_filters: u8,
    pub max_multicast_filters: u8,
    pub max_vlan_filters: u8,
    pub max_qos_entries: u8,
    pub max_qos_key_size: u8,
    pub max_dist_key_size: u8,
    pub options: DpniOptionsV9,
}

impl Default for DpniCfgV9 {
    fn default() -> Self {
        Self {
            mac_addr: MacAddr::default(),
            max_senders: 8,
            max_tcs: 1,
            max_dist_per_tc: [1, 0, 0, 0, 0, 0, 0, 0],
            max_unicast_filters: 16,
            max_multicast_filters: 64,
            max_vlan_filters: 16,
            max_qos_entries: 0,
            max_qos_key_size: 0,
            max_dist_key_size: 0,
            options: DpniOptionsV9::UNICAST_FILTER
                | DpniOptionsV9::MULTICAST_FILTER
                | DpniOptionsV9::VLAN_FILTER,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpniCfgV10 {
    pub options: DpniOptions,
    pub num_queues: u8,
    pub num_tcs: u8,
    pub mac_filter_entries: u8,
    pub vlan_filter_entries: u8,
    pub qos_entries: u8,
    pub fs_entries: u16,
    /// 10.1 and later, 0 lets the firmware pick.
    pub num_cgs: u8,
    /// 10.1 and later, 0 lets the firmware pick.
    pub num_channels: u8,
}

impl Default for DpniCfgV10 {
    fn default() -> Self {
        Self {
            options: DpniOptions::empty(),
            num_queues: 8,
            num_tcs: 1,
            mac_filter_entries: 16,
            vlan_filter_entries: 0,
            qos_entries: 0,
            fs_entries: 64,
            num_cgs: 0,
            num_channels: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DpniCfg {
    V9(DpniCfgV9),
    V10(DpniCfgV10),
}

impl DpniCfg {
    /// The default configuration for the generation of `abi`.
    pub fn default_for(abi: Abi) -> Self {
        match abi.generation() {
            Generation::V9 => DpniCfg::V9(DpniCfgV9::default()),
            Generation::V10 => DpniCfg::V10(DpniCfgV10::default()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpniAttrV9 {
    pub id: u32,
    pub max_tcs: u8,
    pub max_senders: u8,
    pub max_unicast_filters: u8,
    pub max_multicast_filters: u8,
    pub max_vlan_filters: u8,
    pub max_qos_entries: u8,
    pub max_qos_key_size: u8,
    pub max_dist_key_size: u8,
    pub options: DpniOptionsV9,
    pub max_dist_per_tc: [u8; MAX_TCS],
    pub version: ApiVersion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpniAttrV10 {
    pub options: DpniOptions,
    pub num_queues: u8,
    pub num_tcs: u8,
    pub mac_filter_entries: u8,
    pub vlan_filter_entries: u8,
    pub qos_entries: u8,
    pub fs_entries: u16,
    /// Reported from 10.1 on.
    pub num_cgs: Option<u8>,
    pub num_channels: Option<u8>,
    pub qos_key_size: u8,
    pub fs_key_size: u8,
    pub wriop_version: WriopVersion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DpniAttr {
    V9(DpniAttrV9),
    V10(DpniAttrV10),
}

/// WRIOP hardware block revision as packed by the firmware: 6 bits major, 5 bits minor,
/// 5 bits revision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriopVersion(pub u16);

impl fmt::Display for WriopVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let v = self.0;
        write!(f, "{}.{}.{}", (v >> 10) & 0x3f, (v >> 5) & 0x1f, v & 0x1f)
    }
}

fn mismatch(abi: Abi) -> crate::Error {
    UnsupportedOnAbiSnafu {
        what: "dpni configuration of the other firmware generation".to_string(),
        abi,
    }
    .build()
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpniCfg) -> Result<u32> {
    let abi = io.abi();
    match (abi.generation(), cfg) {
        (Generation::V9, DpniCfg::V9(cfg)) => create_v9(io, cfg),
        (Generation::V10, DpniCfg::V10(cfg)) => create_v10(io, container, cfg),
        _ => Err(mismatch(abi)),
    }
}

fn create_v9<P: Portal>(io: &mut McIo<P>, cfg: &DpniCfgV9) -> Result<u32> {
    object::check_range("number of traffic classes", cfg.max_tcs as usize, 1..=MAX_TCS)?;
    object::create(
        io,
        ObjectType::Dpni,
        Token::NONE,
        1,
        |cmd| {
            cmd.write(
                0,
                V9_CREATE_CMD_0::MAX_TCS.val(cfg.max_tcs.into())
                    + V9_CREATE_CMD_0::MAX_SENDERS.val(cfg.max_senders.into()),
            );
            cmd.write_mac(0, &cfg.mac_addr);
            cmd.write(
                1,
                V9_CREATE_CMD_1::OPTIONS.val(cfg.options.bits().into())
                    + V9_CREATE_CMD_1::MAX_UNICAST_FILTERS.val(cfg.max_unicast_filters.into())
                    + V9_CREATE_CMD_1::MAX_MULTICAST_FILTERS
                        .val(cfg.max_multicast_filters.into())
                    + V9_CREATE_CMD_1::MAX_VLAN_FILTERS.val(cfg.max_vlan_filters.into())
                    + V9_CREATE_CMD_1::MAX_QOS_ENTRIES.val(cfg.max_qos_entries.into()),
            );
            cmd.write(
                2,
                V9_CREATE_CMD_2::MAX_QOS_KEY_SIZE.val(cfg.max_qos_key_size.into())
                    + V9_CREATE_CMD_2::MAX_DIST_KEY_SIZE.val(cfg.max_dist_key_size.into()),
            );
            cmd.write_bytes(3, &cfg.max_dist_per_tc);
        },
        |io, token| {
            let rsp = object::get_attributes(io, token, 1)?;
            Ok(rsp.param::<V9_ATTR_RSP_0::Register>(0).read(V9_ATTR_RSP_0::ID) as u32)
        },
    )
}

fn create_v10<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpniCfgV10) -> Result<u32> {
    let abi = io.abi();
    object::check_range("number of queues", cfg.num_queues, 1..=16)?;
    object::check_range("number of traffic classes", cfg.num_tcs, 1..=8)?;
    let unsupported = cfg.options - DpniOptions::supported(abi);
    if !unsupported.is_empty() {
        return UnsupportedOnAbiSnafu {
            what: format!("dpni options {unsupported:?}"),
            abi,
        }
        .fail();
    }
    if abi == Abi::V10_0 && (cfg.num_cgs != 0 || cfg.num_channels != 0) {
        return UnsupportedOnAbiSnafu {
            what: "dpni congestion group and channel counts".to_string(),
            abi,
        }
        .fail();
    }

    let cmd_version = abi.extended_cmd_version();
    object::create(
        io,
        ObjectType::Dpni,
        container,
        cmd_version,
        |cmd| {
            cmd.write(
                0,
                V10_CFG_0::OPTIONS.val(cfg.options.bits().into())
                    + V10_CFG_0::NUM_QUEUES.val(cfg.num_queues.into())
                    + V10_CFG_0::NUM_TCS.val(cfg.num_tcs.into())
                    + V10_CFG_0::MAC_FILTER_ENTRIES.val(cfg.mac_filter_entries.into()),
            );
            let mut word1 = V10_CFG_1::VLAN_FILTER_ENTRIES.val(cfg.vlan_filter_entries.into())
                + V10_CFG_1::QOS_ENTRIES.val(cfg.qos_entries.into())
                + V10_CFG_1::FS_ENTRIES.val(cfg.fs_entries.into());
            if cmd_version > 1 {
                word1 += V10_CFG_1::NUM_CGS.val(cfg.num_cgs.into())
                    + V10_CFG_1::NUM_CHANNELS.val(cfg.num_channels.into());
            }
            cmd.write(1, word1);
        },
        // 10.x create answers with the id itself.
        |_, _| Ok(0),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpniAttr> {
    let abi = io.abi();
    let rsp = object::get_attributes(io, token, abi.extended_cmd_version())?;
    Ok(match abi.generation() {
        Generation::V9 => DpniAttr::V9(decode_attr_v9(&rsp)),
        Generation::V10 => DpniAttr::V10(decode_attr_v10(abi, &rsp)),
    })
}

fn decode_attr_v9(rsp: &McCommand) -> DpniAttrV9 {
    let word0 = rsp.param::<V9_ATTR_RSP_0::Register>(0);
    let word1 = rsp.param::<V9_ATTR_RSP_1::Register>(1);
    DpniAttrV9 {
        id: word0.read(V9_ATTR_RSP_0::ID) as u32,
        max_tcs: word0.read(V9_ATTR_RSP_0::MAX_TCS) as u8,
        max_senders: word0.read(V9_ATTR_RSP_0::MAX_SENDERS) as u8,
        max_unicast_filters: word0.read(V9_ATTR_RSP_0::MAX_UNICAST_FILTERS) as u8,
        max_multicast_filters: word0.read(V9_ATTR_RSP_0::MAX_MULTICAST_FILTERS) as u8,
        max_vlan_filters: word1.read(V9_ATTR_RSP_1::MAX_VLAN_FILTERS) as u8,
        max_qos_entries: word1.read(V9_ATTR_RSP_1::MAX_QOS_ENTRIES) as u8,
        max_qos_key_size: word1.read(V9_ATTR_RSP_1::MAX_QOS_KEY_SIZE) as u8,
        max_dist_key_size: word1.read(V9_ATTR_RSP_1::MAX_DIST_KEY_SIZE) as u8,
        options: DpniOptionsV9::from_bits_retain(word1.read(V9_ATTR_RSP_1::OPTIONS) as u32),
        version: object::read_version_v9(rsp, 2),
        max_dist_per_tc: rsp.read_bytes::<MAX_TCS>(3),
    }
}

fn decode_attr_v10(abi: Abi, rsp: &McCommand) -> DpniAttrV10 {
    let word0 = rsp.param::<V10_CFG_0::Register>(0);
    let word1 = rsp.param::<V10_CFG_1::Register>(1);
    let word2 = rsp.param::<V10_ATTR_RSP_2::Register>(2);
    let extended = abi == Abi::V10_1;
    DpniAttrV10 {
        options: DpniOptions::from_bits_retain(word0.read(V10_CFG_0::OPTIONS) as u32),
        num_queues: word0.read(V10_CFG_0::NUM_QUEUES) as u8,
        num_tcs: word0.read(V10_CFG_0::NUM_TCS) as u8,
        mac_filter_entries: word0.read(V10_CFG_0::MAC_FILTER_ENTRIES) as u8,
        vlan_filter_entries: word1.read(V10_CFG_1::VLAN_FILTER_ENTRIES) as u8,
        qos_entries: word1.read(V10_CFG_1::QOS_ENTRIES) as u8,
        fs_entries: word1.read(V10_CFG_1::FS_ENTRIES) as u16,
        num_cgs: extended.then(|| word1.read(V10_CFG_1::NUM_CGS) as u8),
        num_channels: extended.then(|| word1.read(V10_CFG_1::NUM_CHANNELS) as u8),
        qos_key_size: word2.read(V10_ATTR_RSP_2::QOS_KEY_SIZE) as u8,
        fs_key_size: word2.read(V10_ATTR_RSP_2::FS_KEY_SIZE) as u8,
        wriop_version: WriopVersion(word2.read(V10_ATTR_RSP_2::WRIOP_VERSION) as u16),
    }
}

pub fn set_primary_mac_addr<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    mac_addr: &MacAddr,
) -> Result<()> {
    let mut cmd = io.command(CMDID_SET_PRIMARY_MAC_ADDR, token);
    cmd.write_mac(0, mac_addr);
    io.send_command(cmd).map(|_| ())
}

pub fn get_primary_mac_addr<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<MacAddr> {
    let cmd = io.command(CMDID_GET_PRIMARY_MAC_ADDR, token);
    let rsp = io.send_command(cmd)?;
    Ok(rsp.read_mac(0))
}

/// MAC address a freshly created interface starts with.
#[cfg(any(test, feature = "emulator"))]
pub(crate) fn initial_mac(abi: Abi, create: &McCommand) -> MacAddr {
    match abi.generation() {
        Generation::V9 => create.read_mac(0),
        Generation::V10 => MacAddr::default(),
    }
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn emulate_attributes(abi: Abi, id: u32, create: &McCommand, rsp: &mut McCommand) {
    match abi.generation() {
        Generation::V9 => {
            let cfg0 = create.param::<V9_CREATE_CMD_0::Register>(0);
            let cfg1 = create.param::<V9_CREATE_CMD_1::Register>(1);
            let cfg2 = create.param::<V9_CREATE_CMD_2::Register>(2);
            rsp.write(
                0,
                V9_ATTR_RSP_0::ID.val(id.into())
                    + V9_ATTR_RSP_0::MAX_TCS.val(cfg0.read(V9_CREATE_CMD_0::MAX_TCS))
                    + V9_ATTR_RSP_0::MAX_SENDERS.val(cfg0.read(V9_CREATE_CMD_0::MAX_SENDERS))
                    + V9_ATTR_RSP_0::MAX_UNICAST_FILTERS
                        .val(cfg1.read(V9_CREATE_CMD_1::MAX_UNICAST_FILTERS))
                    + V9_ATTR_RSP_0::MAX_MULTICAST_FILTERS
                        .val(cfg1.read(V9_CREATE_CMD_1::MAX_MULTICAST_FILTERS)),
            );
            rsp.write(
                1,
                V9_ATTR_RSP_1::MAX_VLAN_FILTERS.val(cfg1.read(V9_CREATE_CMD_1::MAX_VLAN_FILTERS))
                    + V9_ATTR_RSP_1::MAX_QOS_ENTRIES
                        .val(cfg1.read(V9_CREATE_CMD_1::MAX_QOS_ENTRIES))
                    + V9_ATTR_RSP_1::MAX_QOS_KEY_SIZE
                        .val(cfg2.read(V9_CREATE_CMD_2::MAX_QOS_KEY_SIZE))
                    + V9_ATTR_RSP_1::MAX_DIST_KEY_SIZE
                        .val(cfg2.read(V9_CREATE_CMD_2::MAX_DIST_KEY_SIZE))
                    + V9_ATTR_RSP_1::OPTIONS.val(cfg1.read(V9_CREATE_CMD_1::OPTIONS)),
            );
            object::write_version_v9(rsp, 2, crate::emulator::object_version(abi));
            rsp.params[3] = create.params[3];
        }
        Generation::V10 => {
            rsp.params[0] = create.params[0];
            rsp.params[1] = create.params[1];
            rsp.write(
                2,
                V10_ATTR_RSP_2::QOS_KEY_SIZE.val(24)
                    + V10_ATTR_RSP_2::FS_KEY_SIZE.val(56)
                    + V10_ATTR_RSP_2::WRIOP_VERSION.val(0x400),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{emulator::Emulator, error::Error, mc::McVersion, object::ObjectName},
    };

    fn io(major: u32, minor: u32) -> McIo<Emulator> {
        McIo::probe(Emulator::new(McVersion {
            major,
            minor,
            revision: 0,
        }))
        .unwrap()
        .0
    }

    fn attributes(io: &mut McIo<Emulator>, id: u32) -> DpniAttr {
        object::with_open(io, ObjectName::new(ObjectType::Dpni, id), |io, token| {
            get_attributes(io, token)
        })
        .unwrap()
    }

    #[test]
    fn v9_create_carries_mac_and_distribution() {
        let mut io = io(9, 0);
        let mac = MacAddr([0x00, 0x04, 0x9f, 0x01, 0x02, 0x03]);
        let cfg = DpniCfgV9 {
            mac_addr: mac,
            max_tcs: 2,
            max_dist_per_tc: [4, 2, 0, 0, 0, 0, 0, 0],
            ..Default::default()
        };
        let id = create(&mut io, Token::NONE, &DpniCfg::V9(cfg)).unwrap();

        let cmd = io.portal().find(0x901).unwrap();
        assert_eq!(cmd.params[0], 0x0004_9f01_0203_0802);
        assert_eq!(cmd.params[1] & 0xffff_ffff, 0x1c0);
        assert_eq!(cmd.params[3], 0x0204);

        let DpniAttr::V9(attr) = attributes(&mut io, id) else {
            panic!("9.x firmware answered with 10.x attributes");
        };
        assert_eq!(attr.id, id);
        assert_eq!(attr.max_tcs, 2);
        assert_eq!(attr.max_senders, 8);
        assert_eq!(attr.max_dist_per_tc, cfg.max_dist_per_tc);
        assert_eq!(attr.options, cfg.options);

        let read_back = object::with_open(&mut io, ObjectName::new(ObjectType::Dpni, id), |io, t| {
            get_primary_mac_addr(io, t)
        })
        .unwrap();
        assert_eq!(read_back, mac);
    }

    #[test]
    fn v10_create_layout() {
        let mut io = io(10, 0);
        let root = io.portal().root_container();
        let cfg = DpniCfgV10 {
            options: DpniOptions::NO_MAC_FILTER | DpniOptions::HAS_KEY_MASKING,
            num_queues: 4,
            num_tcs: 2,
            ..Default::default()
        };
        let id = object::with_open(&mut io, ObjectName::new(ObjectType::Dprc, root), |io, t| {
            create(io, t, &DpniCfg::V10(cfg))
        })
        .unwrap();

        let cmd = io.portal().find(0x901).unwrap();
        assert_eq!(cmd.cmd_id(Abi::V10_0).version, 1);
        assert_eq!(cmd.params[0], 0x0010_0204_0000_0012);
        assert_eq!(cmd.params[1], 0x0000_0040_0000_0000);

        let DpniAttr::V10(attr) = attributes(&mut io, id) else {
            panic!("10.x firmware answered with 9.x attributes");
        };
        assert_eq!(attr.options, cfg.options);
        assert_eq!(attr.num_queues, 4);
        assert_eq!(attr.fs_entries, 64);
        assert_eq!(attr.num_cgs, None);
        assert_eq!(attr.wriop_version.to_string(), "1.0.0");
    }

    #[test]
    fn v10_1_create_uses_command_version_2() {
        let mut io = io(10, 10);
        let root = io.portal().root_container();
        let cfg = DpniCfgV10 {
            options: DpniOptions::CUSTOM_CG,
            num_cgs: 4,
            num_channels: 2,
            ..Default::default()
        };
        let id = object::with_open(&mut io, ObjectName::new(ObjectType::Dprc, root), |io, t| {
            create(io, t, &DpniCfg::V10(cfg))
        })
        .unwrap();
        let cmd = io.portal().find(0x901).unwrap();
        assert_eq!(cmd.cmd_id(Abi::V10_1).version, 2);
        assert_eq!(cmd.params[1] >> 48, 0x0204);

        let DpniAttr::V10(attr) = attributes(&mut io, id) else {
            panic!("10.x firmware answered with 9.x attributes");
        };
        assert_eq!(attr.num_cgs, Some(4));
        assert_eq!(attr.num_channels, Some(2));
    }

    #[test]
    fn options_and_counts_of_10_1_are_refused_by_10_0() {
        let mut io = io(10, 0);
        let opr = DpniCfgV10 {
            options: DpniOptions::HAS_OPR,
            ..Default::default()
        };
        assert!(matches!(
            create(&mut io, Token(1), &DpniCfg::V10(opr)),
            Err(Error::UnsupportedOnAbi { .. })
        ));
        let cgs = DpniCfgV10 {
            num_cgs: 2,
            ..Default::default()
        };
        assert!(matches!(
            create(&mut io, Token(1), &DpniCfg::V10(cgs)),
            Err(Error::UnsupportedOnAbi { .. })
        ));
    }

    #[test]
    fn configuration_must_match_the_generation() {
        let mut io = io(9, 0);
        let result = create(&mut io, Token::NONE, &DpniCfg::default_for(Abi::V10_1));
        assert!(matches!(result, Err(Error::UnsupportedOnAbi { .. })));
    }

    #[test]
    fn primary_mac_can_be_replaced() {
        let mut io = io(10, 1);
        let root = io.portal().root_container();
        let cfg = DpniCfg::default_for(io.abi());
        let id = object::with_open(&mut io, ObjectName::new(ObjectType::Dprc, root), |io, t| {
            create(io, t, &cfg)
        })
        .unwrap();
        let mac: MacAddr = "02:00:c0:a8:00:01".parse().unwrap();
        let name = ObjectName::new(ObjectType::Dpni, id);
        object::with_open(&mut io, name, |io, t| set_primary_mac_addr(io, t, &mac)).unwrap();
        let read_back =
            object::with_open(&mut io, name, |io, t| get_primary_mac_addr(io, t)).unwrap();
        assert_eq!(read_back, mac);
    }
}
