/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! L2 switch object (DPSW).

use {
    crate::{
        error::{Result, UnsupportedOnAbiSnafu},
        mc::{Abi, CmdId, Generation, McIo, Portal, Token},
        object::{self, ApiVersion, ObjectType},
    },
    bitflags::bitflags,
    core::{fmt, str::FromStr},
    tock_registers::register_bitfields,
};

pub(crate) const CMDID_IF_SET_MAX_FRAME_LENGTH: CmdId = CmdId::new(0x044);

register_bitfields! {
    u64,

    pub(crate) CREATE_CMD_0 [
        NUM_IFS OFFSET(0) NUMBITS(16) [],
        MAX_FDBS OFFSET(16) NUMBITS(8) [],
        MAX_METERS_PER_IF OFFSET(24) NUMBITS(8) [],
        COMPONENT_TYPE OFFSET(32) NUMBITS(4) [],
    ],
    pub(crate) CREATE_CMD_1 [
        MAX_VLANS OFFSET(0) NUMBITS(16) [],
        MAX_FDB_ENTRIES OFFSET(16) NUMBITS(16) [],
        FDB_AGING_TIME OFFSET(32) NUMBITS(16) [],
        MAX_FDB_MC_GROUPS OFFSET(48) NUMBITS(16) [],
    ],
    pub(crate) ATTR_RSP_0 [
        NUM_IFS OFFSET(0) NUMBITS(16) [],
        MAX_FDBS OFFSET(16) NUMBITS(8) [],
        NUM_FDBS OFFSET(24) NUMBITS(8) [],
        MAX_VLANS OFFSET(32) NUMBITS(16) [],
        NUM_VLANS OFFSET(48) NUMBITS(16) [],
    ],
    pub(crate) ATTR_RSP_1 [
        MAX_FDB_ENTRIES OFFSET(0) NUMBITS(16) [],
        FDB_AGING_TIME OFFSET(16) NUMBITS(16) [],
        ID OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) ATTR_RSP_2 [
        MEM_SIZE OFFSET(0) NUMBITS(16) [],
        MAX_FDB_MC_GROUPS OFFSET(16) NUMBITS(16) [],
        MAX_METERS_PER_IF OFFSET(32) NUMBITS(8) [],
    ],
    pub(crate) ATTR_RSP_4 [
        COMPONENT_TYPE OFFSET(0) NUMBITS(4) [],
    ],
    pub(crate) SET_MAX_FRAME_LENGTH_CMD_0 [
        IF_ID OFFSET(0) NUMBITS(16) [],
        FRAME_LENGTH OFFSET(16) NUMBITS(16) [],
    ]
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DpswOptions: u64 {
        const FLOODING_DIS = 0x0000_0001;
        const MULTICAST_DIS = 0x0000_0004;
        const CTRL_IF_DIS = 0x0000_0010;
        const FLOODING_METERING_DIS = 0x0000_0020;
        const METERING_EN = 0x0000_0040;
        /// Link aggregation disabled, 10.1 and later.
        const LAG_DIS = 0x0000_0080;
    }
}

impl DpswOptions {
    pub const NAMES: [(&'static str, DpswOptions); 6] = [
        ("DPSW_OPT_FLOODING_DIS", DpswOptions::FLOODING_DIS),
        ("DPSW_OPT_MULTICAST_DIS", DpswOptions::MULTICAST_DIS),
        ("DPSW_OPT_CTRL_IF_DIS", DpswOptions::CTRL_IF_DIS),
        (
            "DPSW_OPT_FLOODING_METERING_DIS",
            DpswOptions::FLOODING_METERING_DIS,
        ),
        ("DPSW_OPT_METERING_EN", DpswOptions::METERING_EN),
        ("DPSW_OPT_LAG_DIS", DpswOptions::LAG_DIS),
    ];

    pub fn supported(abi: Abi) -> Self {
        match abi {
            Abi::V10_1 => Self::all(),
            Abi::V9 | Abi::V10_0 => Self::all() - Self::LAG_DIS,
        }
    }
}

/// How the switch forwards between its interfaces, 10.1 and later.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComponentType {
    /// Virtual Ethernet bridge.
    #[default]
    CVeb,
    /// Port extender.
    FVepa,
}

impl ComponentType {
    fn raw(self) -> u64 {
        match self {
            ComponentType::CVeb => 0,
            ComponentType::FVepa => 1,
        }
    }

    fn from_raw(raw: u64) -> Self {
        match raw {
            1 => ComponentType::FVepa,
            _ => ComponentType::CVeb,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ComponentType::CVeb => "DPSW_COMPONENT_TYPE_C_VEB",
            ComponentType::FVepa => "DPSW_COMPONENT_TYPE_F_VEPA",
        })
    }
}

impl FromStr for ComponentType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DPSW_COMPONENT_TYPE_C_VEB" => Ok(ComponentType::CVeb),
            "DPSW_COMPONENT_TYPE_F_VEPA" => Ok(ComponentType::FVepa),
            _ => crate::error::InvalidArgumentSnafu {
                what: "component type",
                reason: format!("{s:?}"),
            }
            .fail(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpswCfg {
    pub num_ifs: u16,
    pub max_fdbs: u8,
    pub max_meters_per_if: u8,
    /// Only a C-VEB switch can be built before 10.1.
    pub component_type: ComponentType,
    pub max_vlans: u16,
    pub max_fdb_entries: u16,
    /// Seconds.
    pub fdb_aging_time: u16,
    pub max_fdb_mc_groups: u16,
    pub options: DpswOptions,
}

impl Default for DpswCfg {
    fn default() -> Self {
        Self {
            num_ifs: 4,
            max_fdbs: 1,
            max_meters_per_if: 0,
            component_type: ComponentType::CVeb,
            max_vlans: 16,
            max_fdb_entries: 1024,
            fdb_aging_time: 300,
            max_fdb_mc_groups: 32,
            options: DpswOptions::empty(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DpswAttr {
    pub id: u32,
    pub options: DpswOptions,
    pub max_vlans: u16,
    pub max_meters_per_if: u8,
    pub max_fdbs: u8,
    pub max_fdb_entries: u16,
    pub fdb_aging_time: u16,
    pub max_fdb_mc_groups: u16,
    pub num_ifs: u16,
    pub mem_size: u16,
    pub num_vlans: u16,
    pub num_fdbs: u8,
    /// 10.1 and later.
    pub component_type: Option<ComponentType>,
    pub version: Option<ApiVersion>,
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpswCfg) -> Result<u32> {
    let abi = io.abi();
    object::check_range("number of interfaces", cfg.num_ifs, 1..=u16::MAX)?;
    let unsupported = cfg.options - DpswOptions::supported(abi);
    if !unsupported.is_empty() {
        return UnsupportedOnAbiSnafu {
            what: format!("dpsw options {unsupported:?}"),
            abi,
        }
        .fail();
    }
    if abi != Abi::V10_1 && cfg.component_type != ComponentType::CVeb {
        return UnsupportedOnAbiSnafu {
            what: format!("component type {}", cfg.component_type),
            abi,
        }
        .fail();
    }

    let cmd_version = abi.extended_cmd_version();
    object::create(
        io,
        ObjectType::Dpsw,
        container,
        cmd_version,
        |cmd| {
            let mut word0 = CREATE_CMD_0::NUM_IFS.val(cfg.num_ifs.into())
                + CREATE_CMD_0::MAX_FDBS.val(cfg.max_fdbs.into())
                + CREATE_CMD_0::MAX_METERS_PER_IF.val(cfg.max_meters_per_if.into());
            if cmd_version > 1 {
                word0 += CREATE_CMD_0::COMPONENT_TYPE.val(cfg.component_type.raw());
            }
            cmd.write(0, word0);
            cmd.write(
                1,
                CREATE_CMD_1::MAX_VLANS.val(cfg.max_vlans.into())
                    + CREATE_CMD_1::MAX_FDB_ENTRIES.val(cfg.max_fdb_entries.into())
                    + CREATE_CMD_1::FDB_AGING_TIME.val(cfg.fdb_aging_time.into())
                    + CREATE_CMD_1::MAX_FDB_MC_GROUPS.val(cfg.max_fdb_mc_groups.into()),
            );
            cmd.params[2] = cfg.options.bits();
        },
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpswAttr> {
    let abi = io.abi();
    let rsp = object::get_attributes(io, token, abi.extended_cmd_version())?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    let word1 = rsp.param::<ATTR_RSP_1::Register>(1);
    let word2 = rsp.param::<ATTR_RSP_2::Register>(2);
    let (component_type, version) = match abi {
        Abi::V9 => (None, Some(object::read_version_v9(&rsp, 4))),
        Abi::V10_0 => (None, None),
        Abi::V10_1 => (
            Some(ComponentType::from_raw(
                rsp.param::<ATTR_RSP_4::Register>(4).read(ATTR_RSP_4::COMPONENT_TYPE),
            )),
            None,
        ),
    };
    Ok(DpswAttr {
        id: word1.read(ATTR_RSP_1::ID) as u32,
        options: DpswOptions::from_bits_retain(rsp.params[3]),
        max_vlans: word0.read(ATTR_RSP_0::MAX_VLANS) as u16,
        max_meters_per_if: word2.read(ATTR_RSP_2::MAX_METERS_PER_IF) as u8,
        max_fdbs: word0.read(ATTR_RSP_0::MAX_FDBS) as u8,
        max_fdb_entries: word1.read(ATTR_RSP_1::MAX_FDB_ENTRIES) as u16,
        fdb_aging_time: word1.read(ATTR_RSP_1::FDB_AGING_TIME) as u16,
        max_fdb_mc_groups: word2.read(ATTR_RSP_2::MAX_FDB_MC_GROUPS) as u16,
        num_ifs: word0.read(ATTR_RSP_0::NUM_IFS) as u16,
        mem_size: word2.read(ATTR_RSP_2::MEM_SIZE) as u16,
        num_vlans: word0.read(ATTR_RSP_0::NUM_VLANS) as u16,
        num_fdbs: word0.read(ATTR_RSP_0::NUM_FDBS) as u8,
        component_type,
        version,
    })
}

/// Largest frame interface `if_id` of the open switch accepts.
pub fn if_set_max_frame_length<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    if_id: u16,
    frame_length: u16,
) -> Result<()> {
    let mut cmd = io.command(CMDID_IF_SET_MAX_FRAME_LENGTH, token);
    cmd.write(
        0,
        SET_MAX_FRAME_LENGTH_CMD_0::IF_ID.val(if_id.into())
            + SET_MAX_FRAME_LENGTH_CMD_0::FRAME_LENGTH.val(frame_length.into()),
    );
    io.send_command(cmd).map(|_| ())
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn decode_set_max_frame_length(cmd: &crate::mc::McCommand) -> (u16, u16) {
    let word = cmd.param::<SET_MAX_FRAME_LENGTH_CMD_0::Register>(0);
    (
        word.read(SET_MAX_FRAME_LENGTH_CMD_0::IF_ID) as u16,
        word.read(SET_MAX_FRAME_LENGTH_CMD_0::FRAME_LENGTH) as u16,
    )
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn num_ifs(create: &crate::mc::McCommand) -> u16 {
    create
        .param::<CREATE_CMD_0::Register>(0)
        .read(CREATE_CMD_0::NUM_IFS) as u16
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn emulate_attributes(
    abi: Abi,
    id: u32,
    create: &crate::mc::McCommand,
    rsp: &mut crate::mc::McCommand,
) {
    let cfg0 = create.param::<CREATE_CMD_0::Register>(0);
    let cfg1 = create.param::<CREATE_CMD_1::Register>(1);
    rsp.write(
        0,
        ATTR_RSP_0::NUM_IFS.val(cfg0.read(CREATE_CMD_0::NUM_IFS))
            + ATTR_RSP_0::MAX_FDBS.val(cfg0.read(CREATE_CMD_0::MAX_FDBS))
            + ATTR_RSP_0::NUM_FDBS.val(1)
            + ATTR_RSP_0::MAX_VLANS.val(cfg1.read(CREATE_CMD_1::MAX_VLANS))
            + ATTR_RSP_0::NUM_VLANS.val(1),
    );
    rsp.write(
        1,
        ATTR_RSP_1::MAX_FDB_ENTRIES.val(cfg1.read(CREATE_CMD_1::MAX_FDB_ENTRIES))
            + ATTR_RSP_1::FDB_AGING_TIME.val(cfg1.read(CREATE_CMD_1::FDB_AGING_TIME))
            + ATTR_RSP_1::ID.val(id.into()),
    );
    rsp.write(
        2,
        ATTR_RSP_2::MEM_SIZE.val(0)
            + ATTR_RSP_2::MAX_FDB_MC_GROUPS.val(cfg1.read(CREATE_CMD_1::MAX_FDB_MC_GROUPS))
            + ATTR_RSP_2::MAX_METERS_PER_IF.val(cfg0.read(CREATE_CMD_0::MAX_METERS_PER_IF)),
    );
    rsp.params[3] = create.params[2];
    match abi.generation() {
        Generation::V9 => object::write_version_v9(rsp, 4, crate::emulator::object_version(abi)),
        Generation::V10 if abi == Abi::V10_1 => rsp.write(
            4,
            ATTR_RSP_4::COMPONENT_TYPE.val(cfg0.read(CREATE_CMD_0::COMPONENT_TYPE)),
        ),
        Generation::V10 => {}
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

    fn create_in_root(io: &mut McIo<Emulator>, cfg: &DpswCfg) -> Result<u32> {
        let root = io.portal().root_container();
        object::with_open(io, ObjectName::new(ObjectType::Dprc, root), |io, token| {
            create(io, token, cfg)
        })
    }

    #[test]
    fn default_switch_layout() {
        let mut io = io(10, 0);
        let id = create_in_root(&mut io, &DpswCfg::default()).unwrap();

        let cmd = io.portal().find(0x902).unwrap();
        assert_eq!(cmd.params[0], 0x0001_0004);
        assert_eq!(cmd.params[1], 0x0020_012c_0400_0010);
        assert_eq!(cmd.params[2], 0);

        let attr = object::with_open(&mut io, ObjectName::new(ObjectType::Dpsw, id), |io, t| {
            get_attributes(io, t)
        })
        .unwrap();
        assert_eq!(attr.id, id);
        assert_eq!(attr.num_ifs, 4);
        assert_eq!(attr.max_fdb_entries, 1024);
        assert_eq!(attr.fdb_aging_time, 300);
        assert_eq!(attr.max_fdb_mc_groups, 32);
        assert_eq!(attr.component_type, None);
    }

    #[test]
    fn v10_1_carries_component_type_and_lag_option() {
        let mut io = io(10, 3);
        let cfg = DpswCfg {
            component_type: ComponentType::FVepa,
            options: DpswOptions::LAG_DIS | DpswOptions::FLOODING_DIS,
            ..Default::default()
        };
        let id = create_in_root(&mut io, &cfg).unwrap();
        let cmd = io.portal().find(0x902).unwrap();
        assert_eq!(cmd.cmd_id(Abi::V10_1).version, 2);
        assert_eq!((cmd.params[0] >> 32) & 0xf, 1);

        let attr = object::with_open(&mut io, ObjectName::new(ObjectType::Dpsw, id), |io, t| {
            get_attributes(io, t)
        })
        .unwrap();
        assert_eq!(attr.component_type, Some(ComponentType::FVepa));
        assert_eq!(attr.options, cfg.options);
    }

    #[test]
    fn lag_option_and_vepa_are_refused_before_10_1() {
        let mut io = io(10, 0);
        let lag = DpswCfg {
            options: DpswOptions::LAG_DIS,
            ..Default::default()
        };
        assert!(matches!(
            create_in_root(&mut io, &lag),
            Err(Error::UnsupportedOnAbi { .. })
        ));
        let vepa = DpswCfg {
            component_type: ComponentType::FVepa,
            ..Default::default()
        };
        assert!(matches!(
            create_in_root(&mut io, &vepa),
            Err(Error::UnsupportedOnAbi { .. })
        ));
    }

    #[test]
    fn max_frame_length_is_set_per_interface() {
        let mut io = io(9, 1);
        let id = create(&mut io, Token::NONE, &DpswCfg::default()).unwrap();
        let name = ObjectName::new(ObjectType::Dpsw, id);
        object::with_open(&mut io, name, |io, token| {
            if_set_max_frame_length(io, token, 2, 9600)
        })
        .unwrap();

        let cmd = io.portal().find(0x044).unwrap();
        assert_eq!(cmd.params[0], (9600 << 16) | 2);
        assert_eq!(io.portal().max_frame_length(name, 2), Some(9600));
    }

    #[test]
    fn max_frame_length_on_missing_interface_is_a_firmware_error() {
        let mut io = io(10, 1);
        let id = create_in_root(&mut io, &DpswCfg::default()).unwrap();
        let result = object::with_open(&mut io, ObjectName::new(ObjectType::Dpsw, id), |io, t| {
            if_set_max_frame_length(io, t, 4, 1522)
        });
        assert!(matches!(result, Err(Error::Firmware { .. })));
    }
}
