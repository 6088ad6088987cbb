/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Demultiplexer object (DPDMUX).

use {
    crate::{
        error::{InvalidArgumentSnafu, Result, UnsupportedOnAbiSnafu},
        mc::{Abi, McIo, Portal, Token},
        object::{self, ApiVersion, ObjectType},
    },
    bitflags::bitflags,
    core::{fmt, str::FromStr},
    tock_registers::register_bitfields,
};

register_bitfields! {
    u64,

    pub(crate) CREATE_CMD_0 [
        METHOD OFFSET(0) NUMBITS(8) [],
        MANIP OFFSET(8) NUMBITS(8) [],
        NUM_IFS OFFSET(16) NUMBITS(16) [],
    ],
    pub(crate) CREATE_CMD_2 [
        MAX_DMAT_ENTRIES OFFSET(0) NUMBITS(16) [],
        MAX_MC_GROUPS OFFSET(16) NUMBITS(16) [],
        MAX_VLAN_IDS OFFSET(32) NUMBITS(16) [],
    ],
    pub(crate) ATTR_RSP_0 [
        METHOD OFFSET(0) NUMBITS(8) [],
        MANIP OFFSET(8) NUMBITS(8) [],
        NUM_IFS OFFSET(16) NUMBITS(16) [],
        MEM_SIZE OFFSET(32) NUMBITS(16) [],
    ],
    pub(crate) ATTR_RSP_1 [
        ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) ATTR_RSP_3 [
        MAX_VLAN_IDS OFFSET(0) NUMBITS(16) [],
    ]
}

/// Frame classification the demux steers on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
    None,
    #[default]
    CVlanMac,
    Mac,
    CVlan,
    /// 10.1 and later.
    SVlan,
    /// 10.1 and later.
    Custom,
}

impl Method {
    pub const NAMES: [(&'static str, Method); 6] = [
        ("DPDMUX_METHOD_NONE", Method::None),
        ("DPDMUX_METHOD_C_VLAN_MAC", Method::CVlanMac),
        ("DPDMUX_METHOD_MAC", Method::Mac),
        ("DPDMUX_METHOD_C_VLAN", Method::CVlan),
        ("DPDMUX_METHOD_S_VLAN", Method::SVlan),
        ("DPDMUX_METHOD_CUSTOM", Method::Custom),
    ];

    fn raw(self) -> u64 {
        match self {
            Method::None => 0,
            Method::CVlanMac => 1,
            Method::Mac => 2,
            Method::CVlan => 3,
            Method::SVlan => 4,
            Method::Custom => 5,
        }
    }

    fn from_raw(raw: u64) -> Option<Self> {
        Self::NAMES
            .into_iter()
            .map(|(_, method)| method)
            .find(|method| method.raw() == raw)
    }

    fn supported(self, abi: Abi) -> bool {
        abi == Abi::V10_1 || !matches!(self, Method::SVlan | Method::Custom)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (name, _) = Self::NAMES
            .into_iter()
            .find(|(_, method)| method == self)
            .unwrap_or(("DPDMUX_METHOD_NONE", Method::None));
        f.write_str(name)
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::NAMES
            .into_iter()
            .find(|(name, _)| *name == s)
            .map(|(_, method)| method)
            .ok_or_else(|| {
                InvalidArgumentSnafu {
                    what: "dpdmux method",
                    reason: format!("{s:?}"),
                }
                .build()
            })
    }
}

/// Frame manipulation on the uplink. No firmware implements anything but none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Manip {
    #[default]
    None,
}

impl fmt::Display for Manip {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DPDMUX_MANIP_NONE")
    }
}

impl FromStr for Manip {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DPDMUX_MANIP_NONE" => Ok(Manip::None),
            _ => InvalidArgumentSnafu {
                what: "dpdmux manipulation",
                reason: format!("{s:?}"),
            }
            .fail(),
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DpdmuxOptions: u64 {
        /// Forward between downlinks, not only to and from the uplink.
        const BRIDGE_EN = 0x0000_0002;
        /// Masked custom classification, 10.1 and later.
        const CLS_MASK_SUPPORT = 0x0000_0020;
    }
}

impl DpdmuxOptions {
    pub const NAMES: [(&'static str, DpdmuxOptions); 2] = [
        ("DPDMUX_OPT_BRIDGE_EN", DpdmuxOptions::BRIDGE_EN),
        ("DPDMUX_OPT_CLS_MASK_SUPPORT", DpdmuxOptions::CLS_MASK_SUPPORT),
    ];

    pub fn supported(abi: Abi) -> Self {
        match abi {
            Abi::V10_1 => Self::all(),
            Abi::V9 | Abi::V10_0 => Self::BRIDGE_EN,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpdmuxCfg {
    pub method: Method,
    pub manip: Manip,
    /// Downlinks; the uplink comes on top.
    pub num_ifs: u16,
    pub options: DpdmuxOptions,
    pub max_dmat_entries: u16,
    pub max_mc_groups: u16,
    /// 10.1 and later.
    pub max_vlan_ids: u16,
}

impl Default for DpdmuxCfg {
    fn default() -> Self {
        Self {
            method: Method::CVlanMac,
            manip: Manip::None,
            num_ifs: 2,
            options: DpdmuxOptions::empty(),
            max_dmat_entries: 64,
            max_mc_groups: 32,
            max_vlan_ids: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpdmuxAttr {
    pub id: u32,
    pub options: DpdmuxOptions,
    /// Raw method when the firmware reports one this library does not know.
    pub method: Result<Method, u8>,
    pub manip: u8,
    pub num_ifs: u16,
    pub mem_size: u16,
    pub max_vlan_ids: Option<u16>,
    pub version: Option<ApiVersion>,
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpdmuxCfg) -> Result<u32> {
    let abi = io.abi();
    object::check_range("number of interfaces", cfg.num_ifs, 1..=u16::MAX - 1)?;
    if !cfg.method.supported(abi) {
        return UnsupportedOnAbiSnafu {
            what: format!("dpdmux method {}", cfg.method),
            abi,
        }
        .fail();
    }
    let unsupported = cfg.options - DpdmuxOptions::supported(abi);
    if !unsupported.is_empty() {
        return UnsupportedOnAbiSnafu {
            what: format!("dpdmux options {unsupported:?}"),
            abi,
        }
        .fail();
    }
    if abi != Abi::V10_1 && cfg.max_vlan_ids != 0 {
        return UnsupportedOnAbiSnafu {
            what: "dpdmux vlan id limit".to_string(),
            abi,
        }
        .fail();
    }

    let cmd_version = abi.extended_cmd_version();
    object::create(
        io,
        ObjectType::Dpdmux,
        container,
        cmd_version,
        |cmd| {
            cmd.write(
                0,
                CREATE_CMD_0::METHOD.val(cfg.method.raw())
                    + CREATE_CMD_0::MANIP.val(0)
                    + CREATE_CMD_0::NUM_IFS.val(cfg.num_ifs.into()),
            );
            cmd.params[1] = cfg.options.bits();
            let mut word2 = CREATE_CMD_2::MAX_DMAT_ENTRIES.val(cfg.max_dmat_entries.into())
                + CREATE_CMD_2::MAX_MC_GROUPS.val(cfg.max_mc_groups.into());
            if cmd_version > 1 {
                word2 += CREATE_CMD_2::MAX_VLAN_IDS.val(cfg.max_vlan_ids.into());
            }
            cmd.write(2, word2);
        },
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpdmuxAttr> {
    let abi = io.abi();
    let rsp = object::get_attributes(io, token, abi.extended_cmd_version())?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    let method = word0.read(ATTR_RSP_0::METHOD);
    let (max_vlan_ids, version) = match abi {
        Abi::V9 => (None, Some(object::read_version_v9(&rsp, 3))),
        Abi::V10_0 => (None, None),
        Abi::V10_1 => (
            Some(rsp.param::<ATTR_RSP_3::Register>(3).read(ATTR_RSP_3::MAX_VLAN_IDS) as u16),
            None,
        ),
    };
    Ok(DpdmuxAttr {
        id: rsp.param::<ATTR_RSP_1::Register>(1).read(ATTR_RSP_1::ID) as u32,
        options: DpdmuxOptions::from_bits_retain(rsp.params[2]),
        method: Method::from_raw(method).ok_or(method as u8),
        manip: word0.read(ATTR_RSP_0::MANIP) as u8,
        num_ifs: word0.read(ATTR_RSP_0::NUM_IFS) as u16,
        mem_size: word0.read(ATTR_RSP_0::MEM_SIZE) as u16,
        max_vlan_ids,
        version,
    })
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn emulate_attributes(
    abi: Abi,
    id: u32,
    create: &crate::mc::McCommand,
    rsp: &mut crate::mc::McCommand,
) {
    let cfg0 = create.param::<CREATE_CMD_0::Register>(0);
    rsp.write(
        0,
        ATTR_RSP_0::METHOD.val(cfg0.read(CREATE_CMD_0::METHOD))
            + ATTR_RSP_0::MANIP.val(cfg0.read(CREATE_CMD_0::MANIP))
            + ATTR_RSP_0::NUM_IFS.val(cfg0.read(CREATE_CMD_0::NUM_IFS))
            + ATTR_RSP_0::MEM_SIZE.val(0),
    );
    rsp.write(1, ATTR_RSP_1::ID.val(id.into()));
    rsp.params[2] = create.params[1];
    match abi {
        Abi::V9 => object::write_version_v9(rsp, 3, crate::emulator::object_version(abi)),
        Abi::V10_0 => {}
        Abi::V10_1 => rsp.write(
            3,
            ATTR_RSP_3::MAX_VLAN_IDS.val(
                create
                    .param::<CREATE_CMD_2::Register>(2)
                    .read(CREATE_CMD_2::MAX_VLAN_IDS),
            ),
        ),
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

    #[test]
    fn v9_create_packs_method_and_interfaces() {
        let mut io = io(9, 0);
        let cfg = DpdmuxCfg {
            method: Method::Mac,
            num_ifs: 3,
            options: DpdmuxOptions::BRIDGE_EN,
            ..Default::default()
        };
        let id = create(&mut io, Token::NONE, &cfg).unwrap();

        let cmd = io.portal().find(0x906).unwrap();
        assert_eq!(cmd.params[0], 0x0003_0002);
        assert_eq!(cmd.params[1], 0x2);
        assert_eq!(cmd.params[2], 0x0020_0040);

        let attr = object::with_open(&mut io, ObjectName::new(ObjectType::Dpdmux, id), |io, t| {
            get_attributes(io, t)
        })
        .unwrap();
        assert_eq!(attr.method, Ok(Method::Mac));
        assert_eq!(attr.num_ifs, 3);
        assert_eq!(attr.options, DpdmuxOptions::BRIDGE_EN);
        assert!(attr.version.is_some());
        assert_eq!(attr.max_vlan_ids, None);
    }

    #[test]
    fn custom_method_and_vlan_limit_need_10_1() {
        let mut old = io(10, 0);
        let custom = DpdmuxCfg {
            method: Method::Custom,
            ..Default::default()
        };
        assert!(matches!(
            create(&mut old, Token(1), &custom),
            Err(Error::UnsupportedOnAbi { .. })
        ));

        let mut new = io(10, 1);
        let root = new.portal().root_container();
        let cfg = DpdmuxCfg {
            max_vlan_ids: 16,
            ..custom
        };
        let id = object::with_open(&mut new, ObjectName::new(ObjectType::Dprc, root), |io, t| {
            create(io, t, &cfg)
        })
        .unwrap();
        let attr = object::with_open(&mut new, ObjectName::new(ObjectType::Dpdmux, id), |io, t| {
            get_attributes(io, t)
        })
        .unwrap();
        assert_eq!(attr.method, Ok(Method::Custom));
        assert_eq!(attr.max_vlan_ids, Some(16));
    }

    #[test]
    fn method_names_round_trip_through_text() {
        for (name, method) in Method::NAMES {
            assert_eq!(name.parse::<Method>().unwrap(), method);
            assert_eq!(method.to_string(), name);
        }
        assert!("DPDMUX_METHOD_VXLAN".parse::<Method>().is_err());
    }
}
