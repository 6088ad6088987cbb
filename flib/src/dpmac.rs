/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! MAC object (DPMAC), the software face of a physical port.

use {
    crate::{
        error::Result,
        mc::{Generation, McIo, Portal, Token},
        object::{self, ApiVersion, ObjectType},
    },
    core::fmt,
    tock_registers::register_bitfields,
};

register_bitfields! {
    u64,

    pub(crate) CREATE_CMD_0 [
        MAC_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) ATTR_RSP_0 [
        ID OFFSET(0) NUMBITS(32) [],
        LINK_TYPE OFFSET(32) NUMBITS(8) [],
        ETH_IF OFFSET(40) NUMBITS(8) [],
    ],
    pub(crate) ATTR_RSP_1 [
        MAX_RATE OFFSET(0) NUMBITS(32) [],
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkType {
    None,
    Fixed,
    Phy,
    Backplane,
    Unknown(u8),
}

impl LinkType {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => LinkType::None,
            1 => LinkType::Fixed,
            2 => LinkType::Phy,
            3 => LinkType::Backplane,
            other => LinkType::Unknown(other),
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinkType::None => f.write_str("DPMAC_LINK_TYPE_NONE"),
            LinkType::Fixed => f.write_str("DPMAC_LINK_TYPE_FIXED"),
            LinkType::Phy => f.write_str("DPMAC_LINK_TYPE_PHY"),
            LinkType::Backplane => f.write_str("DPMAC_LINK_TYPE_BACKPLANE"),
            LinkType::Unknown(raw) => write!(f, "unknown link type {raw}"),
        }
    }
}

/// Media-independent interface the port is wired with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EthIf {
    Mii,
    Rmii,
    Smii,
    Gmii,
    Rgmii,
    Sgmii,
    Qsgmii,
    Xaui,
    Xfi,
    Unknown(u8),
}

impl EthIf {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => EthIf::Mii,
            1 => EthIf::Rmii,
            2 => EthIf::Smii,
            3 => EthIf::Gmii,
            4 => EthIf::Rgmii,
            5 => EthIf::Sgmii,
            6 => EthIf::Qsgmii,
            7 => EthIf::Xaui,
            8 => EthIf::Xfi,
            other => EthIf::Unknown(other),
        }
    }
}

impl fmt::Display for EthIf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EthIf::Mii => "MII",
            EthIf::Rmii => "RMII",
            EthIf::Smii => "SMII",
            EthIf::Gmii => "GMII",
            EthIf::Rgmii => "RGMII",
            EthIf::Sgmii => "SGMII",
            EthIf::Qsgmii => "QSGMII",
            EthIf::Xaui => "XAUI",
            EthIf::Xfi => "XFI",
            EthIf::Unknown(raw) => return write!(f, "unknown interface {raw}"),
        };
        write!(f, "DPMAC_ETH_IF_{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpmacCfg {
    /// Physical port number, counted from 1.
    pub mac_id: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpmacAttr {
    pub id: u32,
    pub link_type: LinkType,
    pub eth_if: EthIf,
    /// Mbit/s.
    pub max_rate: u32,
    pub version: Option<ApiVersion>,
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpmacCfg) -> Result<u32> {
    object::check_range("MAC id", cfg.mac_id, 1..=u32::MAX)?;
    object::create(
        io,
        ObjectType::Dpmac,
        container,
        1,
        |cmd| cmd.write(0, CREATE_CMD_0::MAC_ID.val(cfg.mac_id.into())),
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpmacAttr> {
    let rsp = object::get_attributes(io, token, 1)?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    Ok(DpmacAttr {
        id: word0.read(ATTR_RSP_0::ID) as u32,
        link_type: LinkType::from_raw(word0.read(ATTR_RSP_0::LINK_TYPE) as u8),
        eth_if: EthIf::from_raw(word0.read(ATTR_RSP_0::ETH_IF) as u8),
        max_rate: rsp.param::<ATTR_RSP_1::Register>(1).read(ATTR_RSP_1::MAX_RATE) as u32,
        version: match io.abi().generation() {
            Generation::V9 => Some(object::read_version_v9(&rsp, 2)),
            Generation::V10 => None,
        },
    })
}

/// A DPMAC id is the port it was created for.
#[cfg(any(test, feature = "emulator"))]
pub(crate) fn requested_id(create: &crate::mc::McCommand) -> u32 {
    create
        .param::<CREATE_CMD_0::Register>(0)
        .read(CREATE_CMD_0::MAC_ID) as u32
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn emulate_attributes(
    abi: crate::mc::Abi,
    id: u32,
    _create: &crate::mc::McCommand,
    rsp: &mut crate::mc::McCommand,
) {
    // Every emulated port is a 10G XFI backplane link.
    rsp.write(
        0,
        ATTR_RSP_0::ID.val(id.into()) + ATTR_RSP_0::LINK_TYPE.val(3) + ATTR_RSP_0::ETH_IF.val(8),
    );
    rsp.write(1, ATTR_RSP_1::MAX_RATE.val(10_000));
    if abi.generation() == Generation::V9 {
        object::write_version_v9(rsp, 2, crate::emulator::object_version(abi));
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{emulator::Emulator, error::Error, mc::McVersion, object::ObjectName},
    };

    #[test]
    fn mac_object_takes_the_port_number_as_id() {
        let (mut io, _) = McIo::probe(Emulator::new(McVersion {
            major: 10,
            minor: 1,
            revision: 0,
        }))
        .unwrap();
        let root = io.portal().root_container();
        let id = object::with_open(&mut io, ObjectName::new(ObjectType::Dprc, root), |io, token| {
            create(io, token, &DpmacCfg { mac_id: 7 })
        })
        .unwrap();
        assert_eq!(id, 7);

        let attr = object::with_open(&mut io, ObjectName::new(ObjectType::Dpmac, 7), |io, token| {
            get_attributes(io, token)
        })
        .unwrap();
        assert_eq!(attr.link_type, LinkType::Backplane);
        assert_eq!(attr.eth_if, EthIf::Xfi);
        assert_eq!(attr.max_rate, 10_000);
    }

    #[test]
    fn port_zero_is_refused() {
        let (mut io, _) = McIo::probe(Emulator::new(McVersion {
            major: 9,
            minor: 0,
            revision: 0,
        }))
        .unwrap();
        assert!(matches!(
            create(&mut io, Token::NONE, &DpmacCfg { mac_id: 0 }),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn enum_names() {
        assert_eq!(EthIf::Sgmii.to_string(), "DPMAC_ETH_IF_SGMII");
        assert_eq!(EthIf::from_raw(42), EthIf::Unknown(42));
        assert_eq!(LinkType::Phy.to_string(), "DPMAC_LINK_TYPE_PHY");
    }
}
