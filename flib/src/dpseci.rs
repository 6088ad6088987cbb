/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! SEC crypto interface object (DPSECI).

use {
    crate::{
        error::{Result, UnsupportedOnAbiSnafu},
        mc::{Abi, McIo, Portal, Token},
        object::{self, ApiVersion, ObjectType},
    },
    bitflags::bitflags,
    tock_registers::register_bitfields,
};

register_bitfields! {
    u64,

    pub(crate) CREATE_CMD_1 [
        NUM_RX_QUEUES OFFSET(0) NUMBITS(8) [],
        NUM_TX_QUEUES OFFSET(8) NUMBITS(8) [],
    ],
    pub(crate) CREATE_CMD_2 [
        OPTIONS OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) ATTR_RSP_0 [
        ID OFFSET(0) NUMBITS(32) [],
        NUM_TX_QUEUES OFFSET(32) NUMBITS(8) [],
        NUM_RX_QUEUES OFFSET(40) NUMBITS(8) [],
    ],
    pub(crate) ATTR_RSP_1 [
        OPTIONS OFFSET(0) NUMBITS(32) [],
    ]
}

/// Queue pairs a SEC interface can carry, one priority byte per rx queue.
pub const MAX_QUEUES: usize = 8;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DpseciOptions: u32 {
        /// Per-interface congestion group.
        const HAS_CG = 0x0000_0020;
    }
}

impl DpseciOptions {
    pub const NAMES: [(&'static str, DpseciOptions); 1] = [("DPSECI_OPT_HAS_CG", Self::HAS_CG)];

    /// Options the create command of `abi` can express. Options only exist from 10.1 on.
    pub fn supported(abi: Abi) -> Self {
        match abi {
            Abi::V10_1 => Self::all(),
            _ => Self::empty(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DpseciCfg {
    /// Priority of every rx queue, 1..=8 each. Their count is the number of rx queues.
    pub priorities: Vec<u8>,
    /// Defaults to the number of rx queues when zero.
    pub num_tx_queues: u8,
    pub options: DpseciOptions,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DpseciAttr {
    pub id: u32,
    pub num_tx_queues: u8,
    pub num_rx_queues: u8,
    /// 10.1 and later.
    pub options: Option<DpseciOptions>,
    pub version: Option<ApiVersion>,
}

pub fn create<P: Portal>(io: &mut McIo<P>, container: Token, cfg: &DpseciCfg) -> Result<u32> {
    let abi = io.abi();
    object::check_range("number of rx queues", cfg.priorities.len(), 1..=MAX_QUEUES)?;
    for priority in &cfg.priorities {
        object::check_range("queue priority", *priority, 1..=8)?;
    }
    let num_tx_queues = match cfg.num_tx_queues {
        0 => cfg.priorities.len() as u8,
        n => n,
    };
    object::check_range("number of tx queues", num_tx_queues as usize, 1..=MAX_QUEUES)?;
    let unsupported = cfg.options - DpseciOptions::supported(abi);
    if !unsupported.is_empty() {
        return UnsupportedOnAbiSnafu {
            what: format!("dpseci options {unsupported:?}"),
            abi,
        }
        .fail();
    }

    let cmd_version = abi.extended_cmd_version();
    object::create(
        io,
        ObjectType::Dpseci,
        container,
        cmd_version,
        |cmd| {
            cmd.write_bytes(0, &cfg.priorities);
            cmd.write(
                1,
                CREATE_CMD_1::NUM_RX_QUEUES.val(cfg.priorities.len() as u64)
                    + CREATE_CMD_1::NUM_TX_QUEUES.val(num_tx_queues.into()),
            );
            if cmd_version > 1 {
                cmd.write(2, CREATE_CMD_2::OPTIONS.val(cfg.options.bits().into()));
            }
        },
        |io, token| get_attributes(io, token).map(|attr| attr.id),
    )
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DpseciAttr> {
    let abi = io.abi();
    let rsp = object::get_attributes(io, token, abi.extended_cmd_version())?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    let (options, version) = match abi {
        Abi::V9 => (None, Some(object::read_version_v9(&rsp, 1))),
        Abi::V10_0 => (None, None),
        Abi::V10_1 => (
            Some(DpseciOptions::from_bits_retain(
                rsp.param::<ATTR_RSP_1::Register>(1).read(ATTR_RSP_1::OPTIONS) as u32,
            )),
            None,
        ),
    };
    Ok(DpseciAttr {
        id: word0.read(ATTR_RSP_0::ID) as u32,
        num_tx_queues: word0.read(ATTR_RSP_0::NUM_TX_QUEUES) as u8,
        num_rx_queues: word0.read(ATTR_RSP_0::NUM_RX_QUEUES) as u8,
        options,
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
    let queues = create.param::<CREATE_CMD_1::Register>(1);
    rsp.write(
        0,
        ATTR_RSP_0::ID.val(id.into())
            + ATTR_RSP_0::NUM_TX_QUEUES.val(queues.read(CREATE_CMD_1::NUM_TX_QUEUES))
            + ATTR_RSP_0::NUM_RX_QUEUES.val(queues.read(CREATE_CMD_1::NUM_RX_QUEUES)),
    );
    match abi {
        Abi::V9 => object::write_version_v9(rsp, 1, crate::emulator::object_version(abi)),
        Abi::V10_0 => {}
        Abi::V10_1 => rsp.write(
            1,
            ATTR_RSP_1::OPTIONS.val(
                create
                    .param::<CREATE_CMD_2::Register>(2)
                    .read(CREATE_CMD_2::OPTIONS),
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

    fn io(minor: u32) -> McIo<Emulator> {
        McIo::probe(Emulator::new(McVersion {
            major: 10,
            minor,
            revision: 0,
        }))
        .unwrap()
        .0
    }

    fn create_in_root(io: &mut McIo<Emulator>, cfg: &DpseciCfg) -> Result<u32> {
        let root = io.portal().root_container();
        object::with_open(io, ObjectName::new(ObjectType::Dprc, root), |io, token| {
            create(io, token, cfg)
        })
    }

    #[test]
    fn priorities_are_laid_out_as_bytes() {
        let mut io = io(1);
        let cfg = DpseciCfg {
            priorities: vec![1, 2, 3, 4, 5, 6, 7, 8],
            num_tx_queues: 0,
            options: DpseciOptions::HAS_CG,
        };
        let id = create_in_root(&mut io, &cfg).unwrap();

        let cmd = io.portal().find(0x909).unwrap();
        assert_eq!(cmd.cmd_id(Abi::V10_1).version, 2);
        assert_eq!(cmd.params[0], 0x0807_0605_0403_0201);
        assert_eq!(cmd.params[1], 0x0808);
        assert_eq!(cmd.params[2], 0x20);

        let attr = object::with_open(&mut io, ObjectName::new(ObjectType::Dpseci, id), |io, t| {
            get_attributes(io, t)
        })
        .unwrap();
        assert_eq!(attr.num_rx_queues, 8);
        assert_eq!(attr.num_tx_queues, 8);
        assert_eq!(attr.options, Some(DpseciOptions::HAS_CG));
    }

    #[test]
    fn options_need_10_1() {
        let mut io = io(0);
        let cfg = DpseciCfg {
            priorities: vec![1],
            num_tx_queues: 1,
            options: DpseciOptions::HAS_CG,
        };
        assert!(matches!(
            create_in_root(&mut io, &cfg),
            Err(Error::UnsupportedOnAbi { .. })
        ));

        let cfg = DpseciCfg {
            options: DpseciOptions::empty(),
            ..cfg
        };
        create_in_root(&mut io, &cfg).unwrap();
        let cmd = io.portal().find(0x909).unwrap();
        assert_eq!(cmd.cmd_id(Abi::V10_0).version, 1);
        assert_eq!(cmd.params[2], 0);
    }

    #[test]
    fn queue_counts_are_checked() {
        let mut io = io(1);
        let too_many = DpseciCfg {
            priorities: vec![1; 9],
            ..Default::default()
        };
        assert!(matches!(
            create_in_root(&mut io, &too_many),
            Err(Error::InvalidArgument { .. })
        ));
        let bad_priority = DpseciCfg {
            priorities: vec![0],
            ..Default::default()
        };
        assert!(matches!(
            create_in_root(&mut io, &bad_priority),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
