/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Resource container object (DPRC).
//!
//! Containers form the object tree: every object lives in exactly one container, and a
//! container hands objects down to its children or takes them back. Links between
//! objects are made through the container as well.
//!
//! Objects are named in commands by their type string and id. The type string is kept
//! raw in [`ObjDesc`] because containers also report object types this library has no
//! commands for (portals, AIOP tiles and the like).

use {
    crate::{
        error::{InvalidArgumentSnafu, Result},
        mc::{CmdId, Generation, McCommand, McIo, Portal, Token, MC_STRING_MAX},
        object::{self, ApiVersion, Endpoint, ObjectName, ObjectType},
    },
    bitflags::bitflags,
    log::debug,
    tock_registers::register_bitfields,
};

pub(crate) const CMDID_GET_CONT_ID: CmdId = CmdId::new(0x830);
pub(crate) const CMDID_CREATE_CONT: CmdId = CmdId::new(0x151);
pub(crate) const CMDID_DESTROY_CONT: CmdId = CmdId::new(0x152);
pub(crate) const CMDID_ASSIGN: CmdId = CmdId::new(0x157);
pub(crate) const CMDID_UNASSIGN: CmdId = CmdId::new(0x158);
pub(crate) const CMDID_GET_OBJ_COUNT: CmdId = CmdId::new(0x159);
pub(crate) const CMDID_GET_OBJ: CmdId = CmdId::new(0x15a);
pub(crate) const CMDID_SET_OBJ_LABEL: CmdId = CmdId::new(0x161);
pub(crate) const CMDID_CONNECT: CmdId = CmdId::new(0x167);
pub(crate) const CMDID_DISCONNECT: CmdId = CmdId::new(0x168);
pub(crate) const CMDID_GET_CONNECTION: CmdId = CmdId::new(0x16c);

register_bitfields! {
    u64,

    pub(crate) GET_CONT_ID_RSP_0 [
        CONTAINER_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) CREATE_CONT_CMD_0 [
        OPTIONS OFFSET(0) NUMBITS(32) [],
        ICID OFFSET(32) NUMBITS(16) [],
    ],
    pub(crate) CREATE_CONT_CMD_1 [
        PORTAL_ID OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) CREATE_CONT_RSP_1 [
        CHILD_CONTAINER_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) DESTROY_CONT_CMD_0 [
        CHILD_CONTAINER_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) ATTR_RSP_0 [
        CONTAINER_ID OFFSET(0) NUMBITS(32) [],
        ICID OFFSET(32) NUMBITS(16) [],
    ],
    pub(crate) ATTR_RSP_1 [
        OPTIONS OFFSET(0) NUMBITS(32) [],
        PORTAL_ID OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) GET_OBJ_COUNT_RSP_0 [
        OBJ_COUNT OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) GET_OBJ_CMD_0 [
        OBJ_INDEX OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) GET_OBJ_RSP_0 [
        ID OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) GET_OBJ_RSP_1 [
        VENDOR OFFSET(0) NUMBITS(16) [],
        IRQ_COUNT OFFSET(16) NUMBITS(8) [],
        REGION_COUNT OFFSET(24) NUMBITS(8) [],
        STATE OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) GET_OBJ_RSP_2 [
        VERSION_MAJOR OFFSET(0) NUMBITS(16) [],
        VERSION_MINOR OFFSET(16) NUMBITS(16) [],
        FLAGS OFFSET(32) NUMBITS(16) [],
    ],
    pub(crate) RES_REQ_CMD_0 [
        CONTAINER_ID OFFSET(0) NUMBITS(32) [],
        OPTIONS OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) RES_REQ_CMD_1 [
        NUM OFFSET(0) NUMBITS(32) [],
        ID_BASE_ALIGN OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) SET_OBJ_LABEL_CMD_0 [
        OBJ_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) ENDPOINT [
        ID OFFSET(0) NUMBITS(32) [],
        INTERFACE OFFSET(32) NUMBITS(16) [],
    ],
    pub(crate) CONNECT_CMD_4 [
        MAX_RATE OFFSET(0) NUMBITS(32) [],
        COMMITTED_RATE OFFSET(32) NUMBITS(32) [],
    ],
    pub(crate) GET_CONNECTION_RSP_6 [
        STATE OFFSET(0) NUMBITS(32) [],
    ]
}

bitflags! {
    /// What a container and the software running on it may do.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DprcOptions: u32 {
        /// May create child containers.
        const SPAWN_ALLOWED = 0x0000_0001;
        /// May allocate objects from its parent.
        const ALLOC_ALLOWED = 0x0000_0002;
        /// May create and destroy objects.
        const OBJ_CREATE_ALLOWED = 0x0000_0004;
        /// May link objects.
        const TOPOLOGY_CHANGES_ALLOWED = 0x0000_0008;
        const IOMMU_BYPASS = 0x0000_0010;
        /// AIOP container.
        const AIOP = 0x0000_0020;
        /// May configure interrupts of its objects.
        const IRQ_CFG_ALLOWED = 0x0000_0040;
    }
}

impl DprcOptions {
    pub const NAMES: [(&'static str, DprcOptions); 7] = [
        ("DPRC_CFG_OPT_SPAWN_ALLOWED", Self::SPAWN_ALLOWED),
        ("DPRC_CFG_OPT_ALLOC_ALLOWED", Self::ALLOC_ALLOWED),
        ("DPRC_CFG_OPT_OBJ_CREATE_ALLOWED", Self::OBJ_CREATE_ALLOWED),
        (
            "DPRC_CFG_OPT_TOPOLOGY_CHANGES_ALLOWED",
            Self::TOPOLOGY_CHANGES_ALLOWED,
        ),
        ("DPRC_CFG_OPT_IOMMU_BYPASS", Self::IOMMU_BYPASS),
        ("DPRC_CFG_OPT_AIOP", Self::AIOP),
        ("DPRC_CFG_OPT_IRQ_CFG_ALLOWED", Self::IRQ_CFG_ALLOWED),
    ];
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ObjState: u32 {
        /// Some software holds a token for it.
        const OPEN = 0x0000_0001;
        /// Visible to the software running on the container.
        const PLUGGED = 0x0000_0002;
    }
}

bitflags! {
    /// How assign and unassign pick the objects they move.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ResReqOptions: u32 {
        /// `id_base_align` is the exact id of the first object.
        const EXPLICIT = 0x0000_0001;
        /// `id_base_align` is an id alignment.
        const ALIGNED = 0x0000_0002;
        /// Plug the objects on arrival.
        const PLUGGED = 0x0000_0004;
    }
}

/// ICID that lets the firmware pick one from its pool.
pub const ICID_POOL: u16 = 0xffff;
/// Portal id that lets the firmware pick the portal.
pub const PORTAL_ID_ANY: i32 = -1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DprcCfg {
    pub icid: u16,
    pub portal_id: i32,
    pub options: DprcOptions,
    pub label: String,
}

impl Default for DprcCfg {
    fn default() -> Self {
        Self {
            icid: ICID_POOL,
            portal_id: PORTAL_ID_ANY,
            options: DprcOptions::empty(),
            label: String::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DprcAttr {
    pub container_id: u32,
    pub icid: u16,
    pub portal_id: i32,
    pub options: DprcOptions,
    pub version: Option<ApiVersion>,
}

/// One object as listed by its container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjDesc {
    pub ty: String,
    pub id: u32,
    pub vendor: u16,
    pub irq_count: u8,
    pub region_count: u8,
    pub state: ObjState,
    pub version: ApiVersion,
    pub flags: u16,
    pub label: String,
}

impl ObjDesc {
    /// `None` for object types this library does not know.
    pub fn name(&self) -> Option<ObjectName> {
        self.ty
            .parse()
            .ok()
            .map(|ty| ObjectName::new(ty, self.id))
    }
}

/// A request to move `num` objects of type `ty` between a container and its child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResReq {
    pub ty: ObjectType,
    pub num: u32,
    pub options: ResReqOptions,
    /// Id of the first object with [`ResReqOptions::EXPLICIT`], alignment otherwise.
    pub id_base_align: i32,
}

impl ResReq {
    /// Exactly `name`, plugged or not.
    pub fn object(name: ObjectName, plugged: bool) -> Self {
        let mut options = ResReqOptions::EXPLICIT;
        options.set(ResReqOptions::PLUGGED, plugged);
        Self {
            ty: name.ty,
            num: 1,
            options,
            id_base_align: name.id as i32,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionCfg {
    /// Mbit/s, 0 for unlimited.
    pub committed_rate: u32,
    pub max_rate: u32,
}

/// Link state reported by the firmware, 1 when the link is up.
pub type LinkState = i32;

fn check_label(label: &str) -> Result<()> {
    if label.len() > MC_STRING_MAX {
        return InvalidArgumentSnafu {
            what: "label",
            reason: format!("{label:?} is longer than {MC_STRING_MAX} bytes"),
        }
        .fail();
    }
    Ok(())
}

fn write_endpoint(cmd: &mut McCommand, index: usize, ep: &Endpoint) {
    cmd.write(
        index,
        ENDPOINT::ID.val(ep.object.id.into()) + ENDPOINT::INTERFACE.val(ep.interface.into()),
    );
}

/// Id of the container the calling software runs in.
pub fn get_container_id<P: Portal>(io: &mut McIo<P>) -> Result<u32> {
    let cmd = io.command(CMDID_GET_CONT_ID, Token::NONE);
    let rsp = io.send_command(cmd)?;
    Ok(rsp
        .param::<GET_CONT_ID_RSP_0::Register>(0)
        .read(GET_CONT_ID_RSP_0::CONTAINER_ID) as u32)
}

/// Creates a child container and returns its id and the offset of its MC portal.
pub fn create_container<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    cfg: &DprcCfg,
) -> Result<(u32, u64)> {
    check_label(&cfg.label)?;
    let mut cmd = io.command(CMDID_CREATE_CONT, token);
    cmd.write(
        0,
        CREATE_CONT_CMD_0::OPTIONS.val(cfg.options.bits().into())
            + CREATE_CONT_CMD_0::ICID.val(cfg.icid.into()),
    );
    cmd.write(
        1,
        CREATE_CONT_CMD_1::PORTAL_ID.val(u64::from(cfg.portal_id as u32)),
    );
    cmd.write_str(2, &cfg.label);
    let rsp = io.send_command(cmd)?;
    let child = rsp
        .param::<CREATE_CONT_RSP_1::Register>(1)
        .read(CREATE_CONT_RSP_1::CHILD_CONTAINER_ID) as u32;
    Ok((child, rsp.params[2]))
}

/// Destroys an empty child container.
pub fn destroy_container<P: Portal>(io: &mut McIo<P>, token: Token, child: u32) -> Result<()> {
    let mut cmd = io.command(CMDID_DESTROY_CONT, token);
    cmd.write(0, DESTROY_CONT_CMD_0::CHILD_CONTAINER_ID.val(child.into()));
    io.send_command(cmd).map(|_| ())
}

pub fn get_attributes<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<DprcAttr> {
    let rsp = object::get_attributes(io, token, 1)?;
    let word0 = rsp.param::<ATTR_RSP_0::Register>(0);
    let word1 = rsp.param::<ATTR_RSP_1::Register>(1);
    Ok(DprcAttr {
        container_id: word0.read(ATTR_RSP_0::CONTAINER_ID) as u32,
        icid: word0.read(ATTR_RSP_0::ICID) as u16,
        portal_id: word1.read(ATTR_RSP_1::PORTAL_ID) as u32 as i32,
        options: DprcOptions::from_bits_retain(word1.read(ATTR_RSP_1::OPTIONS) as u32),
        version: match io.abi().generation() {
            Generation::V9 => Some(object::read_version_v9(&rsp, 2)),
            Generation::V10 => None,
        },
    })
}

pub fn get_obj_count<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<u32> {
    let cmd = io.command(CMDID_GET_OBJ_COUNT, token);
    let rsp = io.send_command(cmd)?;
    Ok(rsp
        .param::<GET_OBJ_COUNT_RSP_0::Register>(0)
        .read(GET_OBJ_COUNT_RSP_0::OBJ_COUNT) as u32)
}

pub fn get_obj<P: Portal>(io: &mut McIo<P>, token: Token, index: u32) -> Result<ObjDesc> {
    let mut cmd = io.command(CMDID_GET_OBJ, token);
    cmd.write(0, GET_OBJ_CMD_0::OBJ_INDEX.val(index.into()));
    let rsp = io.send_command(cmd)?;
    let word1 = rsp.param::<GET_OBJ_RSP_1::Register>(1);
    let word2 = rsp.param::<GET_OBJ_RSP_2::Register>(2);
    Ok(ObjDesc {
        ty: rsp.read_str(3),
        id: rsp.param::<GET_OBJ_RSP_0::Register>(0).read(GET_OBJ_RSP_0::ID) as u32,
        vendor: word1.read(GET_OBJ_RSP_1::VENDOR) as u16,
        irq_count: word1.read(GET_OBJ_RSP_1::IRQ_COUNT) as u8,
        region_count: word1.read(GET_OBJ_RSP_1::REGION_COUNT) as u8,
        state: ObjState::from_bits_retain(word1.read(GET_OBJ_RSP_1::STATE) as u32),
        version: ApiVersion {
            major: word2.read(GET_OBJ_RSP_2::VERSION_MAJOR) as u16,
            minor: word2.read(GET_OBJ_RSP_2::VERSION_MINOR) as u16,
        },
        flags: word2.read(GET_OBJ_RSP_2::FLAGS) as u16,
        label: rsp.read_str(5),
    })
}

/// Every object in the container `token` is open on, in firmware order.
pub fn get_objects<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<Vec<ObjDesc>> {
    let count = get_obj_count(io, token)?;
    debug!("dprc: {} objects", count);
    (0..count).map(|index| get_obj(io, token, index)).collect()
}

fn res_req<P: Portal>(
    io: &mut McIo<P>,
    cmd_id: CmdId,
    token: Token,
    container_id: u32,
    req: &ResReq,
) -> Result<()> {
    let mut cmd = io.command(cmd_id, token);
    cmd.write(
        0,
        RES_REQ_CMD_0::CONTAINER_ID.val(container_id.into())
            + RES_REQ_CMD_0::OPTIONS.val(req.options.bits().into()),
    );
    cmd.write(
        1,
        RES_REQ_CMD_1::NUM.val(req.num.into())
            + RES_REQ_CMD_1::ID_BASE_ALIGN.val(u64::from(req.id_base_align as u32)),
    );
    cmd.write_str(2, req.ty.name());
    io.send_command(cmd).map(|_| ())
}

/// Moves objects from the open container to `container_id`. Assigning to the open
/// container itself changes only the plugged state.
pub fn assign<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    container_id: u32,
    req: &ResReq,
) -> Result<()> {
    res_req(io, CMDID_ASSIGN, token, container_id, req)
}

/// Moves objects from child `child_id` back to the open container.
pub fn unassign<P: Portal>(io: &mut McIo<P>, token: Token, child_id: u32, req: &ResReq) -> Result<()> {
    res_req(io, CMDID_UNASSIGN, token, child_id, req)
}

pub fn set_obj_label<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    name: ObjectName,
    label: &str,
) -> Result<()> {
    check_label(label)?;
    let mut cmd = io.command(CMDID_SET_OBJ_LABEL, token);
    cmd.write(0, SET_OBJ_LABEL_CMD_0::OBJ_ID.val(name.id.into()));
    cmd.write_str(1, label);
    cmd.write_str(3, name.ty.name());
    io.send_command(cmd).map(|_| ())
}

pub fn connect<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    endpoint1: &Endpoint,
    endpoint2: &Endpoint,
    cfg: &ConnectionCfg,
) -> Result<()> {
    let mut cmd = io.command(CMDID_CONNECT, token);
    write_endpoint(&mut cmd, 0, endpoint1);
    write_endpoint(&mut cmd, 1, endpoint2);
    cmd.write_str(2, endpoint1.object.ty.name());
    cmd.write(
        4,
        CONNECT_CMD_4::MAX_RATE.val(cfg.max_rate.into())
            + CONNECT_CMD_4::COMMITTED_RATE.val(cfg.committed_rate.into()),
    );
    cmd.write_str(5, endpoint2.object.ty.name());
    io.send_command(cmd).map(|_| ())
}

pub fn disconnect<P: Portal>(io: &mut McIo<P>, token: Token, endpoint: &Endpoint) -> Result<()> {
    let mut cmd = io.command(CMDID_DISCONNECT, token);
    write_endpoint(&mut cmd, 0, endpoint);
    cmd.write_str(1, endpoint.object.ty.name());
    io.send_command(cmd).map(|_| ())
}

/// The far end of the link at `endpoint`, `None` when nothing is connected there.
pub fn get_connection<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    endpoint: &Endpoint,
) -> Result<Option<(Endpoint, LinkState)>> {
    let mut cmd = io.command(CMDID_GET_CONNECTION, token);
    write_endpoint(&mut cmd, 0, endpoint);
    cmd.write_str(1, endpoint.object.ty.name());
    let rsp = io.send_command(cmd)?;

    let state = rsp
        .param::<GET_CONNECTION_RSP_6::Register>(6)
        .read(GET_CONNECTION_RSP_6::STATE) as u32 as i32;
    let ty = rsp.read_str(4);
    if state == -1 || ty.is_empty() {
        return Ok(None);
    }
    let far = rsp.param::<ENDPOINT::Register>(3);
    Ok(Some((
        Endpoint {
            object: ObjectName::new(ty.parse()?, far.read(ENDPOINT::ID) as u32),
            interface: far.read(ENDPOINT::INTERFACE) as u16,
        },
        state,
    )))
}

//--------------------------------------------------------------------------------------------------
// Decoders the emulator answers with
//--------------------------------------------------------------------------------------------------

#[cfg(any(test, feature = "emulator"))]
pub(crate) mod wire {
    use super::*;

    pub(crate) fn container_cfg(cmd: &McCommand) -> DprcCfg {
        let word0 = cmd.param::<CREATE_CONT_CMD_0::Register>(0);
        DprcCfg {
            icid: word0.read(CREATE_CONT_CMD_0::ICID) as u16,
            portal_id: cmd
                .param::<CREATE_CONT_CMD_1::Register>(1)
                .read(CREATE_CONT_CMD_1::PORTAL_ID) as u32 as i32,
            options: DprcOptions::from_bits_retain(
                word0.read(CREATE_CONT_CMD_0::OPTIONS) as u32
            ),
            label: cmd.read_str(2),
        }
    }

    pub(crate) fn created_container(rsp: &mut McCommand, child: u32, portal_offset: u64) {
        rsp.write(1, CREATE_CONT_RSP_1::CHILD_CONTAINER_ID.val(child.into()));
        rsp.params[2] = portal_offset;
    }

    pub(crate) fn child_id(cmd: &McCommand) -> u32 {
        cmd.param::<DESTROY_CONT_CMD_0::Register>(0)
            .read(DESTROY_CONT_CMD_0::CHILD_CONTAINER_ID) as u32
    }

    pub(crate) fn container_id(rsp: &mut McCommand, id: u32) {
        rsp.write(0, GET_CONT_ID_RSP_0::CONTAINER_ID.val(id.into()));
    }

    pub(crate) fn attributes(
        abi: crate::mc::Abi,
        rsp: &mut McCommand,
        id: u32,
        cfg: &DprcCfg,
    ) {
        rsp.write(
            0,
            ATTR_RSP_0::CONTAINER_ID.val(id.into()) + ATTR_RSP_0::ICID.val(cfg.icid.into()),
        );
        rsp.write(
            1,
            ATTR_RSP_1::OPTIONS.val(cfg.options.bits().into())
                + ATTR_RSP_1::PORTAL_ID.val(u64::from(cfg.portal_id as u32)),
        );
        if abi.generation() == Generation::V9 {
            object::write_version_v9(rsp, 2, crate::emulator::object_version(abi));
        }
    }

    pub(crate) fn obj_count(rsp: &mut McCommand, count: u32) {
        rsp.write(0, GET_OBJ_COUNT_RSP_0::OBJ_COUNT.val(count.into()));
    }

    pub(crate) fn obj_index(cmd: &McCommand) -> u32 {
        cmd.param::<GET_OBJ_CMD_0::Register>(0)
            .read(GET_OBJ_CMD_0::OBJ_INDEX) as u32
    }

    pub(crate) fn obj(rsp: &mut McCommand, desc: &ObjDesc) {
        rsp.write(0, GET_OBJ_RSP_0::ID.val(desc.id.into()));
        rsp.write(
            1,
            GET_OBJ_RSP_1::VENDOR.val(desc.vendor.into())
                + GET_OBJ_RSP_1::IRQ_COUNT.val(desc.irq_count.into())
                + GET_OBJ_RSP_1::REGION_COUNT.val(desc.region_count.into())
                + GET_OBJ_RSP_1::STATE.val(desc.state.bits().into()),
        );
        rsp.write(
            2,
            GET_OBJ_RSP_2::VERSION_MAJOR.val(desc.version.major.into())
                + GET_OBJ_RSP_2::VERSION_MINOR.val(desc.version.minor.into())
                + GET_OBJ_RSP_2::FLAGS.val(desc.flags.into()),
        );
        rsp.write_str(3, &desc.ty);
        rsp.write_str(5, &desc.label);
    }

    /// Target container and request of an assign or unassign.
    pub(crate) fn res_req(cmd: &McCommand) -> Result<(u32, ResReq)> {
        let word0 = cmd.param::<RES_REQ_CMD_0::Register>(0);
        let word1 = cmd.param::<RES_REQ_CMD_1::Register>(1);
        Ok((
            word0.read(RES_REQ_CMD_0::CONTAINER_ID) as u32,
            ResReq {
                ty: cmd.read_str(2).parse()?,
                num: word1.read(RES_REQ_CMD_1::NUM) as u32,
                options: ResReqOptions::from_bits_retain(
                    word0.read(RES_REQ_CMD_0::OPTIONS) as u32
                ),
                id_base_align: word1.read(RES_REQ_CMD_1::ID_BASE_ALIGN) as u32 as i32,
            },
        ))
    }

    pub(crate) fn obj_label(cmd: &McCommand) -> Result<(ObjectName, String)> {
        let id = cmd
            .param::<SET_OBJ_LABEL_CMD_0::Register>(0)
            .read(SET_OBJ_LABEL_CMD_0::OBJ_ID) as u32;
        Ok((
            ObjectName::new(cmd.read_str(3).parse()?, id),
            cmd.read_str(1),
        ))
    }

    fn endpoint(cmd: &McCommand, index: usize, type_index: usize) -> Result<Endpoint> {
        let word = cmd.param::<ENDPOINT::Register>(index);
        Ok(Endpoint {
            object: ObjectName::new(
                cmd.read_str(type_index).parse()?,
                word.read(ENDPOINT::ID) as u32,
            ),
            interface: word.read(ENDPOINT::INTERFACE) as u16,
        })
    }

    pub(crate) fn connect(cmd: &McCommand) -> Result<(Endpoint, Endpoint)> {
        Ok((endpoint(cmd, 0, 2)?, endpoint(cmd, 1, 5)?))
    }

    /// The endpoint of a disconnect or get-connection.
    pub(crate) fn single_endpoint(cmd: &McCommand) -> Result<Endpoint> {
        endpoint(cmd, 0, 1)
    }

    pub(crate) fn connection(rsp: &mut McCommand, far: Option<(&Endpoint, LinkState)>) {
        match far {
            Some((ep, state)) => {
                write_endpoint(rsp, 3, ep);
                rsp.write_str(4, ep.object.ty.name());
                rsp.write(
                    6,
                    GET_CONNECTION_RSP_6::STATE.val(u64::from(state as u32)),
                );
            }
            None => rsp.write(
                6,
                GET_CONNECTION_RSP_6::STATE.val(u64::from(-1i32 as u32)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            emulator::Emulator,
            error::Error,
            mc::{McStatus, McVersion},
        },
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

    fn in_root<T>(
        io: &mut McIo<Emulator>,
        f: impl FnOnce(&mut McIo<Emulator>, Token) -> Result<T>,
    ) -> Result<T> {
        let root = get_container_id(io)?;
        object::with_open(io, ObjectName::new(ObjectType::Dprc, root), f)
    }

    #[test]
    fn create_container_layout() {
        let mut io = io(10, 0);
        let cfg = DprcCfg {
            options: DprcOptions::SPAWN_ALLOWED | DprcOptions::OBJ_CREATE_ALLOWED,
            label: "guest".into(),
            ..Default::default()
        };
        let (child, offset) = in_root(&mut io, |io, t| create_container(io, t, &cfg)).unwrap();

        let cmd = io.portal().find(0x151).unwrap();
        assert_eq!(cmd.params[0], 0x0000_ffff_0000_0005);
        assert_eq!(cmd.params[1], 0xffff_ffff_0000_0000);
        assert_eq!(cmd.read_str(2), "guest");
        assert_ne!(offset, 0);

        let attr = object::with_open(&mut io, ObjectName::new(ObjectType::Dprc, child), |io, t| {
            get_attributes(io, t)
        })
        .unwrap();
        assert_eq!(attr.container_id, child);
        assert_eq!(attr.options, cfg.options);
        assert_eq!(attr.version, None);
    }

    #[test]
    fn long_labels_are_refused() {
        let mut io = io(10, 1);
        let cfg = DprcCfg {
            label: "a-label-of-sixteen".into(),
            ..Default::default()
        };
        assert!(matches!(
            in_root(&mut io, |io, t| create_container(io, t, &cfg)),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn objects_are_listed_with_labels() {
        let mut io = io(10, 1);
        let id = in_root(&mut io, |io, t| crate::dpbp::create(io, t)).unwrap();
        let name = ObjectName::new(ObjectType::Dpbp, id);
        in_root(&mut io, |io, t| set_obj_label(io, t, name, "pool")).unwrap();

        let objects = in_root(&mut io, |io, t| get_objects(io, t)).unwrap();
        let desc = objects
            .iter()
            .find(|desc| desc.name() == Some(name))
            .unwrap();
        assert_eq!(desc.label, "pool");
        assert!(desc.state.contains(ObjState::PLUGGED));
        assert!(!desc.state.contains(ObjState::OPEN));
    }

    #[test]
    fn assign_moves_an_object_to_a_child() {
        let mut io = io(9, 3);
        let root = get_container_id(&mut io).unwrap();
        let id = crate::dpbp::create(&mut io, Token::NONE).unwrap();
        let name = ObjectName::new(ObjectType::Dpbp, id);
        let (child, _) = in_root(&mut io, |io, t| {
            create_container(io, t, &DprcCfg::default())
        })
        .unwrap();

        in_root(&mut io, |io, t| {
            assign(io, t, child, &ResReq::object(name, true))
        })
        .unwrap();
        assert_eq!(io.portal().parent_of(name), Some(child));

        let cmd = io.portal().find(0x157).unwrap();
        assert_eq!(cmd.params[0], (0x5u64 << 32) | u64::from(child));
        assert_eq!(cmd.params[1], (u64::from(id) << 32) | 1);
        assert_eq!(cmd.read_str(2), "dpbp");

        in_root(&mut io, |io, t| {
            unassign(io, t, child, &ResReq::object(name, false))
        })
        .unwrap();
        assert_eq!(io.portal().parent_of(name), Some(root));
    }

    #[test]
    fn destroying_a_populated_container_is_refused() {
        let mut io = io(10, 0);
        let (child, _) = in_root(&mut io, |io, t| {
            create_container(
                io,
                t,
                &DprcCfg {
                    options: DprcOptions::OBJ_CREATE_ALLOWED,
                    ..Default::default()
                },
            )
        })
        .unwrap();
        object::with_open(&mut io, ObjectName::new(ObjectType::Dprc, child), |io, t| {
            crate::dpbp::create(io, t)
        })
        .unwrap();

        let err = in_root(&mut io, |io, t| destroy_container(io, t, child)).unwrap_err();
        assert_eq!(err.mc_status(), Some(McStatus::InvalidState));
    }

    #[test]
    fn links_are_reported_from_both_ends() {
        let mut io = io(10, 1);
        let sw = in_root(&mut io, |io, t| {
            crate::dpsw::create(io, t, &crate::dpsw::DpswCfg::default())
        })
        .unwrap();
        let ni = in_root(&mut io, |io, t| {
            crate::dpni::create(io, t, &crate::dpni::DpniCfg::default_for(crate::mc::Abi::V10_1))
        })
        .unwrap();
        let port: Endpoint = format!("dpsw.{sw}.1").parse().unwrap();
        let nic: Endpoint = format!("dpni.{ni}").parse().unwrap();

        in_root(&mut io, |io, t| {
            connect(io, t, &port, &nic, &ConnectionCfg::default())
        })
        .unwrap();
        let cmd = io.portal().find(0x167).unwrap();
        assert_eq!(cmd.params[0], (1u64 << 32) | u64::from(sw));
        assert_eq!(cmd.read_str(2), "dpsw");
        assert_eq!(cmd.read_str(5), "dpni");

        let far = in_root(&mut io, |io, t| get_connection(io, t, &nic)).unwrap();
        assert_eq!(far.map(|(ep, _)| ep), Some(port));

        in_root(&mut io, |io, t| disconnect(io, t, &port)).unwrap();
        let far = in_root(&mut io, |io, t| get_connection(io, t, &nic)).unwrap();
        assert_eq!(far, None);
    }
}
