/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Software model of the MC command portal.
//!
//! Keeps an object tree the way the firmware would and answers commands from it,
//! encoded for the ABI of the firmware version it pretends to run. Every command
//! received is logged as sent so tests can inspect the exact wire layout.

use {
    crate::{
        dpbp, dpci, dpcon, dpdmux, dpio, dpmac, dpni,
        dprc::{self, DprcCfg, DprcOptions, ObjDesc, ObjState, ResReqOptions},
        dpseci, dpsw,
        error::Result,
        mc::{Abi, Generation, McCommand, McStatus, McVersion, Portal, Token, HEADER_V10},
        object::{self, ApiVersion, Endpoint, MacAddr, ObjectName, ObjectType},
    },
    log::{debug, trace},
    std::collections::BTreeMap,
    tock_registers::LocalRegisterCopy,
};

const CMDID_GET_VERSION: u16 = 0x831;
const CMDID_GET_CONT_ID: u16 = 0x830;

/// Object version every emulated object reports.
pub fn object_version(abi: Abi) -> ApiVersion {
    match abi {
        Abi::V9 => ApiVersion { major: 3, minor: 1 },
        Abi::V10_0 => ApiVersion { major: 4, minor: 0 },
        Abi::V10_1 => ApiVersion { major: 5, minor: 2 },
    }
}

/// One emulated object.
#[derive(Clone, Debug, Default)]
pub struct Node {
    /// Container holding the object, `None` for the root container only.
    pub parent: Option<u32>,
    /// The create command that made it, attributes are derived from it.
    pub create: McCommand,
    pub label: String,
    pub plugged: bool,
    pub mac: MacAddr,
    pub frame_lengths: BTreeMap<u16, u16>,
    /// Containers only.
    pub container: Option<DprcCfg>,
}

type Answer = core::result::Result<(), McStatus>;

pub struct Emulator {
    version: McVersion,
    abi: Abi,
    root: u32,
    objects: BTreeMap<ObjectName, Node>,
    sessions: BTreeMap<u16, ObjectName>,
    next_token: u16,
    links: Vec<(Endpoint, Endpoint)>,
    log: Vec<McCommand>,
    fail_next: Option<(u16, McStatus)>,
}

impl Emulator {
    /// A firmware of `version` with only the root container in place. Versions no ABI
    /// exists for still answer the version probe, and nothing else.
    pub fn new(version: McVersion) -> Self {
        let abi = Abi::from_version(&version).unwrap_or(Abi::V9);
        let root = 1;
        let mut objects = BTreeMap::new();
        objects.insert(
            ObjectName::new(ObjectType::Dprc, root),
            Node {
                plugged: true,
                container: Some(DprcCfg {
                    icid: 0,
                    portal_id: 0,
                    options: DprcOptions::all() - DprcOptions::AIOP,
                    label: String::new(),
                }),
                ..Default::default()
            },
        );
        Self {
            version,
            abi,
            root,
            objects,
            sessions: BTreeMap::new(),
            next_token: 1,
            links: Vec::new(),
            log: Vec::new(),
            fail_next: None,
        }
    }

    /// Puts an object straight into container `parent`, as if the firmware booted with it.
    pub fn add_object(&mut self, name: ObjectName, parent: u32) -> &mut Self {
        let container = (name.ty == ObjectType::Dprc).then(DprcCfg::default);
        self.objects.insert(
            name,
            Node {
                parent: Some(parent),
                plugged: true,
                container,
                ..Default::default()
            },
        );
        self
    }

    /// Answers the next command `cmd_id` with `status` instead of executing it.
    pub fn fail_next(&mut self, cmd_id: u16, status: McStatus) -> &mut Self {
        self.fail_next = Some((cmd_id, status));
        self
    }

    pub fn abi(&self) -> Abi {
        self.abi
    }

    pub fn root_container(&self) -> u32 {
        self.root
    }

    pub fn object(&self, name: ObjectName) -> Option<&Node> {
        self.objects.get(&name)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectName, &Node)> {
        self.objects.iter()
    }

    pub fn parent_of(&self, name: ObjectName) -> Option<u32> {
        self.objects.get(&name).and_then(|node| node.parent)
    }

    pub fn children(&self, container: u32) -> Vec<ObjectName> {
        self.objects
            .iter()
            .filter(|(_, node)| node.parent == Some(container))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn links(&self) -> &[(Endpoint, Endpoint)] {
        &self.links
    }

    pub fn max_frame_length(&self, name: ObjectName, interface: u16) -> Option<u16> {
        self.objects
            .get(&name)
            .and_then(|node| node.frame_lengths.get(&interface).copied())
    }

    /// Every command received so far, as sent.
    pub fn log(&self) -> &[McCommand] {
        &self.log
    }

    /// The last command `cmd_id` received.
    pub fn find(&self, cmd_id: u16) -> Option<&McCommand> {
        self.log
            .iter()
            .rev()
            .find(|cmd| cmd.cmd_id(self.abi).id == cmd_id)
    }

    /// Tokens handed out and not closed yet.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, token: Token) -> core::result::Result<ObjectName, McStatus> {
        self.sessions
            .get(&token.0)
            .copied()
            .ok_or(McStatus::AuthError)
    }

    fn container_session(&self, token: Token) -> core::result::Result<u32, McStatus> {
        let name = self.session(token)?;
        match name.ty {
            ObjectType::Dprc => Ok(name.id),
            _ => Err(McStatus::InvalidState),
        }
    }

    fn container_options(&self, id: u32) -> DprcOptions {
        self.objects
            .get(&ObjectName::new(ObjectType::Dprc, id))
            .and_then(|node| node.container.as_ref())
            .map_or(DprcOptions::empty(), |cfg| cfg.options)
    }

    fn node_mut(&mut self, name: ObjectName) -> core::result::Result<&mut Node, McStatus> {
        self.objects.get_mut(&name).ok_or(McStatus::ConfigError)
    }

    fn is_open(&self, name: ObjectName) -> bool {
        self.sessions.values().any(|open| *open == name)
    }

    fn new_session(&mut self, name: ObjectName) -> Token {
        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1).max(1);
        self.sessions.insert(token, name);
        Token(token)
    }

    fn free_id(&self, ty: ObjectType) -> u32 {
        let first = match ty {
            ObjectType::Dprc => self.root + 1,
            _ => 0,
        };
        (first..)
            .find(|id| !self.objects.contains_key(&ObjectName::new(ty, *id)))
            .unwrap_or(first)
    }

    fn unlink(&mut self, name: ObjectName) {
        self.links
            .retain(|(a, b)| a.object != name && b.object != name);
    }

    fn link_of(&self, ep: &Endpoint) -> Option<Endpoint> {
        self.links.iter().find_map(|(a, b)| {
            if a == ep {
                Some(*b)
            } else if b == ep {
                Some(*a)
            } else {
                None
            }
        })
    }

    /// Interfaces a link can attach to on `name`.
    fn interfaces(&self, name: ObjectName) -> core::result::Result<u16, McStatus> {
        let node = self.objects.get(&name).ok_or(McStatus::ConfigError)?;
        Ok(match name.ty {
            ObjectType::Dpsw => dpsw::num_ifs(&node.create),
            ObjectType::Dpdmux => u16::MAX,
            _ => 1,
        })
    }

    fn attributes(&self, name: ObjectName, rsp: &mut McCommand) -> Answer {
        let node = self.objects.get(&name).ok_or(McStatus::ConfigError)?;
        let (abi, id, create) = (self.abi, name.id, &node.create);
        match name.ty {
            ObjectType::Dprc => {
                let cfg = node.container.clone().unwrap_or_default();
                dprc::wire::attributes(abi, rsp, id, &cfg);
            }
            ObjectType::Dpni => dpni::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpio => dpio::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpbp => dpbp::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpsw => dpsw::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpdmux => dpdmux::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpci => dpci::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpcon => dpcon::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpseci => dpseci::emulate_attributes(abi, id, create, rsp),
            ObjectType::Dpmac => dpmac::emulate_attributes(abi, id, create, rsp),
        }
        Ok(())
    }

    fn create(&mut self, ty: ObjectType, cmd: &McCommand, rsp: &mut McCommand) -> Answer {
        let token = cmd.token(self.abi);
        let parent = match self.abi.generation() {
            Generation::V9 if token == Token::NONE => self.root,
            Generation::V9 => return Err(McStatus::AuthError),
            Generation::V10 => self.container_session(token)?,
        };
        if !self
            .container_options(parent)
            .contains(DprcOptions::OBJ_CREATE_ALLOWED)
        {
            return Err(McStatus::NoPrivilege);
        }
        if ty == ObjectType::Dprc {
            return Err(McStatus::UnsupportedOp);
        }
        let id = match ty {
            ObjectType::Dpmac => dpmac::requested_id(cmd),
            _ => self.free_id(ty),
        };
        let name = ObjectName::new(ty, id);
        if self.objects.contains_key(&name) {
            return Err(McStatus::Busy);
        }
        self.objects.insert(
            name,
            Node {
                parent: Some(parent),
                create: *cmd,
                plugged: true,
                mac: dpni::initial_mac(self.abi, cmd),
                ..Default::default()
            },
        );
        debug!("emulator: created {} in dprc.{}", name, parent);

        match self.abi.generation() {
            Generation::V9 => {
                let token = self.new_session(name);
                rsp.set_token(self.abi, token);
            }
            Generation::V10 => rsp.write(0, object::CREATE_RSP_0::OBJECT_ID.val(id.into())),
        }
        Ok(())
    }

    fn remove(&mut self, name: ObjectName) {
        self.objects.remove(&name);
        self.sessions.retain(|_, open| *open != name);
        self.unlink(name);
        debug!("emulator: destroyed {}", name);
    }

    fn destroy_v10(&mut self, ty: ObjectType, cmd: &McCommand) -> Answer {
        let container = self.container_session(cmd.token(self.abi))?;
        let id = cmd
            .param::<object::DESTROY_CMD_0::Register>(0)
            .read(object::DESTROY_CMD_0::OBJECT_ID) as u32;
        let name = ObjectName::new(ty, id);
        if ty == ObjectType::Dprc || self.parent_of(name) != Some(container) {
            return Err(McStatus::ConfigError);
        }
        if self.is_open(name) {
            return Err(McStatus::Busy);
        }
        self.remove(name);
        Ok(())
    }

    fn destroy_v9(&mut self, token: Token) -> Answer {
        let name = self.session(token)?;
        if name.ty == ObjectType::Dprc {
            return Err(McStatus::UnsupportedOp);
        }
        self.remove(name);
        Ok(())
    }

    fn create_container(&mut self, parent: u32, cmd: &McCommand, rsp: &mut McCommand) -> Answer {
        if !self
            .container_options(parent)
            .contains(DprcOptions::SPAWN_ALLOWED)
        {
            return Err(McStatus::NoPrivilege);
        }
        let mut cfg = dprc::wire::container_cfg(cmd);
        let id = self.free_id(ObjectType::Dprc);
        if cfg.icid == dprc::ICID_POOL {
            cfg.icid = 0x100 + id as u16;
        }
        if cfg.portal_id == dprc::PORTAL_ID_ANY {
            cfg.portal_id = id as i32;
        }
        let portal_offset = 0x0800_0000 + u64::from(cfg.portal_id as u32) * 0x1_0000;
        self.objects.insert(
            ObjectName::new(ObjectType::Dprc, id),
            Node {
                parent: Some(parent),
                create: *cmd,
                label: cfg.label.clone(),
                plugged: true,
                container: Some(cfg),
                ..Default::default()
            },
        );
        dprc::wire::created_container(rsp, id, portal_offset);
        Ok(())
    }

    fn destroy_container(&mut self, parent: u32, cmd: &McCommand) -> Answer {
        let child = ObjectName::new(ObjectType::Dprc, dprc::wire::child_id(cmd));
        if self.parent_of(child) != Some(parent) {
            return Err(McStatus::ConfigError);
        }
        if !self.children(child.id).is_empty() || self.is_open(child) {
            return Err(McStatus::InvalidState);
        }
        self.remove(child);
        Ok(())
    }

    /// Names a resource request selects among the children of `from`.
    fn select(&self, from: u32, req: &dprc::ResReq) -> core::result::Result<Vec<ObjectName>, McStatus> {
        if req.options.contains(ResReqOptions::EXPLICIT) {
            let base = req.id_base_align as u32;
            let names: Vec<ObjectName> = (base..base.saturating_add(req.num))
                .map(|id| ObjectName::new(req.ty, id))
                .collect();
            if names.iter().any(|name| self.parent_of(*name) != Some(from)) {
                return Err(McStatus::ConfigError);
            }
            Ok(names)
        } else {
            let names: Vec<ObjectName> = self
                .children(from)
                .into_iter()
                .filter(|name| name.ty == req.ty)
                .take(req.num as usize)
                .collect();
            if names.len() < req.num as usize {
                return Err(McStatus::NoResource);
            }
            Ok(names)
        }
    }

    fn assign(&mut self, own: u32, cmd: &McCommand) -> Answer {
        let (target, req) = dprc::wire::res_req(cmd).map_err(|_| McStatus::ConfigError)?;
        let plugged = req.options.contains(ResReqOptions::PLUGGED);
        if target != own
            && self.parent_of(ObjectName::new(ObjectType::Dprc, target)) != Some(own)
        {
            return Err(McStatus::ConfigError);
        }
        for name in self.select(own, &req)? {
            let node = self.node_mut(name)?;
            node.parent = Some(target);
            node.plugged = plugged;
        }
        Ok(())
    }

    fn unassign(&mut self, own: u32, cmd: &McCommand) -> Answer {
        let (child, req) = dprc::wire::res_req(cmd).map_err(|_| McStatus::ConfigError)?;
        if self.parent_of(ObjectName::new(ObjectType::Dprc, child)) != Some(own) {
            return Err(McStatus::ConfigError);
        }
        let plugged = req.options.contains(ResReqOptions::PLUGGED);
        for name in self.select(child, &req)? {
            let node = self.node_mut(name)?;
            node.parent = Some(own);
            node.plugged = plugged;
        }
        Ok(())
    }

    fn get_obj(&self, container: u32, cmd: &McCommand, rsp: &mut McCommand) -> Answer {
        let index = dprc::wire::obj_index(cmd) as usize;
        let name = *self
            .children(container)
            .get(index)
            .ok_or(McStatus::ConfigError)?;
        let node = self.objects.get(&name).ok_or(McStatus::ConfigError)?;
        let mut state = ObjState::empty();
        state.set(ObjState::PLUGGED, node.plugged);
        state.set(ObjState::OPEN, self.is_open(name));
        let (irq_count, region_count) = match name.ty {
            ObjectType::Dprc | ObjectType::Dpio => (1, 2),
            ObjectType::Dpni | ObjectType::Dpsw | ObjectType::Dpdmux => (1, 0),
            _ => (0, 0),
        };
        dprc::wire::obj(
            rsp,
            &ObjDesc {
                ty: name.ty.name().into(),
                id: name.id,
                vendor: 0x1957,
                irq_count,
                region_count,
                state,
                version: object_version(self.abi),
                flags: 0,
                label: node.label.clone(),
            },
        );
        Ok(())
    }

    fn connect(&mut self, cmd: &McCommand) -> Answer {
        let (a, b) = dprc::wire::connect(cmd).map_err(|_| McStatus::ConfigError)?;
        for ep in [&a, &b] {
            if ep.interface >= self.interfaces(ep.object)? {
                return Err(McStatus::ConfigError);
            }
            if self.link_of(ep).is_some() {
                return Err(McStatus::InvalidState);
            }
        }
        if a == b {
            return Err(McStatus::ConfigError);
        }
        self.links.push((a, b));
        Ok(())
    }

    fn disconnect(&mut self, cmd: &McCommand) -> Answer {
        let ep = dprc::wire::single_endpoint(cmd).map_err(|_| McStatus::ConfigError)?;
        let before = self.links.len();
        self.links.retain(|(a, b)| *a != ep && *b != ep);
        if self.links.len() == before {
            return Err(McStatus::ConfigError);
        }
        Ok(())
    }

    fn get_connection(&self, cmd: &McCommand, rsp: &mut McCommand) -> Answer {
        let ep = dprc::wire::single_endpoint(cmd).map_err(|_| McStatus::ConfigError)?;
        if !self.objects.contains_key(&ep.object) {
            return Err(McStatus::ConfigError);
        }
        let far = self.link_of(&ep);
        dprc::wire::connection(rsp, far.as_ref().map(|far| (far, 1)));
        Ok(())
    }

    fn container_command(&mut self, id: u16, cmd: &McCommand, rsp: &mut McCommand) -> Answer {
        let own = self.container_session(cmd.token(self.abi))?;
        match id {
            0x151 => self.create_container(own, cmd, rsp),
            0x152 => self.destroy_container(own, cmd),
            0x157 => self.assign(own, cmd),
            0x158 => self.unassign(own, cmd),
            0x159 => {
                dprc::wire::obj_count(rsp, self.children(own).len() as u32);
                Ok(())
            }
            0x15a => self.get_obj(own, cmd, rsp),
            0x161 => {
                let (name, label) =
                    dprc::wire::obj_label(cmd).map_err(|_| McStatus::ConfigError)?;
                if self.parent_of(name) != Some(own) {
                    return Err(McStatus::ConfigError);
                }
                self.node_mut(name)?.label = label;
                Ok(())
            }
            0x167 => self.connect(cmd),
            0x168 => self.disconnect(cmd),
            0x16c => self.get_connection(cmd, rsp),
            _ => Err(McStatus::UnsupportedOp),
        }
    }

    fn execute(&mut self, cmd: &McCommand, rsp: &mut McCommand) -> Answer {
        // The command id sits at the same bits in both generations.
        let header = LocalRegisterCopy::<u64, HEADER_V10::Register>::new(cmd.header);
        let id = header.read(HEADER_V10::CMD_ID) as u16;
        if id == CMDID_GET_VERSION {
            rsp.params[0] = (u64::from(self.version.major) << 32) | u64::from(self.version.revision);
            rsp.params[1] = u64::from(self.version.minor);
            return Ok(());
        }

        let cmd_id = cmd.cmd_id(self.abi);
        if cmd_id.version > 1 && self.abi != Abi::V10_1 {
            return Err(McStatus::UnsupportedOp);
        }
        // 10.x firmware knows no unversioned command.
        if self.abi.generation() == Generation::V10 && cmd_id.version == 0 {
            return Err(McStatus::UnsupportedOp);
        }
        let token = cmd.token(self.abi);
        let ty = ObjectType::from_nibble(id & 0xf);

        match (id & 0xff0, ty) {
            (0x830, _) if id == CMDID_GET_CONT_ID => {
                dprc::wire::container_id(rsp, self.root);
                Ok(())
            }
            (0x800, None) if id == object::CMDID_CLOSE.id => self
                .sessions
                .remove(&token.0)
                .map(|_| ())
                .ok_or(McStatus::AuthError),
            (0x800, Some(ty)) => {
                let object_id = cmd
                    .param::<object::OPEN_CMD_0::Register>(0)
                    .read(object::OPEN_CMD_0::OBJECT_ID) as u32;
                let name = ObjectName::new(ty, object_id);
                if !self.objects.contains_key(&name) {
                    return Err(McStatus::ConfigError);
                }
                let token = self.new_session(name);
                rsp.set_token(self.abi, token);
                Ok(())
            }
            (0x900, None) if id == object::CMDID_DESTROY_V9.id => match self.abi.generation() {
                Generation::V9 => self.destroy_v9(token),
                Generation::V10 => Err(McStatus::UnsupportedOp),
            },
            (0x900, Some(ty)) => self.create(ty, cmd, rsp),
            (0x980, Some(ty)) if self.abi.generation() == Generation::V10 => {
                self.destroy_v10(ty, cmd)
            }
            (0xa00, Some(_)) if self.abi.generation() == Generation::V10 => {
                let version = object_version(self.abi);
                rsp.write(
                    0,
                    object::API_VERSION_RSP_0::MAJOR.val(version.major.into())
                        + object::API_VERSION_RSP_0::MINOR.val(version.minor.into()),
                );
                Ok(())
            }
            _ if id == object::CMDID_GET_ATTR.id => {
                let name = self.session(token)?;
                self.attributes(name, rsp)
            }
            _ if id == object::CMDID_IS_ENABLED.id => {
                self.session(token)?;
                Ok(())
            }
            _ if id == dpni::CMDID_SET_PRIMARY_MAC_ADDR.id
                || id == dpni::CMDID_GET_PRIMARY_MAC_ADDR.id =>
            {
                let name = self.session(token)?;
                if name.ty != ObjectType::Dpni {
                    return Err(McStatus::UnsupportedOp);
                }
                let node = self.node_mut(name)?;
                if id == dpni::CMDID_SET_PRIMARY_MAC_ADDR.id {
                    node.mac = cmd.read_mac(0);
                } else {
                    let mac = node.mac;
                    rsp.write_mac(0, &mac);
                }
                Ok(())
            }
            _ if id == dpsw::CMDID_IF_SET_MAX_FRAME_LENGTH.id => {
                let name = self.session(token)?;
                if name.ty != ObjectType::Dpsw {
                    return Err(McStatus::UnsupportedOp);
                }
                let (interface, length) = dpsw::decode_set_max_frame_length(cmd);
                if interface >= self.interfaces(name)? {
                    return Err(McStatus::ConfigError);
                }
                self.node_mut(name)?.frame_lengths.insert(interface, length);
                Ok(())
            }
            (0x150 | 0x160, _) => self.container_command(id, cmd, rsp),
            _ => Err(McStatus::UnsupportedOp),
        }
    }
}

impl Portal for Emulator {
    fn send(&mut self, cmd: &mut McCommand) -> Result<()> {
        self.log.push(*cmd);
        let id = LocalRegisterCopy::<u64, HEADER_V10::Register>::new(cmd.header)
            .read(HEADER_V10::CMD_ID) as u16;

        let mut rsp = McCommand {
            header: cmd.header,
            ..Default::default()
        };
        let status = match self.fail_next {
            Some((fail_id, status)) if fail_id == id => {
                self.fail_next = None;
                status
            }
            _ => match self.execute(cmd, &mut rsp) {
                Ok(()) => McStatus::Ok,
                Err(status) => status,
            },
        };
        trace!("emulator: {:#05x} answered {:?}", id, status);
        if status != McStatus::Ok {
            rsp.params = cmd.params;
        }
        rsp.set_status(status);
        *cmd = rsp;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{error::Error, mc::McIo},
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
    fn probe_picks_the_abi_of_the_emulated_version() {
        let (io, version) = McIo::probe(Emulator::new(McVersion {
            major: 10,
            minor: 1,
            revision: 9,
        }))
        .unwrap();
        assert_eq!(io.abi(), Abi::V10_1);
        assert_eq!(version.to_string(), "10.1.9");
    }

    #[test]
    fn firmware_older_than_9_fails_the_probe() {
        let result = McIo::probe(Emulator::new(McVersion {
            major: 8,
            minor: 1,
            revision: 0,
        }));
        assert!(matches!(result, Err(Error::UnsupportedFirmware { .. })));
    }

    #[test]
    fn unknown_tokens_are_refused() {
        let mut io = io(10, 0);
        let err = object::close(&mut io, Token(77)).unwrap_err();
        assert_eq!(err.mc_status(), Some(McStatus::AuthError));
    }

    #[test]
    fn opening_a_missing_object_fails() {
        let mut io = io(9, 0);
        let err = object::open(&mut io, ObjectType::Dpni, 12).unwrap_err();
        assert!(matches!(
            err,
            Error::Firmware {
                status: McStatus::ConfigError,
                ..
            }
        ));
    }

    #[test]
    fn extended_commands_are_refused_before_10_1() {
        let mut io = io(10, 0);
        let root = io.portal().root_container();
        let token = object::open(&mut io, ObjectType::Dprc, root).unwrap();
        let err = object::get_attributes(&mut io, token, 2).unwrap_err();
        assert_eq!(err.mc_status(), Some(McStatus::UnsupportedOp));
        object::close(&mut io, token).unwrap();
    }

    #[test]
    fn injected_failure_hits_once() {
        let mut io = io(10, 1);
        io.portal_mut().fail_next(0x830, McStatus::Busy);
        let err = dprc::get_container_id(&mut io).unwrap_err();
        assert_eq!(err.errno(), libc::EBUSY);
        assert_eq!(dprc::get_container_id(&mut io).unwrap(), 1);
    }

    #[test]
    fn v9_destroy_goes_through_the_object_token() {
        let mut io = io(9, 0);
        let id = dpbp::create(&mut io, Token::NONE).unwrap();
        let name = ObjectName::new(ObjectType::Dpbp, id);
        object::destroy(&mut io, Token::NONE, name).unwrap();
        assert!(io.portal().object(name).is_none());
        assert_eq!(io.portal().open_sessions(), 0);
    }

    #[test]
    fn v10_destroy_needs_the_parent_container() {
        let mut io = io(10, 0);
        let root = ObjectName::new(ObjectType::Dprc, io.portal().root_container());
        let id = object::with_open(&mut io, root, |io, t| dpbp::create(io, t)).unwrap();
        let name = ObjectName::new(ObjectType::Dpbp, id);

        object::with_open(&mut io, root, |io, t| object::destroy(io, t, name)).unwrap();
        assert!(io.portal().object(name).is_none());

        let again = object::with_open(&mut io, root, |io, t| object::destroy(io, t, name));
        assert_eq!(again.unwrap_err().mc_status(), Some(McStatus::ConfigError));
    }
}
