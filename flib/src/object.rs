/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! DPAA2 object catalogue and the commands every object type answers.

use {
    crate::{
        error::{
            Error, InvalidArgumentSnafu, MalformedNameSnafu, Result, UnknownObjectTypeSnafu,
            UnsupportedOnAbiSnafu,
        },
        mc::{CmdId, Generation, McCommand, McIo, Portal, Token},
    },
    core::{fmt, str::FromStr},
    log::warn,
    tock_registers::register_bitfields,
};

pub(crate) const CMDID_CLOSE: CmdId = CmdId::new(0x800);
pub(crate) const CMDID_GET_ATTR: CmdId = CmdId::new(0x004);
pub(crate) const CMDID_IS_ENABLED: CmdId = CmdId::new(0x006);
/// 9.x destroys through the object's own token, with one id for every type.
pub(crate) const CMDID_DESTROY_V9: CmdId = CmdId::new(0x900);

register_bitfields! {
    u64,

    pub(crate) OPEN_CMD_0 [
        OBJECT_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) CREATE_RSP_0 [
        OBJECT_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) DESTROY_CMD_0 [
        OBJECT_ID OFFSET(0) NUMBITS(32) [],
    ],
    pub(crate) API_VERSION_RSP_0 [
        MAJOR OFFSET(0) NUMBITS(16) [],
        MINOR OFFSET(16) NUMBITS(16) [],
    ],
    pub(crate) IS_ENABLED_RSP_0 [
        ENABLED OFFSET(0) NUMBITS(1) [],
    ],
    // 9.x reports the object version inside the attributes.
    pub(crate) VERSION_V9 [
        MAJOR OFFSET(0) NUMBITS(16) [],
        MINOR OFFSET(16) NUMBITS(16) [],
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Dprc,
    Dpni,
    Dpio,
    Dpbp,
    Dpsw,
    Dpdmux,
    Dpci,
    Dpcon,
    Dpseci,
    Dpmac,
}

impl ObjectType {
    pub const ALL: [ObjectType; 10] = [
        ObjectType::Dprc,
        ObjectType::Dpni,
        ObjectType::Dpio,
        ObjectType::Dpbp,
        ObjectType::Dpsw,
        ObjectType::Dpdmux,
        ObjectType::Dpci,
        ObjectType::Dpcon,
        ObjectType::Dpseci,
        ObjectType::Dpmac,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ObjectType::Dprc => "dprc",
            ObjectType::Dpni => "dpni",
            ObjectType::Dpio => "dpio",
            ObjectType::Dpbp => "dpbp",
            ObjectType::Dpsw => "dpsw",
            ObjectType::Dpdmux => "dpdmux",
            ObjectType::Dpci => "dpci",
            ObjectType::Dpcon => "dpcon",
            ObjectType::Dpseci => "dpseci",
            ObjectType::Dpmac => "dpmac",
        }
    }

    /// Low nibble shared by the open, create, destroy and api-version ids of a type.
    pub(crate) const fn nibble(self) -> u16 {
        match self {
            ObjectType::Dpni => 0x1,
            ObjectType::Dpsw => 0x2,
            ObjectType::Dpio => 0x3,
            ObjectType::Dpbp => 0x4,
            ObjectType::Dprc => 0x5,
            ObjectType::Dpdmux => 0x6,
            ObjectType::Dpci => 0x7,
            ObjectType::Dpcon => 0x8,
            ObjectType::Dpseci => 0x9,
            ObjectType::Dpmac => 0xc,
        }
    }

    #[cfg(any(test, feature = "emulator"))]
    pub(crate) fn from_nibble(nibble: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.nibble() == nibble)
    }

    pub(crate) const fn open_cmd(self) -> CmdId {
        CmdId::new(0x800 | self.nibble())
    }

    pub(crate) const fn create_cmd(self) -> CmdId {
        CmdId::new(0x900 | self.nibble())
    }

    /// 10.x destroy, sent to the parent container.
    pub(crate) const fn destroy_cmd(self) -> CmdId {
        CmdId::new(0x980 | self.nibble())
    }

    pub(crate) const fn api_version_cmd(self) -> CmdId {
        CmdId::new(0xa00 | self.nibble())
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| UnknownObjectTypeSnafu { name: s }.build())
    }
}

/// `<type>.<id>`, the way restool names objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectName {
    pub ty: ObjectType,
    pub id: u32,
}

impl ObjectName {
    pub const fn new(ty: ObjectType, id: u32) -> Self {
        Self { ty, id }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.ty, self.id)
    }
}

impl FromStr for ObjectName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (ty, id) = s
            .split_once('.')
            .ok_or_else(|| MalformedNameSnafu { name: s }.build())?;
        let id = id
            .parse()
            .map_err(|_| MalformedNameSnafu { name: s }.build())?;
        Ok(Self { ty: ty.parse()?, id })
    }
}

/// One end of a link between two objects: `<type>.<id>[.<interface>]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub object: ObjectName,
    pub interface: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.object.ty {
            // Objects with a single interface are named without it.
            ObjectType::Dpni | ObjectType::Dpmac => write!(f, "{}", self.object),
            _ => write!(f, "{}.{}", self.object, self.interface),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.match_indices('.').nth(1) {
            Some((at, _)) => {
                let object = s[..at].parse()?;
                let interface = s[at + 1..]
                    .parse()
                    .map_err(|_| MalformedNameSnafu { name: s }.build())?;
                Ok(Self { object, interface })
            }
            None => Ok(Self {
                object: s.parse()?,
                interface: 0,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            InvalidArgumentSnafu {
                what: "MAC address",
                reason: format!("{s:?} is not six colon separated hex bytes"),
            }
            .build()
        };
        let mut mac = [0u8; 6];
        let mut parts = s.split(':');
        for byte in mac.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(mac))
    }
}

/// Object or command-set version, `major.minor`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

pub(crate) fn read_version_v9(rsp: &McCommand, index: usize) -> ApiVersion {
    let word = rsp.param::<VERSION_V9::Register>(index);
    ApiVersion {
        major: word.read(VERSION_V9::MAJOR) as u16,
        minor: word.read(VERSION_V9::MINOR) as u16,
    }
}

#[cfg(any(test, feature = "emulator"))]
pub(crate) fn write_version_v9(rsp: &mut McCommand, index: usize, version: ApiVersion) {
    rsp.write(
        index,
        VERSION_V9::MAJOR.val(version.major.into()) + VERSION_V9::MINOR.val(version.minor.into()),
    );
}

//--------------------------------------------------------------------------------------------------
// Commands common to all object types
//--------------------------------------------------------------------------------------------------

pub fn open<P: Portal>(io: &mut McIo<P>, ty: ObjectType, id: u32) -> Result<Token> {
    let mut cmd = io.command(ty.open_cmd(), Token::NONE);
    cmd.write(0, OPEN_CMD_0::OBJECT_ID.val(id.into()));
    let rsp = io.send_command(cmd)?;
    Ok(rsp.token(io.abi()))
}

pub fn close<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<()> {
    let cmd = io.command(CMDID_CLOSE, token);
    io.send_command(cmd).map(|_| ())
}

/// Keeps the first failure of a sequence that must end by closing a token.
pub(crate) fn keep_first_error<T>(result: Result<T>, closed: Result<()>) -> Result<T> {
    match (result, closed) {
        (Ok(value), closed) => closed.map(|()| value),
        (Err(error), Err(close_error)) => {
            warn!("closing after a failed command failed too: {}", close_error);
            Err(error)
        }
        (Err(error), Ok(())) => Err(error),
    }
}

/// Opens `ty.id`, runs `f` with its token and closes it again on every path.
pub fn with_open<P, T, F>(io: &mut McIo<P>, name: ObjectName, f: F) -> Result<T>
where
    P: Portal,
    F: FnOnce(&mut McIo<P>, Token) -> Result<T>,
{
    let token = open(io, name.ty, name.id)?;
    let result = f(io, token);
    let closed = close(io, token);
    keep_first_error(result, closed)
}

/// Creates an object and returns its id.
///
/// 9.x creates in the caller's own container and hands back an open token, so the id is
/// looked up through `id_of` and the token closed. 10.x creates inside the container
/// `container` is open on and answers with the id.
pub(crate) fn create<P, F, G>(
    io: &mut McIo<P>,
    ty: ObjectType,
    container: Token,
    cmd_version: u8,
    fill: F,
    id_of: G,
) -> Result<u32>
where
    P: Portal,
    F: FnOnce(&mut McCommand),
    G: FnOnce(&mut McIo<P>, Token) -> Result<u32>,
{
    let abi = io.abi();
    let target = match abi.generation() {
        Generation::V9 => Token::NONE,
        Generation::V10 => container,
    };
    let mut cmd = io.command(ty.create_cmd().with_version(cmd_version), target);
    fill(&mut cmd);
    let rsp = io.send_command(cmd)?;

    match abi.generation() {
        Generation::V9 => {
            let token = rsp.token(abi);
            let id = id_of(io, token);
            let closed = close(io, token);
            keep_first_error(id, closed)
        }
        Generation::V10 => Ok(rsp.param::<CREATE_RSP_0::Register>(0).read(CREATE_RSP_0::OBJECT_ID)
            as u32),
    }
}

/// Destroys object `name`, a child of the container `container` is open on (10.x only).
pub fn destroy<P: Portal>(io: &mut McIo<P>, container: Token, name: ObjectName) -> Result<()> {
    match io.abi().generation() {
        Generation::V9 => {
            let token = open(io, name.ty, name.id)?;
            let cmd = io.command(CMDID_DESTROY_V9, token);
            // A destroyed object takes its token with it, close only on failure.
            match io.send_command(cmd) {
                Ok(_) => Ok(()),
                Err(error) => {
                    let closed = close(io, token);
                    keep_first_error(Err(error), closed)
                }
            }
        }
        Generation::V10 => {
            let mut cmd = io.command(name.ty.destroy_cmd(), container);
            cmd.write(0, DESTROY_CMD_0::OBJECT_ID.val(name.id.into()));
            io.send_command(cmd).map(|_| ())
        }
    }
}

/// Version of the command set for `ty`, 10.x only.
pub fn get_api_version<P: Portal>(io: &mut McIo<P>, ty: ObjectType) -> Result<ApiVersion> {
    if io.abi().generation() == Generation::V9 {
        return UnsupportedOnAbiSnafu {
            what: format!("{ty} api version query"),
            abi: io.abi(),
        }
        .fail();
    }
    let cmd = io.command(ty.api_version_cmd(), Token::NONE);
    let rsp = io.send_command(cmd)?;
    let word = rsp.param::<API_VERSION_RSP_0::Register>(0);
    Ok(ApiVersion {
        major: word.read(API_VERSION_RSP_0::MAJOR) as u16,
        minor: word.read(API_VERSION_RSP_0::MINOR) as u16,
    })
}

/// Object version: 9.x attributes carry it, 10.x asks separately.
pub fn resolve_version<P: Portal>(
    io: &mut McIo<P>,
    ty: ObjectType,
    from_attributes: Option<ApiVersion>,
) -> Result<ApiVersion> {
    match from_attributes {
        Some(version) => Ok(version),
        None => get_api_version(io, ty),
    }
}

pub fn is_enabled<P: Portal>(io: &mut McIo<P>, token: Token) -> Result<bool> {
    let cmd = io.command(CMDID_IS_ENABLED, token);
    let rsp = io.send_command(cmd)?;
    Ok(rsp
        .param::<IS_ENABLED_RSP_0::Register>(0)
        .is_set(IS_ENABLED_RSP_0::ENABLED))
}

/// Sends get-attributes and returns the raw response for the caller's field table.
pub(crate) fn get_attributes<P: Portal>(
    io: &mut McIo<P>,
    token: Token,
    cmd_version: u8,
) -> Result<McCommand> {
    let cmd = io.command(CMDID_GET_ATTR.with_version(cmd_version), token);
    io.send_command(cmd)
}

/// Rejects a value outside `range` for the named field.
pub(crate) fn check_range<T>(
    what: &'static str,
    value: T,
    range: core::ops::RangeInclusive<T>,
) -> Result<()>
where
    T: PartialOrd + fmt::Display,
{
    if !range.contains(&value) {
        return InvalidArgumentSnafu {
            what,
            reason: format!(
                "{} is out of range {}..={}",
                value,
                range.start(),
                range.end()
            ),
        }
        .fail();
    }
    Ok(())
}
