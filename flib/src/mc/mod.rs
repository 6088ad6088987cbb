/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Management Complex command portal interface.
//!
//! Every request to the MC firmware is a fixed 64-byte [`McCommand`]: one header word
//! followed by seven parameter words. The firmware overwrites the same buffer with its
//! response, status included in the header.
//!
//! Parameter payloads are described by per-command field tables (`register_bitfields!`
//! blocks in each object module), one table per parameter word.

use {
    bit_field::BitField,
    bitflags::bitflags,
    core::fmt,
    static_assertions::const_assert_eq,
    tock_registers::{fields::FieldValue, register_bitfields, LocalRegisterCopy, RegisterLongName},
};

mod portal;
mod status;
mod version;

pub use {
    portal::{DevicePortal, McIo, Portal},
    status::McStatus,
    version::{get_version, Abi, Generation, McVersion},
};

/// Number of parameter words following the header.
pub const MC_CMD_NUM_PARAMS: usize = 7;

register_bitfields! {
    u64,

    /// MC 9.x command header.
    pub(crate) HEADER_V9 [
        FLAGS OFFSET(0) NUMBITS(32) [],
        STATUS OFFSET(16) NUMBITS(8) [],
        TOKEN OFFSET(38) NUMBITS(10) [],
        CMD_ID OFFSET(52) NUMBITS(12) [],
    ],

    /// MC 10.x command header. The 9.x command id moved up over a version nibble.
    pub(crate) HEADER_V10 [
        SOURCE_ID OFFSET(0) NUMBITS(8) [],
        FLAGS_HW OFFSET(8) NUMBITS(8) [],
        STATUS OFFSET(16) NUMBITS(8) [],
        FLAGS_SW OFFSET(24) NUMBITS(8) [],
        TOKEN OFFSET(32) NUMBITS(16) [],
        CMD_VERSION OFFSET(48) NUMBITS(4) [],
        CMD_ID OFFSET(52) NUMBITS(12) [],
    ]
}

bitflags! {
    /// Command flags, at their absolute header bit positions (same in both generations).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CmdFlags: u32 {
        /// Serve this command from the high priority queue.
        const PRIORITY = 0x0000_8000;
        /// Do not raise the portal interrupt on completion.
        const INTR_DIS = 0x0100_0000;
    }
}

/// Command identifier: 12-bit command number plus the command version (MC 10.x only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CmdId {
    pub id: u16,
    pub version: u8,
}

impl CmdId {
    /// Version 1 of command `id`.
    pub const fn new(id: u16) -> Self {
        Self { id, version: 1 }
    }

    pub const fn with_version(self, version: u8) -> Self {
        Self {
            id: self.id,
            version,
        }
    }
}

impl fmt::Display for CmdId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#05x}/v{}", self.id, self.version)
    }
}

/// Authentication value handed out by open (and 9.x create) commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub u16);

impl Token {
    /// Token of commands that are not addressed to an open object.
    pub const NONE: Token = Token(0);
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// One MC command or response, exactly as exchanged through the portal.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct McCommand {
    pub header: u64,
    pub params: [u64; MC_CMD_NUM_PARAMS],
}

const_assert_eq!(core::mem::size_of::<McCommand>(), 64);

impl McCommand {
    /// Zeroed command with the header encoded for `abi`.
    pub fn new(abi: Abi, cmd: CmdId, flags: CmdFlags, token: Token) -> Self {
        let header = match abi.generation() {
            Generation::V9 => {
                let mut header = LocalRegisterCopy::<u64, HEADER_V9::Register>::new(0);
                header.write(
                    HEADER_V9::FLAGS.val(flags.bits().into())
                        + HEADER_V9::TOKEN.val(token.0.into())
                        + HEADER_V9::CMD_ID.val(cmd.id.into()),
                );
                header.get()
            }
            Generation::V10 => {
                let flags = u64::from(flags.bits());
                let mut header = LocalRegisterCopy::<u64, HEADER_V10::Register>::new(0);
                header.write(
                    HEADER_V10::FLAGS_HW.val(flags >> 8)
                        + HEADER_V10::FLAGS_SW.val(flags >> 24)
                        + HEADER_V10::TOKEN.val(token.0.into())
                        + HEADER_V10::CMD_VERSION.val(cmd.version.into())
                        + HEADER_V10::CMD_ID.val(cmd.id.into()),
                );
                header.get()
            }
        };
        Self {
            header,
            params: [0; MC_CMD_NUM_PARAMS],
        }
    }

    /// Command id as encoded for `abi`. 9.x commands carry no version.
    pub fn cmd_id(&self, abi: Abi) -> CmdId {
        match abi.generation() {
            Generation::V9 => {
                let header = LocalRegisterCopy::<u64, HEADER_V9::Register>::new(self.header);
                CmdId::new(header.read(HEADER_V9::CMD_ID) as u16).with_version(0)
            }
            Generation::V10 => {
                let header = LocalRegisterCopy::<u64, HEADER_V10::Register>::new(self.header);
                CmdId::new(header.read(HEADER_V10::CMD_ID) as u16)
                    .with_version(header.read(HEADER_V10::CMD_VERSION) as u8)
            }
        }
    }

    pub fn token(&self, abi: Abi) -> Token {
        match abi.generation() {
            Generation::V9 => Token(
                LocalRegisterCopy::<u64, HEADER_V9::Register>::new(self.header)
                    .read(HEADER_V9::TOKEN) as u16,
            ),
            Generation::V10 => Token(
                LocalRegisterCopy::<u64, HEADER_V10::Register>::new(self.header)
                    .read(HEADER_V10::TOKEN) as u16,
            ),
        }
    }

    /// Raw completion status. Both generations keep it at bits 16..23.
    pub fn status(&self) -> u8 {
        LocalRegisterCopy::<u64, HEADER_V10::Register>::new(self.header).read(HEADER_V10::STATUS)
            as u8
    }

    /// Writes `fields` into parameter word `index`, leaving the other bits untouched.
    pub fn write<R: RegisterLongName>(&mut self, index: usize, fields: FieldValue<u64, R>) {
        let mut word = LocalRegisterCopy::<u64, R>::new(self.params[index]);
        word.modify(fields);
        self.params[index] = word.get();
    }

    /// Parameter word `index` viewed through field table `R`.
    pub fn param<R: RegisterLongName>(&self, index: usize) -> LocalRegisterCopy<u64, R> {
        LocalRegisterCopy::new(self.params[index])
    }

    /// Lays `bytes` out over consecutive parameter words starting at `index`,
    /// lowest byte first.
    pub fn write_bytes(&mut self, index: usize, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            let bit = (i % 8) * 8;
            self.params[index + i / 8].set_bits(bit..bit + 8, u64::from(*byte));
        }
    }

    pub fn read_bytes<const N: usize>(&self, index: usize) -> [u8; N] {
        let mut bytes = [0u8; N];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let bit = (i % 8) * 8;
            *byte = self.params[index + i / 8].get_bits(bit..bit + 8) as u8;
        }
        bytes
    }

    /// Object type names and labels: 16 NUL padded bytes over two words.
    /// Callers keep `s` within [`MC_STRING_MAX`] bytes, longer input is cut.
    pub fn write_str(&mut self, index: usize, s: &str) {
        let mut bytes = [0u8; MC_STRING_LEN];
        let len = s.len().min(MC_STRING_MAX);
        bytes[..len].copy_from_slice(&s.as_bytes()[..len]);
        self.write_bytes(index, &bytes);
    }

    pub fn read_str(&self, index: usize) -> String {
        let bytes = self.read_bytes::<MC_STRING_LEN>(index);
        let len = bytes.iter().position(|b| *b == 0).unwrap_or(MC_STRING_LEN);
        String::from_utf8_lossy(&bytes[..len]).into_owned()
    }

    /// MAC addresses sit in bits 16..63 of one word, last byte lowest.
    pub fn write_mac(&mut self, index: usize, mac: &crate::MacAddr) {
        for (i, byte) in mac.0.iter().rev().enumerate() {
            let bit = 16 + i * 8;
            self.params[index].set_bits(bit..bit + 8, u64::from(*byte));
        }
    }

    pub fn read_mac(&self, index: usize) -> crate::MacAddr {
        let mut mac = [0u8; 6];
        for (i, byte) in mac.iter_mut().rev().enumerate() {
            let bit = 16 + i * 8;
            *byte = self.params[index].get_bits(bit..bit + 8) as u8;
        }
        crate::MacAddr(mac)
    }

    #[cfg(any(test, feature = "emulator"))]
    pub(crate) fn set_status(&mut self, status: McStatus) {
        let mut header = LocalRegisterCopy::<u64, HEADER_V10::Register>::new(self.header);
        header.modify(HEADER_V10::STATUS.val(status.raw().into()));
        self.header = header.get();
    }

    #[cfg(any(test, feature = "emulator"))]
    pub(crate) fn set_token(&mut self, abi: Abi, token: Token) {
        match abi.generation() {
            Generation::V9 => {
                let mut header = LocalRegisterCopy::<u64, HEADER_V9::Register>::new(self.header);
                header.modify(HEADER_V9::TOKEN.val(token.0.into()));
                self.header = header.get();
            }
            Generation::V10 => {
                let mut header = LocalRegisterCopy::<u64, HEADER_V10::Register>::new(self.header);
                header.modify(HEADER_V10::TOKEN.val(token.0.into()));
                self.header = header.get();
            }
        }
    }
}

/// Bytes reserved for a string on the wire, terminator included.
pub const MC_STRING_LEN: usize = 16;
/// Longest object type or label that fits.
pub const MC_STRING_MAX: usize = MC_STRING_LEN - 1;

impl fmt::Debug for McCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[hd] {:016x}", self.header)?;
        for (i, param) in self.params.iter().enumerate() {
            writeln!(f, "[{:02}] {:016x}", i, param)?;
        }
        Ok(())
    }
}
