/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {cfg_if::cfg_if, core::fmt};

cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        const ENAVAIL: i32 = libc::ENAVAIL;
    } else {
        const ENAVAIL: i32 = libc::EAGAIN;
    }
}

/// Completion status the firmware leaves in the response header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum McStatus {
    Ok,
    /// Command still in flight.
    Ready,
    AuthError,
    NoPrivilege,
    DmaError,
    ConfigError,
    Timeout,
    NoResource,
    NoMemory,
    Busy,
    UnsupportedOp,
    InvalidState,
    Unknown(u8),
}

impl McStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x0 => Self::Ok,
            0x1 => Self::Ready,
            0x3 => Self::AuthError,
            0x4 => Self::NoPrivilege,
            0x5 => Self::DmaError,
            0x6 => Self::ConfigError,
            0x7 => Self::Timeout,
            0x8 => Self::NoResource,
            0x9 => Self::NoMemory,
            0xa => Self::Busy,
            0xb => Self::UnsupportedOp,
            0xc => Self::InvalidState,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::Ok => 0x0,
            Self::Ready => 0x1,
            Self::AuthError => 0x3,
            Self::NoPrivilege => 0x4,
            Self::DmaError => 0x5,
            Self::ConfigError => 0x6,
            Self::Timeout => 0x7,
            Self::NoResource => 0x8,
            Self::NoMemory => 0x9,
            Self::Busy => 0xa,
            Self::UnsupportedOp => 0xb,
            Self::InvalidState => 0xc,
            Self::Unknown(raw) => raw,
        }
    }

    /// POSIX error number the status is reported as, positive.
    pub fn errno(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Ready => libc::EAGAIN,
            Self::AuthError => libc::EACCES,
            Self::NoPrivilege => libc::EPERM,
            Self::DmaError => libc::EIO,
            Self::ConfigError => libc::ENXIO,
            Self::Timeout => libc::ETIMEDOUT,
            Self::NoResource => ENAVAIL,
            Self::NoMemory => libc::ENOMEM,
            Self::Busy => libc::EBUSY,
            Self::UnsupportedOp => libc::ENOTSUP,
            Self::InvalidState => libc::ENODEV,
            Self::Unknown(_) => libc::EIO,
        }
    }
}

impl fmt::Display for McStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "Success"),
            Self::Ready => write!(f, "Ready"),
            Self::AuthError => write!(f, "Authentication error"),
            Self::NoPrivilege => write!(f, "No privilege"),
            Self::DmaError => write!(f, "DMA or I/O error"),
            Self::ConfigError => write!(f, "Configuration error"),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::NoResource => write!(f, "No resources"),
            Self::NoMemory => write!(f, "No memory available"),
            Self::Busy => write!(f, "Busy"),
            Self::UnsupportedOp => write!(f, "Unsupported operation"),
            Self::InvalidState => write!(f, "Invalid state"),
            Self::Unknown(raw) => write!(f, "Unknown MC status {:#04x}", raw),
        }
    }
}
