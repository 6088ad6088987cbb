/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    crate::mc::{Abi, CmdId, McStatus, McVersion},
    snafu::Snafu,
    std::{io, path::PathBuf},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("MC firmware rejected command {cmd}: {status}"))]
    Firmware { cmd: CmdId, status: McStatus },
    #[snafu(display("Cannot open MC portal {}", path.display()))]
    OpenPortal { path: PathBuf, source: io::Error },
    #[snafu(display("MC portal command exchange failed"))]
    Ioctl { source: io::Error },
    #[snafu(display("MC portal is not available on this platform"))]
    UnsupportedPlatform,
    #[snafu(display("Unsupported MC firmware version {version}"))]
    UnsupportedFirmware { version: McVersion },
    #[snafu(display("{what} is not supported by MC firmware {abi}"))]
    UnsupportedOnAbi { what: String, abi: Abi },
    #[snafu(display("Invalid {what}: {reason}"))]
    InvalidArgument { what: &'static str, reason: String },
    #[snafu(display("Unknown object type {name:?}"))]
    UnknownObjectType { name: String },
    #[snafu(display("Malformed object name {name:?}, expected <type>.<id>"))]
    MalformedName { name: String },
    #[snafu(display("{object} does not exist"))]
    NotFound { object: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// POSIX error number this error is reported as, positive.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Firmware { status, .. } => status.errno(),
            Error::OpenPortal { source, .. } | Error::Ioctl { source } => {
                source.raw_os_error().unwrap_or(libc::EIO)
            }
            Error::UnsupportedPlatform => libc::ENODEV,
            Error::UnsupportedFirmware { .. } | Error::UnsupportedOnAbi { .. } => libc::ENOTSUP,
            Error::InvalidArgument { .. }
            | Error::UnknownObjectType { .. }
            | Error::MalformedName { .. } => libc::EINVAL,
            Error::NotFound { .. } => libc::ENOENT,
        }
    }

    /// The firmware status behind this error, if the firmware was the one to refuse.
    pub fn mc_status(&self) -> Option<McStatus> {
        match self {
            Error::Firmware { status, .. } => Some(*status),
            _ => None,
        }
    }
}
