/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Command portal transport.

use {
    super::{get_version, Abi, CmdFlags, CmdId, McCommand, McStatus, McVersion, Token},
    crate::error::{FirmwareSnafu, Result},
    cfg_if::cfg_if,
    log::debug,
};

/// Something that carries commands to the MC and back.
pub trait Portal {
    /// Hands `cmd` to the firmware and blocks until the response has overwritten it.
    /// Only transport failures are errors here, the firmware status stays in the header.
    fn send(&mut self, cmd: &mut McCommand) -> Result<()>;
}

/// A portal bound to the ABI of the firmware behind it.
pub struct McIo<P> {
    portal: P,
    abi: Abi,
}

impl<P: Portal> McIo<P> {
    /// Wraps `portal` and asks the firmware for its version to pick the ABI.
    pub fn probe(portal: P) -> Result<(Self, McVersion)> {
        let mut io = Self {
            portal,
            abi: Abi::PROBE,
        };
        let version = get_version(&mut io)?;
        io.abi = Abi::from_version(&version)?;
        debug!("mc: firmware {} speaks ABI {}", version, io.abi);
        Ok((io, version))
    }

    pub fn with_abi(portal: P, abi: Abi) -> Self {
        Self { portal, abi }
    }

    pub fn abi(&self) -> Abi {
        self.abi
    }

    /// Fresh command addressed to `token`.
    pub fn command(&self, id: CmdId, token: Token) -> McCommand {
        McCommand::new(self.abi, id, CmdFlags::empty(), token)
    }

    /// One blocking round trip. A non-OK status in the response is an error.
    pub fn send_command(&mut self, mut cmd: McCommand) -> Result<McCommand> {
        let id = cmd.cmd_id(self.abi);
        debug!("mc: -> {} token {}", id, cmd.token(self.abi));

        self.portal.send(&mut cmd)?;

        let status = McStatus::from_raw(cmd.status());
        debug!("mc: <- {} status {:?}", id, status);
        if status != McStatus::Ok {
            return FirmwareSnafu { cmd: id, status }.fail();
        }
        Ok(cmd)
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn portal_mut(&mut self) -> &mut P {
        &mut self.portal
    }
}

cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        use {
            crate::error::{IoctlSnafu, OpenPortalSnafu},
            snafu::ResultExt,
            std::{
                fs::{File, OpenOptions},
                io,
                os::unix::io::AsRawFd,
                path::Path,
            },
        };

        const RESTOOL_IOCTL_TYPE: u8 = b'R';

        /// `_IOWR(type, nr, size)` with the generic Linux ioctl number layout.
        const fn iowr(ty: u8, nr: u8, size: usize) -> u64 {
            const IOC_READ_WRITE: u64 = 3;
            (IOC_READ_WRITE << 30) | ((size as u64) << 16) | ((ty as u64) << 8) | nr as u64
        }

        const RESTOOL_SEND_MC_COMMAND: u64 =
            iowr(RESTOOL_IOCTL_TYPE, 0xE0, core::mem::size_of::<McCommand>());

        /// The MC portal exposed by the fsl-mc bus driver as a character device.
        pub struct DevicePortal {
            file: File,
        }

        impl DevicePortal {
            pub const DEFAULT_PATH: &'static str = "/dev/mc_restool";

            pub fn open(path: impl AsRef<Path>) -> Result<Self> {
                let path = path.as_ref();
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(path)
                    .context(OpenPortalSnafu { path })?;
                Ok(Self { file })
            }
        }

        impl Portal for DevicePortal {
            fn send(&mut self, cmd: &mut McCommand) -> Result<()> {
                // SAFETY: McCommand is the repr(C) image of struct mc_command the driver
                // copies in and back out, and it outlives the call.
                let ret = unsafe {
                    libc::ioctl(
                        self.file.as_raw_fd(),
                        RESTOOL_SEND_MC_COMMAND as _,
                        cmd as *mut McCommand,
                    )
                };
                if ret < 0 {
                    return Err(io::Error::last_os_error()).context(IoctlSnafu);
                }
                Ok(())
            }
        }

        #[cfg(test)]
        mod tests {
            use super::*;

            #[test]
            fn send_command_ioctl_number() {
                assert_eq!(RESTOOL_SEND_MC_COMMAND, 0xc040_52e0);
            }
        }
    } else {
        use {crate::error::UnsupportedPlatformSnafu, std::path::Path};

        /// No MC portal driver exists outside Linux.
        pub struct DevicePortal;

        impl DevicePortal {
            pub const DEFAULT_PATH: &'static str = "/dev/mc_restool";

            pub fn open(_path: impl AsRef<Path>) -> Result<Self> {
                UnsupportedPlatformSnafu.fail()
            }
        }

        impl Portal for DevicePortal {
            fn send(&mut self, _cmd: &mut McCommand) -> Result<()> {
                UnsupportedPlatformSnafu.fail()
            }
        }
    }
}
