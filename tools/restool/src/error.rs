/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    flib::{ObjectName, ObjectType},
    snafu::Snafu,
};

/// Command line mistakes caught before anything is sent to the MC.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid --{option}: {reason}"))]
    InvalidOption { option: &'static str, reason: String },
    #[snafu(display("{name} is not a {expected} object"))]
    WrongType {
        expected: ObjectType,
        name: ObjectName,
    },
    #[snafu(display("No object type given, see --help"))]
    NoObject,
}

/// Process exit status for `err`: the negative errno of the first error in the chain
/// that carries one, truncated to a byte.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    let errno = err
        .chain()
        .find_map(|cause| {
            if let Some(err) = cause.downcast_ref::<flib::Error>() {
                Some(err.errno())
            } else if cause.downcast_ref::<Error>().is_some() {
                Some(libc::EINVAL)
            } else {
                cause
                    .downcast_ref::<std::io::Error>()
                    .map(|err| err.raw_os_error().unwrap_or(libc::EIO))
            }
        })
        .unwrap_or(libc::EIO);
    errno.wrapping_neg() as u8
}

#[cfg(test)]
mod tests {
    use {super::*, flib::mc::McStatus};

    #[test]
    fn exit_status_is_the_negative_errno() {
        let err = anyhow::Error::new(NoObjectSnafu.build());
        assert_eq!(exit_status(&err), (-libc::EINVAL) as u8);

        let err = anyhow::Error::new(flib::Error::Firmware {
            cmd: flib::mc::CmdId::new(0x151),
            status: McStatus::Busy,
        });
        assert_eq!(exit_status(&err), (-libc::EBUSY) as u8);
    }

    #[test]
    fn context_does_not_hide_the_errno() {
        let err = anyhow::Error::new(flib::Error::NotFound {
            object: "dpni.9".into(),
        })
        .context("cannot show dpni.9");
        assert_eq!(exit_status(&err), (-libc::ENOENT) as u8);
    }
}
