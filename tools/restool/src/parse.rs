/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Value parsers for option arguments.

use {
    crate::error::InvalidOptionSnafu,
    core::ops::BitOr,
    flib::{Endpoint, MacAddr, ObjectName},
};

pub fn object_name(s: &str) -> flib::Result<ObjectName> {
    s.parse()
}

pub fn endpoint(s: &str) -> flib::Result<Endpoint> {
    s.parse()
}

pub fn mac_addr(s: &str) -> flib::Result<MacAddr> {
    s.parse()
}

/// A comma separated list of flag names from `names`, or-ed together.
pub fn flags<T>(option: &'static str, s: &str, names: &[(&'static str, T)]) -> crate::Result<T>
where
    T: Copy + Default + BitOr<Output = T>,
{
    s.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .try_fold(T::default(), |acc, name| {
            let flag = names
                .iter()
                .find(|(known, _)| *known == name)
                .map(|(_, flag)| *flag)
                .ok_or_else(|| {
                    InvalidOptionSnafu {
                        option,
                        reason: format!("unknown option {name:?}"),
                    }
                    .build()
                })?;
            Ok(acc | flag)
        })
}

/// A comma separated list of numbers, e.g. `--priorities=1,2,2`.
pub fn number_list(option: &'static str, s: &str) -> crate::Result<Vec<u8>> {
    s.split(',')
        .map(|item| {
            item.trim().parse::<u8>().map_err(|_| {
                InvalidOptionSnafu {
                    option,
                    reason: format!("{item:?} is not a number"),
                }
                .build()
            })
        })
        .collect()
}
