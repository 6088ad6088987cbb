/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Firmware library for the DPAA2 Management Complex.
//!
//! One function per MC command: each builds an [`McCommand`](mc::McCommand), packs its
//! fields, exchanges it through an [`McIo`](mc::McIo) and decodes the answer. Two
//! incompatible firmware generations (9.x and 10.x) are spoken; [`mc::Abi`] is detected
//! once and every encoder dispatches on it.

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod mc;
pub mod object;

pub mod dpbp;
pub mod dpci;
pub mod dpcon;
pub mod dpdmux;
pub mod dpio;
pub mod dpmac;
pub mod dpni;
pub mod dprc;
pub mod dpseci;
pub mod dpsw;

#[cfg(any(test, feature = "emulator"))]
pub mod emulator;

#[cfg(test)]
mod tests;

pub use {
    error::{Error, Result},
    object::{ApiVersion, Endpoint, MacAddr, ObjectName, ObjectType},
};
