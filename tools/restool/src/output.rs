/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Formatting shared by the `info`, `show` and `list` verbs.

use {
    colored::Colorize,
    flib::dprc::{ObjDesc, ObjState},
    prettytable::{format, row, Table},
    std::{fmt::Display, io::Write},
};

/// One `key: value` line.
pub fn field(out: &mut impl Write, key: &str, value: impl Display) -> std::io::Result<()> {
    writeln!(out, "{key}: {value}")
}

/// Names of the flags set in an option word, in table order.
pub fn option_names<T: Copy>(
    names: &[(&'static str, T)],
    is_set: impl Fn(T) -> bool,
) -> Vec<&'static str> {
    names
        .iter()
        .filter(|(_, flag)| is_set(*flag))
        .map(|(name, _)| *name)
        .collect()
}

/// An option word as hex followed by one indented line per set flag.
pub fn options(out: &mut impl Write, bits: u64, names: &[&str]) -> std::io::Result<()> {
    writeln!(out, "options: {bits:#x}")?;
    for name in names {
        writeln!(out, "\t{name}")?;
    }
    Ok(())
}

pub fn heading(text: &str, script: bool) -> String {
    if script {
        text.into()
    } else {
        text.bold().to_string()
    }
}

pub fn plugged_state(state: ObjState) -> &'static str {
    if state.contains(ObjState::PLUGGED) {
        "plugged"
    } else {
        "unplugged"
    }
}

/// The objects of one container, one row each.
pub fn object_table(objects: &[ObjDesc]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(row!["object", "label", "plugged-state", "version"]);
    for desc in objects {
        let label = if desc.label.is_empty() {
            "-"
        } else {
            desc.label.as_str()
        };
        table.add_row(row![
            format!("{}.{}", desc.ty, desc.id),
            label,
            plugged_state(desc.state),
            desc.version
        ]);
    }
    table
}
