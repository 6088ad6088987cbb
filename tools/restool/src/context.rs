/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

use {
    crate::error::{InvalidOptionSnafu, WrongTypeSnafu},
    flib::{
        dprc::{self, ObjDesc},
        mc::{Abi, Generation, McIo, McVersion, Portal, Token},
        object, ObjectName, ObjectType,
    },
    log::debug,
    std::io::{self, Stdout, Write},
};

/// Everything one restool invocation works with: the MC portal, the firmware it talks
/// to and the root container, held open until [`Restool::close`].
pub struct Restool<P: Portal, W: Write = Stdout> {
    pub io: McIo<P>,
    pub mc_version: McVersion,
    pub root: ObjectName,
    root_token: Token,
    /// Bare output for scripts.
    pub script: bool,
    pub out: W,
}

impl<P: Portal, W: Write> Restool<P, W> {
    /// Probes the firmware and opens the container restool runs in.
    pub fn open(portal: P, out: W, script: bool) -> flib::Result<Self> {
        let (mut io, mc_version) = McIo::probe(portal)?;
        let root_id = dprc::get_container_id(&mut io)?;
        let root_token = object::open(&mut io, ObjectType::Dprc, root_id)?;
        debug!(
            "MC firmware {}, abi {}, root container dprc.{}",
            mc_version,
            io.abi(),
            root_id
        );
        Ok(Self {
            io,
            mc_version,
            root: ObjectName::new(ObjectType::Dprc, root_id),
            root_token,
            script,
            out,
        })
    }

    pub fn close(mut self) -> flib::Result<()> {
        object::close(&mut self.io, self.root_token)
    }

    pub fn abi(&self) -> Abi {
        self.io.abi()
    }

    /// Runs `f` on a token for container `id`. The root container reuses the token held
    /// for the whole run.
    pub fn with_container<T>(
        &mut self,
        id: u32,
        f: impl FnOnce(&mut McIo<P>, Token) -> flib::Result<T>,
    ) -> flib::Result<T> {
        if id == self.root.id {
            f(&mut self.io, self.root_token)
        } else {
            object::with_open(&mut self.io, ObjectName::new(ObjectType::Dprc, id), f)
        }
    }

    pub fn with_object<T>(
        &mut self,
        name: ObjectName,
        f: impl FnOnce(&mut McIo<P>, Token) -> flib::Result<T>,
    ) -> flib::Result<T> {
        if name == self.root {
            f(&mut self.io, self.root_token)
        } else {
            object::with_open(&mut self.io, name, f)
        }
    }

    pub fn objects(&mut self, container: u32) -> flib::Result<Vec<ObjDesc>> {
        self.with_container(container, |io, token| dprc::get_objects(io, token))
    }

    /// The container holding `name` and its listing there, searched depth first from
    /// the root container.
    pub fn find_parent(&mut self, name: ObjectName) -> flib::Result<(u32, ObjDesc)> {
        let mut pending = vec![self.root.id];
        while let Some(container) = pending.pop() {
            for desc in self.objects(container)? {
                if desc.name() == Some(name) {
                    return Ok((container, desc));
                }
                if desc.name().map(|found| found.ty) == Some(ObjectType::Dprc) {
                    pending.push(desc.id);
                }
            }
        }
        Err(flib::Error::NotFound {
            object: name.to_string(),
        })
    }

    /// Container new objects go to. Only 10.x firmware creates into anything other than
    /// the caller's own container.
    pub fn create_target(&self, container: Option<ObjectName>) -> crate::Result<u32> {
        let Some(container) = container else {
            return Ok(self.root.id);
        };
        if self.abi().generation() == Generation::V9 {
            return InvalidOptionSnafu {
                option: "container",
                reason: format!(
                    "MC firmware {} creates objects in {} only",
                    self.mc_version, self.root
                ),
            }
            .fail();
        }
        expect_type(container, ObjectType::Dprc)?;
        Ok(container.id)
    }

    /// Destroys `name`: 9.x through the object itself, 10.x through its parent.
    pub fn destroy(&mut self, name: ObjectName) -> flib::Result<()> {
        match self.abi().generation() {
            Generation::V9 => object::destroy(&mut self.io, Token::NONE, name),
            Generation::V10 => {
                let (parent, _) = self.find_parent(name)?;
                self.with_container(parent, |io, token| object::destroy(io, token, name))
            }
        }
    }

    pub fn report_created(&mut self, name: ObjectName, container: u32) -> io::Result<()> {
        if self.script {
            writeln!(self.out, "{name}")
        } else {
            writeln!(self.out, "{name} is created under dprc.{container}")
        }
    }

    pub fn report_destroyed(&mut self, name: ObjectName) -> io::Result<()> {
        if self.script {
            Ok(())
        } else {
            writeln!(self.out, "{name} is destroyed")
        }
    }
}

pub fn expect_type(name: ObjectName, expected: ObjectType) -> crate::Result<ObjectName> {
    if name.ty != expected {
        return WrongTypeSnafu { expected, name }.fail();
    }
    Ok(name)
}
