//! Host-provided C library, registered per header.
//!
//! Each header is a table of (intrinsic, C prototype) pairs; registration
//! lexes and parses the prototype through the normal declaration path, then
//! installs the host function pointer on the resulting definition. This
//! keeps library signatures in real C and exercises the same type parser
//! the interpreted program uses.

mod cstdlib;
mod cstring;
mod math;
mod stdio;

use tracing::debug;

use crate::error::{CResult, ErrorKind};
use crate::interp::{Interp, IntrinsicFn, ParseState};
use crate::types::{BaseType, TypeId};

/// One library entry: the host function and its C prototype.
pub type LibraryEntry = (IntrinsicFn, &'static str);

impl Interp {
    /// Register a table of library functions.
    pub fn library_add(&mut self, entries: &[LibraryEntry]) -> CResult<()> {
        for (func, prototype) in entries {
            let stream = self.add_stream("<library>", prototype)?;
            self.run_stream(stream)?;
            let def = self
                .functions
                .last_mut()
                .ok_or_else(|| crate::error::CError::new(ErrorKind::Link, "bad library prototype"))?;
            def.intrinsic = Some(*func);
        }
        Ok(())
    }

    /// Define a read-only global backed by fresh heap storage.
    pub fn define_platform_int(&mut self, ps: &ParseState, name: &str, typ: TypeId, v: i64) -> CResult<()> {
        let id = self.interner.intern(name);
        let (val, _) = self.var_define(ps, id, typ, false)?;
        self.write_int_as(ps, val.addr, self.types.base(typ), v)
    }

    pub fn define_platform_double(&mut self, ps: &ParseState, name: &str, v: f64) -> CResult<()> {
        let id = self.interner.intern(name);
        let (val, _) = self.var_define(ps, id, crate::types::DOUBLE, false)?;
        self.write_fp_as(ps, val.addr, BaseType::Double, v)
    }

    /// Switch in one system header's function table. Unknown headers are
    /// ignored; repeated includes are no-ops.
    pub fn register_header_by_name(&mut self, _ps: &ParseState, header: &str) -> CResult<()> {
        if self.included_headers.iter().any(|h| h == header) {
            return Ok(());
        }
        self.included_headers.push(header.to_owned());
        debug!(header, "register system header");
        match header {
            "stdio.h" => stdio::register(self),
            "stdlib.h" => cstdlib::register(self),
            "string.h" => cstring::register(self),
            "math.h" => math::register(self),
            "assert.h" => cstdlib::register_assert(self),
            _ => Ok(()),
        }
    }

    /// Register every system header plus the platform constants.
    pub fn include_all_system_headers(&mut self) -> CResult<()> {
        self.register_platform()?;
        let stream = self.ensure_platform_stream()?;
        let ps = ParseState::new(stream);
        for header in ["stdio.h", "stdlib.h", "string.h", "math.h", "assert.h"] {
            self.register_header_by_name(&ps, header)?;
        }
        Ok(())
    }

    /// TRUE/FALSE/NULL, defined once.
    pub fn register_platform(&mut self) -> CResult<()> {
        if self.included_headers.iter().any(|h| h == "<platform>") {
            return Ok(());
        }
        self.included_headers.push("<platform>".to_owned());
        let stream = self.ensure_platform_stream()?;
        let ps = ParseState::new(stream);
        self.define_platform_int(&ps, "TRUE", crate::types::INT, 1)?;
        self.define_platform_int(&ps, "FALSE", crate::types::INT, 0)?;
        self.define_platform_int(&ps, "NULL", crate::types::INT, 0)?;
        Ok(())
    }

    /// An empty stream whose cursor anchors diagnostics for definitions
    /// made from the host side.
    pub fn ensure_platform_stream(&mut self) -> CResult<usize> {
        let name = "<platform>";
        let id = self.interner.intern(name);
        if let Some(idx) = self.streams.iter().position(|s| s.file == id) {
            return Ok(idx);
        }
        self.add_stream(name, "")
    }
}
