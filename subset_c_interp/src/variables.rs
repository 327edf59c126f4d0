//! Variable storage: the global table, per-frame local tables, lexical
//! scope dormancy and static-variable mangling.
//!
//! Tables are multimaps so a name can hold one active slot plus dormant
//! slots from sibling blocks. Lookup takes the newest in-scope slot, local
//! frame first, then globals. Leaving a block marks its slots dormant;
//! re-entering the same block (same scope id) reactivates them.

use std::collections::HashMap;

use crate::error::{CResult, ErrorKind};
use crate::interp::{Interp, ParsePos, ParseState, ScopeId};
use crate::intern::StrId;
use crate::types::TypeId;
use crate::value::Value;

/// One defined variable.
#[derive(Debug, Clone, Copy)]
pub struct VarSlot {
    pub val: Value,
    pub scope: Option<ScopeId>,
    pub out_of_scope: bool,
    /// Declaration site, for the re-declaration-is-identical rule in
    /// re-entered blocks.
    pub decl: Option<ParsePos>,
}

/// Stable reference to a table slot; lets l-value views write back a
/// resized payload without raw pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarRef {
    /// `None` = global table, `Some(i)` = frames[i].
    pub frame: Option<usize>,
    pub name: StrId,
    pub idx: usize,
}

#[derive(Debug, Default)]
pub struct VarTable {
    map: HashMap<StrId, Vec<VarSlot>>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest active slot for a name.
    pub fn get(&self, name: StrId) -> Option<(usize, &VarSlot)> {
        let slots = self.map.get(&name)?;
        slots
            .iter()
            .enumerate()
            .rev()
            .find(|(_, s)| !s.out_of_scope)
    }

    pub fn has_active(&self, name: StrId) -> bool {
        self.get(name).is_some()
    }

    pub fn has_dormant(&self, name: StrId) -> bool {
        self.map
            .get(&name)
            .is_some_and(|slots| slots.iter().any(|s| s.out_of_scope))
    }

    pub fn push(&mut self, name: StrId, slot: VarSlot) -> usize {
        let slots = self.map.entry(name).or_default();
        slots.push(slot);
        slots.len() - 1
    }

    pub fn slot_mut(&mut self, name: StrId, idx: usize) -> Option<&mut VarSlot> {
        self.map.get_mut(&name)?.get_mut(idx)
    }

    /// Mark every active slot of `scope` dormant (block exit).
    pub fn deactivate_scope(&mut self, scope: ScopeId) {
        for slots in self.map.values_mut() {
            for slot in slots.iter_mut() {
                if slot.scope == Some(scope) && !slot.out_of_scope {
                    slot.out_of_scope = true;
                }
            }
        }
    }

    /// Reactivate every dormant slot of `scope` (block re-entry).
    pub fn activate_scope(&mut self, scope: ScopeId) {
        for slots in self.map.values_mut() {
            for slot in slots.iter_mut() {
                if slot.scope == Some(scope) && slot.out_of_scope {
                    slot.out_of_scope = false;
                }
            }
        }
    }
}

/// Per-call record: local table, return value cell and parameter count.
/// The return cursor is implicit in the host call stack.
#[derive(Debug)]
pub struct StackFrame {
    pub func_name: StrId,
    pub locals: VarTable,
    pub ret_val: Value,
    pub num_params: usize,
}

impl Interp {
    /// The table new definitions go into.
    fn current_table(&mut self) -> &mut VarTable {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.locals,
            None => &mut self.globals,
        }
    }

    fn current_frame_index(&self) -> Option<usize> {
        if self.frames.is_empty() {
            None
        } else {
            Some(self.frames.len() - 1)
        }
    }

    /// Allocate storage for a new variable: heap for globals, stack for
    /// locals.
    pub fn alloc_var_payload(&mut self, ps: &ParseState, typ: TypeId) -> CResult<u64> {
        let size = self.types.size_of(typ);
        let on_heap = self.frames.is_empty();
        let addr = if on_heap {
            self.arena.alloc_heap(size)
        } else {
            self.arena.alloc_stack(size)
        };
        addr.ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))
    }

    /// Define a variable in the current table. Fails on an active duplicate.
    pub fn var_define(
        &mut self,
        ps: &ParseState,
        name: StrId,
        typ: TypeId,
        writable: bool,
    ) -> CResult<(Value, VarRef)> {
        let addr = self.alloc_var_payload(ps, typ)?;
        self.var_define_at(ps, name, typ, addr, writable)
    }

    /// Define a variable whose payload already exists (static aliases,
    /// platform variables, bound parameters).
    pub fn var_define_at(
        &mut self,
        ps: &ParseState,
        name: StrId,
        typ: TypeId,
        addr: u64,
        writable: bool,
    ) -> CResult<(Value, VarRef)> {
        let frame = self.current_frame_index();
        if self.current_table().has_active(name) {
            let ident = self.interner.resolve(name).to_owned();
            return Err(self.err(ps, ErrorKind::Name, format!("'{ident}' is already defined")));
        }
        let mut val = Value::new(typ, addr);
        val.is_lvalue = writable;
        let slot = VarSlot {
            val,
            scope: ps.scope,
            out_of_scope: false,
            decl: Some(ParsePos { stream: ps.stream, pos: ps.pos }),
        };
        let idx = self.current_table().push(name, slot);
        Ok((val, VarRef { frame, name, idx }))
    }

    /// Define a variable unless this exact declaration already exists (a
    /// re-entered block re-executes its declarations). Statics get a
    /// mangled global cell plus a frame-local alias sharing its storage.
    /// Returns the value and whether this was the first visit.
    pub fn var_define_but_ignore_identical(
        &mut self,
        ps: &ParseState,
        name: StrId,
        typ: TypeId,
        is_static: bool,
    ) -> CResult<(Value, VarRef, bool)> {
        if is_static {
            let mangled = self.static_mangled_name(ps, name);
            let mut first_visit = false;
            let existing = self.globals.get(mangled).map(|(_, slot)| slot.val);
            let global_val = match existing {
                Some(val) => val,
                None => {
                    let size = self.types.size_of(typ);
                    let addr = self
                        .arena
                        .alloc_heap(size)
                        .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
                    let mut val = Value::new(typ, addr);
                    val.is_lvalue = true;
                    self.globals.push(
                        mangled,
                        VarSlot { val, scope: None, out_of_scope: false, decl: None },
                    );
                    first_visit = true;
                    val
                }
            };
            // local alias with the short name, sharing the global storage
            if self.frames.is_empty() {
                // static at file scope: the mangled cell is enough unless
                // the plain name is still free
                if !self.globals.has_active(name) {
                    let (_, vr) = self.var_define_at(ps, name, global_val.typ, global_val.addr, true)?;
                    return Ok((global_val, vr, first_visit));
                }
                let idx = self.globals.get(name).map(|(i, _)| i).unwrap_or(0);
                return Ok((global_val, VarRef { frame: None, name, idx }, first_visit));
            }
            let decl = ParsePos { stream: ps.stream, pos: ps.pos };
            if let Some((idx, slot)) = self.frames.last().unwrap().locals.get(name) {
                if slot.decl == Some(decl) {
                    let frame = self.current_frame_index();
                    return Ok((slot.val, VarRef { frame, name, idx }, first_visit));
                }
            }
            let (_, vr) = self.var_define_at(ps, name, global_val.typ, global_val.addr, true)?;
            return Ok((global_val, vr, first_visit));
        }

        let decl = ParsePos { stream: ps.stream, pos: ps.pos };
        let table = match self.frames.last() {
            Some(f) => &f.locals,
            None => &self.globals,
        };
        if let Some((idx, slot)) = table.get(name) {
            if slot.decl == Some(decl) {
                let frame = self.current_frame_index();
                return Ok((slot.val, VarRef { frame, name, idx }, false));
            }
        }
        let (val, vr) = self.var_define(ps, name, typ, true)?;
        Ok((val, vr, true))
    }

    /// `"/<file>/<func>/<ident>"`, interned.
    fn static_mangled_name(&mut self, ps: &ParseState, name: StrId) -> StrId {
        let file = self.interner.resolve(self.streams[ps.stream].file).to_owned();
        let func = self
            .frames
            .last()
            .map(|f| self.interner.resolve(f.func_name).to_owned());
        let ident = self.interner.resolve(name);
        let mangled = match func {
            Some(func) => format!("/{file}/{func}/{ident}"),
            None => format!("/{file}/{ident}"),
        };
        self.interner.intern(&mangled)
    }

    /// Find a variable: local frame first, then globals.
    pub fn var_lookup(&self, name: StrId) -> Option<(Value, VarRef)> {
        if let Some(frame_idx) = self.current_frame_index() {
            if let Some((idx, slot)) = self.frames[frame_idx].locals.get(name) {
                return Some((slot.val, VarRef { frame: Some(frame_idx), name, idx }));
            }
        }
        self.globals
            .get(name)
            .map(|(idx, slot)| (slot.val, VarRef { frame: None, name, idx }))
    }

    /// Find a variable or fail with a Name error.
    pub fn var_get(&self, ps: &ParseState, name: StrId) -> CResult<(Value, VarRef)> {
        if let Some(found) = self.var_lookup(name) {
            return Ok(found);
        }
        let ident = self.interner.resolve(name).to_owned();
        let dormant = match self.frames.last() {
            Some(f) => f.locals.has_dormant(name),
            None => self.globals.has_dormant(name),
        };
        if dormant {
            Err(self.err(ps, ErrorKind::Name, format!("'{ident}' is out of scope")))
        } else {
            Err(self.err(ps, ErrorKind::Name, format!("'{ident}' is undefined")))
        }
    }

    /// Write back a resized payload through an l-value's owning slot.
    pub fn update_var_slot(&mut self, vr: VarRef, typ: TypeId, addr: u64) {
        let table = match vr.frame {
            Some(i) => &mut self.frames[i].locals,
            None => &mut self.globals,
        };
        if let Some(slot) = table.slot_mut(vr.name, vr.idx) {
            slot.val.typ = typ;
            slot.val.addr = addr;
        }
    }

    // ==================== Scopes ====================

    /// Enter a lexical block: rotate the scope id and reactivate dormant
    /// variables bound to the new block. Returns the previous scope.
    pub fn scope_begin(&mut self, ps: &mut ParseState) -> Option<ScopeId> {
        let old = ps.scope?;
        let new = ScopeId(((ps.stream as u64) << 32) | ps.pos as u64);
        ps.scope = Some(new);
        self.current_table().activate_scope(new);
        Some(old)
    }

    /// Leave a lexical block: mark its variables dormant and restore the
    /// previous scope id.
    pub fn scope_end(&mut self, ps: &mut ParseState, prev: Option<ScopeId>) {
        let Some(prev) = prev else { return };
        if let Some(current) = ps.scope {
            self.current_table().deactivate_scope(current);
        }
        ps.scope = Some(prev);
    }

    // ==================== Stack frames ====================

    /// Push a call frame. The arena frame must already be pushed by the
    /// caller (parameter cells live inside it).
    pub fn frame_push(&mut self, func_name: StrId, ret_val: Value, num_params: usize) {
        self.frames.push(StackFrame {
            func_name,
            locals: VarTable::new(),
            ret_val,
            num_params,
        });
    }

    // ==================== String literals ====================

    /// Shared cell for a string literal; identical literals share storage.
    pub fn string_literal_cell(&mut self, ps: &ParseState, body: StrId) -> CResult<u64> {
        if let Some(&addr) = self.string_literals.get(&body) {
            return Ok(addr);
        }
        let bytes = self.interner.resolve(body).as_bytes().to_vec();
        let addr = self
            .arena
            .alloc_heap(bytes.len() + 1)
            .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
        self.arena.write(addr, &bytes);
        // trailing NUL is already there: heap allocations are zeroed
        self.string_literals.insert(body, addr);
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dormant_slots_are_skipped_and_reactivated() {
        let mut interner = crate::intern::Interner::new();
        let mut table = VarTable::new();
        let name = interner.intern("x");
        let scope = ScopeId(7);
        let mut val = Value::new(crate::types::INT, 64);
        val.is_lvalue = true;
        table.push(name, VarSlot { val, scope: Some(scope), out_of_scope: false, decl: None });
        assert!(table.has_active(name));
        table.deactivate_scope(scope);
        assert!(!table.has_active(name));
        assert!(table.has_dormant(name));
        table.activate_scope(scope);
        assert!(table.has_active(name));
    }
}
