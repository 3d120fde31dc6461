//! Scope and slot management for render procedures.
//!
//! [`LocalVariableManager`] tracks nested lexical scopes and assigns every
//! declared variable a numbered [`Slot`] in the procedure's frame.
//!
//! # Slot discipline
//!
//! - Slots are numbered monotonically per procedure and never reused, so a
//!   slot number identifies one variable for the whole procedure and two
//!   live variables can never share storage.
//! - Parameters and state variables live in the outermost scope. They are
//!   re-materialized from the params record (or their constant initializer)
//!   every time the procedure is entered, so they are never saved.
//! - Every other slot owned by an active scope is *live*: its value is saved
//!   when the render suspends and restored when it resumes. The live set
//!   for a resume point is fixed when the point is emitted.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use vellum_ir::VarType;

use crate::CompileError;

/// Index of a local in a procedure frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Slot(u32);

impl Slot {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Slot(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Param,
    /// A parameter declared `@inject`, read from the injected record.
    Injected,
    State,
    /// `let` and loop variables.
    Local,
    /// Compiler temporaries: loop cursors, switch subjects, capture buffers.
    Synthetic,
}

impl SlotKind {
    /// Kinds rebuilt on every entry instead of being saved.
    pub fn is_rematerialized(self) -> bool {
        matches!(self, SlotKind::Param | SlotKind::Injected | SlotKind::State)
    }
}

/// Identifies one scope activation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    /// Variable name, or a label for synthetic slots.
    pub name: String,
    pub ty: VarType,
    pub kind: SlotKind,
}

struct ScopeFrame {
    id: ScopeId,
    bindings: FxHashMap<String, Slot>,
    owned: Vec<Slot>,
}

pub struct LocalVariableManager {
    template: String,
    slots: Vec<SlotInfo>,
    scopes: Vec<ScopeFrame>,
    next_scope: u32,
}

impl LocalVariableManager {
    pub fn new(template: impl Into<String>) -> Self {
        LocalVariableManager {
            template: template.into(),
            slots: Vec::new(),
            scopes: Vec::new(),
            next_scope: 0,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.next_scope);
        self.next_scope += 1;
        self.scopes.push(ScopeFrame {
            id,
            bindings: FxHashMap::default(),
            owned: Vec::new(),
        });
        id
    }

    /// Closes `id`, which must be the innermost open scope. Its slots stay
    /// allocated but are no longer live or visible.
    pub fn exit_scope(&mut self, id: ScopeId) -> Result<(), CompileError> {
        match self.scopes.last() {
            Some(frame) if frame.id == id => {
                self.scopes.pop();
                Ok(())
            }
            _ => Err(CompileError::internal(
                &self.template,
                "scopes must be exited innermost first",
            )),
        }
    }

    /// Declares a named variable in the innermost scope.
    pub fn declare(
        &mut self,
        name: &str,
        ty: VarType,
        kind: SlotKind,
    ) -> Result<Slot, CompileError> {
        let Some(frame) = self.scopes.last() else {
            return Err(CompileError::internal(
                &self.template,
                format!("`{name}` declared outside of any scope"),
            ));
        };
        if frame.bindings.contains_key(name) {
            return Err(CompileError::DuplicateLocal {
                template: self.template.clone(),
                name: name.to_owned(),
            });
        }
        let slot = self.allocate(name, ty, kind)?;
        if let Some(frame) = self.scopes.last_mut() {
            frame.bindings.insert(name.to_owned(), slot);
        }
        Ok(slot)
    }

    /// Allocates an unnamed compiler temporary owned by the innermost scope.
    pub fn synthetic(&mut self, label: &str) -> Result<Slot, CompileError> {
        if self.scopes.is_empty() {
            return Err(CompileError::internal(
                &self.template,
                format!("temporary `{label}` allocated outside of any scope"),
            ));
        }
        self.allocate(label, VarType::Unknown, SlotKind::Synthetic)
    }

    fn allocate(&mut self, name: &str, ty: VarType, kind: SlotKind) -> Result<Slot, CompileError> {
        let raw = u32::try_from(self.slots.len())
            .map_err(|_| CompileError::internal(&self.template, "too many locals"))?;
        let slot = Slot(raw);
        self.slots.push(SlotInfo {
            name: name.to_owned(),
            ty,
            kind,
        });
        if let Some(frame) = self.scopes.last_mut() {
            frame.owned.push(slot);
        }
        Ok(slot)
    }

    /// Resolves a name through the open scopes, innermost first.
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name).copied())
    }

    /// Like [`lookup`](Self::lookup), but only matches slots of `kind`.
    pub fn lookup_kind(&self, name: &str, kind: SlotKind) -> Option<Slot> {
        self.scopes.iter().rev().find_map(|frame| {
            frame
                .bindings
                .get(name)
                .copied()
                .filter(|slot| self.slots[slot.index()].kind == kind)
        })
    }

    /// Slots whose values must survive a suspension right now, ascending.
    pub fn live_slots(&self) -> SmallVec<[Slot; 8]> {
        let mut live: SmallVec<[Slot; 8]> = self
            .scopes
            .iter()
            .flat_map(|frame| frame.owned.iter().copied())
            .filter(|slot| !self.slots[slot.index()].kind.is_rematerialized())
            .collect();
        live.sort_unstable();
        live
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_info(&self, slot: Slot) -> Option<&SlotInfo> {
        self.slots.get(slot.index())
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Consumes the manager, returning the frame layout.
    pub fn into_layout(self) -> Vec<SlotInfo> {
        self.slots
    }
}
