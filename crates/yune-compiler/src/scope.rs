//! Lexical scopes for name resolution.
//!
//! A [`DeclarationTable`] is one node in a chain of scopes. Each node owns
//! the declarations introduced in it and borrows its parent, so a table can
//! never be its own parent. Every table shares the module's top-level name
//! map, which the root of the chain falls back to.
//!
//! Lookups that resolve through the parent chain are recorded as captures on
//! the scope where the lookup started. Closure lowering reads the captures of
//! the closure's scope to materialize the outer bindings it uses.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use yune_core::{CompilationError, Name, Span};

use crate::declaration::{DeclId, Declaration};

// ============================================================================
// Types
// ============================================================================

/// A name resolved through the parent chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: String,
    pub declaration: Declaration,
}

#[derive(Debug, Clone)]
struct LocalEntry {
    declaration: Declaration,
    span: Span,
}

// ============================================================================
// DeclarationTable
// ============================================================================

/// A scope in the declaration chain.
#[derive(Debug)]
pub struct DeclarationTable<'p> {
    parent: Option<&'p DeclarationTable<'p>>,
    /// Module-level declarations, shared by the whole chain.
    top_level: Rc<FxHashMap<String, DeclId>>,
    /// Declarations introduced in this scope.
    locals: FxHashMap<String, LocalEntry>,
    captures: RefCell<Vec<Capture>>,
    dedup_captures: bool,
}

impl DeclarationTable<'static> {
    /// Create the root of a scope chain.
    pub fn root(top_level: Rc<FxHashMap<String, DeclId>>, dedup_captures: bool) -> Self {
        Self {
            parent: None,
            top_level,
            locals: FxHashMap::default(),
            captures: RefCell::new(Vec::new()),
            dedup_captures,
        }
    }
}

impl<'p> DeclarationTable<'p> {
    /// A fresh root that only sees the top-level map.
    ///
    /// Top-level declarations are analyzed against this table so that the
    /// locals of whoever referenced them stay invisible.
    pub fn top_level(&self) -> DeclarationTable<'static> {
        DeclarationTable::root(Rc::clone(&self.top_level), self.dedup_captures)
    }

    /// Create a child scope with no locals and no captures.
    pub fn new_scope(&self) -> DeclarationTable<'_> {
        DeclarationTable {
            parent: Some(self),
            top_level: Rc::clone(&self.top_level),
            locals: FxHashMap::default(),
            captures: RefCell::new(Vec::new()),
            dedup_captures: self.dedup_captures,
        }
    }

    /// Introduce a declaration in this scope.
    ///
    /// Parent scopes are not consulted, so shadowing an outer name is legal.
    pub fn add(&mut self, name: &Name, declaration: Declaration) -> Result<(), CompilationError> {
        if let Some(existing) = self.locals.get(name.as_str()) {
            return Err(CompilationError::DuplicateDeclaration {
                name: name.string.clone(),
                first: existing.span,
                second: name.span,
            });
        }
        self.locals.insert(
            name.string.clone(),
            LocalEntry {
                declaration,
                span: name.span,
            },
        );
        Ok(())
    }

    /// Resolve a name without recording captures.
    pub fn resolve(&self, name: &str) -> Option<Declaration> {
        if let Some(entry) = self.locals.get(name) {
            return Some(entry.declaration.clone());
        }
        match self.parent {
            Some(parent) => parent.resolve(name),
            None => self.top_level.get(name).map(|id| Declaration::TopLevel(*id)),
        }
    }

    /// Record that `name` was resolved through the parent chain.
    pub fn record_capture(&self, name: &str, declaration: &Declaration) {
        let mut captures = self.captures.borrow_mut();
        if self.dedup_captures && captures.iter().any(|c| c.name == name) {
            return;
        }
        tracing::trace!(name, local = declaration.is_local(), "capture recorded");
        captures.push(Capture {
            name: name.to_string(),
            declaration: declaration.clone(),
        });
    }

    /// Resolve a name, recording a capture on every scope the lookup passed
    /// through before it was found.
    pub fn get(&self, name: &str) -> Option<Declaration> {
        if let Some(entry) = self.locals.get(name) {
            return Some(entry.declaration.clone());
        }
        match self.parent {
            Some(parent) => {
                let found = parent.get(name)?;
                self.record_capture(name, &found);
                Some(found)
            }
            None => self.top_level.get(name).map(|id| Declaration::TopLevel(*id)),
        }
    }

    pub fn captures(&self) -> Vec<Capture> {
        self.captures.borrow().clone()
    }

    /// Captures of parameters and local variables. Top-level declarations
    /// are globals in the target and never need capturing.
    pub fn local_captures(&self) -> Vec<Capture> {
        self.captures
            .borrow()
            .iter()
            .filter(|c| c.declaration.is_local())
            .cloned()
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
