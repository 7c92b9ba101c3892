//! Semantic analysis of top-level declarations.
//!
//! The analyzer type-checks one top-level declaration at a time and emits
//! its lowered form to the backend. References to other top-level names are
//! resolved lazily: the first lookup of a declaration that has not been
//! analyzed yet analyzes it on the spot, against a table that only sees the
//! module's top-level names. A declaration is analyzed at most once per
//! module pass.
//!
//! ## Module Structure
//!
//! - `decl`: built-ins, functions, constants and type annotations
//! - `expr`: expression inference (literals, tuples, lists, closures)
//! - `operators`: unary and binary operators
//! - `calls`: function calls
//! - `stmt`: blocks and statements
//! - `macros`: macro expansion through the backend
//!
//! ## Errors
//!
//! User-facing problems are pushed onto the shared diagnostics list and stop
//! the current declaration with [`Halt::Diagnostics`]. Sibling declarations
//! keep going. Fatal errors unwind the whole module pass.

mod calls;
mod decl;
mod expr;
mod macros;
mod operators;
mod stmt;

use rustc_hash::{FxHashMap, FxHashSet};
use yune_core::{
    BackendError, CompilationError, FatalError, InternalError, Name, TypeValue, Value,
};

use crate::backend::Backend;
use crate::declaration::{DeclId, Declaration, Declarations, TopLevel};
use crate::lower;
use crate::options::CompileOptions;
use crate::scope::DeclarationTable;
use crate::typed::TypedExpr;
use macros::MacroCache;

// ============================================================================
// Types
// ============================================================================

/// Why the analysis of a declaration stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// Diagnostics were recorded; siblings continue.
    Diagnostics,
    /// The whole module pass stops.
    Fatal(FatalError),
}

impl From<FatalError> for Halt {
    fn from(err: FatalError) -> Self {
        Halt::Fatal(err)
    }
}

impl From<InternalError> for Halt {
    fn from(err: InternalError) -> Self {
        Halt::Fatal(err.into())
    }
}

impl From<BackendError> for Halt {
    fn from(err: BackendError) -> Self {
        Halt::Fatal(err.into())
    }
}

pub type Check<T> = Result<T, Halt>;

/// Called on every successful name resolution with the declaration being
/// analyzed at the time, the name and what it resolved to.
pub type Observer<'a> = Box<dyn FnMut(Option<DeclId>, &Name, &Declaration) + 'a>;

/// State shared by every analyzer of one module pass.
pub struct AnalysisState<'a> {
    declarations: &'a Declarations<'a>,
    backend: &'a mut dyn Backend,
    options: &'a CompileOptions,
    diagnostics: Vec<CompilationError>,
    /// Declarations whose definition was emitted.
    defined: FxHashSet<DeclId>,
    /// Declarations whose analysis stopped on diagnostics.
    failed: FxHashSet<DeclId>,
    /// Declarations whose type is being computed.
    in_progress: FxHashSet<DeclId>,
    types: FxHashMap<DeclId, TypeValue>,
    values: FxHashMap<DeclId, Value>,
    macro_cache: MacroCache,
    observer: Option<Observer<'a>>,
    /// Stack of declarations under analysis.
    current: Vec<DeclId>,
    /// Definition order.
    order: Vec<DeclId>,
}

impl<'a> AnalysisState<'a> {
    pub fn new(
        declarations: &'a Declarations<'a>,
        backend: &'a mut dyn Backend,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            declarations,
            backend,
            options,
            diagnostics: Vec::new(),
            defined: FxHashSet::default(),
            failed: FxHashSet::default(),
            in_progress: FxHashSet::default(),
            types: FxHashMap::default(),
            values: FxHashMap::default(),
            macro_cache: MacroCache::default(),
            observer: None,
            current: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn with_observer(
        mut self,
        observer: impl FnMut(Option<DeclId>, &Name, &Declaration) + 'a,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn diagnostics(&self) -> &[CompilationError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<CompilationError> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn defined_count(&self) -> usize {
        self.defined.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn type_of(&self, id: DeclId) -> Option<&TypeValue> {
        self.types.get(&id)
    }

    /// Value of a declaration known at compile time.
    pub fn value_of(&self, id: DeclId) -> Option<&Value> {
        self.values.get(&id)
    }

    /// Declarations in the order their definitions were emitted.
    pub fn order(&self) -> &[DeclId] {
        &self.order
    }

    pub fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    fn name_of(&self, id: DeclId) -> String {
        self.declarations.get(id).name().to_string()
    }
}

// ============================================================================
// Analyzer
// ============================================================================

/// Analyzer bound to one scope.
pub struct Analyzer<'s, 't, 'a> {
    state: &'s mut AnalysisState<'a>,
    table: &'t DeclarationTable<'t>,
    /// Unknown names are reported as types rather than variables.
    in_annotation: bool,
}

impl<'s, 't, 'a> Analyzer<'s, 't, 'a> {
    pub fn new(state: &'s mut AnalysisState<'a>, table: &'t DeclarationTable<'t>) -> Self {
        Self {
            state,
            table,
            in_annotation: false,
        }
    }

    pub fn state(&self) -> &AnalysisState<'a> {
        self.state
    }

    /// An analyzer for a nested scope sharing this analyzer's state.
    fn nested<'b>(&'b mut self, table: &'b DeclarationTable<'b>) -> Analyzer<'b, 'b, 'a> {
        Analyzer {
            state: &mut *self.state,
            table,
            in_annotation: self.in_annotation,
        }
    }

    /// Record a diagnostic and stop the current declaration.
    fn report(&mut self, error: CompilationError) -> Halt {
        tracing::debug!(%error, "diagnostic");
        self.state.diagnostics.push(error);
        Halt::Diagnostics
    }

    /// Resolve `name` and return its declaration and type.
    ///
    /// A top-level declaration that has not been analyzed yet is analyzed
    /// first. Functions publish their type before their body is checked, so
    /// a function may refer to itself or to a function that refers back.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get_type(&mut self, name: &Name) -> Check<(Declaration, TypeValue)> {
        let Some(declaration) = self.table.get(name.as_str()) else {
            let error = if self.in_annotation {
                CompilationError::UndefinedType {
                    name: name.string.clone(),
                    span: name.span,
                }
            } else {
                CompilationError::UndefinedVariable {
                    name: name.string.clone(),
                    span: name.span,
                }
            };
            return Err(self.report(error));
        };

        let current = self.state.current.last().copied();
        if let Some(observer) = self.state.observer.as_mut() {
            observer(current, name, &declaration);
        }

        let ty = match &declaration {
            Declaration::Local(local) => local.ty.clone(),
            Declaration::TopLevel(id) => self.top_level_type(*id)?,
        };
        Ok((declaration, ty))
    }

    fn top_level_type(&mut self, id: DeclId) -> Check<TypeValue> {
        if let Some(ty) = self.state.types.get(&id) {
            return Ok(ty.clone());
        }
        // The failure was already reported where it happened.
        if self.state.failed.contains(&id) {
            return Err(Halt::Diagnostics);
        }
        if self.state.in_progress.contains(&id) {
            return Err(InternalError::Reentrant {
                name: self.state.name_of(id),
            }
            .into());
        }

        self.analyze(id)?;

        if let Some(ty) = self.state.types.get(&id) {
            return Ok(ty.clone());
        }
        if self.state.failed.contains(&id) {
            return Err(Halt::Diagnostics);
        }
        Err(InternalError::MissingType {
            name: self.state.name_of(id),
        }
        .into())
    }

    /// Analyze a top-level declaration unless that already happened.
    ///
    /// Diagnostics mark the declaration as failed and are not an error of
    /// this call. Only fatal errors are returned.
    pub fn analyze(&mut self, id: DeclId) -> Result<(), FatalError> {
        if self.state.defined.contains(&id) || self.state.failed.contains(&id) {
            return Ok(());
        }

        let declarations = self.state.declarations;
        let entry = declarations.get(id);
        let span = tracing::debug_span!("analyze", name = entry.name());
        let _enter = span.enter();

        // Only the top-level names are visible to the declaration.
        let table = self.table.top_level();
        let mut analyzer = Analyzer::new(&mut *self.state, &table);
        analyzer.state.current.push(id);
        let result = match entry {
            TopLevel::Builtin(builtin) => analyzer.analyze_builtin(id, builtin),
            TopLevel::Function(function) => analyzer.analyze_function(id, function),
            TopLevel::Constant(constant) => analyzer.analyze_constant(id, constant),
        };
        analyzer.state.current.pop();
        analyzer.state.in_progress.remove(&id);

        match result {
            Ok(()) => {
                tracing::debug!("analysis finished");
                Ok(())
            }
            Err(Halt::Diagnostics) => {
                tracing::debug!("analysis failed");
                self.state.failed.insert(id);
                Ok(())
            }
            Err(Halt::Fatal(err)) => Err(err),
        }
    }

    /// Send a signature-only declaration to the backend.
    pub fn declare(&mut self, text: &str) -> Result<(), FatalError> {
        tracing::trace!(text, "declare");
        self.state.backend.declare(text)?;
        Ok(())
    }

    /// Send the definition of `id` to the backend and mark it defined.
    pub fn define(&mut self, id: DeclId, text: &str) -> Result<(), FatalError> {
        if !self.state.defined.insert(id) {
            return Err(InternalError::AlreadyDefined {
                name: self.state.name_of(id),
            }
            .into());
        }
        self.state.order.push(id);
        tracing::trace!(text, "define");
        self.state.backend.define(text)?;
        Ok(())
    }

    /// Evaluate a checked expression through the backend.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn evaluate(&mut self, expr: &TypedExpr) -> Result<Value, FatalError> {
        let mut undefined = None;
        expr.visit_top_level(&mut |id| {
            if undefined.is_none() && !self.state.defined.contains(&id) {
                undefined = Some(id);
            }
        });
        if let Some(id) = undefined {
            return Err(InternalError::EvaluatedBeforeDefinition {
                name: self.state.name_of(id),
            }
            .into());
        }

        let text = lower::expression(expr);
        tracing::trace!(text = %text, "evaluate");
        let data = self.state.backend.evaluate(&text)?;
        Value::from_json(&data, &[]).map_err(|err| BackendError::from(err).into())
    }
}

// ============================================================================
// Tests
// ============================================================================
