//! Declarations known to the compiler.
//!
//! Top-level declarations (built-ins, functions and constants) live in one
//! [`Declarations`] arena and are referred to by [`DeclId`]. Parameters and
//! local variables are [`LocalDeclaration`]s owned by the scope that
//! introduced them.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use yune_ast::{ConstantDeclaration, FunctionDeclaration, Module, TopLevelDeclaration};
use yune_core::{CompilationError, Name, Span, TypeValue};

// ============================================================================
// Top-level declarations
// ============================================================================

/// Index of a top-level declaration in [`Declarations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declarations every module starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Type,
    Int,
    Float,
    Bool,
    String,
    Nil,
    Expression,
    /// `List: Fn((Type,), Type)`
    List,
    /// `Fn: Fn((Type, Type), Type)`
    Fn,
}

impl Builtin {
    pub const ALL: [Builtin; 9] = [
        Builtin::Type,
        Builtin::Int,
        Builtin::Float,
        Builtin::Bool,
        Builtin::String,
        Builtin::Nil,
        Builtin::Expression,
        Builtin::List,
        Builtin::Fn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Type => "Type",
            Builtin::Int => "Int",
            Builtin::Float => "Float",
            Builtin::Bool => "Bool",
            Builtin::String => "String",
            Builtin::Nil => "Nil",
            Builtin::Expression => "Expression",
            Builtin::List => "List",
            Builtin::Fn => "Fn",
        }
    }

    /// The type this built-in aliases, for the type-valued built-ins.
    pub fn aliased(&self) -> Option<TypeValue> {
        Some(match self {
            Builtin::Type => TypeValue::Type,
            Builtin::Int => TypeValue::Int,
            Builtin::Float => TypeValue::Float,
            Builtin::Bool => TypeValue::Bool,
            Builtin::String => TypeValue::String,
            Builtin::Nil => TypeValue::Nil,
            Builtin::Expression => TypeValue::expression(),
            Builtin::List | Builtin::Fn => return None,
        })
    }

    /// Type of the built-in itself.
    pub fn ty(&self) -> TypeValue {
        match self {
            Builtin::List => TypeValue::function_of(vec![TypeValue::Type], TypeValue::Type),
            Builtin::Fn => {
                TypeValue::function_of(vec![TypeValue::Type, TypeValue::Type], TypeValue::Type)
            }
            _ => TypeValue::Type,
        }
    }

    /// Apply a type constructor to type arguments.
    pub fn construct(&self, arguments: &[TypeValue]) -> Option<TypeValue> {
        match (self, arguments) {
            (Builtin::List, [element]) => Some(TypeValue::list(element.clone())),
            (Builtin::Fn, [argument, ret]) => {
                Some(TypeValue::function(argument.clone(), ret.clone()))
            }
            _ => None,
        }
    }

    pub fn lower_declaration(&self) -> String {
        match self {
            Builtin::List => "ty::Type List(ty::Type element);".to_string(),
            Builtin::Fn => "ty::Type Fn(ty::Type argument, ty::Type returnType);".to_string(),
            _ => format!("extern const ty::Type {};", self.name()),
        }
    }

    pub fn lower_definition(&self) -> String {
        match (self, self.aliased()) {
            (_, Some(aliased)) => {
                format!("const ty::Type {} = {};", self.name(), aliased.lower_value())
            }
            (Builtin::List, None) => "ty::Type List(ty::Type element) {\n    \
                 return box(ty::ListType{ .element = element });\n}"
                .to_string(),
            (_, None) => "ty::Type Fn(ty::Type argument, ty::Type returnType) {\n    \
                 return box(ty::FnType{ .argument = argument, .returnType = returnType });\n}"
                .to_string(),
        }
    }
}

/// A declaration at module scope.
#[derive(Debug, Clone, Copy)]
pub enum TopLevel<'m> {
    Builtin(Builtin),
    Function(&'m FunctionDeclaration),
    Constant(&'m ConstantDeclaration),
}

impl<'m> TopLevel<'m> {
    pub fn name(&self) -> &str {
        match self {
            TopLevel::Builtin(builtin) => builtin.name(),
            TopLevel::Function(f) => f.name.as_str(),
            TopLevel::Constant(c) => c.name.as_str(),
        }
    }

    /// Where the declaration's name was written. Built-ins have no location.
    pub fn span(&self) -> Span {
        match self {
            TopLevel::Builtin(_) => Span::default(),
            TopLevel::Function(f) => f.name.span,
            TopLevel::Constant(c) => c.name.span,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, TopLevel::Function(_))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, TopLevel::Builtin(_))
    }
}

/// All top-level declarations of a module, built-ins first.
#[derive(Debug)]
pub struct Declarations<'m> {
    entries: Vec<TopLevel<'m>>,
    names: Rc<FxHashMap<String, DeclId>>,
}

impl<'m> Declarations<'m> {
    /// Merge the built-ins with the module's declarations.
    ///
    /// Every name collision, including one with a built-in, is reported as a
    /// `DuplicateDeclaration`.
    pub fn collect(module: &'m Module) -> Result<Self, Vec<CompilationError>> {
        let mut entries: Vec<TopLevel<'m>> =
            Builtin::ALL.iter().copied().map(TopLevel::Builtin).collect();
        entries.extend(module.declarations.iter().map(|decl| match decl {
            TopLevelDeclaration::Function(f) => TopLevel::Function(f),
            TopLevelDeclaration::Constant(c) => TopLevel::Constant(c),
        }));

        let mut names: FxHashMap<String, DeclId> = FxHashMap::default();
        let mut errors = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let id = DeclId(index as u32);
            if let Some(first) = names.get(entry.name()) {
                errors.push(CompilationError::DuplicateDeclaration {
                    name: entry.name().to_string(),
                    first: entries[first.index()].span(),
                    second: entry.span(),
                });
            } else {
                names.insert(entry.name().to_string(), id);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            entries,
            names: Rc::new(names),
        })
    }

    #[inline]
    pub fn get(&self, id: DeclId) -> TopLevel<'m> {
        self.entries[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        self.names.get(name).copied()
    }

    /// Shared name map, used as the top-level fallback of declaration tables.
    pub fn names(&self) -> Rc<FxHashMap<String, DeclId>> {
        Rc::clone(&self.names)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, TopLevel<'m>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (DeclId(index as u32), *entry))
    }

    pub fn builtins(&self) -> impl Iterator<Item = (DeclId, Builtin)> + '_ {
        self.iter().filter_map(|(id, entry)| match entry {
            TopLevel::Builtin(builtin) => Some((id, builtin)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Declarations visible to name lookup
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Parameter,
    Variable,
}

/// A parameter or local variable.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDeclaration {
    pub name: Name,
    pub kind: LocalKind,
    pub ty: TypeValue,
}

/// What a name resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    TopLevel(DeclId),
    Local(Rc<LocalDeclaration>),
}

impl Declaration {
    pub fn local(name: Name, kind: LocalKind, ty: TypeValue) -> Self {
        Declaration::Local(Rc::new(LocalDeclaration { name, kind, ty }))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Declaration::Local(_))
    }
}
