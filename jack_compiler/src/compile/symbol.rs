use std::{collections::BTreeMap, fmt};

use smol_str::SmolStr;

use super::vm_writer::Segment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Declared type, either a primitive like `int` or a class name.
    pub ty: SmolStr,
    pub kind: SymbolKind,
    /// Dense, zero-based index within the symbol's kind.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Shared by all instances of a class.
    Static,
    /// Instance variable.
    Field,
    Argument,
    /// Local variable of a subroutine.
    Local,
}

impl SymbolKind {
    /// Class scope lives for the whole class. Subroutine scope is
    /// cleared at the start of each subroutine.
    #[inline]
    pub fn is_class_scope(&self) -> bool {
        matches!(self, SymbolKind::Static | SymbolKind::Field)
    }

    /// Memory segment the VM addresses this kind of variable through.
    #[rustfmt::skip]
    pub fn segment(&self) -> Segment {
        match self {
            SymbolKind::Static   => Segment::Static,
            SymbolKind::Field    => Segment::This,
            SymbolKind::Argument => Segment::Argument,
            SymbolKind::Local    => Segment::Local,
        }
    }

    fn counter(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SymbolKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolKind::Static   => write!(f, "static"),
            SymbolKind::Field    => write!(f, "field"),
            SymbolKind::Argument => write!(f, "argument"),
            SymbolKind::Local    => write!(f, "local"),
        }
    }
}

/// Two level symbol table.
///
/// Names resolve in the subroutine scope first, which shadows the class scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: BTreeMap<SmolStr, Symbol>,
    subroutine_scope: BTreeMap<SmolStr, Symbol>,
    /// Next index of each kind, in [`SymbolKind`] declaration order.
    counters: [usize; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol with the next free index of its kind.
    ///
    /// Defining an existing name again replaces the earlier entry.
    pub fn define(&mut self, name: impl Into<SmolStr>, ty: impl Into<SmolStr>, kind: SymbolKind) -> usize {
        let counter = &mut self.counters[kind.counter()];
        let index = *counter;
        *counter += 1;

        let symbol = Symbol {
            ty: ty.into(),
            kind,
            index,
        };
        if kind.is_class_scope() {
            self.class_scope.insert(name.into(), symbol);
        } else {
            self.subroutine_scope.insert(name.into(), symbol);
        }

        index
    }

    /// Forget the previous subroutine's arguments and locals.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counters[SymbolKind::Argument.counter()] = 0;
        self.counters[SymbolKind::Local.counter()] = 0;
    }

    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    #[inline]
    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        self.lookup(name).map(|symbol| symbol.kind)
    }

    #[inline]
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|symbol| symbol.ty.as_str())
    }

    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup(name).map(|symbol| symbol.index)
    }

    /// Number of symbols defined so far of the given kind.
    #[inline]
    pub fn var_count(&self, kind: SymbolKind) -> usize {
        self.counters[kind.counter()]
    }
}
