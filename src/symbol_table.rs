use fnv::FnvHashMap;
use thiserror::Error;

/// Storage kind of a declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Var,
}

impl Kind {
    fn is_class_level(self) -> bool {
        matches!(self, Kind::Static | Kind::Field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub data_type: String,
    pub kind: Kind,
    pub index: u16,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefineError {
    #[error("'{0}' is already defined in this scope")]
    Duplicate(String),
    #[error("Too many variables")]
    TooMany,
}

#[derive(Default)]
struct Scope {
    symbols: FnvHashMap<String, Symbol>,
    counts: FnvHashMap<Kind, u16>,
}

impl Scope {
    fn clear(&mut self) {
        self.symbols.clear();
        self.counts.clear();
    }

    fn count(&self, kind: Kind) -> u16 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Two simultaneous scopes: class (static, field) and subroutine (argument, local).
#[derive(Default)]
pub struct SymbolTable {
    class_scope: Scope,
    subroutine_scope: Scope,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every class-level name. Called when a new class begins.
    pub fn start_class(&mut self) {
        self.class_scope.clear();
        self.subroutine_scope.clear();
    }

    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
    }

    /// Declares `name` with the next slot index of `kind` in the matching scope.
    pub fn define(
        &mut self,
        name: &str,
        data_type: &str,
        kind: Kind,
    ) -> Result<&Symbol, DefineError> {
        let scope = if kind.is_class_level() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };
        if scope.symbols.contains_key(name) {
            return Err(DefineError::Duplicate(name.to_string()));
        }

        let index = scope.count(kind);
        let count = index.checked_add(1).ok_or(DefineError::TooMany)?;
        scope.counts.insert(kind, count);
        let symbol = scope.symbols.entry(name.to_string()).or_insert(Symbol {
            name: name.to_string(),
            data_type: data_type.to_string(),
            kind,
            index,
        });
        Ok(&*symbol)
    }

    /// Subroutine scope shadows class scope. `None` means the name is external.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .symbols
            .get(name)
            .or_else(|| self.class_scope.symbols.get(name))
    }

    pub fn var_count(&self, kind: Kind) -> u16 {
        if kind.is_class_level() {
            self.class_scope.count(kind)
        } else {
            self.subroutine_scope.count(kind)
        }
    }
}
