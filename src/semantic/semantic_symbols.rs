//scopes and symbols
//scopes and symbols live in two arenas owned by the SymbolTable and refer to each other by id,
//parse tree nodes and model objects keep the ids

use std::fmt::Write;

use crate::ast::Span;
use crate::semantic::semantic_types::WichType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Predefined,
    Global,
    Function,
    Local,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    pub symbols: Vec<SymbolId>,
    pub nested: Vec<ScopeId>,
    pub function: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: Option<WichType>,
    pub scope: ScopeId,
    pub is_parameter: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub return_type: WichType,
    pub params: Vec<SymbolId>,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Type(WichType),
    Variable(VariableSymbol),
    Function(FunctionSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Type(ty) => ty.name(),
            Symbol::Variable(var) => &var.name,
            Symbol::Function(func) => &func.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    predefined: ScopeId,
    global: ScopeId,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            scopes: Vec::new(),
            symbols: Vec::new(),
            predefined: ScopeId(0),
            global: ScopeId(0),
        };
        let predefined = table.push_scope(ScopeKind::Predefined, "predefined", None);
        for ty in WichType::builtins() {
            let id = SymbolId(table.symbols.len());
            table.symbols.push(Symbol::Type(ty));
            table.scopes[predefined.0].symbols.push(id);
        }
        let global = table.push_scope(ScopeKind::Global, "global", Some(predefined));
        table.predefined = predefined;
        table.global = global;
        table
    }

    pub fn predefined(&self) -> ScopeId {
        self.predefined
    }

    pub fn global(&self) -> ScopeId {
        self.global
    }

    pub fn push_scope(&mut self, kind: ScopeKind, name: &str, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            name: name.to_string(),
            parent,
            symbols: Vec::new(),
            nested: Vec::new(),
            function: None,
        });
        if let Some(parent) = parent {
            // the predefined scope is printed on its own, global is not listed under it
            if self.scopes[parent.0].kind != ScopeKind::Predefined {
                self.scopes[parent.0].nested.push(id);
            }
        }
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn variable(&self, id: SymbolId) -> Option<&VariableSymbol> {
        match self.symbol(id) {
            Symbol::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn function(&self, id: SymbolId) -> Option<&FunctionSymbol> {
        match self.symbol(id) {
            Symbol::Function(func) => Some(func),
            _ => None,
        }
    }

    //define a symbol, or return the symbol already holding that name in the scope
    pub fn define(&mut self, scope: ScopeId, symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(existing) = self.resolve_local(scope, symbol.name()) {
            return Err(existing);
        }
        let id = SymbolId(self.symbols.len());
        self.symbols.push(symbol);
        self.scopes[scope.0].symbols.push(id);
        Ok(id)
    }

    pub fn attach_function(&mut self, scope: ScopeId, function: SymbolId) {
        self.scopes[scope.0].function = Some(function);
    }

    pub fn resolve_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scope(scope)
            .symbols
            .iter()
            .copied()
            .find(|id| self.symbol(*id).name() == name)
    }

    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.resolve_local(id, name) {
                return Some(found);
            }
            current = self.scope(id).parent;
        }
        None
    }

    pub fn resolve_type(&self, name: &str) -> Option<WichType> {
        match self.resolve_local(self.predefined, name).map(|id| self.symbol(id)) {
            Some(Symbol::Type(ty)) => Some(*ty),
            _ => None,
        }
    }

    pub fn set_variable_type(&mut self, id: SymbolId, ty: WichType) {
        if let Symbol::Variable(var) = &mut self.symbols[id.0] {
            var.ty = Some(ty);
        }
    }

    pub fn set_return_type(&mut self, id: SymbolId, ty: WichType) {
        if let Symbol::Function(func) = &mut self.symbols[id.0] {
            func.return_type = ty;
        }
    }

    pub fn add_parameter(&mut self, function: SymbolId, param: SymbolId) {
        if let Symbol::Function(func) = &mut self.symbols[function.0] {
            func.params.push(param);
        }
    }

    //the function owning this scope, walking outwards through local blocks
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            match s.kind {
                ScopeKind::Function => return s.function,
                ScopeKind::Global | ScopeKind::Predefined => return None,
                ScopeKind::Local => current = s.parent,
            }
        }
        None
    }

    //variables (not parameters) defined directly in a scope, in declaration order
    pub fn variables(&self, scope: ScopeId) -> Vec<&VariableSymbol> {
        self.scope(scope)
            .symbols
            .iter()
            .filter_map(|id| self.variable(*id))
            .filter(|var| !var.is_parameter)
            .collect()
    }

    //every defined name, in definition order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(Symbol::name)
    }

    pub fn heap_variables(&self, scope: ScopeId) -> Vec<&VariableSymbol> {
        self.variables(scope)
            .into_iter()
            .filter(|var| var.ty.is_some_and(WichType::is_heap))
            .collect()
    }

    pub fn heap_parameters(&self, function_scope: ScopeId) -> Vec<&VariableSymbol> {
        self.scope(function_scope)
            .symbols
            .iter()
            .filter_map(|id| self.variable(*id))
            .filter(|var| var.is_parameter && var.ty.is_some_and(WichType::is_heap))
            .collect()
    }

    pub fn dump(&self, scope: ScopeId) -> String {
        let mut out = String::new();
        self.dump_scope(scope, 0, &mut out);
        out
    }

    fn dump_scope(&self, id: ScopeId, level: usize, out: &mut String) {
        let scope = self.scope(id);
        let indent = "    ".repeat(level);
        let _ = writeln!(out, "{}{} {{", indent, scope.name);
        let mut printed = Vec::new();
        for sym in &scope.symbols {
            match self.symbol(*sym) {
                Symbol::Type(ty) => {
                    let _ = writeln!(out, "{}    {}", indent, ty.name());
                }
                Symbol::Variable(var) => {
                    let ty = var.ty.map_or("void", WichType::name);
                    let _ = writeln!(out, "{}    {}.{}:{}", indent, scope.name, var.name, ty);
                }
                Symbol::Function(func) => {
                    printed.push(func.scope);
                    self.dump_scope(func.scope, level + 1, out);
                }
            }
        }
        for nested in &scope.nested {
            if !printed.contains(nested) {
                self.dump_scope(*nested, level + 1, out);
            }
        }
        let _ = writeln!(out, "{}}}", indent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, scope: ScopeId, ty: Option<WichType>) -> Symbol {
        Symbol::Variable(VariableSymbol {
            name: name.to_string(),
            ty,
            scope,
            is_parameter: false,
            span: 0..0,
        })
    }

    #[test]
    fn predefined_scope_lists_builtin_types() {
        let table = SymbolTable::new();
        assert_eq!(
            table.dump(table.predefined()),
            "predefined {\n    int\n    float\n    string\n    []\n    boolean\n}\n"
        );
    }

    #[test]
    fn resolution_walks_outwards() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let x = table.define(global, var("x", global, Some(WichType::Int))).unwrap();
        let local = table.push_scope(ScopeKind::Local, "local", Some(global));
        assert_eq!(table.resolve(local, "x"), Some(x));
        assert_eq!(table.resolve_local(local, "x"), None);
        assert_eq!(table.resolve_type("[]"), Some(WichType::Vector));
        assert_eq!(table.resolve(local, "int").map(|id| table.symbol(id).name().to_string()), Some("int".into()));
    }

    #[test]
    fn redefinition_returns_existing_symbol() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let first = table.define(global, var("x", global, None)).unwrap();
        assert_eq!(table.define(global, var("x", global, None)), Err(first));
    }

    #[test]
    fn heap_variables_keep_declaration_order() {
        let mut table = SymbolTable::new();
        let global = table.global();
        table.define(global, var("s", global, Some(WichType::String))).unwrap();
        table.define(global, var("i", global, Some(WichType::Int))).unwrap();
        table.define(global, var("v", global, Some(WichType::Vector))).unwrap();
        let names: Vec<&str> = table.heap_variables(global).iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["s", "v"]);
    }
}
