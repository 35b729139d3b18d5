//first semantic pass: build the scope tree and define every symbol
//references are not checked here, the type setter resolves them once all definitions exist

use crate::ast::*;
use crate::error_handler::{ErrorHandler, ErrorKind};
use crate::semantic::semantic_symbols::{
    FunctionSymbol, ScopeId, ScopeKind, Symbol, SymbolTable, VariableSymbol,
};
use crate::semantic::semantic_types::WichType;

pub struct DefSymbols<'a> {
    symtab: &'a mut SymbolTable,
    errors: &'a mut ErrorHandler,
}

pub fn define_symbols(script: &mut Script, symtab: &mut SymbolTable, errors: &mut ErrorHandler) {
    let mut pass = DefSymbols { symtab, errors };
    pass.script(script);
}

impl<'a> DefSymbols<'a> {
    fn script(&mut self, script: &mut Script) {
        let global = self.symtab.global();
        script.scope = Some(global);
        for item in &mut script.items {
            match item {
                Item::Function(function) => self.function(function, global),
                Item::Statement(stmt) => self.statement(stmt, global),
            }
        }
    }

    fn function(&mut self, function: &mut Function, global: ScopeId) {
        let return_type = match &function.return_type {
            Some(name) => self.resolve_type(name),
            None => WichType::Void,
        };
        let scope = self
            .symtab
            .push_scope(ScopeKind::Function, &function.name, Some(global));
        let symbol = Symbol::Function(FunctionSymbol {
            name: function.name.clone(),
            return_type,
            params: Vec::new(),
            scope,
            span: function.span.clone(),
        });
        match self.symtab.define(global, symbol) {
            Ok(id) => {
                self.symtab.attach_function(scope, id);
                function.symbol = Some(id);
            }
            Err(_) => self.errors.error(
                ErrorKind::SymbolRedefinition,
                function.span.clone(),
                format!("symbol redefinition: {}", function.name),
            ),
        }
        function.scope = Some(scope);

        for param in &function.params {
            let ty = self.resolve_type(&param.ty);
            let var = Symbol::Variable(VariableSymbol {
                name: param.name.clone(),
                ty: Some(ty),
                scope,
                is_parameter: true,
                span: param.span.clone(),
            });
            match self.symtab.define(scope, var) {
                Ok(id) => {
                    if let Some(func) = function.symbol {
                        self.symtab.add_parameter(func, id);
                    }
                }
                Err(_) => self.errors.error(
                    ErrorKind::SymbolRedefinition,
                    param.span.clone(),
                    format!("symbol redefinition: {}", param.name),
                ),
            }
        }

        self.block(&mut function.body, scope);
    }

    fn resolve_type(&mut self, name: &TypeName) -> WichType {
        match self.symtab.resolve_type(&name.name) {
            Some(ty) => ty,
            None => {
                self.errors.error(
                    ErrorKind::SymbolNotFound,
                    name.span.clone(),
                    format!("symbol not found: {}", name.name),
                );
                WichType::Error
            }
        }
    }

    fn block(&mut self, block: &mut Block, parent: ScopeId) {
        let scope = self.symtab.push_scope(ScopeKind::Local, "local", Some(parent));
        block.scope = Some(scope);
        for stmt in &mut block.statements {
            self.statement(stmt, scope);
        }
    }

    fn statement(&mut self, stmt: &mut Statement, scope: ScopeId) {
        match &mut stmt.kind {
            StatementKind::VarDef { name, symbol, .. } => {
                let var = Symbol::Variable(VariableSymbol {
                    name: name.clone(),
                    ty: None,
                    scope,
                    is_parameter: false,
                    span: stmt.span.clone(),
                });
                match self.symtab.define(scope, var) {
                    Ok(id) => *symbol = Some(id),
                    Err(_) => self.errors.error(
                        ErrorKind::SymbolRedefinition,
                        stmt.span.clone(),
                        format!("symbol redefinition: {}", name),
                    ),
                }
            }
            StatementKind::If {
                then_block,
                else_block,
                ..
            } => {
                self.block(then_block, scope);
                if let Some(else_block) = else_block {
                    self.block(else_block, scope);
                }
            }
            StatementKind::While { body, .. } => self.block(body, scope),
            StatementKind::Block(block) => self.block(block, scope),
            StatementKind::Assign { .. }
            | StatementKind::ElementAssign { .. }
            | StatementKind::Call(_)
            | StatementKind::Print(_)
            | StatementKind::Return(_) => {}
        }
    }
}
