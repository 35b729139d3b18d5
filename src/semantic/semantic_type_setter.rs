//second semantic pass: resolve every reference, compute expression types,
//record implicit promotions and set the types of variables defined with `var`

use crate::ast::*;
use crate::error_handler::{ErrorHandler, ErrorKind};
use crate::semantic::semantic_symbols::{ScopeId, Symbol, SymbolId, SymbolTable};
use crate::semantic::semantic_types::{WichType, arithmetic_result, can_assign};

pub struct TypeSetter<'a> {
    symtab: &'a mut SymbolTable,
    errors: &'a mut ErrorHandler,
}

pub fn set_types(script: &mut Script, symtab: &mut SymbolTable, errors: &mut ErrorHandler) {
    let global = symtab.global();
    let mut pass = TypeSetter { symtab, errors };
    for item in &mut script.items {
        match item {
            Item::Function(function) => pass.block(&mut function.body),
            Item::Statement(stmt) => pass.statement(stmt, script.scope.unwrap_or(global)),
        }
    }
}

//widen an expression to the type its consumer expects
fn promote(expr: &mut Expr, target: WichType) {
    if expr.ty != Some(target) {
        expr.promote_to = Some(target);
    }
}

impl<'a> TypeSetter<'a> {
    fn error(&mut self, kind: ErrorKind, span: &Span, message: String) {
        self.errors.error(kind, span.clone(), message);
    }

    fn block(&mut self, block: &mut Block) {
        let Some(scope) = block.scope else {
            return;
        };
        for stmt in &mut block.statements {
            self.statement(stmt, scope);
        }
    }

    fn statement(&mut self, stmt: &mut Statement, scope: ScopeId) {
        let span = stmt.span.clone();
        match &mut stmt.kind {
            StatementKind::VarDef { name, value, symbol } => {
                let mut ty = self.value(value, scope);
                if ty == WichType::Void {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &value.span,
                        format!("invalid operation: {} is initialized with a void value", name),
                    );
                    ty = WichType::Error;
                }
                if let Some(id) = symbol {
                    self.symtab.set_variable_type(*id, ty);
                }
            }
            StatementKind::Assign { name, value, symbol } => {
                let ty = self.value(value, scope);
                let Some(id) = self.resolve_variable(name, scope, &span) else {
                    return;
                };
                *symbol = Some(id);
                let declared = self.symtab.variable(id).and_then(|v| v.ty);
                match declared {
                    None => self.symtab.set_variable_type(id, ty),
                    Some(WichType::Error) => {}
                    Some(_) if ty == WichType::Error => {}
                    Some(target) if can_assign(ty, target) => promote(value, target),
                    Some(target) => self.error(
                        ErrorKind::IncompatibleTypes,
                        &span,
                        format!("incompatible types: cannot assign {} to {} of type {}", ty, name, target),
                    ),
                }
            }
            StatementKind::ElementAssign {
                name,
                index,
                value,
                symbol,
            } => {
                let index_ty = self.expr(index, scope);
                let value_ty = self.value(value, scope);
                if let Some(id) = self.resolve_variable(name, scope, &span) {
                    *symbol = Some(id);
                    let target = self.symtab.variable(id).and_then(|v| v.ty);
                    match target {
                        Some(WichType::Vector) | Some(WichType::Error) => {}
                        Some(other) => self.error(
                            ErrorKind::InvalidOperation,
                            &span,
                            format!("invalid operation: element assignment to {} of type {}", name, other),
                        ),
                        None => self.error(
                            ErrorKind::ForwardReferenceToVariable,
                            &span,
                            format!("forward reference to variable: {}", name),
                        ),
                    }
                }
                self.expect_index(index, index_ty);
                match value_ty {
                    WichType::Int | WichType::Float => promote(value, WichType::Float),
                    WichType::Error => {}
                    other => self.error(
                        ErrorKind::IncompatibleTypes,
                        &value.span,
                        format!("incompatible types: vector elements are numbers, found {}", other),
                    ),
                }
            }
            StatementKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.condition(cond, scope);
                self.block(then_block);
                if let Some(else_block) = else_block {
                    self.block(else_block);
                }
            }
            StatementKind::While { cond, body } => {
                self.condition(cond, scope);
                self.block(body);
            }
            StatementKind::Call(call) => {
                self.expr(call, scope);
            }
            StatementKind::Print(value) => {
                if let Some(value) = value {
                    self.value(value, scope);
                }
            }
            StatementKind::Return(value) => self.return_statement(value, scope, &span),
            StatementKind::Block(block) => self.block(block),
        }
    }

    fn return_statement(&mut self, value: &mut Expr, scope: ScopeId, span: &Span) {
        let ty = self.value(value, scope);
        let Some(func) = self.symtab.enclosing_function(scope) else {
            self.error(
                ErrorKind::InvalidOperation,
                span,
                "invalid operation: return outside of a function".to_string(),
            );
            return;
        };
        let Some(func) = self.symtab.function(func) else {
            return;
        };
        let expected = func.return_type;
        let name = func.name.clone();
        match expected {
            WichType::Void => self.error(
                ErrorKind::InvalidOperation,
                span,
                format!("invalid operation: {} has no return type but returns a value", name),
            ),
            WichType::Error => {}
            _ if ty == WichType::Error => {}
            target if can_assign(ty, target) => promote(value, target),
            target => self.error(
                ErrorKind::IncompatibleTypes,
                span,
                format!("incompatible types: {} returns {}, found {}", name, target, ty),
            ),
        }
    }

    fn condition(&mut self, cond: &mut Expr, scope: ScopeId) {
        let ty = self.value(cond, scope);
        if ty != WichType::Boolean && ty != WichType::Error {
            self.error(
                ErrorKind::IncompatibleTypes,
                &cond.span,
                format!("incompatible types: condition must be boolean, found {}", ty),
            );
        }
    }

    fn expect_index(&mut self, index: &Expr, ty: WichType) {
        if ty != WichType::Int && ty != WichType::Error {
            self.error(
                ErrorKind::IncompatibleTypes,
                &index.span,
                format!("incompatible types: index must be int, found {}", ty),
            );
        }
    }

    fn resolve_variable(&mut self, name: &str, scope: ScopeId, span: &Span) -> Option<SymbolId> {
        match self.symtab.resolve(scope, name) {
            None => {
                self.error(ErrorKind::SymbolNotFound, span, format!("symbol not found: {}", name));
                None
            }
            Some(id) => match self.symtab.symbol(id) {
                Symbol::Variable(_) => Some(id),
                _ => {
                    self.error(
                        ErrorKind::InvalidOperation,
                        span,
                        format!("invalid operation: {} is not a variable", name),
                    );
                    None
                }
            },
        }
    }

    //an expression whose value is used: void calls are rejected here
    fn value(&mut self, expr: &mut Expr, scope: ScopeId) -> WichType {
        let ty = self.expr(expr, scope);
        if ty == WichType::Void {
            self.error(
                ErrorKind::InvalidOperation,
                &expr.span,
                "invalid operation: void function result used as a value".to_string(),
            );
            expr.ty = Some(WichType::Error);
            return WichType::Error;
        }
        ty
    }

    pub fn expr(&mut self, expr: &mut Expr, scope: ScopeId) -> WichType {
        let span = expr.span.clone();
        let ty = match &mut expr.kind {
            ExprKind::Int(_) => WichType::Int,
            ExprKind::Float(_) => WichType::Float,
            ExprKind::Str(_) => WichType::String,
            ExprKind::Bool(_) => WichType::Boolean,
            ExprKind::Vector(elements) => {
                for element in elements.iter_mut() {
                    match self.value(element, scope) {
                        WichType::Int | WichType::Float => promote(element, WichType::Float),
                        WichType::Error => {}
                        other => self.error(
                            ErrorKind::IncompatibleTypes,
                            &element.span,
                            format!("incompatible types: vector elements are numbers, found {}", other),
                        ),
                    }
                }
                WichType::Vector
            }
            ExprKind::Identifier { name, symbol } => self.identifier(name, symbol, scope, &span),
            ExprKind::Binary { left, op, right } => {
                let l = self.value(left, scope);
                let r = self.value(right, scope);
                self.binary(left, *op, right, l, r, &span)
            }
            ExprKind::Negate(operand) => match self.value(operand, scope) {
                ty @ (WichType::Int | WichType::Float | WichType::Vector) => ty,
                WichType::Error => WichType::Error,
                other => {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &span,
                        format!("invalid operation: - {}", other),
                    );
                    WichType::Error
                }
            },
            ExprKind::Not(operand) => match self.value(operand, scope) {
                WichType::Boolean => WichType::Boolean,
                WichType::Error => WichType::Error,
                other => {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &span,
                        format!("invalid operation: ! {}", other),
                    );
                    WichType::Error
                }
            },
            ExprKind::Index { target, index } => {
                let target_ty = self.value(target, scope);
                let index_ty = self.value(index, scope);
                self.expect_index(index, index_ty);
                match target_ty {
                    WichType::Vector => WichType::Float,
                    WichType::String => WichType::String,
                    WichType::Error => WichType::Error,
                    other => {
                        self.error(
                            ErrorKind::InvalidOperation,
                            &span,
                            format!("invalid operation: cannot index a value of type {}", other),
                        );
                        WichType::Error
                    }
                }
            }
            ExprKind::Len(operand) => match self.value(operand, scope) {
                WichType::Vector | WichType::String => WichType::Int,
                WichType::Error => WichType::Error,
                other => {
                    self.error(
                        ErrorKind::InvalidOperation,
                        &span,
                        format!("invalid operation: len of {}", other),
                    );
                    WichType::Error
                }
            },
            ExprKind::Call { name, args, symbol } => self.call(name, args, symbol, scope, &span),
        };
        expr.ty = Some(ty);
        ty
    }

    fn identifier(
        &mut self,
        name: &str,
        symbol: &mut Option<SymbolId>,
        scope: ScopeId,
        span: &Span,
    ) -> WichType {
        let Some(id) = self.symtab.resolve(scope, name) else {
            self.error(ErrorKind::SymbolNotFound, span, format!("symbol not found: {}", name));
            return WichType::Error;
        };
        *symbol = Some(id);
        match self.symtab.symbol(id) {
            Symbol::Variable(var) => match var.ty {
                Some(ty) => ty,
                None => {
                    self.error(
                        ErrorKind::ForwardReferenceToVariable,
                        span,
                        format!("forward reference to variable: {}", name),
                    );
                    WichType::Error
                }
            },
            Symbol::Function(_) | Symbol::Type(_) => {
                self.error(
                    ErrorKind::InvalidOperation,
                    span,
                    format!("invalid operation: {} is not a value", name),
                );
                WichType::Error
            }
        }
    }

    fn binary(
        &mut self,
        left: &mut Expr,
        op: Operator,
        right: &mut Expr,
        l: WichType,
        r: WichType,
        span: &Span,
    ) -> WichType {
        if l == WichType::Error || r == WichType::Error {
            return WichType::Error;
        }
        let sym = op.symbol();

        if op.is_arithmetic() {
            if l == WichType::String || r == WichType::String {
                if l != r {
                    self.error(
                        ErrorKind::IncompatibleTypes,
                        span,
                        format!("incompatible types: {} {} {}", l, sym, r),
                    );
                    return WichType::Error;
                }
                if op != Operator::Plus {
                    self.error(
                        ErrorKind::InvalidOperation,
                        span,
                        format!("invalid operation: {} {} {}", l, sym, r),
                    );
                    return WichType::Error;
                }
                return WichType::String;
            }
            return match arithmetic_result(l, r) {
                Some(result) => {
                    promote(left, result);
                    promote(right, result);
                    result
                }
                None => {
                    self.error(
                        ErrorKind::InvalidOperation,
                        span,
                        format!("invalid operation: {} {} {}", l, sym, r),
                    );
                    WichType::Error
                }
            };
        }

        if op.is_ordering() {
            if l.is_numeric() && r.is_numeric() {
                if let Some(common) = arithmetic_result(l, r) {
                    promote(left, common);
                    promote(right, common);
                }
                return WichType::Boolean;
            }
            self.error(
                ErrorKind::InvalidOperation,
                span,
                format!("invalid operation: {} {} {}", l, sym, r),
            );
            return WichType::Error;
        }

        if op.is_equality() {
            if l.is_numeric() && r.is_numeric() {
                if let Some(common) = arithmetic_result(l, r) {
                    promote(left, common);
                    promote(right, common);
                }
                return WichType::Boolean;
            }
            if l == r {
                return WichType::Boolean;
            }
            self.error(
                ErrorKind::IncompatibleTypes,
                span,
                format!("incompatible types: {} {} {}", l, sym, r),
            );
            return WichType::Error;
        }

        // && and ||
        if l == WichType::Boolean && r == WichType::Boolean {
            return WichType::Boolean;
        }
        self.error(
            ErrorKind::IncompatibleTypes,
            span,
            format!("incompatible types: {} {} {}", l, sym, r),
        );
        WichType::Error
    }

    fn call(
        &mut self,
        name: &str,
        args: &mut [Expr],
        symbol: &mut Option<SymbolId>,
        scope: ScopeId,
        span: &Span,
    ) -> WichType {
        let arg_types: Vec<WichType> = args.iter_mut().map(|arg| self.value(arg, scope)).collect();
        let Some(id) = self.symtab.resolve(scope, name) else {
            self.error(ErrorKind::SymbolNotFound, span, format!("symbol not found: {}", name));
            return WichType::Error;
        };
        let Some(func) = self.symtab.function(id) else {
            self.error(
                ErrorKind::InvalidOperation,
                span,
                format!("invalid operation: {} is not a function", name),
            );
            return WichType::Error;
        };
        *symbol = Some(id);
        let return_type = func.return_type;
        let formals: Vec<Option<WichType>> = func
            .params
            .iter()
            .map(|p| self.symtab.variable(*p).and_then(|v| v.ty))
            .collect();

        if formals.len() != args.len() {
            self.error(
                ErrorKind::IncorrectArgNumbers,
                span,
                format!(
                    "incorrect number of arguments: {} expects {}, found {}",
                    name,
                    formals.len(),
                    args.len()
                ),
            );
            return return_type;
        }

        for (i, (arg, formal)) in args.iter_mut().zip(formals).enumerate() {
            let actual = arg_types[i];
            let Some(formal) = formal else { continue };
            if actual == WichType::Error || formal == WichType::Error {
                continue;
            }
            if can_assign(actual, formal) {
                promote(arg, formal);
            } else {
                self.error(
                    ErrorKind::IncompatibleArgType,
                    &arg.span,
                    format!(
                        "incompatible argument type: argument {} of {} expects {}, found {}",
                        i + 1,
                        name,
                        formal,
                        actual
                    ),
                );
            }
        }
        return_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_script;
    use crate::semantic::semantic_def_symbols::define_symbols;

    fn check(src: &str) -> (Script, SymbolTable, ErrorHandler) {
        let mut errors = ErrorHandler::new(src);
        let mut script = parse_script(src, &mut errors);
        let mut symtab = SymbolTable::new();
        define_symbols(&mut script, &mut symtab, &mut errors);
        set_types(&mut script, &mut symtab, &mut errors);
        (script, symtab, errors)
    }

    fn kinds(src: &str) -> Vec<ErrorKind> {
        check(src).2.kinds()
    }

    fn first_value(script: &Script) -> &Expr {
        match script.statements().next().map(|s| &s.kind) {
            Some(StatementKind::VarDef { value, .. }) => value,
            other => panic!("expected var def, got {:?}", other),
        }
    }

    #[test]
    fn int_operand_is_promoted_in_float_arithmetic() {
        let (script, symtab, errors) = check("var x = 1 + 2.5");
        assert!(!errors.has_errors());
        let value = first_value(&script);
        assert_eq!(value.ty, Some(WichType::Float));
        let ExprKind::Binary { left, right, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(left.promote_to, Some(WichType::Float));
        assert_eq!(right.promote_to, None);
        assert_eq!(symtab.dump(symtab.global()), "global {\n    global.x:float\n}\n");
    }

    #[test]
    fn scalar_is_broadcast_in_vector_arithmetic() {
        let (script, _, errors) = check("var v = [1, 2] * 3");
        assert!(!errors.has_errors());
        let ExprKind::Binary { left, right, .. } = &first_value(&script).kind else {
            panic!("expected binary");
        };
        assert_eq!(left.ty, Some(WichType::Vector));
        assert_eq!(right.promote_to, Some(WichType::Vector));
        let ExprKind::Vector(elements) = &left.kind else {
            panic!("expected vector literal");
        };
        assert!(elements.iter().all(|e| e.promote_to == Some(WichType::Float)));
    }

    #[test]
    fn string_arithmetic_rules() {
        assert!(kinds("var s = \"a\" + \"b\"").is_empty());
        assert_eq!(kinds("var s = \"a\" - \"b\""), vec![ErrorKind::InvalidOperation]);
        assert_eq!(kinds("var s = \"a\" + 1"), vec![ErrorKind::IncompatibleTypes]);
    }

    #[test]
    fn undefined_names_are_reported() {
        assert_eq!(kinds("var x = y"), vec![ErrorKind::SymbolNotFound]);
        assert_eq!(kinds("z = 1"), vec![ErrorKind::SymbolNotFound]);
        assert_eq!(kinds("g()"), vec![ErrorKind::SymbolNotFound]);
    }

    #[test]
    fn errors_do_not_cascade() {
        assert_eq!(kinds("var x = y + 1\nvar z = x * 2"), vec![ErrorKind::SymbolNotFound]);
    }

    #[test]
    fn reading_a_variable_before_its_definition() {
        assert_eq!(
            kinds("func f() { print(x) }\nvar x = 1"),
            vec![ErrorKind::ForwardReferenceToVariable]
        );
    }

    #[test]
    fn assignment_compatibility() {
        assert!(kinds("var x = 1.0\nx = 2").is_empty());
        assert_eq!(kinds("var x = 1\nx = 2.0"), vec![ErrorKind::IncompatibleTypes]);
        assert_eq!(kinds("var s = \"a\"\ns = [1]"), vec![ErrorKind::IncompatibleTypes]);
    }

    #[test]
    fn call_arity_and_argument_types() {
        let f = "func f(x : float, s : string) : int { return 1 }\n";
        assert!(kinds(&format!("{}var a = f(1, \"s\")", f)).is_empty());
        assert_eq!(kinds(&format!("{}f(1)", f)), vec![ErrorKind::IncorrectArgNumbers]);
        assert_eq!(kinds(&format!("{}f(1, 2)", f)), vec![ErrorKind::IncompatibleArgType]);
    }

    #[test]
    fn forward_calls_resolve() {
        assert!(kinds("var r = g(2)\nfunc g(n : int) : int { return n * 2 }").is_empty());
    }

    #[test]
    fn conditions_must_be_boolean() {
        assert_eq!(kinds("if (1) { }"), vec![ErrorKind::IncompatibleTypes]);
        assert!(kinds("while (1 < 2.0 && true) { }").is_empty());
    }

    #[test]
    fn returns_are_checked_against_the_function() {
        assert_eq!(kinds("return 1"), vec![ErrorKind::InvalidOperation]);
        assert_eq!(kinds("func f() { return 1 }"), vec![ErrorKind::InvalidOperation]);
        assert_eq!(kinds("func f() : string { return 1 }"), vec![ErrorKind::IncompatibleTypes]);
        assert!(kinds("func f() : float { return 1 }").is_empty());
    }

    #[test]
    fn void_result_cannot_be_used() {
        assert_eq!(
            kinds("func f() { }\nvar x = f()"),
            vec![ErrorKind::InvalidOperation]
        );
        assert!(kinds("func f() { }\nf()").is_empty());
    }

    #[test]
    fn indexing_and_len() {
        let (script, _, errors) = check("var v = [1, 2]\nvar e = v[1]\nvar c = \"abc\"[2]\nvar n = len(v) + len(c)");
        assert!(!errors.has_errors());
        let types: Vec<_> = script
            .statements()
            .filter_map(|s| match &s.kind {
                StatementKind::VarDef { value, .. } => value.ty,
                _ => None,
            })
            .collect();
        assert_eq!(
            types,
            vec![WichType::Vector, WichType::Float, WichType::String, WichType::Int]
        );
        assert_eq!(kinds("var v = [1]\nvar e = v[1.0]"), vec![ErrorKind::IncompatibleTypes]);
        assert_eq!(kinds("var e = 3[1]"), vec![ErrorKind::InvalidOperation]);
    }

    #[test]
    fn element_assignment_needs_a_vector() {
        assert!(kinds("var v = [1]\nv[1] = 2").is_empty());
        assert_eq!(kinds("var s = \"a\"\ns[1] = 2"), vec![ErrorKind::InvalidOperation]);
    }

    #[test]
    fn equality_and_ordering() {
        assert!(kinds("var b = \"a\" == \"b\"\nvar c = [1] != [2]\nvar d = 1 == 2.0").is_empty());
        assert_eq!(kinds("var b = \"a\" < \"b\""), vec![ErrorKind::InvalidOperation]);
        assert_eq!(kinds("var b = \"a\" == 1"), vec![ErrorKind::IncompatibleTypes]);
        assert_eq!(kinds("var b = 1 && true"), vec![ErrorKind::IncompatibleTypes]);
    }
}
