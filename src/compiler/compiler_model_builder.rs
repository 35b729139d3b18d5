//typed parse tree -> output model
//one omo per construct, operand-specialized kinds for binary ops,
//promotion wrappers from the recorded promotions and fresh temporaries per function.
//temporaries and renamed locals never reuse a name defined in the program, a local shadowing
//an outer variable gets its own C name so every slot of a function is distinct

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::ast::{self, Expr, ExprKind, Function, Script, Statement, StatementKind};
use crate::compiler::CodegenError;
use crate::compiler::compiler_model::*;
use crate::semantic::semantic_symbols::{ScopeId, ScopeKind, SymbolId, SymbolTable};
use crate::semantic::semantic_types::WichType;

pub struct ModelBuilder<'a> {
    symtab: &'a SymbolTable,
    temps: usize,
    //names a generated identifier must not take
    taken: HashSet<String>,
    renamed: HashMap<SymbolId, String>,
    //bound temporaries of the block being built
    scratch: Vec<(String, WichType)>,
}

pub fn build_model(script: &Script, symtab: &SymbolTable) -> Result<Omo, CodegenError> {
    let mut builder = ModelBuilder::new(symtab);
    builder.file(script)
}

fn expr_type(expr: &Expr) -> Result<WichType, CodegenError> {
    match expr.ty {
        Some(WichType::Error) | None => Err(CodegenError::UntypedExpression {
            start: expr.span.start,
            end: expr.span.end,
        }),
        Some(ty) => Ok(ty),
    }
}

fn effective_type(expr: &Expr) -> Result<WichType, CodegenError> {
    let ty = expr_type(expr)?;
    Ok(expr.promote_to.unwrap_or(ty))
}

fn float_text(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{}.0", text)
    }
}

fn temp_decls(temps: Vec<(String, WichType)>) -> IndexMap<String, Omo> {
    temps
        .into_iter()
        .map(|(name, ty)| {
            let decl = Omo::VarDecl(VarDecl {
                name: name.clone(),
                ty,
                is_temp: true,
            });
            (name, decl)
        })
        .collect()
}

impl<'a> ModelBuilder<'a> {
    pub fn new(symtab: &'a SymbolTable) -> Self {
        ModelBuilder {
            symtab,
            temps: 0,
            taken: symtab.names().map(str::to_string).collect(),
            renamed: HashMap::new(),
            scratch: Vec::new(),
        }
    }

    fn new_temp(&mut self) -> String {
        loop {
            let name = format!("t{}", self.temps);
            self.temps += 1;
            if !self.taken.contains(&name) {
                return name;
            }
        }
    }

    fn rename(&mut self, name: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", name, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    //C name of a variable reference, the wich name unless the local was renamed
    fn c_name(&self, symbol: Option<SymbolId>, name: &str) -> String {
        symbol
            .and_then(|id| self.renamed.get(&id))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    //true when a variable of an outer scope is visible under this name
    fn shadows(&self, scope: ScopeId, name: &str) -> bool {
        let symtab = self.symtab;
        let s = symtab.scope(scope);
        s.kind == ScopeKind::Local
            && s
                .parent
                .and_then(|parent| symtab.resolve(parent, name))
                .is_some_and(|id| symtab.variable(id).is_some())
    }

    fn locals(&mut self, scope: ScopeId) -> Result<IndexMap<String, Omo>, CodegenError> {
        let symtab = self.symtab;
        let mut locals = IndexMap::new();
        for &id in &symtab.scope(scope).symbols {
            let Some(var) = symtab.variable(id) else {
                continue;
            };
            if var.is_parameter {
                continue;
            }
            let ty = var
                .ty
                .filter(|ty| *ty != WichType::Error)
                .ok_or_else(|| CodegenError::UntypedVariable(var.name.clone()))?;
            let name = if self.shadows(scope, &var.name) {
                let fresh = self.rename(&var.name);
                self.renamed.insert(id, fresh.clone());
                fresh
            } else {
                var.name.clone()
            };
            locals.insert(
                name.clone(),
                Omo::VarDecl(VarDecl {
                    name,
                    ty,
                    is_temp: false,
                }),
            );
        }
        Ok(locals)
    }

    fn file(&mut self, script: &Script) -> Result<Omo, CodegenError> {
        let global = script
            .scope
            .ok_or_else(|| CodegenError::MissingScope("script".to_string()))?;
        let globals = self.locals(global)?;

        let mut funcs = Vec::new();
        for function in script.functions() {
            funcs.push(self.func(function)?);
        }

        self.temps = 0;
        let mut stats = Vec::new();
        for stmt in script.statements() {
            stats.push(self.statement(stmt)?);
        }
        let body = Block {
            temps: temp_decls(std::mem::take(&mut self.scratch)),
            stats,
            scope: Some(global),
            function_body: true,
            ..Block::default()
        };
        Ok(Omo::File(File {
            globals,
            funcs,
            main: child(Omo::MainFunc(MainFunc {
                body: child(Omo::Block(body)),
            })),
        }))
    }

    fn func(&mut self, function: &Function) -> Result<Omo, CodegenError> {
        self.temps = 0;
        let missing = || CodegenError::MissingScope(function.name.clone());
        let scope = function.scope.ok_or_else(missing)?;
        let symbol = function
            .symbol
            .and_then(|id| self.symtab.function(id))
            .ok_or_else(missing)?;

        let mut args = Vec::new();
        for param in &symbol.params {
            let var = self
                .symtab
                .variable(*param)
                .ok_or_else(|| CodegenError::UntypedVariable(function.name.clone()))?;
            let ty = var
                .ty
                .ok_or_else(|| CodegenError::UntypedVariable(var.name.clone()))?;
            args.push(Omo::ArgDef(ArgDef {
                name: var.name.clone(),
                ty,
            }));
        }

        let body = self.block(&function.body, true)?;
        Ok(Omo::Func(Func {
            name: function.name.clone(),
            return_type: symbol.return_type,
            args,
            body: child(body),
            scope,
            rc_injected: false,
        }))
    }

    fn block(&mut self, block: &ast::Block, function_body: bool) -> Result<Omo, CodegenError> {
        let scope = block
            .scope
            .ok_or_else(|| CodegenError::MissingScope("block".to_string()))?;
        let locals = self.locals(scope)?;
        let outer = std::mem::take(&mut self.scratch);
        let mut stats = Vec::new();
        for stmt in &block.statements {
            stats.push(self.statement(stmt)?);
        }
        let temps = std::mem::replace(&mut self.scratch, outer);
        Ok(Omo::Block(Block {
            locals,
            temps: temp_decls(temps),
            stats,
            cleanup: Vec::new(),
            scope: Some(scope),
            function_body,
            rc_injected: false,
        }))
    }

    fn statement(&mut self, stmt: &Statement) -> Result<Omo, CodegenError> {
        Ok(match &stmt.kind {
            StatementKind::VarDef { name, value, symbol } => Omo::VarDefStat(VarDefStat {
                name: self.c_name(*symbol, name),
                ty: effective_type(value)?,
                expr: child(self.expr(value)?),
            }),
            StatementKind::Assign { name, value, symbol } => {
                let ty = effective_type(value)?;
                let expr = self.expr(value)?;
                Omo::AssignStat(AssignStat {
                    name: self.c_name(*symbol, name),
                    ty,
                    expr: child(expr),
                    var_ref: self.new_temp(),
                })
            }
            StatementKind::ElementAssign {
                name,
                index,
                value,
                symbol,
            } => Omo::ElementAssignStat(ElementAssignStat {
                name: self.c_name(*symbol, name),
                index: child(self.expr(index)?),
                expr: child(self.expr(value)?),
            }),
            StatementKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.expr(cond)?;
                let then = self.block(then_block, false)?;
                let else_branch = match else_block {
                    Some(block) => child(self.block(block, false)?),
                    None => None,
                };
                Omo::IfStat(IfStat {
                    cond: child(cond),
                    then: child(then),
                    else_branch,
                })
            }
            StatementKind::While { cond, body } => Omo::WhileStat(WhileStat {
                cond: child(self.expr(cond)?),
                body: child(self.block(body, false)?),
            }),
            StatementKind::Call(call) => Omo::CallStat(CallStat {
                call: child(self.expr(call)?),
            }),
            StatementKind::Print(value) => match value {
                Some(value) => Omo::PrintStat(PrintStat {
                    ty: Some(effective_type(value)?),
                    expr: child(self.expr(value)?),
                }),
                None => Omo::PrintStat(PrintStat { expr: None, ty: None }),
            },
            StatementKind::Return(value) => {
                let ty = effective_type(value)?;
                let expr = self.expr(value)?;
                Omo::ReturnStat(ReturnStat {
                    expr: child(expr),
                    ty,
                    var_ref: self.new_temp(),
                })
            }
            StatementKind::Block(block) => Omo::BlockStat(BlockStat {
                block: child(self.block(block, false)?),
            }),
        })
    }

    //expression with its int -> float promotion applied
    fn expr(&mut self, expr: &Expr) -> Result<Omo, CodegenError> {
        let ty = expr_type(expr)?;
        if let (ExprKind::Int(value), Some(WichType::Float)) = (&expr.kind, expr.promote_to) {
            return Ok(Omo::FloatLiteral(Literal {
                value: float_text(*value as f64),
                var_ref: None,
            }));
        }
        let omo = self.base_expr(expr, ty)?;
        match expr.promote_to {
            None => Ok(omo),
            Some(target) if target == ty => Ok(omo),
            Some(WichType::Float) if ty == WichType::Int => Ok(Omo::IntToFloat(Promotion {
                expr: child(omo),
                len: None,
                ty: WichType::Float,
                var_ref: self.new_temp(),
            })),
            Some(target) => Err(CodegenError::UnsupportedPromotion { from: ty, to: target }),
        }
    }

    //binary operand: scalars broadcast to vectors need the other operand, so they are
    //returned unwrapped together with their type
    fn operand(&mut self, expr: &Expr) -> Result<(Omo, WichType), CodegenError> {
        let ty = expr_type(expr)?;
        if expr.promote_to == Some(WichType::Vector) && ty != WichType::Vector {
            return Ok((self.base_expr(expr, ty)?, ty));
        }
        let omo = self.expr(expr)?;
        Ok((omo, effective_type(expr)?))
    }

    //a vector operand other than a variable is bound to a temporary so the
    //length of the broadcast reads it instead of evaluating it again
    fn bind_vector(&mut self, operand: &mut Omo) -> Option<(String, Omo)> {
        if matches!(operand, Omo::VarRef(_)) {
            return None;
        }
        let name = self.new_temp();
        self.scratch.push((name.clone(), WichType::Vector));
        let value = std::mem::replace(operand, Omo::temp(&name, WichType::Vector));
        Some((name, value))
    }

    fn broadcast(&mut self, scalar: Omo, scalar_ty: WichType, vector: &Omo) -> Omo {
        let len = Omo::VectorLen(VectorLen {
            expr: child(vector.clone()),
            arg_ty: WichType::Vector,
            var_ref: self.new_temp(),
        });
        let promotion = Promotion {
            expr: child(scalar),
            len: child(len),
            ty: WichType::Vector,
            var_ref: self.new_temp(),
        };
        if scalar_ty == WichType::Int {
            Omo::IntToVector(promotion)
        } else {
            Omo::FloatToVector(promotion)
        }
    }

    fn base_expr(&mut self, expr: &Expr, ty: WichType) -> Result<Omo, CodegenError> {
        Ok(match &expr.kind {
            ExprKind::Int(value) => Omo::IntLiteral(Literal {
                value: value.to_string(),
                var_ref: None,
            }),
            ExprKind::Float(value) => Omo::FloatLiteral(Literal {
                value: float_text(*value),
                var_ref: None,
            }),
            ExprKind::Bool(value) => Omo::BoolLiteral(Literal {
                value: value.to_string(),
                var_ref: None,
            }),
            ExprKind::Str(value) => Omo::StringLiteral(Literal {
                value: value.clone(),
                var_ref: Some(self.new_temp()),
            }),
            ExprKind::Vector(elements) => {
                let mut elems = Vec::new();
                for element in elements {
                    elems.push(self.expr(element)?);
                }
                Omo::VectorLiteral(VectorLiteral {
                    elems,
                    var_ref: self.new_temp(),
                })
            }
            ExprKind::Identifier { name, symbol } => Omo::var(&self.c_name(*symbol, name), ty),
            ExprKind::Binary { left, op, right } => {
                let (mut l, l_ty) = self.operand(left)?;
                let (mut r, r_ty) = self.operand(right)?;
                let mut bound = None;
                if l_ty != r_ty && l_ty == WichType::Vector {
                    bound = self.bind_vector(&mut l);
                    r = self.broadcast(r, r_ty, &l);
                } else if l_ty != r_ty && r_ty == WichType::Vector {
                    bound = self.bind_vector(&mut r);
                    l = self.broadcast(l, l_ty, &r);
                }
                let operand_ty = if l_ty == WichType::Vector || r_ty == WichType::Vector {
                    WichType::Vector
                } else {
                    l_ty
                };
                let node = BinaryOpExpr {
                    op: op.symbol().to_string(),
                    left: child(l),
                    right: child(r),
                    ty,
                    operand_ty,
                    var_ref: self.new_temp(),
                };
                let binary = match operand_ty {
                    WichType::Float => Omo::FloatBinary(node),
                    WichType::String => Omo::StrBinary(node),
                    WichType::Vector => Omo::VectorBinary(node),
                    _ => Omo::IntBinary(node),
                };
                match bound {
                    Some((name, value)) => Omo::Bind(Bind {
                        name,
                        ty: WichType::Vector,
                        value: child(value),
                        body: child(binary),
                    }),
                    None => binary,
                }
            }
            ExprKind::Negate(operand) => Omo::NegateExpr(UnaryExpr {
                expr: child(self.expr(operand)?),
                ty,
                var_ref: self.new_temp(),
            }),
            ExprKind::Not(operand) => Omo::NotExpr(UnaryExpr {
                expr: child(self.expr(operand)?),
                ty,
                var_ref: self.new_temp(),
            }),
            ExprKind::Index { target, index } => {
                let target_ty = expr_type(target)?;
                let node = IndexExpr {
                    expr: child(self.expr(target)?),
                    index: child(self.expr(index)?),
                    ty,
                    var_ref: self.new_temp(),
                };
                if target_ty == WichType::String {
                    Omo::StrIndex(node)
                } else {
                    Omo::VectorIndex(node)
                }
            }
            ExprKind::Len(operand) => Omo::VectorLen(VectorLen {
                arg_ty: expr_type(operand)?,
                expr: child(self.expr(operand)?),
                var_ref: self.new_temp(),
            }),
            ExprKind::Call { name, args, .. } => {
                let mut built = Vec::new();
                for arg in args {
                    built.push(self.expr(arg)?);
                }
                Omo::FuncCall(FuncCall {
                    name: name.clone(),
                    args: built,
                    ty,
                    var_ref: self.new_temp(),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Item;
    use crate::error_handler::ErrorHandler;
    use crate::parser::parse_script;
    use crate::semantic::analyze;

    fn model(src: &str) -> Omo {
        let mut errors = ErrorHandler::new(src);
        let mut script = parse_script(src, &mut errors);
        let symtab = analyze(&mut script, &mut errors);
        assert!(!errors.has_errors(), "{:?}", errors.diagnostics());
        build_model(&script, &symtab).unwrap()
    }

    fn main_stats(file: &Omo) -> &[Omo] {
        let Omo::File(file) = file else { panic!("expected file") };
        let Some(Omo::MainFunc(main)) = file.main.as_deref() else {
            panic!("expected main")
        };
        let Some(Omo::Block(body)) = main.body.as_deref() else {
            panic!("expected body")
        };
        &body.stats
    }

    fn var_def_expr(stat: &Omo) -> &Omo {
        match stat {
            Omo::VarDefStat(def) => def.expr.as_deref().unwrap(),
            other => panic!("expected var def, got {}", other.kind_name()),
        }
    }

    #[test]
    fn globals_become_file_level_declarations() {
        let file = model("var x = 1\nvar s = \"hi\"");
        let Omo::File(f) = &file else { panic!() };
        let globals: Vec<&String> = f.globals.keys().collect();
        assert_eq!(globals, vec!["x", "s"]);
        assert_eq!(main_stats(&file).len(), 2);
    }

    #[test]
    fn operand_type_selects_the_binary_kind() {
        let file = model("var a = 1 + 2\nvar b = 1.5 * 2\nvar c = \"a\" + \"b\"\nvar d = [1] - [2]\nvar e = \"a\" == \"b\"\nvar f = true && false");
        let kinds: Vec<&str> = main_stats(&file).iter().map(|s| var_def_expr(s).kind_name()).collect();
        assert_eq!(
            kinds,
            vec!["IntBinary", "FloatBinary", "StrBinary", "VectorBinary", "StrBinary", "IntBinary"]
        );
    }

    #[test]
    fn int_operand_is_wrapped_for_float_arithmetic() {
        let file = model("var i = 2\nvar b = 1.5 * i");
        let Omo::FloatBinary(bin) = var_def_expr(&main_stats(&file)[1]) else { panic!() };
        assert!(matches!(bin.right.as_deref(), Some(Omo::IntToFloat(_))));
        assert!(matches!(bin.left.as_deref(), Some(Omo::FloatLiteral(l)) if l.value == "1.5"));
    }

    #[test]
    fn promoted_int_literals_become_float_literals() {
        let file = model("var v = [1, 2.5, 3]");
        let Omo::VectorLiteral(vector) = var_def_expr(&main_stats(&file)[0]) else { panic!() };
        let values: Vec<&str> = vector
            .elems
            .iter()
            .map(|e| match e {
                Omo::FloatLiteral(l) => l.value.as_str(),
                other => other.kind_name(),
            })
            .collect();
        assert_eq!(values, vec!["1.0", "2.5", "3.0"]);
    }

    #[test]
    fn broadcast_reads_a_bound_vector_operand() {
        let file = model("var v = [1, 2] + 3");
        let Omo::Bind(bind) = var_def_expr(&main_stats(&file)[0]) else {
            panic!("expected bound operand")
        };
        assert_eq!(bind.name, "t1");
        assert!(matches!(bind.value.as_deref(), Some(Omo::VectorLiteral(v)) if v.elems.len() == 2));
        let Some(Omo::VectorBinary(bin)) = bind.body.as_deref() else { panic!("expected binary") };
        assert!(matches!(bin.left.as_deref(), Some(Omo::VarRef(v)) if v.name == "t1" && v.is_temp));
        let Some(Omo::IntToVector(promo)) = bin.right.as_deref() else {
            panic!("expected int to vector")
        };
        let Some(Omo::VectorLen(len)) = promo.len.as_deref() else {
            panic!("expected len")
        };
        assert!(matches!(len.expr.as_deref(), Some(Omo::VarRef(v)) if v.name == "t1"));

        let Omo::File(f) = &file else { panic!() };
        let Some(Omo::MainFunc(main)) = f.main.as_deref() else { panic!() };
        let Some(Omo::Block(body)) = main.body.as_deref() else { panic!() };
        assert_eq!(body.temps.keys().collect::<Vec<_>>(), vec!["t1"]);
    }

    #[test]
    fn vector_variables_are_not_bound() {
        let file = model("var v = [1, 2]\nvar w = 2 * v");
        let Omo::VectorBinary(bin) = var_def_expr(&main_stats(&file)[1]) else {
            panic!("expected binary")
        };
        let Some(Omo::IntToVector(promo)) = bin.left.as_deref() else { panic!() };
        let Some(Omo::VectorLen(len)) = promo.len.as_deref() else { panic!() };
        assert!(matches!(len.expr.as_deref(), Some(Omo::VarRef(v)) if v.name == "v" && !v.is_temp));
    }

    #[test]
    fn temporaries_skip_names_the_program_defines() {
        let file = model("var t1 = \"x\"\nprint(\"y\")\nprint(t1)");
        let stats = main_stats(&file);
        let Omo::PrintStat(first) = &stats[1] else { panic!() };
        assert_eq!(first.expr.as_deref().and_then(Omo::var_ref), Some("t2"));
        let Omo::PrintStat(second) = &stats[2] else { panic!() };
        assert!(matches!(second.expr.as_deref(), Some(Omo::VarRef(v)) if v.name == "t1"));
    }

    #[test]
    fn shadowing_locals_get_their_own_name() {
        let file = model("func f(p : string) { var s = p if (true) { var s = \"b\" var p = s s = p } print(s) }");
        let Omo::File(f) = &file else { panic!() };
        let Omo::Func(func) = &f.funcs[0] else { panic!() };
        let Some(Omo::Block(body)) = func.body.as_deref() else { panic!() };
        assert_eq!(body.locals.keys().collect::<Vec<_>>(), vec!["s"]);
        let Omo::IfStat(stat) = &body.stats[1] else { panic!() };
        let Some(Omo::Block(then)) = stat.then.as_deref() else { panic!() };
        assert_eq!(then.locals.keys().collect::<Vec<_>>(), vec!["s_1", "p_1"]);
        let Omo::VarDefStat(inner_p) = &then.stats[1] else { panic!() };
        assert_eq!(inner_p.name, "p_1");
        assert!(matches!(inner_p.expr.as_deref(), Some(Omo::VarRef(v)) if v.name == "s_1"));
        let Omo::AssignStat(assign) = &then.stats[2] else { panic!() };
        assert_eq!(assign.name, "s_1");
        assert!(matches!(assign.expr.as_deref(), Some(Omo::VarRef(v)) if v.name == "p_1"));
        let Omo::PrintStat(print) = &body.stats[2] else { panic!() };
        assert!(matches!(print.expr.as_deref(), Some(Omo::VarRef(v)) if v.name == "s"));
    }

    #[test]
    fn temporaries_restart_per_function() {
        let file = model("func f() : string { return \"a\" + \"b\" }\nprint(\"x\")");
        let Omo::File(f) = &file else { panic!() };
        let Omo::Func(func) = &f.funcs[0] else { panic!() };
        let Some(Omo::Block(body)) = func.body.as_deref() else { panic!() };
        let Omo::ReturnStat(ret) = &body.stats[0] else { panic!() };
        assert_eq!(ret.expr.as_deref().and_then(Omo::var_ref), Some("t2"));
        assert_eq!(ret.var_ref, "t3");
        let Omo::PrintStat(print) = &main_stats(&file)[0] else { panic!() };
        assert_eq!(print.expr.as_deref().and_then(Omo::var_ref), Some("t0"));
    }

    #[test]
    fn function_body_holds_its_locals_and_args() {
        let file = model("func f(x : int, y : []) { var i = 3 if (i > 3) { var c = \"hi\" } }");
        let Omo::File(f) = &file else { panic!() };
        let Omo::Func(func) = &f.funcs[0] else { panic!() };
        assert_eq!(func.args.len(), 2);
        let Some(Omo::Block(body)) = func.body.as_deref() else { panic!() };
        assert!(body.function_body);
        assert_eq!(body.locals.keys().collect::<Vec<_>>(), vec!["i"]);
        let Omo::IfStat(stat) = &body.stats[1] else { panic!() };
        let Some(Omo::Block(then)) = stat.then.as_deref() else { panic!() };
        assert!(!then.function_body);
        assert_eq!(then.locals.keys().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn untyped_expression_is_fatal() {
        let src = "var x = 1";
        let mut errors = ErrorHandler::new(src);
        let mut script = parse_script(src, &mut errors);
        let symtab = analyze(&mut script, &mut errors);
        if let Some(Item::Statement(Statement {
            kind: StatementKind::VarDef { value, .. },
            ..
        })) = script.items.first_mut()
        {
            value.ty = None;
        }
        assert!(matches!(
            build_model(&script, &symtab),
            Err(CodegenError::UntypedExpression { .. })
        ));
    }
}
