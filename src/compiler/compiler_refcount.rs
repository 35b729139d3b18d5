//reference counting injection over the output model
//every named heap slot (variable, parameter, temporary) owns one reference while it is live.
//fresh strings and vectors are born with a count of zero and are hoisted into temporaries,
//a wich function hands its result back owning one reference which the caller's temporary adopts

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::compiler::compiler_model::*;
use crate::compiler::compiler_model_walker::{ModelListener, ModelWalker, Visit};
use crate::semantic::semantic_symbols::{ScopeId, ScopeKind, SymbolTable};
use crate::semantic::semantic_types::WichType;

pub fn inject(model: &mut Omo, symtab: &SymbolTable) {
    let mut injector = RefCountInjector::new(symtab);
    ModelWalker::new(&mut injector).walk_root(model);
}

pub struct RefCountInjector<'a> {
    symtab: &'a SymbolTable,
    //heap parameters of the function being walked
    params: Vec<String>,
    //heap slots of every block already lowered, for return sweeps of nested blocks
    scope_slots: HashMap<ScopeId, Vec<String>>,
}

//statements of a block being rebuilt
#[derive(Default)]
struct Lowered {
    stats: Vec<Omo>,
    temps: Vec<(String, WichType)>,
    returns: Vec<usize>,
}

impl Lowered {
    fn define_temp(&mut self, name: String, ty: WichType, expr: Omo, adopt: bool) {
        self.stats.push(Omo::TempVarDef(TempVarDef {
            name: name.clone(),
            ty,
            expr: child(expr),
            ref_inserted: true,
        }));
        if !adopt && ty.is_heap() {
            self.stats.push(Omo::reference(&name));
        }
        self.temps.push((name, ty));
    }
}

//a newly allocated heap value: the temporary that will hold it and its type
fn fresh_value(expr: &Omo) -> Option<(String, WichType)> {
    let ty = expr.ty()?;
    if !ty.is_heap() {
        return None;
    }
    match expr {
        Omo::StringLiteral(_)
        | Omo::VectorLiteral(_)
        | Omo::FuncCall(_)
        | Omo::StrBinary(_)
        | Omo::VectorBinary(_)
        | Omo::NegateExpr(_)
        | Omo::StrIndex(_)
        | Omo::IntToVector(_)
        | Omo::FloatToVector(_) => Some((expr.var_ref()?.to_string(), ty)),
        _ => None,
    }
}

fn temp_decl(name: &str, ty: WichType) -> Omo {
    Omo::VarDecl(VarDecl {
        name: name.to_string(),
        ty,
        is_temp: true,
    })
}

impl<'a> RefCountInjector<'a> {
    pub fn new(symtab: &'a SymbolTable) -> Self {
        RefCountInjector {
            symtab,
            params: Vec::new(),
            scope_slots: HashMap::new(),
        }
    }

    //post-order: operands are evaluated into temporaries before the operation using them
    fn hoist(&self, expr: &mut Omo, out: &mut Lowered) {
        self.unbind(expr, out);
        if self.short_circuit(expr, out) {
            return;
        }
        self.hoist_children(expr, out);
        if let Some((name, ty)) = fresh_value(expr) {
            let adopt = matches!(expr, Omo::FuncCall(_));
            let value = std::mem::replace(expr, Omo::temp(&name, ty));
            out.define_temp(name, ty, value, adopt);
        }
    }

    fn hoist_children(&self, expr: &mut Omo, out: &mut Lowered) {
        for slot in expr.children_mut() {
            match slot {
                ChildMut::Single(single) => {
                    if let Some(c) = single.as_deref_mut() {
                        self.hoist(c, out);
                    }
                }
                ChildMut::Sequence(list) => {
                    for c in list.iter_mut() {
                        self.hoist(c, out);
                    }
                }
                ChildMut::Map(_) => {}
            }
        }
    }

    //the bound value is held by the bind's temporary, the body takes the bind's place
    fn unbind(&self, expr: &mut Omo, out: &mut Lowered) {
        let Omo::Bind(bind) = expr else {
            return;
        };
        let name = bind.name.clone();
        let ty = bind.ty;
        let value = bind.value.take();
        let body = bind.body.take();
        if let Some(mut value) = value {
            self.hoist(&mut value, out);
            out.define_temp(name, ty, *value, false);
        }
        if let Some(body) = body {
            *expr = *body;
            self.unbind(expr, out);
        }
    }

    //the right operand of && and || runs only when the left one does not decide the result:
    //t = left; if (t) { right temps; t = right; drop right temps }   (if (!t) for ||)
    fn short_circuit(&self, expr: &mut Omo, out: &mut Lowered) -> bool {
        let Omo::IntBinary(b) = expr else {
            return false;
        };
        if b.op != "&&" && b.op != "||" {
            return false;
        }
        self.hoist_child(&mut b.left, out);
        let mut inner = Lowered::default();
        self.hoist_child(&mut b.right, &mut inner);
        if inner.stats.is_empty() {
            return true;
        }

        let name = b.var_ref.clone();
        let guard = if b.op == "&&" {
            Omo::temp(&name, WichType::Boolean)
        } else {
            Omo::NotExpr(UnaryExpr {
                expr: child(Omo::temp(&name, WichType::Boolean)),
                ty: WichType::Boolean,
                var_ref: String::new(),
            })
        };
        let left = b.left.take();
        let right = b.right.take();
        if let Some(left) = left {
            out.define_temp(name.clone(), WichType::Boolean, *left, false);
        }

        let mut stats = inner.stats;
        stats.push(Omo::AssignStat(AssignStat {
            name: name.clone(),
            ty: WichType::Boolean,
            expr: right,
            var_ref: String::new(),
        }));
        let cleanup = inner
            .temps
            .iter()
            .rev()
            .filter(|(_, ty)| ty.is_heap())
            .map(|(temp, _)| Omo::dereference(temp))
            .collect();
        let locals = inner
            .temps
            .iter()
            .map(|(temp, ty)| (temp.clone(), temp_decl(temp, *ty)))
            .collect();
        out.stats.push(Omo::IfStat(IfStat {
            cond: child(guard),
            then: child(Omo::Block(Block {
                locals,
                stats,
                cleanup,
                rc_injected: true,
                ..Block::default()
            })),
            else_branch: None,
        }));
        *expr = Omo::temp(&name, WichType::Boolean);
        true
    }

    fn hoist_child(&self, expr: &mut Child, out: &mut Lowered) {
        if let Some(e) = expr.as_deref_mut() {
            self.hoist(e, out);
        }
    }

    //leave expr as a temporary that owns one reference to the value, returning its name
    fn hold(&self, expr: &mut Omo, capture: &str, ty: WichType, out: &mut Lowered) -> String {
        self.hoist(expr, out);
        match expr {
            Omo::VarRef(v) if v.is_temp => v.name.clone(),
            _ => {
                let borrowed = std::mem::replace(expr, Omo::temp(capture, ty));
                out.define_temp(capture.to_string(), ty, borrowed, false);
                capture.to_string()
            }
        }
    }

    fn lower_statement(&self, stat: Omo, out: &mut Lowered) {
        match stat {
            Omo::VarDefStat(mut s) => {
                if let Some(expr) = s.expr.as_deref_mut() {
                    self.unbind(expr, out);
                    if s.ty.is_heap() && !matches!(expr, Omo::FuncCall(_)) {
                        // the variable takes the fresh value directly
                        self.hoist_children(expr, out);
                    } else {
                        self.hoist(expr, out);
                    }
                }
                let heap = s.ty.is_heap();
                let name = s.name.clone();
                out.stats.push(Omo::VarDefStat(s));
                if heap {
                    out.stats.push(Omo::reference(&name));
                }
            }
            Omo::AssignStat(mut s) if s.ty.is_heap() => {
                if let Some(expr) = s.expr.as_deref_mut() {
                    self.hold(expr, &s.var_ref, s.ty, out);
                }
                let name = s.name.clone();
                out.stats.push(Omo::dereference(&name));
                out.stats.push(Omo::AssignStat(s));
                out.stats.push(Omo::reference(&name));
            }
            Omo::AssignStat(mut s) => {
                self.hoist_child(&mut s.expr, out);
                out.stats.push(Omo::AssignStat(s));
            }
            Omo::ReturnStat(mut s) => {
                if let Some(expr) = s.expr.as_deref_mut() {
                    if s.ty.is_heap() {
                        let holder = self.hold(expr, &s.var_ref, s.ty, out);
                        // the reference handed over to the caller
                        out.stats.push(Omo::reference(&holder));
                    } else {
                        self.hoist(expr, out);
                        let value = std::mem::replace(expr, Omo::temp(&s.var_ref, s.ty));
                        out.define_temp(s.var_ref.clone(), s.ty, value, false);
                    }
                }
                out.returns.push(out.stats.len());
                out.stats.push(Omo::ReturnStat(s));
            }
            Omo::CallStat(mut s) => {
                let Some(call) = s.call.as_deref_mut() else {
                    return;
                };
                if call.ty().is_some_and(WichType::is_heap) {
                    // the unused result is adopted by a temporary and dropped with the block
                    self.hoist(call, out);
                } else {
                    self.hoist_children(call, out);
                    out.stats.push(Omo::CallStat(s));
                }
            }
            Omo::PrintStat(mut s) => {
                self.hoist_child(&mut s.expr, out);
                out.stats.push(Omo::PrintStat(s));
            }
            Omo::IfStat(mut s) => {
                self.hoist_child(&mut s.cond, out);
                out.stats.push(Omo::IfStat(s));
            }
            Omo::ElementAssignStat(mut s) => {
                self.hoist_child(&mut s.index, out);
                self.hoist_child(&mut s.expr, out);
                out.stats.push(Omo::ElementAssignStat(s));
            }
            Omo::WhileStat(s) => out.stats.push(self.lower_while(s)),
            other => out.stats.push(other),
        }
    }

    //a condition allocating heap values is evaluated at the top of the body every iteration:
    //while (true) { temps; if (!cond) { drop temps; break; } body }
    fn lower_while(&self, mut stat: WhileStat) -> Omo {
        let mut pre = Lowered::default();
        self.hoist_child(&mut stat.cond, &mut pre);
        if pre.temps.is_empty() {
            return Omo::WhileStat(stat);
        }
        let Some(Omo::Block(body)) = stat.body.as_deref_mut() else {
            return Omo::WhileStat(stat);
        };
        let cond = std::mem::replace(
            &mut stat.cond,
            child(Omo::BoolLiteral(Literal {
                value: "true".to_string(),
                var_ref: None,
            })),
        );
        let mut exit_stats: Vec<Omo> = pre
            .temps
            .iter()
            .rev()
            .filter(|(_, ty)| ty.is_heap())
            .map(|(name, _)| Omo::dereference(name))
            .collect();
        exit_stats.push(Omo::BreakStat);
        let exit = Omo::IfStat(IfStat {
            cond: child(Omo::NotExpr(UnaryExpr {
                expr: cond,
                ty: WichType::Boolean,
                var_ref: String::new(),
            })),
            then: child(Omo::Block(Block {
                stats: exit_stats,
                rc_injected: true,
                ..Block::default()
            })),
            else_branch: None,
        });

        let mut locals = IndexMap::new();
        for (name, ty) in &pre.temps {
            locals.insert(name.clone(), temp_decl(name, *ty));
        }
        locals.extend(std::mem::take(&mut body.locals));
        body.locals = locals;

        let mut stats = pre.stats;
        stats.push(exit);
        stats.append(&mut body.stats);
        body.stats = stats;
        Omo::WhileStat(stat)
    }

    //heap slots of a block in declaration order: its variables, then its temporaries.
    //globals are declared at file level and released by main's block
    fn block_slots(&self, block: &Block) -> Vec<String> {
        let mut slots: Vec<String> = match block.scope {
            Some(scope) if self.symtab.scope(scope).kind == ScopeKind::Global => self
                .symtab
                .heap_variables(scope)
                .iter()
                .map(|var| var.name.clone())
                .collect(),
            _ => Vec::new(),
        };
        let decls: Vec<&VarDecl> = block
            .locals
            .values()
            .filter_map(|decl| match decl {
                Omo::VarDecl(d) if d.ty.is_heap() => Some(d),
                _ => None,
            })
            .collect();
        slots.extend(decls.iter().filter(|d| !d.is_temp).map(|d| d.name.clone()));
        slots.extend(decls.iter().filter(|d| d.is_temp).map(|d| d.name.clone()));
        slots
    }

    //slots of the enclosing blocks of the same function, innermost first
    fn enclosing_slots(&self, scope: Option<ScopeId>) -> Vec<String> {
        let mut sweep = Vec::new();
        let mut current = scope.and_then(|s| self.symtab.scope(s).parent);
        while let Some(id) = current {
            let s = self.symtab.scope(id);
            if s.kind != ScopeKind::Local {
                break;
            }
            if let Some(slots) = self.scope_slots.get(&id) {
                sweep.extend(slots.iter().rev().cloned());
            }
            current = s.parent;
        }
        sweep
    }

    fn lower_block(&mut self, block: &mut Block) {
        if block.rc_injected {
            return;
        }
        block.rc_injected = true;

        let mut out = Lowered::default();
        for stat in std::mem::take(&mut block.stats) {
            self.lower_statement(stat, &mut out);
        }
        for (name, ty) in &out.temps {
            block.locals.insert(name.clone(), temp_decl(name, *ty));
        }

        let slots = self.block_slots(block);
        if let Some(scope) = block.scope {
            self.scope_slots.insert(scope, slots.clone());
        }

        let own: Vec<Omo> = slots.iter().rev().map(|name| Omo::dereference(name)).collect();
        let params: Vec<Omo> = self.params.iter().rev().map(|name| Omo::dereference(name)).collect();

        if !out.returns.is_empty() {
            let mut sweep = own.clone();
            sweep.extend(
                self.enclosing_slots(block.scope)
                    .iter()
                    .map(|name| Omo::dereference(name)),
            );
            sweep.extend(params.iter().cloned());
            for &at in out.returns.iter().rev() {
                out.stats.splice(at..at, sweep.iter().cloned());
            }
        }

        let ends_in_return = matches!(out.stats.last(), Some(Omo::ReturnStat(_)));
        block.stats = out.stats;
        if !ends_in_return {
            block.cleanup = own;
            if block.function_body {
                block.cleanup.extend(params);
            }
        }
    }
}

impl ModelListener for RefCountInjector<'_> {
    fn visit(&mut self, omo: &mut Omo) -> Visit {
        match omo {
            Omo::Func(func) => {
                self.params = self
                    .symtab
                    .heap_parameters(func.scope)
                    .iter()
                    .map(|var| var.name.clone())
                    .collect();
                if !func.rc_injected {
                    func.rc_injected = true;
                    if let Some(Omo::Block(body)) = func.body.as_deref_mut() {
                        let mut stats: Vec<Omo> =
                            self.params.iter().map(|name| Omo::reference(name)).collect();
                        stats.append(&mut body.stats);
                        body.stats = stats;
                    }
                }
            }
            Omo::MainFunc(_) => self.params.clear(),
            Omo::Block(block) => self.lower_block(block),
            _ => {}
        }
        Visit::NoResult
    }
}
