//output model objects (omo): the tree the templates are rendered from
//every kind declares its model children statically, walker and converter only go through
//children() / children_mut() so the descriptor is the single source of truth for traversal

use indexmap::IndexMap;

use crate::semantic::semantic_symbols::ScopeId;
use crate::semantic::semantic_types::WichType;

pub type Child = Option<Box<Omo>>;

pub fn child(omo: Omo) -> Child {
    Some(Box::new(omo))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Single,
    Sequence,
    Map,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelChild {
    pub name: &'static str,
    pub kind: ChildKind,
}

const fn single(name: &'static str) -> ModelChild {
    ModelChild {
        name,
        kind: ChildKind::Single,
    }
}

const fn sequence(name: &'static str) -> ModelChild {
    ModelChild {
        name,
        kind: ChildKind::Sequence,
    }
}

const fn map(name: &'static str) -> ModelChild {
    ModelChild {
        name,
        kind: ChildKind::Map,
    }
}

const NO_CHILDREN: &[ModelChild] = &[];
const FILE_CHILDREN: &[ModelChild] = &[map("globals"), sequence("funcs"), single("main")];
const FUNC_CHILDREN: &[ModelChild] = &[sequence("args"), single("body")];
const BODY_CHILDREN: &[ModelChild] = &[single("body")];
const BLOCK_CHILDREN: &[ModelChild] = &[
    map("locals"),
    map("temps"),
    sequence("stats"),
    sequence("cleanup"),
];
const EXPR_CHILDREN: &[ModelChild] = &[single("expr")];
const ELEMENT_ASSIGN_CHILDREN: &[ModelChild] = &[single("index"), single("expr")];
const IF_CHILDREN: &[ModelChild] = &[single("cond"), single("then"), single("else_branch")];
const WHILE_CHILDREN: &[ModelChild] = &[single("cond"), single("body")];
const CALL_STAT_CHILDREN: &[ModelChild] = &[single("call")];
const BLOCK_STAT_CHILDREN: &[ModelChild] = &[single("block")];
const ELEMS_CHILDREN: &[ModelChild] = &[sequence("elems")];
const CALL_CHILDREN: &[ModelChild] = &[sequence("args")];
const BINARY_CHILDREN: &[ModelChild] = &[single("left"), single("right")];
const INDEX_CHILDREN: &[ModelChild] = &[single("expr"), single("index")];
const PROMOTION_CHILDREN: &[ModelChild] = &[single("expr"), single("len")];
const BIND_CHILDREN: &[ModelChild] = &[single("value"), single("body")];

pub enum ChildRef<'a> {
    Single(Option<&'a Omo>),
    Sequence(&'a [Omo]),
    Map(&'a IndexMap<String, Omo>),
}

pub enum ChildMut<'a> {
    Single(&'a mut Child),
    Sequence(&'a mut Vec<Omo>),
    Map(&'a mut IndexMap<String, Omo>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub globals: IndexMap<String, Omo>,
    pub funcs: Vec<Omo>,
    pub main: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub name: String,
    pub return_type: WichType,
    pub args: Vec<Omo>,
    pub body: Child,
    pub scope: ScopeId,
    pub rc_injected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MainFunc {
    pub body: Child,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub locals: IndexMap<String, Omo>,
    //scratch slots of bound expressions
    pub temps: IndexMap<String, Omo>,
    pub stats: Vec<Omo>,
    pub cleanup: Vec<Omo>,
    pub scope: Option<ScopeId>,
    pub function_body: bool,
    pub rc_injected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgDef {
    pub name: String,
    pub ty: WichType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: WichType,
    pub is_temp: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDefStat {
    pub name: String,
    pub ty: WichType,
    pub expr: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStat {
    pub name: String,
    pub ty: WichType,
    pub expr: Child,
    pub var_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementAssignStat {
    pub name: String,
    pub index: Child,
    pub expr: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStat {
    pub cond: Child,
    pub then: Child,
    pub else_branch: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStat {
    pub cond: Child,
    pub body: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStat {
    pub expr: Child,
    pub ty: WichType,
    pub var_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStat {
    pub expr: Child,
    pub ty: Option<WichType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStat {
    pub call: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStat {
    pub block: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TempVarDef {
    pub name: String,
    pub ty: WichType,
    pub expr: Child,
    pub ref_inserted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefStat {
    pub var_ref: String,
}

//int, float and boolean literals hold their C text, string literals the raw value
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: String,
    pub var_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorLiteral {
    pub elems: Vec<Omo>,
    pub var_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
    pub ty: WichType,
    pub is_temp: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<Omo>,
    pub ty: WichType,
    pub var_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpExpr {
    pub op: String,
    pub left: Child,
    pub right: Child,
    pub ty: WichType,
    pub operand_ty: WichType,
    pub var_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub expr: Child,
    pub ty: WichType,
    pub var_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub expr: Child,
    pub index: Child,
    pub ty: WichType,
    pub var_ref: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorLen {
    pub expr: Child,
    pub arg_ty: WichType,
    pub var_ref: String,
}

//len is only present on scalar to vector broadcasts
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    pub expr: Child,
    pub len: Child,
    pub ty: WichType,
    pub var_ref: String,
}

//value evaluated once into a temporary, body refers to it by name
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    pub name: String,
    pub ty: WichType,
    pub value: Child,
    pub body: Child,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Omo {
    File(File),
    Func(Func),
    MainFunc(MainFunc),
    Block(Block),
    ArgDef(ArgDef),
    VarDecl(VarDecl),
    VarDefStat(VarDefStat),
    AssignStat(AssignStat),
    ElementAssignStat(ElementAssignStat),
    IfStat(IfStat),
    WhileStat(WhileStat),
    ReturnStat(ReturnStat),
    PrintStat(PrintStat),
    CallStat(CallStat),
    BlockStat(BlockStat),
    BreakStat,
    TempVarDef(TempVarDef),
    Ref(RefStat),
    Deref(RefStat),
    IntLiteral(Literal),
    FloatLiteral(Literal),
    BoolLiteral(Literal),
    StringLiteral(Literal),
    VectorLiteral(VectorLiteral),
    VarRef(VarRef),
    FuncCall(FuncCall),
    IntBinary(BinaryOpExpr),
    FloatBinary(BinaryOpExpr),
    StrBinary(BinaryOpExpr),
    VectorBinary(BinaryOpExpr),
    NegateExpr(UnaryExpr),
    NotExpr(UnaryExpr),
    VectorIndex(IndexExpr),
    StrIndex(IndexExpr),
    VectorLen(VectorLen),
    IntToFloat(Promotion),
    IntToVector(Promotion),
    FloatToVector(Promotion),
    Bind(Bind),
}

impl Omo {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Omo::File(_) => "File",
            Omo::Func(_) => "Func",
            Omo::MainFunc(_) => "MainFunc",
            Omo::Block(_) => "Block",
            Omo::ArgDef(_) => "ArgDef",
            Omo::VarDecl(_) => "VarDecl",
            Omo::VarDefStat(_) => "VarDefStat",
            Omo::AssignStat(_) => "AssignStat",
            Omo::ElementAssignStat(_) => "ElementAssignStat",
            Omo::IfStat(_) => "IfStat",
            Omo::WhileStat(_) => "WhileStat",
            Omo::ReturnStat(_) => "ReturnStat",
            Omo::PrintStat(_) => "PrintStat",
            Omo::CallStat(_) => "CallStat",
            Omo::BlockStat(_) => "BlockStat",
            Omo::BreakStat => "BreakStat",
            Omo::TempVarDef(_) => "TempVarDef",
            Omo::Ref(_) => "Ref",
            Omo::Deref(_) => "Deref",
            Omo::IntLiteral(_) => "IntLiteral",
            Omo::FloatLiteral(_) => "FloatLiteral",
            Omo::BoolLiteral(_) => "BoolLiteral",
            Omo::StringLiteral(_) => "StringLiteral",
            Omo::VectorLiteral(_) => "VectorLiteral",
            Omo::VarRef(_) => "VarRef",
            Omo::FuncCall(_) => "FuncCall",
            Omo::IntBinary(_) => "IntBinary",
            Omo::FloatBinary(_) => "FloatBinary",
            Omo::StrBinary(_) => "StrBinary",
            Omo::VectorBinary(_) => "VectorBinary",
            Omo::NegateExpr(_) => "NegateExpr",
            Omo::NotExpr(_) => "NotExpr",
            Omo::VectorIndex(_) => "VectorIndex",
            Omo::StrIndex(_) => "StrIndex",
            Omo::VectorLen(_) => "VectorLen",
            Omo::IntToFloat(_) => "IntToFloat",
            Omo::IntToVector(_) => "IntToVector",
            Omo::FloatToVector(_) => "FloatToVector",
            Omo::Bind(_) => "Bind",
        }
    }

    pub fn model_children(&self) -> &'static [ModelChild] {
        match self {
            Omo::File(_) => FILE_CHILDREN,
            Omo::Func(_) => FUNC_CHILDREN,
            Omo::MainFunc(_) => BODY_CHILDREN,
            Omo::Block(_) => BLOCK_CHILDREN,
            Omo::VarDefStat(_)
            | Omo::AssignStat(_)
            | Omo::ReturnStat(_)
            | Omo::PrintStat(_)
            | Omo::TempVarDef(_)
            | Omo::NegateExpr(_)
            | Omo::NotExpr(_)
            | Omo::VectorLen(_) => EXPR_CHILDREN,
            Omo::ElementAssignStat(_) => ELEMENT_ASSIGN_CHILDREN,
            Omo::IfStat(_) => IF_CHILDREN,
            Omo::WhileStat(_) => WHILE_CHILDREN,
            Omo::CallStat(_) => CALL_STAT_CHILDREN,
            Omo::BlockStat(_) => BLOCK_STAT_CHILDREN,
            Omo::VectorLiteral(_) => ELEMS_CHILDREN,
            Omo::FuncCall(_) => CALL_CHILDREN,
            Omo::IntBinary(_) | Omo::FloatBinary(_) | Omo::StrBinary(_) | Omo::VectorBinary(_) => {
                BINARY_CHILDREN
            }
            Omo::VectorIndex(_) | Omo::StrIndex(_) => INDEX_CHILDREN,
            Omo::IntToFloat(_) | Omo::IntToVector(_) | Omo::FloatToVector(_) => PROMOTION_CHILDREN,
            Omo::Bind(_) => BIND_CHILDREN,
            Omo::ArgDef(_)
            | Omo::VarDecl(_)
            | Omo::BreakStat
            | Omo::Ref(_)
            | Omo::Deref(_)
            | Omo::IntLiteral(_)
            | Omo::FloatLiteral(_)
            | Omo::BoolLiteral(_)
            | Omo::StringLiteral(_)
            | Omo::VarRef(_) => NO_CHILDREN,
        }
    }

    //children in descriptor order
    pub fn children(&self) -> Vec<ChildRef<'_>> {
        fn one(c: &Child) -> ChildRef<'_> {
            ChildRef::Single(c.as_deref())
        }
        match self {
            Omo::File(f) => vec![
                ChildRef::Map(&f.globals),
                ChildRef::Sequence(&f.funcs),
                one(&f.main),
            ],
            Omo::Func(f) => vec![ChildRef::Sequence(&f.args), one(&f.body)],
            Omo::MainFunc(m) => vec![one(&m.body)],
            Omo::Block(b) => vec![
                ChildRef::Map(&b.locals),
                ChildRef::Map(&b.temps),
                ChildRef::Sequence(&b.stats),
                ChildRef::Sequence(&b.cleanup),
            ],
            Omo::VarDefStat(s) => vec![one(&s.expr)],
            Omo::AssignStat(s) => vec![one(&s.expr)],
            Omo::ReturnStat(s) => vec![one(&s.expr)],
            Omo::PrintStat(s) => vec![one(&s.expr)],
            Omo::TempVarDef(s) => vec![one(&s.expr)],
            Omo::NegateExpr(e) | Omo::NotExpr(e) => vec![one(&e.expr)],
            Omo::VectorLen(e) => vec![one(&e.expr)],
            Omo::ElementAssignStat(s) => vec![one(&s.index), one(&s.expr)],
            Omo::IfStat(s) => vec![one(&s.cond), one(&s.then), one(&s.else_branch)],
            Omo::WhileStat(s) => vec![one(&s.cond), one(&s.body)],
            Omo::CallStat(s) => vec![one(&s.call)],
            Omo::BlockStat(s) => vec![one(&s.block)],
            Omo::VectorLiteral(v) => vec![ChildRef::Sequence(&v.elems)],
            Omo::FuncCall(c) => vec![ChildRef::Sequence(&c.args)],
            Omo::IntBinary(b) | Omo::FloatBinary(b) | Omo::StrBinary(b) | Omo::VectorBinary(b) => {
                vec![one(&b.left), one(&b.right)]
            }
            Omo::VectorIndex(i) | Omo::StrIndex(i) => vec![one(&i.expr), one(&i.index)],
            Omo::IntToFloat(p) | Omo::IntToVector(p) | Omo::FloatToVector(p) => {
                vec![one(&p.expr), one(&p.len)]
            }
            Omo::Bind(b) => vec![one(&b.value), one(&b.body)],
            Omo::ArgDef(_)
            | Omo::VarDecl(_)
            | Omo::BreakStat
            | Omo::Ref(_)
            | Omo::Deref(_)
            | Omo::IntLiteral(_)
            | Omo::FloatLiteral(_)
            | Omo::BoolLiteral(_)
            | Omo::StringLiteral(_)
            | Omo::VarRef(_) => Vec::new(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        match self {
            Omo::File(f) => vec![
                ChildMut::Map(&mut f.globals),
                ChildMut::Sequence(&mut f.funcs),
                ChildMut::Single(&mut f.main),
            ],
            Omo::Func(f) => vec![ChildMut::Sequence(&mut f.args), ChildMut::Single(&mut f.body)],
            Omo::MainFunc(m) => vec![ChildMut::Single(&mut m.body)],
            Omo::Block(b) => vec![
                ChildMut::Map(&mut b.locals),
                ChildMut::Map(&mut b.temps),
                ChildMut::Sequence(&mut b.stats),
                ChildMut::Sequence(&mut b.cleanup),
            ],
            Omo::VarDefStat(s) => vec![ChildMut::Single(&mut s.expr)],
            Omo::AssignStat(s) => vec![ChildMut::Single(&mut s.expr)],
            Omo::ReturnStat(s) => vec![ChildMut::Single(&mut s.expr)],
            Omo::PrintStat(s) => vec![ChildMut::Single(&mut s.expr)],
            Omo::TempVarDef(s) => vec![ChildMut::Single(&mut s.expr)],
            Omo::NegateExpr(e) | Omo::NotExpr(e) => vec![ChildMut::Single(&mut e.expr)],
            Omo::VectorLen(e) => vec![ChildMut::Single(&mut e.expr)],
            Omo::ElementAssignStat(s) => {
                vec![ChildMut::Single(&mut s.index), ChildMut::Single(&mut s.expr)]
            }
            Omo::IfStat(s) => vec![
                ChildMut::Single(&mut s.cond),
                ChildMut::Single(&mut s.then),
                ChildMut::Single(&mut s.else_branch),
            ],
            Omo::WhileStat(s) => vec![ChildMut::Single(&mut s.cond), ChildMut::Single(&mut s.body)],
            Omo::CallStat(s) => vec![ChildMut::Single(&mut s.call)],
            Omo::BlockStat(s) => vec![ChildMut::Single(&mut s.block)],
            Omo::VectorLiteral(v) => vec![ChildMut::Sequence(&mut v.elems)],
            Omo::FuncCall(c) => vec![ChildMut::Sequence(&mut c.args)],
            Omo::IntBinary(b) | Omo::FloatBinary(b) | Omo::StrBinary(b) | Omo::VectorBinary(b) => {
                vec![ChildMut::Single(&mut b.left), ChildMut::Single(&mut b.right)]
            }
            Omo::VectorIndex(i) | Omo::StrIndex(i) => {
                vec![ChildMut::Single(&mut i.expr), ChildMut::Single(&mut i.index)]
            }
            Omo::IntToFloat(p) | Omo::IntToVector(p) | Omo::FloatToVector(p) => {
                vec![ChildMut::Single(&mut p.expr), ChildMut::Single(&mut p.len)]
            }
            Omo::Bind(b) => vec![ChildMut::Single(&mut b.value), ChildMut::Single(&mut b.body)],
            Omo::ArgDef(_)
            | Omo::VarDecl(_)
            | Omo::BreakStat
            | Omo::Ref(_)
            | Omo::Deref(_)
            | Omo::IntLiteral(_)
            | Omo::FloatLiteral(_)
            | Omo::BoolLiteral(_)
            | Omo::StringLiteral(_)
            | Omo::VarRef(_) => Vec::new(),
        }
    }

    //wich type of an expression omo, None for everything else
    pub fn ty(&self) -> Option<WichType> {
        match self {
            Omo::IntLiteral(_) => Some(WichType::Int),
            Omo::FloatLiteral(_) => Some(WichType::Float),
            Omo::BoolLiteral(_) => Some(WichType::Boolean),
            Omo::StringLiteral(_) => Some(WichType::String),
            Omo::VectorLiteral(_) => Some(WichType::Vector),
            Omo::VarRef(v) => Some(v.ty),
            Omo::FuncCall(c) => Some(c.ty),
            Omo::IntBinary(b) | Omo::FloatBinary(b) | Omo::StrBinary(b) | Omo::VectorBinary(b) => {
                Some(b.ty)
            }
            Omo::NegateExpr(e) | Omo::NotExpr(e) => Some(e.ty),
            Omo::VectorIndex(i) | Omo::StrIndex(i) => Some(i.ty),
            Omo::VectorLen(_) => Some(WichType::Int),
            Omo::IntToFloat(p) | Omo::IntToVector(p) | Omo::FloatToVector(p) => Some(p.ty),
            Omo::Bind(b) => b.body.as_deref().and_then(Omo::ty),
            _ => None,
        }
    }

    //temporary name reserved for a non-trivial expression
    pub fn var_ref(&self) -> Option<&str> {
        match self {
            Omo::IntLiteral(l) | Omo::FloatLiteral(l) | Omo::BoolLiteral(l) | Omo::StringLiteral(l) => {
                l.var_ref.as_deref()
            }
            Omo::VectorLiteral(v) => Some(&v.var_ref),
            Omo::FuncCall(c) => Some(&c.var_ref),
            Omo::IntBinary(b) | Omo::FloatBinary(b) | Omo::StrBinary(b) | Omo::VectorBinary(b) => {
                Some(&b.var_ref)
            }
            Omo::NegateExpr(e) | Omo::NotExpr(e) => Some(&e.var_ref),
            Omo::VectorIndex(i) | Omo::StrIndex(i) => Some(&i.var_ref),
            Omo::VectorLen(v) => Some(&v.var_ref),
            Omo::IntToFloat(p) | Omo::IntToVector(p) | Omo::FloatToVector(p) => Some(&p.var_ref),
            _ => None,
        }
    }

    pub fn set_var_ref(&mut self, name: String) {
        match self {
            Omo::IntLiteral(l) | Omo::FloatLiteral(l) | Omo::BoolLiteral(l) | Omo::StringLiteral(l) => {
                if l.var_ref.is_some() {
                    l.var_ref = Some(name);
                }
            }
            Omo::VectorLiteral(v) => v.var_ref = name,
            Omo::FuncCall(c) => c.var_ref = name,
            Omo::IntBinary(b) | Omo::FloatBinary(b) | Omo::StrBinary(b) | Omo::VectorBinary(b) => {
                b.var_ref = name
            }
            Omo::NegateExpr(e) | Omo::NotExpr(e) => e.var_ref = name,
            Omo::VectorIndex(i) | Omo::StrIndex(i) => i.var_ref = name,
            Omo::VectorLen(v) => v.var_ref = name,
            Omo::IntToFloat(p) | Omo::IntToVector(p) | Omo::FloatToVector(p) => p.var_ref = name,
            _ => {}
        }
    }

    pub fn var(name: &str, ty: WichType) -> Omo {
        Omo::VarRef(VarRef {
            name: name.to_string(),
            ty,
            is_temp: false,
        })
    }

    pub fn temp(name: &str, ty: WichType) -> Omo {
        Omo::VarRef(VarRef {
            name: name.to_string(),
            ty,
            is_temp: true,
        })
    }

    pub fn reference(name: &str) -> Omo {
        Omo::Ref(RefStat {
            var_ref: name.to_string(),
        })
    }

    pub fn dereference(name: &str) -> Omo {
        Omo::Deref(RefStat {
            var_ref: name.to_string(),
        })
    }
}
