//parse tree of a wich script
//the parser fills in the syntax, semantic passes fill the annotation slots
//(scope ids on script/functions/blocks, resolved symbols, expression types and promotions)

use crate::semantic::semantic_symbols::{ScopeId, SymbolId};
use crate::semantic::semantic_types::WichType;

pub type Span = std::ops::Range<usize>;

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub items: Vec<Item>,
    pub scope: Option<ScopeId>,
}

//functions and global statements, in source order
#[derive(Debug, Clone)]
pub enum Item {
    Function(Function),
    Statement(Statement),
}

impl Script {
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            Item::Statement(_) => None,
        })
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.items.iter().filter_map(|item| match item {
            Item::Statement(s) => Some(s),
            Item::Function(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeName>,
    pub body: Block,
    pub span: Span,
    pub scope: Option<ScopeId>,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeName,
    pub span: Span,
}

//type as written in source, resolved against the predefined scope
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    VarDef {
        name: String,
        value: Expr,
        symbol: Option<SymbolId>,
    },
    Assign {
        name: String,
        value: Expr,
        symbol: Option<SymbolId>,
    },
    ElementAssign {
        name: String,
        index: Expr,
        value: Expr,
        symbol: Option<SymbolId>,
    },
    Call(Expr),
    Print(Option<Expr>),
    Return(Expr),
    Block(Block),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<WichType>,
    pub promote_to: Option<WichType>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: None,
            promote_to: None,
        }
    }

    //type after implicit promotion, what the consumer of this expression sees
    pub fn effective_type(&self) -> Option<WichType> {
        self.promote_to.or(self.ty)
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Vector(Vec<Expr>),
    Identifier {
        name: String,
        symbol: Option<SymbolId>,
    },
    Binary {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    Not(Box<Expr>),
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        symbol: Option<SymbolId>,
    },
    Len(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide
        )
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Operator::Less | Operator::LessEqual | Operator::Greater | Operator::GreaterEqual
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }
}
