//! The syntax tree handed over by the parser.
//!
//! Nodes are plain data with a few annotation slots (`Expr::ty`, the field
//! index of a qualified access, the resolved `Function` of calls and
//! operators, ...). The slots are empty when the tree leaves the parser and
//! are filled in place by the [`TypeChecker`](../checker/struct.TypeChecker.html).
use crate::{
    functions::{Function, Modifiers},
    types::Type,
};
use span::{Span, Spanned};
use std::{fmt, rc::Rc};
use strum_macros::EnumDiscriminants;

pub type Ident = Spanned<String>;

/// A sequence of statements opening a lexical scope. The root of every
/// compilation unit is a block.
#[derive(Debug, Clone)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(EnumDiscriminants, Debug, Clone)]
#[strum_discriminants(derive(Hash))]
pub enum StmtKind {
    Expression(Expr),
    VariableDecl(VariableDecl),
    Assignment { target: Expr, value: Expr },
    Block(Block),
    /// `if`/`else if`/`else` chain. Only the first clause is guaranteed to
    /// have a condition, a clause without one is an `else`.
    If(Vec<IfClause>),
    While { condition: Expr, body: Block },
    Return(Option<Expr>),
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Import(Ident),
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub ty: TypeRef,
    pub name: Ident,
    pub init: Option<Expr>,
    /// The type `ty` resolved to.
    pub resolved: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct IfClause {
    pub condition: Option<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub ty: TypeRef,
    pub name: Ident,
}

/// A function definition, or a declaration if `body` is `None`
/// (functions implemented elsewhere, e.g. in C).
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Ident,
    pub result: TypeRef,
    pub params: Vec<Param>,
    pub var_args: bool,
    pub modifiers: Modifiers,
    pub body: Option<Block>,
    /// The interned function this definition belongs to.
    pub function: Option<Rc<Function>>,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Ident,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub span: Span,
    pub ty: TypeRef,
    pub name: Ident,
}

/// A type as written in the source, resolved against a `TypeInfo` later.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub span: Span,
    pub kind: TypeRefKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRefKind {
    Basic(String),
    Array {
        element: Box<TypeRef>,
        dimension: u32,
        static_size: Option<u32>,
    },
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for TypeRef {}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeRefKind::Basic(name) => write!(f, "{}", name),
            TypeRefKind::Array {
                element,
                static_size: Some(size),
                ..
            } => write!(f, "{}[{}]", element, size),
            TypeRefKind::Array {
                element, dimension, ..
            } => write!(
                f,
                "{}[{}]",
                element,
                ",".repeat(dimension.saturating_sub(1) as usize)
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
    /// Filled in by the type checker.
    pub ty: Option<Type>,
}

#[derive(EnumDiscriminants, Debug, Clone)]
#[strum_discriminants(derive(Hash))]
pub enum ExprKind {
    DoubleLiteral(f64),
    IntegerLiteral(i64),
    CharLiteral(u8),
    StringLiteral(String),
    BooleanLiteral(bool),
    NullLiteral,
    VariableRef {
        name: String,
        address: bool,
    },
    /// `target.name`
    QualifiedAccess {
        target: Box<Expr>,
        name: Ident,
        /// storage index of the field, used for the memory layout
        index: Option<usize>,
        address: bool,
    },
    /// An explicit cast has a `target` as written by the user. Implicit
    /// casts inserted by the checker have none, their type is `Expr::ty`.
    Cast {
        expr: Box<Expr>,
        target: Option<TypeRef>,
    },
    FunctionCall {
        name: Ident,
        arguments: Vec<Expr>,
        function: Option<Rc<Function>>,
    },
    /// `target[i, j, ...]`, one index per dimension.
    ArrayAccess {
        target: Box<Expr>,
        indices: Vec<Expr>,
        address: bool,
    },
    UnaryOperator {
        op: UnaryOp,
        operand: Box<Expr>,
        function: Option<Rc<Function>>,
    },
    BinaryOperator {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        function: Option<Rc<Function>>,
    },
    /// `new element[size, ...]`
    AllocateArray {
        element: TypeRef,
        sizes: Vec<Expr>,
    },
    /// `new Class`
    AllocateObject {
        class: TypeRef,
    },
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self {
            span,
            kind,
            ty: None,
        }
    }

    /// Wraps `expr` in a cast to `target` that has no source syntax.
    pub fn implicit_cast(expr: Expr, target: Type) -> Self {
        Self {
            span: expr.span.clone(),
            kind: ExprKind::Cast {
                expr: Box::new(expr),
                target: None,
            },
            ty: Some(target),
        }
    }

    pub fn is_implicit_cast(&self) -> bool {
        match self.kind {
            ExprKind::Cast { target: None, .. } => true,
            _ => false,
        }
    }

    /// Marks an assignment target as address-taken. Returns false for
    /// expressions that do not denote a storage location. The length of an
    /// array is read-only.
    pub fn mark_address(&mut self) -> bool {
        if self.kind.is_array_length() {
            return false;
        }
        match &mut self.kind {
            ExprKind::VariableRef { address, .. }
            | ExprKind::QualifiedAccess { address, .. }
            | ExprKind::ArrayAccess { address, .. } => {
                *address = true;
                true
            }
            _ => false,
        }
    }
}

impl ExprKind {
    /// Only meaningful once the accessed expression has been checked.
    fn is_array_length(&self) -> bool {
        match self {
            ExprKind::QualifiedAccess { target, .. } => match target.ty {
                Some(Type::Array(_)) => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// How the expression is called in error messages.
    pub fn describe(&self) -> &'static str {
        use self::ExprKind::*;
        match self {
            DoubleLiteral(_) | IntegerLiteral(_) | CharLiteral(_) | StringLiteral(_)
            | BooleanLiteral(_) | NullLiteral => "a literal",
            VariableRef { .. } => "a variable",
            QualifiedAccess { .. } if self.is_array_length() => "the length of an array",
            QualifiedAccess { .. } => "a field access",
            Cast { .. } => "a cast",
            FunctionCall { .. } => "a function call",
            ArrayAccess { .. } => "an array element",
            UnaryOperator { .. } | BinaryOperator { .. } => "an operator expression",
            AllocateArray { .. } | AllocateObject { .. } => "an allocation",
        }
    }
}

/// Binary operators. Each is resolved like a call to the function named by
/// its `symbol`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Less,
    Greater,
    LessEquals,
    GreaterEquals,

    Equals,
    NotEquals,

    And,
    Or,
}

impl BinaryOp {
    pub const ARITHMETIC: [BinaryOp; 5] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
    ];
    pub const RELATIONAL: [BinaryOp; 4] = [
        BinaryOp::Less,
        BinaryOp::Greater,
        BinaryOp::LessEquals,
        BinaryOp::GreaterEquals,
    ];
    pub const EQUALITY: [BinaryOp; 2] = [BinaryOp::Equals, BinaryOp::NotEquals];
    pub const LOGICAL: [BinaryOp; 2] = [BinaryOp::And, BinaryOp::Or];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEquals => "<=",
            BinaryOp::GreaterEquals => ">=",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// One of the unary operations `-`, `~` and `not`
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum UnaryOp {
    Neg,
    BitNot,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "not",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
