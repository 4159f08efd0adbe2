//! Programmatic construction of syntax trees.
//!
//! Every node built gets its own span, one line further down the file than
//! the previous one, so diagnostics about different nodes can be told
//! apart. Used by tests and by front ends that synthesize code.
use crate::{ast::*, functions::Modifiers};
use span::{Position, Span, Spanned};
use std::{cell::Cell, rc::Rc};

pub struct AstBuilder {
    file: Rc<str>,
    line: Cell<u32>,
}

impl AstBuilder {
    pub fn new(file: &str) -> Self {
        Self {
            file: Rc::from(file),
            line: Cell::new(0),
        }
    }

    pub fn span(&self) -> Span {
        let line = self.line.get() + 1;
        self.line.set(line);
        let start = Position::new(line, 1);
        Span::new(self.file.clone(), start, start.advance(9))
    }

    pub fn ident(&self, name: &str) -> Ident {
        Spanned::new(self.span(), name.to_string())
    }

    // types

    pub fn ty(&self, name: &str) -> TypeRef {
        TypeRef {
            span: self.span(),
            kind: TypeRefKind::Basic(name.to_string()),
        }
    }

    pub fn array_ty(&self, element: TypeRef, dimension: u32) -> TypeRef {
        TypeRef {
            span: self.span(),
            kind: TypeRefKind::Array {
                element: Box::new(element),
                dimension,
                static_size: None,
            },
        }
    }

    pub fn static_array_ty(&self, element: TypeRef, size: u32) -> TypeRef {
        TypeRef {
            span: self.span(),
            kind: TypeRefKind::Array {
                element: Box::new(element),
                dimension: 1,
                static_size: Some(size),
            },
        }
    }

    // expressions

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr::new(self.span(), kind)
    }

    pub fn int(&self, value: i64) -> Expr {
        self.expr(ExprKind::IntegerLiteral(value))
    }

    pub fn double(&self, value: f64) -> Expr {
        self.expr(ExprKind::DoubleLiteral(value))
    }

    pub fn char(&self, value: u8) -> Expr {
        self.expr(ExprKind::CharLiteral(value))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::StringLiteral(value.to_string()))
    }

    pub fn boolean(&self, value: bool) -> Expr {
        self.expr(ExprKind::BooleanLiteral(value))
    }

    pub fn null(&self) -> Expr {
        self.expr(ExprKind::NullLiteral)
    }

    pub fn var(&self, name: &str) -> Expr {
        self.expr(ExprKind::VariableRef {
            name: name.to_string(),
            address: false,
        })
    }

    pub fn field(&self, target: Expr, name: &str) -> Expr {
        self.expr(ExprKind::QualifiedAccess {
            target: Box::new(target),
            name: self.ident(name),
            index: None,
            address: false,
        })
    }

    pub fn cast(&self, expr: Expr, target: TypeRef) -> Expr {
        self.expr(ExprKind::Cast {
            expr: Box::new(expr),
            target: Some(target),
        })
    }

    pub fn call(&self, name: &str, arguments: Vec<Expr>) -> Expr {
        self.expr(ExprKind::FunctionCall {
            name: self.ident(name),
            arguments,
            function: None,
        })
    }

    pub fn index(&self, target: Expr, indices: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ArrayAccess {
            target: Box::new(target),
            indices,
            address: false,
        })
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::UnaryOperator {
            op,
            operand: Box::new(operand),
            function: None,
        })
    }

    pub fn binary(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::BinaryOperator {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            function: None,
        })
    }

    pub fn new_array(&self, element: TypeRef, sizes: Vec<Expr>) -> Expr {
        self.expr(ExprKind::AllocateArray { element, sizes })
    }

    pub fn new_object(&self, class: TypeRef) -> Expr {
        self.expr(ExprKind::AllocateObject { class })
    }

    // statements

    fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            span: self.span(),
            kind,
        }
    }

    pub fn block(&self, statements: Vec<Stmt>) -> Block {
        Block {
            span: self.span(),
            statements,
        }
    }

    pub fn block_stmt(&self, block: Block) -> Stmt {
        self.stmt(StmtKind::Block(block))
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expression(expr))
    }

    pub fn decl(&self, ty: TypeRef, name: &str, init: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::VariableDecl(VariableDecl {
            ty,
            name: self.ident(name),
            init,
            resolved: None,
        }))
    }

    pub fn assign(&self, target: Expr, value: Expr) -> Stmt {
        self.stmt(StmtKind::Assignment { target, value })
    }

    /// `if`/`else if`/`else`, a clause without condition is the `else`.
    pub fn if_(&self, clauses: Vec<(Option<Expr>, Block)>) -> Stmt {
        self.stmt(StmtKind::If(
            clauses
                .into_iter()
                .map(|(condition, body)| IfClause { condition, body })
                .collect(),
        ))
    }

    pub fn while_(&self, condition: Expr, body: Block) -> Stmt {
        self.stmt(StmtKind::While { condition, body })
    }

    pub fn ret(&self, value: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(value))
    }

    pub fn import(&self, module: &str) -> Stmt {
        self.stmt(StmtKind::Import(self.ident(module)))
    }

    pub fn class(&self, name: &str, fields: Vec<(TypeRef, &str)>) -> Stmt {
        let def = ClassDef {
            name: self.ident(name),
            fields: fields
                .into_iter()
                .map(|(ty, name)| self.field_decl(ty, name))
                .collect(),
        };
        self.stmt(StmtKind::ClassDef(def))
    }

    pub fn field_decl(&self, ty: TypeRef, name: &str) -> FieldDecl {
        FieldDecl {
            span: self.span(),
            ty,
            name: self.ident(name),
        }
    }

    pub fn function_def(
        &self,
        result: TypeRef,
        name: &str,
        params: Vec<(TypeRef, &str)>,
        body: Option<Block>,
    ) -> FunctionDef {
        FunctionDef {
            name: self.ident(name),
            result,
            params: params
                .into_iter()
                .map(|(ty, name)| Param {
                    ty,
                    name: self.ident(name),
                })
                .collect(),
            var_args: false,
            modifiers: Modifiers::NONE,
            body,
            function: None,
        }
    }

    pub fn function(
        &self,
        result: TypeRef,
        name: &str,
        params: Vec<(TypeRef, &str)>,
        body: Block,
    ) -> Stmt {
        let def = self.function_def(result, name, params, Some(body));
        self.function_stmt(def)
    }

    /// A body-less declaration of a function with C linkage.
    pub fn extern_function(
        &self,
        result: TypeRef,
        name: &str,
        params: Vec<(TypeRef, &str)>,
    ) -> Stmt {
        let mut def = self.function_def(result, name, params, None);
        def.modifiers = Modifiers::C_LINKAGE;
        self.function_stmt(def)
    }

    pub fn function_stmt(&self, def: FunctionDef) -> Stmt {
        self.stmt(StmtKind::FunctionDef(def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_get_distinct_spans() {
        let b = AstBuilder::new("t.jl");
        let x = b.var("x");
        let y = b.var("x");
        assert_ne!(x.span, y.span);
        assert_eq!("t.jl", x.span.file());
        assert!(x.span.start() < y.span.start());
    }

    #[test]
    fn type_refs_display_like_source() {
        let b = AstBuilder::new("t.jl");
        assert_eq!("int[,]", b.array_ty(b.ty("int"), 2).to_string());
        assert_eq!("char[16]", b.static_array_ty(b.ty("char"), 16).to_string());
        assert_eq!(b.array_ty(b.ty("int"), 1), b.array_ty(b.ty("int"), 1));
    }
}
