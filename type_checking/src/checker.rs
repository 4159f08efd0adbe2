//! Second pass: type every expression of a unit.
//!
//! The checker walks the tree with a scoped symbol table and fills in the
//! annotation slots of the AST: the type of every expression, field
//! indices, and the function each call or operator resolved to. Wherever a
//! value flows into a slot of a wider type, an implicit cast is inserted
//! into the tree, so code generation never has to derive a coercion.
//!
//! Errors are reported to the session and checking continues. An
//! expression whose type could not be determined is skipped by its parents
//! without further messages.
use crate::{
    ast::*,
    error::{CouldNotDetermineType, SemanticError, Suggestion},
    functions::{self, Function, ENTRY_POINT},
    session::Session,
    type_info::TypeInfo,
    types::Type,
};
use itertools::Itertools;
use span::Span;
use std::rc::Rc;
use symtab::Scoped;

/// The function whose body is being checked.
#[derive(Debug, Clone)]
struct FunctionScope {
    name: String,
    /// `None` if the declared result type did not resolve.
    result: Option<Type>,
}

pub struct TypeChecker<'a> {
    session: &'a Session<'a>,
    type_info: &'a TypeInfo,
    /// Variables by name. A variable whose declared type is unknown is
    /// still defined, with type `None`, so its uses do not produce more
    /// errors.
    symbols: Scoped<String, Option<Type>>,
    /// Set when entering a function: its body block uses the scope that
    /// already holds the parameters.
    reuse_scope: bool,
    current_function: Option<FunctionScope>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(session: &'a Session<'a>, type_info: &'a TypeInfo) -> Self {
        Self {
            session,
            type_info,
            symbols: Scoped::new(),
            reuse_scope: false,
            current_function: None,
        }
    }

    pub fn check(mut self, root: &mut Block) {
        self.check_block(root);
    }

    fn check_block(&mut self, block: &mut Block) {
        let reuse = std::mem::replace(&mut self.reuse_scope, false);
        if !reuse {
            self.symbols.enter_scope();
        }
        for stmt in &mut block.statements {
            self.check_stmt(stmt);
        }
        if !reuse {
            self.symbols
                .leave_scope()
                .expect("a block leaves the scope it entered");
        }
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expression(expr) => {
                let _ = self.check_expr(expr);
            }
            StmtKind::VariableDecl(decl) => self.check_variable_decl(decl),
            StmtKind::Assignment { target, value } => {
                let _ = self.check_assignment_stmt(target, value);
            }
            StmtKind::Block(block) => self.check_block(block),
            StmtKind::If(clauses) => {
                for clause in clauses {
                    if let Some(condition) = &mut clause.condition {
                        let _ = self.check_assignment(&Type::BOOLEAN, condition);
                    }
                    self.check_block(&mut clause.body);
                }
            }
            StmtKind::While { condition, body } => {
                let _ = self.check_assignment(&Type::BOOLEAN, condition);
                self.check_block(body);
            }
            StmtKind::Return(value) => self.check_return(&stmt.span, value.as_mut()),
            StmtKind::FunctionDef(def) => self.check_function(def),
            // declared in the first pass, nothing left to check
            StmtKind::ClassDef(_) | StmtKind::Import(_) => (),
        }
    }

    fn check_variable_decl(&mut self, decl: &mut VariableDecl) {
        let ty = self.resolve_type(&decl.ty).ok().and_then(|ty| {
            if ty.is_void() {
                self.session.report_error(
                    &decl.ty.span,
                    SemanticError::VoidNotAllowed {
                        kind: "variable",
                        name: decl.name.data.clone(),
                    },
                );
                None
            } else {
                Some(ty)
            }
        });

        // the initializer cannot see the variable it initializes
        if let Some(init) = &mut decl.init {
            let _ = match &ty {
                Some(ty) => self.check_assignment(ty, init),
                None => self.check_expr(init).map(|_| ()),
            };
        }

        decl.resolved = ty.clone();
        if self.symbols.define(decl.name.data.clone(), ty).is_err() {
            self.session.report_error(
                &decl.name.span,
                SemanticError::RedefinitionOfSymbol {
                    name: decl.name.data.clone(),
                },
            );
        }
    }

    fn check_assignment_stmt(
        &mut self,
        target: &mut Expr,
        value: &mut Expr,
    ) -> Result<(), CouldNotDetermineType> {
        let value_ty = self.check_expr(value);
        let target_ty = self.check_expr(target)?;
        if !target.mark_address() {
            self.session.report_error(
                &target.span,
                SemanticError::NotAddressable {
                    what: target.kind.describe(),
                },
            );
            return Err(CouldNotDetermineType);
        }
        value_ty?;
        self.coerce(&target_ty, value)
    }

    fn check_return(&mut self, span: &Span, value: Option<&mut Expr>) {
        let function = match self.current_function.clone() {
            Some(function) => function,
            None => {
                self.session
                    .report_error(span, SemanticError::ReturnOutsideFunction);
                if let Some(value) = value {
                    let _ = self.check_expr(value);
                }
                return;
            }
        };

        match (function.result, value) {
            (None, Some(value)) => {
                let _ = self.check_expr(value);
            }
            (None, None) => (),
            (Some(ref result), None) if result.is_void() => (),
            (Some(result), None) => self.session.report_error(
                span,
                SemanticError::MissingReturnValue {
                    function: function.name,
                    ty: result.to_string(),
                },
            ),
            (Some(ref result), Some(value)) if result.is_void() => {
                let _ = self.check_expr(value);
                self.session.report_error(
                    &value.span,
                    SemanticError::UnexpectedReturnValue {
                        function: function.name,
                    },
                );
            }
            (Some(result), Some(value)) => {
                let _ = self.check_assignment(&result, value);
            }
        }
    }

    fn check_function(&mut self, def: &mut FunctionDef) {
        // signature errors were reported when the unit was declared
        let result = self.type_info.resolve_type(&def.result).ok();
        let formals = def
            .params
            .iter()
            .map(|param| self.type_info.resolve_type(&param.ty).ok())
            .collect::<Option<Vec<_>>>();
        if let (Some(_), Some(formals)) = (&result, &formals) {
            let mangled = functions::mangle(&def.name.data, formals, def.var_args, def.modifiers);
            def.function = self.session.functions.lookup(&mangled);
        }

        if def.body.is_none() {
            return;
        }
        log::debug!("checking function {}", def.name.data);

        let previous = self.current_function.replace(FunctionScope {
            name: def.name.data.clone(),
            result,
        });
        self.symbols.enter_scope();
        for param in &def.params {
            let ty = self
                .type_info
                .resolve_type(&param.ty)
                .ok()
                .filter(|ty| !ty.is_void());
            if self.symbols.define(param.name.data.clone(), ty).is_err() {
                self.session.report_error(
                    &param.name.span,
                    SemanticError::RedefinitionOfSymbol {
                        name: param.name.data.clone(),
                    },
                );
            }
        }

        if let Some(body) = &mut def.body {
            self.reuse_scope = true;
            self.check_block(body);
        }

        self.symbols
            .leave_scope()
            .expect("the parameter scope is not the root scope");
        self.current_function = previous;
    }

    /// Checks `expr` and makes it fit into a slot of type `target`.
    fn check_assignment(
        &mut self,
        target: &Type,
        expr: &mut Expr,
    ) -> Result<(), CouldNotDetermineType> {
        self.check_expr(expr)?;
        self.coerce(target, expr)
    }

    /// Wraps the already checked `expr` in an implicit cast to `target` if
    /// its type is assignable but not equal to it.
    fn coerce(&self, target: &Type, expr: &mut Expr) -> Result<(), CouldNotDetermineType> {
        let ty = expr.ty.clone().ok_or(CouldNotDetermineType)?;
        if ty == *target {
            return Ok(());
        }
        if !ty.is_assignable_to(target) {
            self.session.report_error(
                &expr.span,
                SemanticError::CannotAssign {
                    from: ty.to_string(),
                    to: target.to_string(),
                },
            );
            return Err(CouldNotDetermineType);
        }

        log::trace!("coercing {} to {} at {}", ty, target, expr.span);
        let placeholder = Expr::new(expr.span.clone(), ExprKind::NullLiteral);
        let inner = std::mem::replace(expr, placeholder);
        *expr = Expr::implicit_cast(inner, target.clone());
        Ok(())
    }

    fn coerce_arguments(
        &self,
        function: &Function,
        arguments: &mut [Expr],
    ) -> Result<(), CouldNotDetermineType> {
        // variadic arguments past the formals are passed as they are
        let mut result = Ok(());
        for (arg, formal) in arguments.iter_mut().zip(&function.formals) {
            if self.coerce(&formal.ty, arg).is_err() {
                result = Err(CouldNotDetermineType);
            }
        }
        result
    }

    fn resolve_type(&self, ty: &TypeRef) -> Result<Type, CouldNotDetermineType> {
        self.type_info.resolve_type(ty).map_err(|err| {
            self.session.report_error(&ty.span, err);
            CouldNotDetermineType
        })
    }

    /// Types `expr` and caches the result on the node.
    pub fn check_expr(&mut self, expr: &mut Expr) -> Result<Type, CouldNotDetermineType> {
        log::trace!(
            "checking {:?} at {}",
            ExprKindDiscriminants::from(&expr.kind),
            expr.span
        );
        let ty = self.expr_type(&expr.span, &mut expr.kind, &expr.ty)?;
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    fn expr_type(
        &mut self,
        span: &Span,
        kind: &mut ExprKind,
        cached: &Option<Type>,
    ) -> Result<Type, CouldNotDetermineType> {
        use self::ExprKind::*;
        match kind {
            DoubleLiteral(_) => Ok(Type::FLOAT64),
            IntegerLiteral(_) => Ok(Type::INT32),
            CharLiteral(_) => Ok(Type::INT8),
            StringLiteral(_) => Ok(Type::array(Type::INT8, 1, None)),
            BooleanLiteral(_) => Ok(Type::BOOLEAN),
            NullLiteral => Ok(Type::NULL),

            VariableRef { name, .. } => match self.symbols.visible_definition(name.as_str()) {
                Some(Some(ty)) => Ok(ty.clone()),
                Some(None) => Err(CouldNotDetermineType),
                None => {
                    let suggestion = Suggestion::closest(
                        name.as_str(),
                        self.symbols.visible_symbols().map(String::as_str),
                    );
                    self.session.report_error(
                        span,
                        SemanticError::UnknownSymbol {
                            name: name.clone(),
                            suggestion,
                        },
                    );
                    Err(CouldNotDetermineType)
                }
            },

            QualifiedAccess {
                target,
                name,
                index,
                ..
            } => {
                let target_ty = self.check_expr(target)?;
                match target_ty.field(&name.data) {
                    Some(field) => {
                        *index = Some(field.index);
                        Ok(field.ty)
                    }
                    None => {
                        let candidates = target_ty.field_names();
                        self.session.report_error(
                            &name.span,
                            SemanticError::UnknownField {
                                ty: target_ty.to_string(),
                                name: name.data.clone(),
                                suggestion: Suggestion::closest(
                                    &name.data,
                                    candidates.iter().map(String::as_str),
                                ),
                            },
                        );
                        Err(CouldNotDetermineType)
                    }
                }
            }

            Cast {
                expr,
                target: Some(target),
            } => {
                let from = self.check_expr(expr);
                let to = self.resolve_type(target);
                let (from, to) = (from?, to?);
                if from.can_cast_to(&to) {
                    Ok(to)
                } else {
                    self.session.report_error(
                        span,
                        SemanticError::InvalidCast {
                            from: from.to_string(),
                            to: to.to_string(),
                        },
                    );
                    Err(CouldNotDetermineType)
                }
            }
            // inserted by an earlier run of the checker
            Cast { expr, target: None } => {
                self.check_expr(expr)?;
                cached.clone().ok_or(CouldNotDetermineType)
            }

            FunctionCall {
                name,
                arguments,
                function,
            } => {
                let args = arguments
                    .iter_mut()
                    .map(|arg| self.check_expr(arg))
                    .collect::<Vec<_>>();
                if name.data == ENTRY_POINT {
                    self.session.report_error(
                        &name.span,
                        SemanticError::EntryPointCall {
                            name: name.data.clone(),
                        },
                    );
                    return Err(CouldNotDetermineType);
                }
                let args = args.into_iter().collect::<Result<Vec<_>, _>>()?;

                let resolved = self
                    .type_info
                    .resolve_function(&name.data, &args)
                    .map_err(|err| {
                        self.session.report_error(span, err);
                        CouldNotDetermineType
                    })?;
                self.coerce_arguments(&resolved, arguments)?;
                let result = resolved.result.clone();
                *function = Some(resolved);
                Ok(result)
            }

            ArrayAccess {
                target, indices, ..
            } => {
                let target_ty = self.check_expr(target);
                let mut indices_ok = true;
                for index in indices.iter_mut() {
                    if self.check_assignment(&Type::INT32, index).is_err() {
                        indices_ok = false;
                    }
                }

                let array = match target_ty? {
                    Type::Array(array) => array,
                    other => {
                        self.session.report_error(
                            &target.span,
                            SemanticError::NotAnArray {
                                ty: other.to_string(),
                            },
                        );
                        return Err(CouldNotDetermineType);
                    }
                };
                if indices.len() != array.dimension as usize {
                    self.session.report_error(
                        span,
                        SemanticError::DimensionMismatch {
                            dimension: array.dimension,
                            indices: indices.len(),
                        },
                    );
                    return Err(CouldNotDetermineType);
                }
                if !indices_ok {
                    return Err(CouldNotDetermineType);
                }
                Ok(array.element.clone())
            }

            UnaryOperator {
                op,
                operand,
                function,
            } => {
                let ty = self.check_expr(operand)?;
                let resolved = self.resolve_operator(span, op.symbol(), &[ty])?;
                self.coerce(&resolved.formals[0].ty, operand)?;
                let result = resolved.result.clone();
                *function = Some(resolved);
                Ok(result)
            }

            BinaryOperator {
                op,
                lhs,
                rhs,
                function,
            } => {
                let lhs_ty = self.check_expr(lhs);
                let rhs_ty = self.check_expr(rhs);
                let operands = [lhs_ty?, rhs_ty?];
                let resolved = self.resolve_operator(span, op.symbol(), &operands)?;
                let lhs_ok = self.coerce(&resolved.formals[0].ty, lhs);
                let rhs_ok = self.coerce(&resolved.formals[1].ty, rhs);
                lhs_ok.and(rhs_ok)?;
                let result = resolved.result.clone();
                *function = Some(resolved);
                Ok(result)
            }

            AllocateArray { element, sizes } => {
                let element_ty = self.resolve_type(element);
                let mut sizes_ok = true;
                for size in sizes.iter_mut() {
                    if self.check_assignment(&Type::INT32, size).is_err() {
                        sizes_ok = false;
                    }
                }
                if sizes.is_empty() {
                    self.session
                        .report_error(span, SemanticError::MissingArraySize);
                    return Err(CouldNotDetermineType);
                }
                let element_ty = element_ty?;
                if element_ty.is_void() {
                    self.session.report_error(
                        &element.span,
                        SemanticError::VoidNotAllowed {
                            kind: "array element",
                            name: element.to_string(),
                        },
                    );
                    return Err(CouldNotDetermineType);
                }
                if !sizes_ok {
                    return Err(CouldNotDetermineType);
                }
                Ok(Type::array(element_ty, sizes.len() as u32, None))
            }

            AllocateObject { class } => match self.resolve_type(class)? {
                ty @ Type::Class(_) => Ok(ty),
                other => {
                    self.session.report_error(
                        &class.span,
                        SemanticError::NotAClass {
                            ty: other.to_string(),
                        },
                    );
                    Err(CouldNotDetermineType)
                }
            },
        }
    }

    /// Operators are overloads of the function named by their symbol.
    fn resolve_operator(
        &self,
        span: &Span,
        symbol: &str,
        operands: &[Type],
    ) -> Result<Rc<Function>, CouldNotDetermineType> {
        self.type_info
            .resolve_function(symbol, operands)
            .map_err(|err| {
                let err = match err {
                    SemanticError::UndeclaredFunction { .. } => {
                        SemanticError::IncompatibleOperands {
                            op: symbol.to_string(),
                            operands: operands.iter().join(", "),
                        }
                    }
                    other => other,
                };
                self.session.report_error(span, err);
                CouldNotDetermineType
            })
    }
}
