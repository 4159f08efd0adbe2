//! Types and operators every compilation unit starts out with.
//!
//! Operators are ordinary (implicit) functions named by their symbol, so the
//! checker resolves `a + b` exactly like a call `+(a, b)`.
use crate::{
    ast::{BinaryOp, UnaryOp},
    functions::{FormalParameter, FunctionPool, Functions},
    types::{Primitive, Type},
};

const NUMERIC: [Type; 3] = [Type::INT8, Type::INT32, Type::FLOAT64];

/// Built once per session and shared by all `TypeInfo`s of that session.
#[derive(Debug)]
pub struct Builtins {
    types: Vec<(&'static str, Type)>,
    operators: Functions,
}

impl Builtins {
    pub fn new(pool: &FunctionPool) -> Self {
        let types = [
            Primitive::Void,
            Primitive::Boolean,
            Primitive::Int8,
            Primitive::Int32,
            Primitive::Float64,
        ]
        .iter()
        .map(|p| (p.name(), Type::Primitive(*p)))
        .collect();

        let mut builtins = Self {
            types,
            operators: Functions::new(),
        };
        builtins.declare_operators(pool);
        builtins
    }

    fn declare_operators(&mut self, pool: &FunctionPool) {
        for ty in NUMERIC.iter() {
            for op in BinaryOp::ARITHMETIC.iter() {
                self.binary(pool, *op, ty, ty.clone());
            }
            for op in BinaryOp::RELATIONAL.iter() {
                self.binary(pool, *op, ty, Type::BOOLEAN);
            }
        }

        let comparable = NUMERIC
            .iter()
            .cloned()
            .chain(vec![Type::BOOLEAN, Type::Reference]);
        for ty in comparable {
            for op in BinaryOp::EQUALITY.iter() {
                self.binary(pool, *op, &ty, Type::BOOLEAN);
            }
        }

        for op in BinaryOp::LOGICAL.iter() {
            self.binary(pool, *op, &Type::BOOLEAN, Type::BOOLEAN);
        }

        for ty in NUMERIC.iter() {
            self.unary(pool, UnaryOp::Neg, ty);
        }
        for ty in &[Type::INT8, Type::INT32, Type::BOOLEAN] {
            self.unary(pool, UnaryOp::BitNot, ty);
        }
        self.unary(pool, UnaryOp::Not, &Type::BOOLEAN);
    }

    fn binary(&mut self, pool: &FunctionPool, op: BinaryOp, operand: &Type, result: Type) {
        self.operators.add(pool.declare_implicit(
            op.symbol(),
            result,
            vec![
                FormalParameter::new(operand.clone(), "lhs"),
                FormalParameter::new(operand.clone(), "rhs"),
            ],
        ));
    }

    fn unary(&mut self, pool: &FunctionPool, op: UnaryOp, operand: &Type) {
        self.operators.add(pool.declare_implicit(
            op.symbol(),
            operand.clone(),
            vec![FormalParameter::new(operand.clone(), "operand")],
        ));
    }

    pub fn types(&self) -> impl Iterator<Item = (&'static str, &Type)> {
        self.types.iter().map(|(name, ty)| (*name, ty))
    }

    pub fn operators(&self) -> &Functions {
        &self.operators
    }
}
