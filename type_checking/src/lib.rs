//! Declaration, resolution and checking of juli compilation units.
//!
//! A unit goes through three steps:
//!
//! 1. the [`Declarator`](declare/struct.Declarator.html) collects classes,
//!    function signatures and imports into a [`TypeInfo`](type_info/struct.TypeInfo.html),
//! 2. [`TypeInfo::resolve_classes`](type_info/struct.TypeInfo.html#method.resolve_classes)
//!    fills in class fields now that every type name is known,
//! 3. the [`TypeChecker`](checker/struct.TypeChecker.html) walks all bodies,
//!    annotates the AST with types and inserts implicit casts.
//!
//! Errors are reported through the session's diagnostics and checking
//! continues, so one run reports as many problems as possible.
#![warn(rust_2018_idioms)]
#![warn(clippy::print_stdout)]

pub mod ast;
pub mod builder;
pub mod builtins;
pub mod checker;
pub mod declare;
pub mod error;
pub mod functions;
pub mod importer;
pub mod session;
pub mod type_info;
pub mod types;

pub use self::{
    checker::TypeChecker,
    declare::Declarator,
    error::{CouldNotDetermineType, ImportError, SemanticError},
    functions::{FormalParameter, Function, FunctionPool, Functions, Modifiers},
    importer::{ImportLoader, Importer, LoadError, ModuleSource, SourceImportLoader},
    session::Session,
    type_info::TypeInfo,
    types::{ArrayType, ClassType, Field, Primitive, Type},
};
