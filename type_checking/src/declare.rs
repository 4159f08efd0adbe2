//! First pass: collect what a unit declares.
//!
//! Imports are merged first, then every class is registered by name, and
//! only then are function signatures resolved. Classes and functions may
//! therefore be used anywhere in the unit, including before their
//! definition.
use crate::{
    ast::{Block, ClassDef, FunctionDef, Ident, StmtKind},
    importer::Importer,
    session::Session,
    type_info::TypeInfo,
};

pub struct Declarator<'a, 'ast> {
    session: &'a Session<'a>,
    importer: &'a Importer,
    /// Declaring an imported module: function bodies belong to the module's
    /// own compile and are dropped here.
    importing: bool,
    type_info: TypeInfo,
    classes: Vec<&'ast ClassDef>,
    functions: Vec<&'ast FunctionDef>,
}

impl<'a, 'ast> Declarator<'a, 'ast> {
    pub fn new(session: &'a Session<'a>, importer: &'a Importer, importing: bool) -> Self {
        Self {
            session,
            importer,
            importing,
            type_info: TypeInfo::new(&session.builtins),
            classes: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Declares everything in `root` and returns the unit's type info.
    /// Class fields are not resolved yet, see `TypeInfo::resolve_classes`.
    pub fn declare(mut self, root: &'ast Block) -> TypeInfo {
        self.collect(root);

        for class in std::mem::replace(&mut self.classes, Vec::new()) {
            if let Err(err) = self.type_info.declare_class(class) {
                self.session.report_error(&class.name.span, err);
            }
        }

        for def in std::mem::replace(&mut self.functions, Vec::new()) {
            // errors were reported where they occurred
            let _ = self
                .type_info
                .define_function(def, self.importing, self.session);
        }

        self.type_info
    }

    /// Walks nested blocks too: definitions are not restricted to the top
    /// level of a unit.
    fn collect(&mut self, block: &'ast Block) {
        for stmt in &block.statements {
            match &stmt.kind {
                StmtKind::Import(module) => self.import(module),
                StmtKind::ClassDef(def) => self.classes.push(def),
                StmtKind::FunctionDef(def) => {
                    self.functions.push(def);
                    if let Some(body) = &def.body {
                        self.collect(body);
                    }
                }
                StmtKind::Block(inner) => self.collect(inner),
                StmtKind::If(clauses) => {
                    for clause in clauses {
                        self.collect(&clause.body);
                    }
                }
                StmtKind::While { body, .. } => self.collect(body),
                StmtKind::Expression(_)
                | StmtKind::VariableDecl(_)
                | StmtKind::Assignment { .. }
                | StmtKind::Return(_) => (),
            }
        }
    }

    fn import(&mut self, module: &Ident) {
        let imported = match self.importer.get_types(&module.data, self.session) {
            Ok(imported) => imported,
            Err(err) => {
                self.session.report_error(&module.span, err);
                return;
            }
        };
        if let Err(errors) = self.type_info.merge(&imported, &module.data) {
            for err in errors {
                self.session.report_error(&module.span, err);
            }
        }
    }
}
