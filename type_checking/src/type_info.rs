//! The universe of one compilation unit: its type table, the functions it
//! can call, and the classes declared but not yet resolved.
use crate::{
    ast::{ClassDef, FunctionDef, TypeRef, TypeRefKind},
    builtins::Builtins,
    error::{CouldNotDetermineType, ImportError, SemanticError, Suggestion},
    functions::{FormalParameter, Function, Functions, ENTRY_POINT},
    session::Session,
    types::{ClassType, Field, Type},
};
use itertools::Itertools;
use span::Span;
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    rc::Rc,
};

#[derive(Debug, Clone)]
pub struct TypeInfo {
    types: HashMap<String, Type>,
    functions: Functions,
    /// Declared classes waiting for `resolve_classes`, in declaration order.
    unresolved: Vec<(Rc<ClassType>, ClassDef)>,
}

impl TypeInfo {
    pub fn new(builtins: &Builtins) -> Self {
        let mut functions = Functions::new();
        functions.merge(builtins.operators());
        Self {
            types: builtins
                .types()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
            functions,
            unresolved: Vec::new(),
        }
    }

    /// Registers an empty class under its name. The fields are filled in
    /// by `resolve_classes`, once all type names are known.
    pub fn declare_class(&mut self, def: &ClassDef) -> Result<Rc<ClassType>, SemanticError> {
        match self.types.entry(def.name.data.clone()) {
            Entry::Occupied(_) => Err(SemanticError::RedefinitionOfType {
                name: def.name.data.clone(),
            }),
            Entry::Vacant(e) => {
                let class = Rc::new(ClassType::new(&def.name.data));
                e.insert(Type::Class(Rc::clone(&class)));
                self.unresolved.push((Rc::clone(&class), def.clone()));
                Ok(class)
            }
        }
    }

    /// Defines the fields of every declared class. Field types are resolved
    /// against the complete type table, so classes may refer to each other.
    pub fn resolve_classes(&mut self, session: &Session<'_>) {
        let unresolved = std::mem::replace(&mut self.unresolved, Vec::new());
        for (class, def) in unresolved {
            let mut fields: Vec<Field> = Vec::with_capacity(def.fields.len());
            for decl in &def.fields {
                let ty = match self.resolve_type(&decl.ty) {
                    Ok(ty) => ty,
                    Err(err) => {
                        session.report_error(&decl.ty.span, err);
                        continue;
                    }
                };
                if ty.is_void() {
                    session.report_error(
                        &decl.ty.span,
                        SemanticError::VoidNotAllowed {
                            kind: "field",
                            name: decl.name.data.clone(),
                        },
                    );
                    continue;
                }
                if fields.iter().any(|f| f.name == decl.name.data) {
                    session.report_error(
                        &decl.name.span,
                        SemanticError::DuplicateField {
                            class: class.name().to_string(),
                            name: decl.name.data.clone(),
                        },
                    );
                    continue;
                }
                fields.push(Field {
                    name: decl.name.data.clone(),
                    index: fields.len(),
                    ty,
                });
            }
            log::debug!("defined class {:?}", class);
            class.set_fields(fields);
        }
    }

    /// Builds the function for `def` and adds it to this unit's overload
    /// sets. An imported definition contributes its signature only.
    pub fn define_function(
        &mut self,
        def: &FunctionDef,
        importing: bool,
        session: &Session<'_>,
    ) -> Result<Rc<Function>, CouldNotDetermineType> {
        let result = self.resolve_type(&def.result).map_err(|err| {
            session.report_error(&def.result.span, err);
            CouldNotDetermineType
        });

        let mut formals = Vec::with_capacity(def.params.len());
        let mut failed = false;
        for param in &def.params {
            match self.resolve_type(&param.ty) {
                Ok(ty) if ty.is_void() => {
                    session.report_error(
                        &param.ty.span,
                        SemanticError::VoidNotAllowed {
                            kind: "parameter",
                            name: param.name.data.clone(),
                        },
                    );
                    failed = true;
                }
                Ok(ty) => formals.push(FormalParameter::new(ty, &param.name.data)),
                Err(err) => {
                    session.report_error(&param.ty.span, err);
                    failed = true;
                }
            }
        }
        let result = result?;
        if failed {
            return Err(CouldNotDetermineType);
        }

        if def.name.data == ENTRY_POINT {
            check_entry_point(&def.name.span, &result, &formals, session);
        }

        let body = if importing {
            None
        } else {
            def.body.as_ref().map(|body| body.span.clone())
        };
        let function = session
            .functions
            .get(
                &def.name.data,
                result,
                formals,
                def.var_args,
                def.modifiers,
                body,
            )
            .map_err(|err| {
                session.report_error(&def.name.span, err);
                CouldNotDetermineType
            })?;
        self.functions.add(Rc::clone(&function));
        Ok(function)
    }

    /// The single best overload of `name` for `args`.
    pub fn resolve_function(
        &self,
        name: &str,
        args: &[Type],
    ) -> Result<Rc<Function>, SemanticError> {
        let mut matches = self.functions.resolve(name, args);
        match matches.len() {
            0 => Err(SemanticError::UndeclaredFunction {
                name: name.to_string(),
                args: args.iter().join(", "),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(SemanticError::AmbiguousCall {
                name: name.to_string(),
                args: args.iter().join(", "),
                candidates: matches.iter().map(|f| format!("  {}", f)).join("\n"),
            }),
        }
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn resolve_type(&self, ty: &TypeRef) -> Result<Type, SemanticError> {
        match &ty.kind {
            TypeRefKind::Basic(name) => self.lookup_type(name).cloned().ok_or_else(|| {
                SemanticError::UnknownType {
                    name: name.clone(),
                    suggestion: Suggestion::closest(
                        name,
                        self.types.keys().map(String::as_str),
                    ),
                }
            }),
            TypeRefKind::Array {
                element,
                dimension,
                static_size,
            } => {
                let element = self.resolve_type(element)?;
                Ok(Type::array(element, *dimension, *static_size))
            }
        }
    }

    /// Adds everything `other` knows to this unit. A type name that refers
    /// to two different types is an error, the first definition is kept.
    pub fn merge(&mut self, other: &TypeInfo, module: &str) -> Result<(), Vec<ImportError>> {
        let mut errors = Vec::new();
        for (name, ty) in other.types() {
            match self.types.entry(name.to_string()) {
                Entry::Occupied(e) => {
                    if !e.get().is_identical(ty) {
                        errors.push(ImportError::MultiplyDefinedType {
                            name: name.to_string(),
                            module: module.to_string(),
                        });
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(ty.clone());
                }
            }
        }
        self.functions.merge(&other.functions);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    /// All types by name, sorted.
    pub fn types(&self) -> impl Iterator<Item = (&str, &Type)> {
        let mut types = self
            .types
            .iter()
            .map(|(name, ty)| (name.as_str(), ty))
            .collect::<Vec<_>>();
        types.sort_by(|a, b| a.0.cmp(b.0));
        types.into_iter()
    }

    pub fn has_unresolved_classes(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

/// `main` is called by the runtime as `int main(int, char[][])`. Anything
/// else still compiles but is probably a mistake.
fn check_entry_point(span: &Span, result: &Type, formals: &[FormalParameter], session: &Session<'_>) {
    let argv = Type::array(Type::array(Type::INT8, 1, None), 1, None);
    let expected = [Type::INT32, argv];
    let matches = *result == Type::INT32
        && formals.len() == expected.len()
        && formals.iter().zip(&expected).all(|(f, ty)| f.ty == *ty);
    if !matches {
        session.report_warning(
            span,
            SemanticError::EntryPointSignature {
                found: format!(
                    "{} {}({})",
                    result,
                    ENTRY_POINT,
                    formals.iter().map(|f| &f.ty).join(", ")
                ),
            },
        );
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FUNCTIONS:")?;
        for function in self.functions.iter().filter(|f| !f.is_implicit()) {
            writeln!(f, "  {} [{}]", function, function.mangled_name())?;
        }
        writeln!(f, "TYPES:")?;
        for (name, ty) in self.types() {
            match ty {
                Type::Class(class) => writeln!(
                    f,
                    "  {} {{ {} }}",
                    name,
                    class
                        .fields()
                        .iter()
                        .map(|field| format!("{} {}", field.ty, field.name))
                        .join("; ")
                )?,
                _ => writeln!(f, "  {}", name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AstBuilder;
    use compiler_shared::Context;
    use utils::assert_matches;

    fn class_def(b: &AstBuilder, name: &str, fields: &[(&str, &str)]) -> ClassDef {
        ClassDef {
            name: b.ident(name),
            fields: fields
                .iter()
                .map(|(ty, name)| b.field_decl(b.ty(ty), name))
                .collect(),
        }
    }

    #[test]
    fn seeded_with_primitives_and_operators() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let ti = TypeInfo::new(&session.builtins);
        assert_eq!(Some(&Type::INT32), ti.lookup_type("int"));
        assert_eq!(Some(&Type::INT8), ti.lookup_type("char"));
        assert!(ti.lookup_type("null").is_none());
        assert!(!ti.functions().candidates("+").is_empty());
    }

    #[test]
    fn class_redeclaration_is_rejected() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("a.jl");
        let mut ti = TypeInfo::new(&session.builtins);
        ti.declare_class(&class_def(&b, "Point", &[])).unwrap();
        assert_matches!(
            ti.declare_class(&class_def(&b, "Point", &[])),
            Err(SemanticError::RedefinitionOfType { .. })
        );
        assert_matches!(
            ti.declare_class(&class_def(&b, "int", &[])),
            Err(SemanticError::RedefinitionOfType { .. })
        );
    }

    #[test]
    fn mutually_recursive_classes() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("a.jl");
        let mut ti = TypeInfo::new(&session.builtins);
        let a = ti
            .declare_class(&class_def(&b, "A", &[("B", "b"), ("int", "n")]))
            .unwrap();
        ti.declare_class(&class_def(&b, "B", &[("A", "a")])).unwrap();
        assert!(ti.has_unresolved_classes());
        ti.resolve_classes(&session);
        assert!(!context.diagnostics.errored());
        assert!(!ti.has_unresolved_classes());

        let b_field = a.field("b").expect("field b");
        assert_eq!(0, b_field.index);
        let back = b_field.ty.field("a").expect("field a of B");
        assert_eq!(Type::Class(a), back.ty);
    }

    #[test]
    fn unknown_and_duplicate_fields_are_reported() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("a.jl");
        let mut ti = TypeInfo::new(&session.builtins);
        let c = ti
            .declare_class(&class_def(
                &b,
                "C",
                &[("Nope", "x"), ("int", "y"), ("double", "y"), ("void", "z")],
            ))
            .unwrap();
        ti.resolve_classes(&session);
        assert_eq!(3, context.diagnostics.messages().len());
        let fields = c.fields();
        assert_eq!(1, fields.len());
        assert_eq!(0, fields[0].index);
    }

    #[test]
    fn resolve_array_types() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("a.jl");
        let ti = TypeInfo::new(&session.builtins);
        let ty = ti.resolve_type(&b.array_ty(b.ty("int"), 2)).unwrap();
        assert_eq!(Type::array(Type::INT32, 2, None), ty);
        assert_matches!(
            ti.resolve_type(&b.array_ty(b.ty("itn"), 1)),
            Err(SemanticError::UnknownType { .. })
        );
    }

    #[test]
    fn resolve_function_reports_ambiguity() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("a.jl");
        let mut ti = TypeInfo::new(&session.builtins);
        for types in &[["int", "double"], ["double", "int"]] {
            let def = b.function_def(
                b.ty("void"),
                "f",
                vec![(b.ty(types[0]), "a"), (b.ty(types[1]), "b")],
                Some(b.block(vec![])),
            );
            ti.define_function(&def, false, &session).unwrap();
        }
        let err = ti
            .resolve_function("f", &[Type::INT8, Type::INT8])
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("ambiguous function call: f(char, char)"));
        assert!(message.contains("void f(int a, double b)"));
        assert!(message.contains("void f(double a, int b)"));

        assert_matches!(
            ti.resolve_function("f", &[Type::INT32]),
            Err(SemanticError::UndeclaredFunction { .. })
        );
        assert!(ti.resolve_function("f", &[Type::INT32, Type::FLOAT64]).is_ok());
    }

    #[test]
    fn unusual_entry_point_is_a_warning() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("a.jl");
        let mut ti = TypeInfo::new(&session.builtins);
        let def = b.function_def(b.ty("void"), "main", vec![], Some(b.block(vec![])));
        ti.define_function(&def, false, &session).unwrap();
        assert!(!context.diagnostics.errored());
        let messages = context.diagnostics.messages();
        assert_eq!(1, messages.len());
        assert!(messages[0].to_string().contains("found 'void main()'"));

        let argv = b.array_ty(b.array_ty(b.ty("char"), 1), 1);
        let def = b.function_def(
            b.ty("int"),
            "main",
            vec![(b.ty("int"), "argc"), (argv, "argv")],
            Some(b.block(vec![])),
        );
        ti.define_function(&def, false, &session).unwrap();
        assert_eq!(1, context.diagnostics.messages().len());
    }

    #[test]
    fn importing_drops_bodies() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("lib.jl");
        let mut ti = TypeInfo::new(&session.builtins);
        let def = b.function_def(b.ty("int"), "answer", vec![], Some(b.block(vec![])));
        let f = ti.define_function(&def, true, &session).unwrap();
        assert!(!f.is_defined());
        assert!(ti.functions().defined().is_empty());
    }

    #[test]
    fn merge_detects_conflicting_types() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("a.jl");
        let mut lib = TypeInfo::new(&session.builtins);
        lib.declare_class(&class_def(&b, "Point", &[])).unwrap();
        lib.declare_class(&class_def(&b, "Line", &[])).unwrap();

        let mut main = TypeInfo::new(&session.builtins);
        main.declare_class(&class_def(&b, "Point", &[])).unwrap();
        let errors = main.merge(&lib, "lib").unwrap_err();
        assert_eq!(1, errors.len());
        match &errors[0] {
            ImportError::MultiplyDefinedType { name, .. } => assert_eq!("Point", name),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(main.lookup_type("Line").is_some());

        // the same classes arriving through two imports are fine
        let mut other = TypeInfo::new(&session.builtins);
        other.merge(&lib, "lib").unwrap();
        other.merge(&lib, "lib").unwrap();
    }
}
