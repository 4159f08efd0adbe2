//! Loading the declarations of imported modules.
//!
//! An `import m` makes every type and function declared in module `m`
//! visible in the importing unit. Modules are declared at most once per
//! `Importer`; later imports of the same module share the cached
//! `TypeInfo`.
use crate::{
    ast::Block, declare::Declarator, error::ImportError, session::Session, type_info::TypeInfo,
};
use failure::Fail;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

#[derive(Debug, Fail)]
pub enum LoadError {
    #[fail(display = "no such module")]
    NotFound,
    #[fail(display = "{}", _0)]
    Parse(String),
}

/// Where module sources come from. Implemented by the front end (files on
/// disk) and by tests (modules in memory). Returns the parsed root block
/// of the module stored at `path`.
pub trait ModuleSource {
    fn load(&self, path: &str) -> Result<Block, LoadError>;
}

/// One strategy for turning a module name into its declarations.
///
/// `Ok(None)` means "not mine": the importer moves on to the next loader.
pub trait ImportLoader {
    fn import_types(
        &self,
        module: &str,
        importer: &Importer,
        session: &Session<'_>,
    ) -> Result<Option<TypeInfo>, ImportError>;
}

/// Loads `m.jl` from a `ModuleSource` and declares it.
pub struct SourceImportLoader {
    source: Rc<dyn ModuleSource>,
}

impl SourceImportLoader {
    pub fn new(source: Rc<dyn ModuleSource>) -> Self {
        Self { source }
    }

    pub fn module_path(module: &str) -> String {
        format!("{}.jl", module)
    }
}

impl ImportLoader for SourceImportLoader {
    fn import_types(
        &self,
        module: &str,
        importer: &Importer,
        session: &Session<'_>,
    ) -> Result<Option<TypeInfo>, ImportError> {
        let path = Self::module_path(module);
        let ast = match self.source.load(&path) {
            Ok(ast) => ast,
            Err(LoadError::NotFound) => return Ok(None),
            Err(LoadError::Parse(message)) => {
                return Err(ImportError::Unparsable {
                    module: module.to_string(),
                    message,
                });
            }
        };

        let mut type_info = Declarator::new(session, importer, true).declare(&ast);
        type_info.resolve_classes(session);
        Ok(Some(type_info))
    }
}

#[derive(Default)]
pub struct Importer {
    loaders: Vec<Box<dyn ImportLoader>>,
    cache: RefCell<HashMap<String, Rc<TypeInfo>>>,
    /// Modules currently being declared, outermost first.
    in_progress: RefCell<Vec<String>>,
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a loader. Loaders are asked in the order they were added.
    pub fn add(&mut self, loader: Box<dyn ImportLoader>) {
        self.loaders.push(loader);
    }

    pub fn get_types(
        &self,
        module: &str,
        session: &Session<'_>,
    ) -> Result<Rc<TypeInfo>, ImportError> {
        if let Some(types) = self.cache.borrow().get(module) {
            log::trace!("module {} served from cache", module);
            return Ok(Rc::clone(types));
        }

        if self.in_progress.borrow().iter().any(|m| m == module) {
            let mut chain = self.in_progress.borrow().clone();
            chain.push(module.to_string());
            return Err(ImportError::CircularImport {
                chain: chain.join(" -> "),
            });
        }

        let loaded = self.declaring(module, || self.load(module, session));

        let types = Rc::new(loaded?);
        log::debug!("imported module {}", module);
        self.cache
            .borrow_mut()
            .insert(module.to_string(), Rc::clone(&types));
        Ok(types)
    }

    /// Runs `declare` with `module` marked as being declared, so imports
    /// leading back to the unit under compilation are reported as cycles
    /// instead of declaring the unit a second time.
    pub fn declaring<R>(&self, module: &str, declare: impl FnOnce() -> R) -> R {
        self.in_progress.borrow_mut().push(module.to_string());
        let result = declare();
        self.in_progress.borrow_mut().pop();
        result
    }

    fn load(&self, module: &str, session: &Session<'_>) -> Result<TypeInfo, ImportError> {
        for loader in &self.loaders {
            if let Some(types) = loader.import_types(module, self, session)? {
                return Ok(types);
            }
        }
        Err(ImportError::ModuleNotFound {
            module: module.to_string(),
        })
    }

    pub fn is_cached(&self, module: &str) -> bool {
        self.cache.borrow().contains_key(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AstBuilder;
    use compiler_shared::Context;
    use std::cell::Cell;
    use utils::assert_matches;

    struct CountingLoader {
        calls: Rc<Cell<usize>>,
    }

    impl ImportLoader for CountingLoader {
        fn import_types(
            &self,
            module: &str,
            _importer: &Importer,
            session: &Session<'_>,
        ) -> Result<Option<TypeInfo>, ImportError> {
            if module != "lib" {
                return Ok(None);
            }
            self.calls.set(self.calls.get() + 1);
            Ok(Some(TypeInfo::new(&session.builtins)))
        }
    }

    /// Modules in memory, keyed by path.
    struct Modules(HashMap<String, Block>);

    impl ModuleSource for Modules {
        fn load(&self, path: &str) -> Result<Block, LoadError> {
            if path == "broken.jl" {
                return Err(LoadError::Parse("unexpected '}'".to_string()));
            }
            self.0.get(path).cloned().ok_or(LoadError::NotFound)
        }
    }

    #[test]
    fn modules_are_loaded_once() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let calls = Rc::new(Cell::new(0));
        let mut importer = Importer::new();
        importer.add(Box::new(CountingLoader {
            calls: Rc::clone(&calls),
        }));

        let first = importer.get_types("lib", &session).unwrap();
        let second = importer.get_types("lib", &session).unwrap();
        assert_eq!(1, calls.get());
        assert!(Rc::ptr_eq(&first, &second));
        assert!(importer.is_cached("lib"));
    }

    #[test]
    fn unknown_module() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let mut importer = Importer::new();
        importer.add(Box::new(CountingLoader {
            calls: Rc::new(Cell::new(0)),
        }));
        let err = importer.get_types("nope", &session).unwrap_err();
        assert_eq!("could not load module nope", err.to_string());
        assert!(!importer.is_cached("nope"));
    }

    #[test]
    fn source_loader_declares_module() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let b = AstBuilder::new("geometry.jl");
        let module = b.block(vec![
            b.class("Point", vec![(b.ty("int"), "x"), (b.ty("int"), "y")]),
            b.function(
                b.ty("Point"),
                "origin",
                vec![],
                b.block(vec![b.ret(Some(b.new_object(b.ty("Point"))))]),
            ),
        ]);
        let mut modules = HashMap::new();
        modules.insert("geometry.jl".to_string(), module);

        let mut importer = Importer::new();
        importer.add(Box::new(SourceImportLoader::new(Rc::new(Modules(modules)))));
        let types = importer.get_types("geometry", &session).unwrap();

        assert!(!context.diagnostics.errored());
        let point = types.lookup_type("Point").expect("Point");
        assert!(point.field("y").is_some());
        let origin = types.functions().candidates("origin");
        assert_eq!(1, origin.len());
        assert!(!origin[0].is_defined());
    }

    #[test]
    fn unparsable_module() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let mut importer = Importer::new();
        importer.add(Box::new(SourceImportLoader::new(Rc::new(Modules(
            HashMap::new(),
        )))));
        assert_matches!(
            importer.get_types("broken", &session),
            Err(ImportError::Unparsable { .. })
        );
        assert_matches!(
            importer.get_types("missing", &session),
            Err(ImportError::ModuleNotFound { .. })
        );
    }

    #[test]
    fn circular_imports_are_detected() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let mut modules = HashMap::new();
        let a = AstBuilder::new("a.jl");
        modules.insert("a.jl".to_string(), a.block(vec![a.import("b")]));
        let b = AstBuilder::new("b.jl");
        modules.insert("b.jl".to_string(), b.block(vec![b.import("a")]));

        let mut importer = Importer::new();
        importer.add(Box::new(SourceImportLoader::new(Rc::new(Modules(modules)))));

        // the cycle is reported inside b, at its import of a; a itself loads
        assert!(importer.get_types("a", &session).is_ok());
        let messages = context.diagnostics.messages();
        assert_eq!(1, messages.len());
        assert_eq!(
            "circular import: a -> b -> a",
            messages[0].message
        );
        assert_eq!("b.jl", messages[0].span.as_ref().unwrap().file());
    }

    #[test]
    fn imports_back_into_the_unit_being_declared() {
        let context = Context::dummy();
        let session = Session::new(&context);
        let mut modules = HashMap::new();
        let a = AstBuilder::new("a.jl");
        modules.insert("a.jl".to_string(), a.block(vec![a.import("main")]));
        let main = AstBuilder::new("main.jl");
        modules.insert(
            "main.jl".to_string(),
            main.block(vec![main.import("a"), main.class("Foo", vec![])]),
        );

        let mut importer = Importer::new();
        importer.add(Box::new(SourceImportLoader::new(Rc::new(Modules(modules)))));

        let types = importer
            .declaring("main", || importer.get_types("a", &session))
            .unwrap();
        assert!(types.lookup_type("Foo").is_none());
        assert!(!importer.is_cached("main"));
        let messages = context.diagnostics.messages();
        assert_eq!(1, messages.len());
        assert_eq!("circular import: main -> a -> main", messages[0].message);
    }
}
