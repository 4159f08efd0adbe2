use compiler_shared::Context;
use diagnostics::MessageLevel;
use failure::Fail;
use std::rc::Rc;
use type_checking::{
    ast::Block, Declarator, Function, ImportLoader, Importer, LoadError, ModuleSource, Session,
    SourceImportLoader, TypeChecker, TypeInfo,
};

/// Process exit status of a compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    /// A compilation unit could not be found or parsed.
    InputError = 1,
    /// At least one unit was loaded but is not a valid program.
    SemanticError = 2,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Fail)]
pub enum DriverError {
    #[fail(display = "could not find compilation unit {}", path)]
    InputNotFound { path: String },
    #[fail(display = "could not parse {}: {}", path, message)]
    Unparsable { path: String, message: String },
}

/// A declared and checked unit, ready for code generation.
#[derive(Debug)]
pub struct CompiledUnit {
    pub name: String,
    /// Annotated with types, casts and resolved functions.
    pub ast: Block,
    pub type_info: TypeInfo,
}

impl CompiledUnit {
    /// Functions whose body is part of this unit: the symbols the code
    /// generator emits for it. Spans of the unit must carry its path as
    /// file name.
    pub fn defined_functions(&self) -> Vec<Rc<Function>> {
        self.type_info
            .functions()
            .defined()
            .into_iter()
            .filter(|f| {
                f.body_span()
                    .map(|span| span.file() == self.name)
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Compiles any number of units in one session. Units share the function
/// pool and the import cache, so a function declared in one unit and
/// defined in another is the same function.
pub struct Driver<'ctx> {
    session: Session<'ctx>,
    importer: Importer,
    source: Rc<dyn ModuleSource>,
}

impl<'ctx> Driver<'ctx> {
    /// Imports are loaded from `source` as well, module `m` from `m.jl`.
    pub fn new(context: &'ctx Context, source: Rc<dyn ModuleSource>) -> Self {
        let mut importer = Importer::new();
        importer.add(Box::new(SourceImportLoader::new(Rc::clone(&source))));
        Self {
            session: Session::new(context),
            importer,
            source,
        }
    }

    /// Adds a loader asked after the ones already registered.
    pub fn add_loader(&mut self, loader: Box<dyn ImportLoader>) {
        self.importer.add(loader);
    }

    pub fn session(&self) -> &Session<'ctx> {
        &self.session
    }

    /// Declares and checks the unit stored at `path`. Semantic errors do
    /// not make this fail: they are reported to the context and the unit
    /// is returned as far as it could be checked.
    pub fn compile_unit(&self, path: &str) -> Result<CompiledUnit, DriverError> {
        let mut ast = self.source.load(path).map_err(|err| match err {
            LoadError::NotFound => DriverError::InputNotFound {
                path: path.to_string(),
            },
            LoadError::Parse(message) => DriverError::Unparsable {
                path: path.to_string(),
                message,
            },
        })?;

        let context = self.session.context;
        let errors_before = context.diagnostics.count(MessageLevel::Error);

        log::debug!("declaring {}", path);
        let module = path.trim_end_matches(".jl");
        let mut type_info = self.importer.declaring(module, || {
            Declarator::new(&self.session, &self.importer, false).declare(&ast)
        });
        type_info.resolve_classes(&self.session);
        log::debug!("declared {}\n{}", path, type_info);

        let declaration_errors = context.diagnostics.count(MessageLevel::Error) - errors_before;
        if declaration_errors > 0 && !context.options.check_after_declaration_errors {
            log::debug!("not checking {} after declaration errors", path);
        } else {
            TypeChecker::new(&self.session, &type_info).check(&mut ast);
        }

        Ok(CompiledUnit {
            name: path.to_string(),
            ast,
            type_info,
        })
    }

    /// Compiles all `units`, writes a summary to the diagnostics and
    /// returns the exit status. Missing or unparsable input takes
    /// precedence over semantic errors.
    pub fn run(&self, units: &[&str]) -> ExitStatus {
        let mut input_error = false;
        for unit in units {
            if let Err(err) = self.compile_unit(unit) {
                self.session.context.diagnostics.error(Box::new(err));
                input_error = true;
            }
        }

        let context = self.session.context;
        context.diagnostics.write_statistics();

        let warnings = context.diagnostics.count(MessageLevel::Warning);
        if input_error {
            ExitStatus::InputError
        } else if context.diagnostics.errored()
            || (context.options.warnings_as_errors && warnings > 0)
        {
            ExitStatus::SemanticError
        } else {
            ExitStatus::Success
        }
    }
}
