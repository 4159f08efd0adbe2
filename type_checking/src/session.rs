use crate::{builtins::Builtins, functions::FunctionPool};
use compiler_shared::Context;
use failure::Fail;
use span::Span;

/// State of one compile: the shared context plus everything that has to be
/// identical across all units compiled together, the function pool and the
/// builtins seeded into every `TypeInfo`.
pub struct Session<'ctx> {
    pub context: &'ctx Context,
    pub functions: FunctionPool,
    pub builtins: Builtins,
}

impl<'ctx> Session<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        let functions = FunctionPool::new();
        let builtins = Builtins::new(&functions);
        Self {
            context,
            functions,
            builtins,
        }
    }

    pub fn report_error<E: Fail>(&self, span: &Span, error: E) {
        self.context.diagnostics.error_at(span, Box::new(error))
    }

    pub fn report_warning<E: Fail>(&self, span: &Span, warning: E) {
        self.context.diagnostics.warning_at(span, Box::new(warning))
    }
}
