/// Knobs of a single compile. Filled in by whoever embeds the pipeline;
/// there is no configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Keep checking function bodies even though declaring the unit
    /// (classes, signatures, imports) already produced errors.
    pub check_after_declaration_errors: bool,
    /// Treat any warning as a failed compile.
    pub warnings_as_errors: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            check_after_declaration_errors: true,
            warnings_as_errors: false,
        }
    }
}
