//! All state shared by the declaration and checking phases that is not
//! specific to the type universe.
use crate::CompileOptions;
use diagnostics::Diagnostics;
use termcolor::WriteColor;

pub struct Context {
    pub diagnostics: Diagnostics,
    pub options: CompileOptions,
}

impl Context {
    pub fn new(writer: Box<dyn WriteColor>, options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(writer),
            options,
        }
    }

    pub fn dummy() -> Self {
        Self::new(Box::new(dummy_writer()), CompileOptions::default())
    }
}

// dummy_writer returns a WriteColor meant for use in tests.
pub fn dummy_writer() -> impl WriteColor {
    termcolor::Buffer::no_color()
}
