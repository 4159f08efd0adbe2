//! The diagnostics object collects the warnings and errors generated by the
//! declaration and checking passes and writes them out as they arrive.
//!
//! Each message is rendered on its own line as `file  start,end - message`.
//! Messages without a location (a module that cannot be loaded at all, for
//! example) are rendered as `error: message`.
//!
//! Every message is also kept, so that a driver or a test can inspect what
//! was reported after the fact.
//!
//! This implementation is NOT thread-safe.
use failure::AsFail;
use span::{MaybeSpanned, Span, Spanned};
use std::{cell::RefCell, collections::HashMap, io::Write};
use termcolor::{Color, ColorSpec, WriteColor};

pub struct Diagnostics {
    message_count: RefCell<HashMap<MessageLevel, usize>>,
    messages: RefCell<Vec<Diagnostic>>,
    writer: RefCell<Box<dyn WriteColor>>,
}

/// A reported message, detached from the error value that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: MessageLevel,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostics {
    pub fn new(writer: Box<dyn WriteColor>) -> Self {
        Self {
            writer: RefCell::new(writer),
            messages: RefCell::new(Vec::new()),
            message_count: RefCell::new(HashMap::new()),
        }
    }

    /// True when an error message was emitted, false
    /// if only warnings were emitted.
    pub fn errored(&self) -> bool {
        self.count(MessageLevel::Error) > 0
    }

    pub fn count(&self, level: MessageLevel) -> usize {
        self.message_count
            .borrow()
            .get(&level)
            .cloned()
            .unwrap_or(0)
    }

    /// A copy of everything reported so far, in reporting order.
    pub fn messages(&self) -> Vec<Diagnostic> {
        self.messages.borrow().clone()
    }

    pub fn write_statistics(&self) {
        let mut writer = self.writer.borrow_mut();
        let mut output = ColorOutput::new(&mut **writer);

        output.set_bold(true);

        if self.errored() {
            output.set_color(MessageLevel::Error.color());
            writeln!(
                output.writer(),
                "Compilation aborted due to {}",
                match self.count(MessageLevel::Error) {
                    1 => "an error".to_string(),
                    n => format!("{} errors", n),
                }
            )
            .ok();
        } else {
            output.set_color(Some(Color::Green));
            writeln!(
                output.writer(),
                "Compilation finished successfully {}",
                match self.count(MessageLevel::Warning) {
                    0 => "without warnings".to_string(),
                    1 => "with a warning".to_string(),
                    n => format!("with {} warnings", n),
                }
            )
            .ok();
        }
    }

    /// Record a message and write it to the writer given in the `new`
    /// constructor. Most of the time this will be stderr.
    pub fn emit(&self, level: MessageLevel, kind: MaybeSpanned<Box<dyn AsFail>>) {
        let span = kind.span().cloned();
        let msg = Diagnostic {
            level,
            message: kind.as_fail().to_string(),
            span,
        };

        {
            let mut writer = self.writer.borrow_mut();
            msg.write_colored(&mut **writer);
        }
        self.messages.borrow_mut().push(msg);
        self.increment_level_count(level);
    }

    pub fn warning(&self, kind: Box<dyn AsFail>) {
        self.emit(MessageLevel::Warning, MaybeSpanned::WithoutSpan(kind))
    }

    pub fn error(&self, kind: Box<dyn AsFail>) {
        self.emit(MessageLevel::Error, MaybeSpanned::WithoutSpan(kind))
    }

    pub fn warning_at(&self, span: &Span, kind: Box<dyn AsFail>) {
        self.emit(
            MessageLevel::Warning,
            Spanned::new(span.clone(), kind).into(),
        )
    }

    pub fn error_at(&self, span: &Span, kind: Box<dyn AsFail>) {
        self.emit(MessageLevel::Error, Spanned::new(span.clone(), kind).into())
    }

    fn increment_level_count(&self, level: MessageLevel) {
        let mut message_count = self.message_count.borrow_mut();
        let counter = message_count.entry(level).or_insert(0);
        *counter += 1;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MessageLevel {
    Error,
    Warning,
}

impl MessageLevel {
    fn color(self) -> Option<Color> {
        // Don't be confused by the return type. `None` means default color!
        match self {
            MessageLevel::Error => Some(Color::Red),
            MessageLevel::Warning => Some(Color::Yellow),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageLevel::Error => "error",
            MessageLevel::Warning => "warning",
        }
    }
}

impl Diagnostic {
    fn write_colored(&self, writer: &mut dyn WriteColor) {
        let mut output = ColorOutput::new(writer);

        match &self.span {
            Some(span) => {
                output.set_bold(true);
                write!(output.writer(), "{} - ", span).ok();
                output.set_bold(false);
                output.set_color(self.level.color());
                if self.level != MessageLevel::Error {
                    write!(output.writer(), "{}: ", self.level.name()).ok();
                }
            }
            None => {
                output.set_color(self.level.color());
                output.set_bold(true);
                write!(output.writer(), "{}: ", self.level.name()).ok();
                output.set_bold(false);
            }
        }

        output.set_color(None);
        writeln!(output.writer(), "{}", self.message).ok();
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.span, self.level) {
            (Some(span), MessageLevel::Error) => write!(f, "{} - {}", span, self.message),
            (Some(span), level) => write!(f, "{} - {}: {}", span, level.name(), self.message),
            (None, level) => write!(f, "{}: {}", level.name(), self.message),
        }
    }
}

/// Calls to functions should pass the raw writer, each function should
/// create its own ColorOutput object that is dropped on return. This
/// gurantees correct coloring in nested calls.
struct ColorOutput<'a> {
    writer: &'a mut dyn WriteColor,
    spec: ColorSpec,
}

impl<'a> ColorOutput<'a> {
    fn new(writer: &'a mut dyn WriteColor) -> Self {
        writer.reset().ok();

        Self {
            writer,
            spec: ColorSpec::new(),
        }
    }

    fn set_color(&mut self, color: Option<Color>) {
        // ignore coloring failures using ok()
        self.spec.set_fg(color);
        self.writer.set_color(&self.spec).ok();
    }

    fn set_bold(&mut self, yes: bool) {
        self.spec.set_bold(yes);
        self.writer.set_color(&self.spec).ok();
    }

    fn writer(&mut self) -> &mut dyn WriteColor {
        self.writer
    }
}

/// reset to no color by default. Otherwise code that
/// is not color aware will print everything in the
/// color last used.
impl<'a> Drop for ColorOutput<'a> {
    fn drop(&mut self) {
        self.writer.reset().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use failure::Fail;
    use span::Position;
    use std::{
        io,
        rc::Rc,
        sync::{Arc, Mutex},
    };
    use utils::assert_matches;

    #[derive(Debug, Fail)]
    enum TestError {
        #[fail(display = "unknown symbol '{}'", name)]
        UnknownSymbol { name: String },
        #[fail(display = "could not load module {}", module)]
        NoModule { module: String },
    }

    /// A `WriteColor` that keeps what was written readable after the
    /// diagnostics object took ownership of it.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            io::Write::write(&mut *self.0.lock().unwrap(), buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl WriteColor for SharedBuffer {
        fn supports_color(&self) -> bool {
            false
        }

        fn set_color(&mut self, _spec: &ColorSpec) -> io::Result<()> {
            Ok(())
        }

        fn reset(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn span() -> Span {
        Span::new(Rc::from("main.jl"), Position::new(3, 5), Position::new(3, 9))
    }

    #[test]
    fn spanned_error_is_rendered_with_location() {
        let buffer = SharedBuffer::default();
        let diagnostics = Diagnostics::new(Box::new(buffer.clone()));
        diagnostics.error_at(
            &span(),
            Box::new(TestError::UnknownSymbol {
                name: "x".to_string(),
            }),
        );
        assert_eq!(
            "main.jl  3:5,3:9 - unknown symbol 'x'\n",
            buffer.contents()
        );
        assert!(diagnostics.errored());
    }

    #[test]
    fn unspanned_error_has_level_prefix() {
        let buffer = SharedBuffer::default();
        let diagnostics = Diagnostics::new(Box::new(buffer.clone()));
        diagnostics.error(Box::new(TestError::NoModule {
            module: "io".to_string(),
        }));
        assert_eq!("error: could not load module io\n", buffer.contents());
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let diagnostics = Diagnostics::new(Box::new(termcolor::Buffer::no_color()));
        diagnostics.warning_at(
            &span(),
            Box::new(TestError::UnknownSymbol {
                name: "y".to_string(),
            }),
        );
        assert!(!diagnostics.errored());
        assert_eq!(1, diagnostics.count(MessageLevel::Warning));
        let messages = diagnostics.messages();
        assert_matches!(
            &messages[..],
            [Diagnostic {
                level: MessageLevel::Warning,
                span: Some(_),
                ..
            }]
        );
        assert_eq!(
            "main.jl  3:5,3:9 - warning: unknown symbol 'y'",
            messages[0].to_string()
        );
    }

    #[test]
    fn statistics_summarize_errors() {
        let buffer = SharedBuffer::default();
        let diagnostics = Diagnostics::new(Box::new(buffer.clone()));
        for name in &["a", "b"] {
            diagnostics.error_at(
                &span(),
                Box::new(TestError::UnknownSymbol {
                    name: name.to_string(),
                }),
            );
        }
        diagnostics.write_statistics();
        assert!(buffer.contents().ends_with("Compilation aborted due to 2 errors\n"));
    }
}
