//! Source locations handed to us by the parser.
//!
//! Every AST node carries a `Span`: the name of the file it was read from
//! and the first and last `Position` it covers. Nothing in here knows about
//! the contents of the file, diagnostics only ever print the coordinates.
mod maybe_spanned;
mod position;
mod span;
mod spanned;

pub use self::{maybe_spanned::MaybeSpanned, position::Position, span::Span, spanned::Spanned};
