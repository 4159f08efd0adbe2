#![warn(
    rust_2018_idioms,
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

pub mod context;
pub mod options;

pub use self::{context::Context, options::CompileOptions};
