//! The juli front end pipeline: load compilation units, declare them,
//! check them, and tell the caller how it went.
#![warn(rust_2018_idioms)]
#![warn(clippy::print_stdout)]

pub mod driver;

pub use self::driver::{CompiledUnit, Driver, DriverError, ExitStatus};
pub use compiler_shared::{CompileOptions, Context};
pub use type_checking::{ImportLoader, LoadError, ModuleSource};
