use failure::Fail;
use std::fmt;

/// Returned by checks that could not compute a type. The reason was
/// already reported when this is returned; callers skip whatever depended
/// on the type and carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouldNotDetermineType;

#[derive(Debug, Fail)]
pub enum SemanticError {
    #[fail(display = "redefinition of type '{}'", name)]
    RedefinitionOfType { name: String },
    #[fail(
        display = "redefinition of function '{}', previously defined at {}",
        signature, previous
    )]
    RedefinitionOfFunction { signature: String, previous: String },
    #[fail(
        display = "conflicting declaration of '{}', previously declared as '{}'",
        name, previous
    )]
    ConflictingDeclaration { name: String, previous: String },
    #[fail(display = "redefinition of '{}' in the same scope", name)]
    RedefinitionOfSymbol { name: String },
    #[fail(display = "duplicate field '{}' in class '{}'", name, class)]
    DuplicateField { class: String, name: String },

    #[fail(display = "unknown type '{}'{}", name, suggestion)]
    UnknownType { name: String, suggestion: Suggestion },
    #[fail(display = "unknown symbol '{}'{}", name, suggestion)]
    UnknownSymbol { name: String, suggestion: Suggestion },
    #[fail(display = "type {} has no field '{}'{}", ty, name, suggestion)]
    UnknownField {
        ty: String,
        name: String,
        suggestion: Suggestion,
    },
    #[fail(display = "undeclared function: {}({})", name, args)]
    UndeclaredFunction { name: String, args: String },
    #[fail(
        display = "ambiguous function call: {}({})\ncandidates are:\n{}",
        name, args, candidates
    )]
    AmbiguousCall {
        name: String,
        args: String,
        candidates: String,
    },

    #[fail(display = "operator '{}' cannot be applied to ({})", op, operands)]
    IncompatibleOperands { op: String, operands: String },
    #[fail(display = "cannot cast {} to {}", from, to)]
    InvalidCast { from: String, to: String },
    #[fail(display = "cannot assign {} to {}", from, to)]
    CannotAssign { from: String, to: String },
    #[fail(display = "cannot index into non-array type {}", ty)]
    NotAnArray { ty: String },
    #[fail(
        display = "array of dimension {} accessed with {} index expression(s)",
        dimension, indices
    )]
    DimensionMismatch { dimension: u32, indices: usize },
    #[fail(display = "array allocation needs at least one size")]
    MissingArraySize,
    #[fail(display = "cannot assign to {}", what)]
    NotAddressable { what: &'static str },
    #[fail(display = "{} '{}' cannot have type void", kind, name)]
    VoidNotAllowed { kind: &'static str, name: String },
    #[fail(display = "cannot allocate an object of non-class type {}", ty)]
    NotAClass { ty: String },
    #[fail(display = "function '{}' must return a value of type {}", function, ty)]
    MissingReturnValue { function: String, ty: String },
    #[fail(display = "void function '{}' cannot return a value", function)]
    UnexpectedReturnValue { function: String },
    #[fail(display = "return outside of a function")]
    ReturnOutsideFunction,
    #[fail(display = "the entry point '{}' cannot be called", name)]
    EntryPointCall { name: String },
    #[fail(
        display = "entry point should be declared as 'int main(int, char[][])', found '{}'",
        found
    )]
    EntryPointSignature { found: String },
}

#[derive(Debug, Fail)]
pub enum ImportError {
    #[fail(display = "could not load module {}", module)]
    ModuleNotFound { module: String },
    #[fail(display = "could not parse module {}: {}", module, message)]
    Unparsable { module: String, message: String },
    #[fail(display = "circular import: {}", chain)]
    CircularImport { chain: String },
    #[fail(display = "multiply defined type '{}' imported from {}", name, module)]
    MultiplyDefinedType { name: String, module: String },
}

/// An optional "did you mean" hint, rendered as a suffix of the message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Suggestion(Option<String>);

impl Suggestion {
    /// The candidate closest to `name`, if it is close enough to be a typo.
    pub fn closest<'a, I>(name: &str, candidates: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max_distance = std::cmp::max(1, name.len() / 3);
        let best = candidates
            .into_iter()
            .filter(|candidate| *candidate != name)
            .map(|candidate| (levenshtein::levenshtein(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= max_distance)
            .min();
        Suggestion(best.map(|(_, candidate)| candidate.to_string()))
    }

    pub fn as_option(&self) -> Option<&str> {
        self.0.as_ref().map(String::as_str)
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(candidate) => write!(f, ", did you mean '{}'?", candidate),
            None => Ok(()),
        }
    }
}
