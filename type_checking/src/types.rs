//! The type universe: primitives, the reference supertype, arrays and
//! classes.
//!
//! Types are values. Cloning one is cheap, arrays and classes are reference
//! counted. Classes are compared by name; their fields are filled in after
//! the class was declared (see `TypeInfo::resolve_classes`), which is what
//! lets two classes refer to each other.
use crate::{
    ast::{BinaryOp, UnaryOp},
    functions::{Function, Functions},
};
use std::{cell::RefCell, fmt, rc::Rc};

/// Primitive types, ordered by widening rank. Everything from `Int8` on is
/// numeric and widens to the types after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Primitive {
    Null,
    Void,
    Boolean,
    Int8,
    Int32,
    Float64,
}

impl Primitive {
    pub fn is_numeric(self) -> bool {
        self >= Primitive::Int8
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Void => "void",
            Primitive::Boolean => "boolean",
            Primitive::Int8 => "char",
            Primitive::Int32 => "int",
            Primitive::Float64 => "double",
        }
    }

    fn mangle(self) -> &'static str {
        match self {
            Primitive::Null => "n",
            Primitive::Void => "v",
            Primitive::Boolean => "b",
            Primitive::Int8 => "c",
            Primitive::Int32 => "i",
            Primitive::Float64 => "d",
        }
    }
}

#[derive(Clone)]
pub enum Type {
    Primitive(Primitive),
    /// Supertype of everything living on the heap, the common type when
    /// arrays, objects and `null` are compared.
    Reference,
    Array(Rc<ArrayType>),
    Class(Rc<ClassType>),
}

#[derive(Debug, PartialEq)]
pub struct ArrayType {
    pub element: Type,
    /// number of indices needed to reach an element, at least 1
    pub dimension: u32,
    /// `Some(n)` for fixed-length arrays
    pub static_size: Option<u32>,
}

/// A user defined class. `fields` is empty until the class is defined.
pub struct ClassType {
    name: String,
    fields: RefCell<Vec<Field>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// dense, zero-based, in declaration order
    pub index: usize,
    pub ty: Type,
}

/// Storage index of the synthetic `length` field of arrays. Slot 0 holds
/// the data pointer.
pub const ARRAY_LENGTH_INDEX: usize = 1;
pub const ARRAY_LENGTH_FIELD: &str = "length";

impl Type {
    pub const NULL: Type = Type::Primitive(Primitive::Null);
    pub const VOID: Type = Type::Primitive(Primitive::Void);
    pub const BOOLEAN: Type = Type::Primitive(Primitive::Boolean);
    pub const INT8: Type = Type::Primitive(Primitive::Int8);
    pub const INT32: Type = Type::Primitive(Primitive::Int32);
    pub const FLOAT64: Type = Type::Primitive(Primitive::Float64);

    pub fn array(element: Type, dimension: u32, static_size: Option<u32>) -> Type {
        debug_assert!(dimension >= 1);
        Type::Array(Rc::new(ArrayType {
            element,
            dimension,
            static_size,
        }))
    }

    pub fn is_void(&self) -> bool {
        match self {
            Type::Primitive(Primitive::Void) => true,
            _ => false,
        }
    }

    /// Equality that tells apart two distinct classes with the same name.
    /// Used when merging type tables of different modules.
    pub fn is_identical(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Class(a), Type::Class(b)) => Rc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// Whether a value of this type may flow into a slot of type `target`
    /// without a cast written by the user. Only widening is implicit.
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Type::Primitive(from), Type::Primitive(to)) => {
                from.is_numeric() && to.is_numeric() && from < to
            }
            (Type::Primitive(Primitive::Null), _) => true,
            (Type::Array(_), Type::Reference) | (Type::Class(_), Type::Reference) => true,
            _ => false,
        }
    }

    /// Whether an explicit cast from this type to `target` is allowed.
    pub fn can_cast_to(&self, target: &Type) -> bool {
        if self.is_assignable_to(target) {
            return true;
        }
        match (self, target) {
            (Type::Primitive(from), Type::Primitive(to)) => {
                *from != Primitive::Void && *to != Primitive::Void
            }
            _ => false,
        }
    }

    /// Short code of this type used in mangled function names.
    pub fn mangle(&self) -> String {
        match self {
            Type::Primitive(p) => p.mangle().to_string(),
            Type::Reference => "R".to_string(),
            Type::Array(array) => {
                let shape = match (array.static_size, array.dimension) {
                    (Some(size), _) => format!("S_{}_", size),
                    (None, 1) => "P".to_string(),
                    (None, dimension) => format!("M_{}_", dimension),
                };
                format!("A{}{}", shape, array.element.mangle())
            }
            // length prefixed, so that class names cannot run into the
            // codes of following parameters
            Type::Class(class) => format!("C{}{}", class.name.len(), class.name),
        }
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        match self {
            Type::Array(array) if name == ARRAY_LENGTH_FIELD => Some(Field {
                name: ARRAY_LENGTH_FIELD.to_string(),
                index: ARRAY_LENGTH_INDEX,
                ty: array.length_type(),
            }),
            Type::Class(class) => class.field(name),
            _ => None,
        }
    }

    /// Names accepted by `field`, used for suggestions.
    pub fn field_names(&self) -> Vec<String> {
        match self {
            Type::Array(_) => vec![ARRAY_LENGTH_FIELD.to_string()],
            Type::Class(class) => class.fields().into_iter().map(|f| f.name).collect(),
            _ => Vec::new(),
        }
    }

    /// The operator function for `self op other`, if exactly one matches.
    pub fn supports_binary_operator(
        &self,
        op: BinaryOp,
        other: &Type,
        functions: &Functions,
    ) -> Option<Rc<Function>> {
        unique(functions.resolve(op.symbol(), &[self.clone(), other.clone()]))
    }

    pub fn supports_unary_operator(
        &self,
        op: UnaryOp,
        functions: &Functions,
    ) -> Option<Rc<Function>> {
        unique(functions.resolve(op.symbol(), &[self.clone()]))
    }
}

fn unique(mut candidates: Vec<Rc<Function>>) -> Option<Rc<Function>> {
    if candidates.len() == 1 {
        candidates.pop()
    } else {
        None
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Reference, Type::Reference) => true,
            (Type::Array(a), Type::Array(b)) => a == b,
            (Type::Class(a), Type::Class(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => f.write_str(p.name()),
            Type::Reference => f.write_str("ref"),
            Type::Array(array) => match array.static_size {
                Some(size) => write!(f, "{}[{}]", array.element, size),
                None => write!(
                    f,
                    "{}[{}]",
                    array.element,
                    ",".repeat(array.dimension as usize - 1)
                ),
            },
            Type::Class(class) => f.write_str(&class.name),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self)
    }
}

impl ArrayType {
    /// `int` for one-dimensional arrays, one length per dimension
    /// otherwise.
    pub fn length_type(&self) -> Type {
        if self.dimension == 1 {
            Type::INT32
        } else {
            Type::array(Type::INT32, 1, Some(self.dimension))
        }
    }
}

impl ClassType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.fields.borrow().iter().find(|f| f.name == name).cloned()
    }

    pub fn fields(&self) -> Vec<Field> {
        self.fields.borrow().clone()
    }

    pub(crate) fn set_fields(&self, fields: Vec<Field>) {
        *self.fields.borrow_mut() = fields;
    }
}

/// Field types may point back to the class itself, so only their names are
/// printed.
impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassType")
            .field("name", &self.name)
            .field(
                "fields",
                &self
                    .fields
                    .borrow()
                    .iter()
                    .map(|field| format!("{} {}", field.ty, field.name))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
