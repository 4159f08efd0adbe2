//! Functions, overload sets and the pool interning functions by mangled
//! name.
use crate::{error::SemanticError, types::Type};
use itertools::Itertools;
use span::Span;
use std::{
    cell::RefCell,
    collections::{hash_map::Entry, HashMap},
    fmt,
    ops::BitOr,
    rc::Rc,
};

/// Name of the program entry point. It is never mangled and cannot be
/// called from juli code.
pub const ENTRY_POINT: &str = "main";

const EXACT_MATCH: u32 = 2;
const ASSIGNABLE_MATCH: u32 = 1;
/// Score of a niladic function called without arguments.
const NILADIC_MATCH: u32 = u32::max_value();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    /// Keep the plain name as symbol, for linking against C.
    pub const C_LINKAGE: Modifiers = Modifiers(1);
    /// Built-in operator, there is no code for it.
    pub const IMPLICIT: Modifiers = Modifiers(1 << 1);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormalParameter {
    pub ty: Type,
    pub name: String,
}

impl FormalParameter {
    pub fn new(ty: Type, name: &str) -> Self {
        Self {
            ty,
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub result: Type,
    pub formals: Vec<FormalParameter>,
    pub var_args: bool,
    pub modifiers: Modifiers,
    mangled: String,
    /// Location of the body, `None` while the function is only declared.
    body: RefCell<Option<Span>>,
}

/// Symbol name of a function with the given signature.
///
/// `main` and functions with C linkage keep their name. Everything else gets
/// the mangled parameter types appended, so overloads get distinct names and
/// two definitions of the same signature collide.
pub fn mangle(name: &str, formals: &[Type], var_args: bool, modifiers: Modifiers) -> String {
    if modifiers.contains(Modifiers::C_LINKAGE) || name == ENTRY_POINT {
        return name.to_string();
    }
    let mut mangled = format!("{}__", name);
    for ty in formals {
        mangled.push_str(&ty.mangle());
    }
    if var_args {
        mangled.push('z');
    }
    mangled
}

impl Function {
    pub fn mangled_name(&self) -> &str {
        &self.mangled
    }

    pub fn is_defined(&self) -> bool {
        self.body.borrow().is_some()
    }

    pub fn body_span(&self) -> Option<Span> {
        self.body.borrow().clone()
    }

    pub fn is_implicit(&self) -> bool {
        self.modifiers.contains(Modifiers::IMPLICIT)
    }

    pub fn formal_types(&self) -> Vec<Type> {
        self.formals.iter().map(|f| f.ty.clone()).collect()
    }

    /// How well this function fits a call with arguments of type `args`.
    ///
    /// 0 means the function cannot be called with these arguments. Each
    /// argument matching its parameter exactly adds 2, each argument that
    /// needs widening adds 1.
    pub fn matches(&self, args: &[Type]) -> u32 {
        if args.len() < self.formals.len() || (args.len() > self.formals.len() && !self.var_args)
        {
            return 0;
        }
        if args.is_empty() && self.formals.is_empty() {
            return NILADIC_MATCH;
        }

        let mut score = 0;
        for (arg, formal) in args.iter().zip(&self.formals) {
            if *arg == formal.ty {
                score += EXACT_MATCH;
            } else if arg.is_assignable_to(&formal.ty) {
                score += ASSIGNABLE_MATCH;
            } else {
                return 0;
            }
        }

        // only varargs were passed to a function without fixed parameters
        if score == 0 {
            ASSIGNABLE_MATCH
        } else {
            score
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = self
            .formals
            .iter()
            .map(|p| {
                if p.name.is_empty() {
                    p.ty.to_string()
                } else {
                    format!("{} {}", p.ty, p.name)
                }
            })
            .collect::<Vec<_>>();
        if self.var_args {
            params.push("...".to_string());
        }
        write!(f, "{} {}({})", self.result, self.name, params.join(", "))
    }
}

/// Interns functions by mangled name for one compile session.
///
/// A signature declared in several units (or imported into several units)
/// yields the same `Function`. Defining it twice with different bodies is
/// an error.
#[derive(Debug, Default)]
pub struct FunctionPool {
    functions: RefCell<HashMap<String, Rc<Function>>>,
}

impl FunctionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        name: &str,
        result: Type,
        formals: Vec<FormalParameter>,
        var_args: bool,
        modifiers: Modifiers,
        body: Option<Span>,
    ) -> Result<Rc<Function>, SemanticError> {
        let formal_types = formals.iter().map(|f| f.ty.clone()).collect::<Vec<_>>();
        let mangled = mangle(name, &formal_types, var_args, modifiers);

        let mut functions = self.functions.borrow_mut();
        match functions.entry(mangled) {
            Entry::Occupied(e) => {
                let existing = Rc::clone(e.get());
                if existing.result != result || existing.formal_types() != formal_types {
                    return Err(SemanticError::ConflictingDeclaration {
                        name: name.to_string(),
                        previous: existing.to_string(),
                    });
                }
                if let Some(body) = body {
                    let previous = existing.body_span();
                    match previous {
                        Some(previous) if previous != body => {
                            return Err(SemanticError::RedefinitionOfFunction {
                                signature: existing.to_string(),
                                previous: previous.to_string(),
                            });
                        }
                        Some(_) => (),
                        None => *existing.body.borrow_mut() = Some(body),
                    }
                }
                Ok(existing)
            }
            Entry::Vacant(e) => {
                let function = Rc::new(Function {
                    name: name.to_string(),
                    result,
                    formals,
                    var_args,
                    modifiers,
                    mangled: e.key().clone(),
                    body: RefCell::new(body),
                });
                log::trace!("interned {} as {}", function, function.mangled);
                e.insert(Rc::clone(&function));
                Ok(function)
            }
        }
    }

    /// Interns a built-in operator. These never have a body and are only
    /// declared once, so there is nothing that could conflict.
    pub fn declare_implicit(
        &self,
        name: &str,
        result: Type,
        formals: Vec<FormalParameter>,
    ) -> Rc<Function> {
        let formal_types = formals.iter().map(|f| f.ty.clone()).collect::<Vec<_>>();
        let mangled = mangle(name, &formal_types, false, Modifiers::IMPLICIT);
        let mut functions = self.functions.borrow_mut();
        let function = functions.entry(mangled.clone()).or_insert_with(|| {
            Rc::new(Function {
                name: name.to_string(),
                result,
                formals,
                var_args: false,
                modifiers: Modifiers::IMPLICIT,
                mangled,
                body: RefCell::new(None),
            })
        });
        Rc::clone(function)
    }

    pub fn lookup(&self, mangled: &str) -> Option<Rc<Function>> {
        self.functions.borrow().get(mangled).cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Overload sets: every function visible in a unit, grouped by name.
#[derive(Debug, Clone, Default)]
pub struct Functions {
    overloads: HashMap<String, Vec<Rc<Function>>>,
}

impl Functions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, function: Rc<Function>) {
        let set = self
            .overloads
            .entry(function.name.clone())
            .or_insert_with(Vec::new);
        if !set.iter().any(|f| Rc::ptr_eq(f, &function)) {
            set.push(function);
        }
    }

    pub fn merge(&mut self, other: &Functions) {
        for function in Iterator::flatten(other.overloads.values()) {
            self.add(Rc::clone(function));
        }
    }

    pub fn candidates(&self, name: &str) -> &[Rc<Function>] {
        self.overloads.get(name).map(|v| &v[..]).unwrap_or(&[])
    }

    /// The best scoring candidates named `name` for arguments of type
    /// `args`. Empty if nothing fits, more than one if several fit equally
    /// well.
    pub fn resolve(&self, name: &str, args: &[Type]) -> Vec<Rc<Function>> {
        let mut best = 0;
        let mut matches = Vec::new();
        for candidate in self.candidates(name) {
            let score = candidate.matches(args);
            if score == 0 || score < best {
                continue;
            }
            if score > best {
                best = score;
                matches.clear();
            }
            matches.push(Rc::clone(candidate));
        }
        log::trace!(
            "resolved {}({}) to {} candidate(s) with score {}",
            name,
            args.iter().join(", "),
            matches.len(),
            best
        );
        matches
    }

    /// All functions, sorted by mangled name.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Function>> {
        let mut all = Iterator::flatten(self.overloads.values()).collect::<Vec<_>>();
        all.sort_by(|a, b| a.mangled.cmp(&b.mangled));
        all.into_iter()
    }

    /// Functions with code in this unit: the symbols a code generator has
    /// to emit.
    pub fn defined(&self) -> Vec<Rc<Function>> {
        self.iter().filter(|f| f.is_defined()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use span::Position;
    use utils::assert_matches;

    fn params(types: &[Type]) -> Vec<FormalParameter> {
        types
            .iter()
            .enumerate()
            .map(|(i, ty)| FormalParameter::new(ty.clone(), &format!("p{}", i)))
            .collect()
    }

    fn declare(pool: &FunctionPool, name: &str, types: &[Type]) -> Rc<Function> {
        pool.get(name, Type::VOID, params(types), false, Modifiers::NONE, None)
            .unwrap()
    }

    fn body(line: u32) -> Option<Span> {
        Some(Span::new(
            std::rc::Rc::from("test.jl"),
            Position::new(line, 1),
            Position::new(line + 2, 1),
        ))
    }

    #[test]
    fn exact_beats_widening() {
        let pool = FunctionPool::new();
        let f_int = declare(&pool, "f", &[Type::INT32]);
        let f_double = declare(&pool, "f", &[Type::FLOAT64]);
        assert_eq!(2, f_int.matches(&[Type::INT32]));
        assert_eq!(1, f_double.matches(&[Type::INT32]));

        let mut functions = Functions::new();
        functions.add(f_double);
        functions.add(Rc::clone(&f_int));
        let resolved = functions.resolve("f", &[Type::INT32]);
        assert_eq!(1, resolved.len());
        assert!(Rc::ptr_eq(&f_int, &resolved[0]));
    }

    #[test]
    fn ties_are_all_returned() {
        let pool = FunctionPool::new();
        let mut functions = Functions::new();
        functions.add(declare(&pool, "f", &[Type::INT32, Type::FLOAT64]));
        functions.add(declare(&pool, "f", &[Type::FLOAT64, Type::INT32]));
        let resolved = functions.resolve("f", &[Type::INT8, Type::INT8]);
        assert_eq!(2, resolved.len());
    }

    #[test]
    fn arity_mismatch_scores_zero() {
        let pool = FunctionPool::new();
        let f = declare(&pool, "f", &[Type::INT32, Type::INT32]);
        assert_eq!(0, f.matches(&[Type::INT32]));
        assert_eq!(0, f.matches(&[Type::INT32, Type::INT32, Type::INT32]));
        assert_eq!(4, f.matches(&[Type::INT32, Type::INT32]));
    }

    #[test]
    fn incompatible_argument_disqualifies() {
        let pool = FunctionPool::new();
        let f = declare(&pool, "f", &[Type::FLOAT64, Type::INT8]);
        assert_eq!(0, f.matches(&[Type::FLOAT64, Type::INT32]));
    }

    #[test]
    fn niladic_and_varargs() {
        let pool = FunctionPool::new();
        let now = declare(&pool, "now", &[]);
        assert_eq!(NILADIC_MATCH, now.matches(&[]));
        assert_eq!(0, now.matches(&[Type::INT32]));

        let printf = pool
            .get(
                "printf",
                Type::INT32,
                params(&[Type::array(Type::INT8, 1, None)]),
                true,
                Modifiers::C_LINKAGE,
                None,
            )
            .unwrap();
        let format = Type::array(Type::INT8, 1, None);
        assert_eq!(2, printf.matches(&[format.clone()]));
        assert_eq!(2, printf.matches(&[format, Type::FLOAT64, Type::BOOLEAN]));
        assert_eq!(0, printf.matches(&[]));

        let any = pool
            .get("any", Type::VOID, vec![], true, Modifiers::NONE, None)
            .unwrap();
        assert_eq!(1, any.matches(&[Type::INT32]));
    }

    #[test]
    fn mangling() {
        assert_ne!(
            mangle("f", &[Type::INT32], false, Modifiers::NONE),
            mangle("f", &[Type::FLOAT64], false, Modifiers::NONE)
        );
        assert_eq!("f__id", mangle("f", &[Type::INT32, Type::FLOAT64], false, Modifiers::NONE));
        assert_eq!("g__", mangle("g", &[], false, Modifiers::NONE));
        assert_eq!("log__APcz", mangle("log", &[Type::array(Type::INT8, 1, None)], true, Modifiers::NONE));
        assert_eq!("puts", mangle("puts", &[Type::INT32], false, Modifiers::C_LINKAGE));
        assert_eq!(
            "main",
            mangle(
                "main",
                &[Type::INT32, Type::array(Type::array(Type::INT8, 1, None), 1, None)],
                false,
                Modifiers::NONE
            )
        );
    }

    #[test]
    fn pool_interns_signatures() {
        let pool = FunctionPool::new();
        let a = declare(&pool, "f", &[Type::INT32]);
        let b = declare(&pool, "f", &[Type::INT32]);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(1, pool.len());
        assert!(pool.lookup("f__i").is_some());
    }

    #[test]
    fn declared_function_can_be_defined_once() {
        let pool = FunctionPool::new();
        let declared = declare(&pool, "f", &[Type::INT32]);
        assert!(!declared.is_defined());

        let defined = pool
            .get("f", Type::VOID, params(&[Type::INT32]), false, Modifiers::NONE, body(3))
            .unwrap();
        assert!(Rc::ptr_eq(&declared, &defined));
        assert!(declared.is_defined());

        // the same definition again, e.g. seen through two paths
        assert!(pool
            .get("f", Type::VOID, params(&[Type::INT32]), false, Modifiers::NONE, body(3))
            .is_ok());

        let redefinition =
            pool.get("f", Type::VOID, params(&[Type::INT32]), false, Modifiers::NONE, body(9));
        assert_matches!(redefinition, Err(SemanticError::RedefinitionOfFunction { .. }));
    }

    #[test]
    fn conflicting_result_type() {
        let pool = FunctionPool::new();
        declare(&pool, "f", &[Type::INT32]);
        let conflict = pool.get(
            "f",
            Type::INT32,
            params(&[Type::INT32]),
            false,
            Modifiers::NONE,
            None,
        );
        assert_matches!(conflict, Err(SemanticError::ConflictingDeclaration { .. }));
    }

    #[test]
    fn registry_deduplicates_and_lists_definitions() {
        let pool = FunctionPool::new();
        let mut functions = Functions::new();
        let f = declare(&pool, "f", &[]);
        functions.add(Rc::clone(&f));
        functions.add(Rc::clone(&f));
        assert_eq!(1, functions.candidates("f").len());

        let g = pool
            .get("g", Type::VOID, vec![], false, Modifiers::NONE, body(1))
            .unwrap();
        let mut other = Functions::new();
        other.add(g);
        functions.merge(&other);
        let defined = functions.defined();
        assert_eq!(1, defined.len());
        assert_eq!("g__", defined[0].mangled_name());
    }

    #[test]
    fn display_signature() {
        let pool = FunctionPool::new();
        let f = pool
            .get(
                "printf",
                Type::INT32,
                vec![FormalParameter::new(Type::array(Type::INT8, 1, None), "format")],
                true,
                Modifiers::C_LINKAGE,
                None,
            )
            .unwrap();
        assert_eq!("int printf(char[] format, ...)", f.to_string());
    }
}
