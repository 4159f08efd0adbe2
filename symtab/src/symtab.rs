use failure::Fail;
use std::{borrow::Borrow, collections::HashMap, hash::Hash};

/// SymbolTable associates a Symbol `S` with a stored value `T`.
pub type SymbolTable<S, T> = HashMap<S, T>;

/// Scoped implements lexical scoping for SymbolTable.
/// The generic type `S` is the Symbol and `T` is the value stored for that
/// symbol.
///
/// A definition in an inner scope shadows definitions of the same symbol in
/// enclosing scopes until the inner scope is left. Defining a symbol twice in
/// the same scope is an error.
pub struct Scoped<S, T>
where
    S: Hash + Eq + Clone,
{
    /// `scopes[0]` is the root scope, it is never left.
    scopes: Vec<SymbolTable<S, T>>,
    /// For each visible symbol, the indices of the scopes defining it,
    /// innermost last.
    visible_defs: HashMap<S, Vec<usize>>,
}

#[derive(Debug, Fail)]
#[fail(display = "cannot leave the root scope")]
pub struct CannotLeaveRootScopeError;

#[derive(Debug, Fail)]
#[fail(display = "symbol is already defined in this scope")]
pub struct RedefinitionError;

impl<S, T> Default for Scoped<S, T>
where
    S: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T> Scoped<S, T>
where
    S: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Scoped {
            scopes: vec![SymbolTable::new()],
            visible_defs: HashMap::new(),
        }
    }

    /// Number of scopes entered on top of the root scope.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(SymbolTable::new())
    }

    pub fn leave_scope(&mut self) -> Result<(), CannotLeaveRootScopeError> {
        if self.scopes.len() == 1 {
            return Err(CannotLeaveRootScopeError);
        }
        let popped = self.scopes.pop().ok_or(CannotLeaveRootScopeError)?;
        for sym in popped.keys() {
            let now_empty = match self.visible_defs.get_mut(sym) {
                Some(stack) => {
                    let idx = stack.pop();
                    debug_assert_eq!(idx, Some(self.scopes.len()));
                    stack.is_empty()
                }
                None => {
                    debug_assert!(false, "scopes inconsistent with visible_defs");
                    false
                }
            };
            if now_empty {
                self.visible_defs.remove(sym);
            }
        }
        Ok(())
    }

    pub fn define(&mut self, sym: S, val: T) -> Result<(), RedefinitionError> {
        let idx = self.scopes.len() - 1;
        let current_scope = &mut self.scopes[idx];
        if current_scope.contains_key(&sym) {
            return Err(RedefinitionError);
        }
        current_scope.insert(sym.clone(), val);
        self.visible_defs.entry(sym).or_insert_with(Vec::new).push(idx);
        Ok(())
    }

    /// The innermost definition of `sym`, `None` if it is not visible.
    pub fn visible_definition<Q>(&self, sym: &Q) -> Option<&T>
    where
        S: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.visible_defs.get(sym)?.last()?;
        let res = self.scopes[idx].get(sym);
        debug_assert!(res.is_some(), "visible_defs is inconsistent with scopes");
        res
    }

    pub fn defined_in_current_scope<Q>(&self, sym: &Q) -> bool
    where
        S: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.scopes[self.scopes.len() - 1].contains_key(sym)
    }

    /// All currently visible symbols, in no particular order.
    pub fn visible_symbols(&self) -> impl Iterator<Item = &S> {
        self.visible_defs.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::assert_matches;

    macro_rules! def {
        ($scoped:expr, $s:expr) => {
            $scoped.define($s, ()).unwrap();
            $scoped
                .visible_definition(&$s)
                .expect("just defined successfully, should be visible");
        };
        ($scoped:expr, $s:expr, $t:expr) => {{
            $scoped.define($s, $t).unwrap();
            let vis = $scoped
                .visible_definition(&$s)
                .expect("just defined successfully, should be visible");
            assert_eq!(&$t, vis);
        }};
    }

    macro_rules! assert_def {
        ($scoped:expr, $s:expr) => {
            $scoped
                .visible_definition(&$s)
                .expect(&format!("expecting visible definition for {:?}", $s));
        };
        ($scoped:expr, $s:expr, $t:expr) => {
            assert_eq!(Some(&$t), $scoped.visible_definition(&$s));
        };
    }

    macro_rules! assert_no_def {
        ($scoped:expr, $s:expr) => {
            let def = $scoped.visible_definition(&$s);
            assert_matches!(def, None);
        };
    }

    #[test]
    fn definition_inheritance_works() {
        let mut scoped = Scoped::new();
        def!(scoped, "root");
        scoped.enter_scope();
        def!(scoped, "l1");
        scoped.enter_scope();
        def!(scoped, "l2");

        // at l2
        assert_def!(scoped, "root");
        assert_def!(scoped, "l1");
        assert_def!(scoped, "l2");
        scoped.leave_scope().expect("not in root scope");
        // at l1
        assert_def!(scoped, "root");
        assert_def!(scoped, "l1");
        assert_no_def!(scoped, "l2");
        scoped.leave_scope().expect("not in root scope");
        // at root scope
        assert_def!(scoped, "root");
        assert_no_def!(scoped, "l1");
        assert_no_def!(scoped, "l2");
    }

    #[test]
    fn neighboring_scopes() {
        let mut scoped = Scoped::new();
        def!(scoped, "inroot");
        scoped.enter_scope();
        def!(scoped, "v");
        scoped.leave_scope().expect("not in root scope");
        scoped.enter_scope();
        def!(scoped, "v");
        scoped.leave_scope().expect("not in root scope");
    }

    #[test]
    fn shadowing_resolves_innermost() {
        let mut scoped = Scoped::new();
        def!(scoped, "x", 1);
        scoped.enter_scope();
        def!(scoped, "x", 2);
        scoped.enter_scope();
        assert_def!(scoped, "x", 2);
        scoped.leave_scope().unwrap();
        scoped.leave_scope().unwrap();
        assert_def!(scoped, "x", 1);
    }

    #[test]
    fn redefinition_in_same_scope() {
        let mut scoped = Scoped::new();
        scoped.enter_scope();
        def!(scoped, "23");
        let redef = scoped.define("23", ());
        assert_matches!(redef, Err(RedefinitionError));
        assert!(scoped.defined_in_current_scope("23"));
    }

    #[test]
    fn lookup_by_borrowed_key() {
        let mut scoped: Scoped<String, u8> = Scoped::new();
        scoped.define("count".to_string(), 7).unwrap();
        assert_eq!(Some(&7), scoped.visible_definition("count"));
        assert_eq!(vec!["count"], scoped.visible_symbols().collect::<Vec<_>>());
    }

    #[test]
    fn over_leaves_returns_err() {
        let mut scoped: Scoped<(), ()> = Scoped::new();
        scoped.enter_scope();
        scoped.enter_scope();
        assert_eq!(2, scoped.depth());
        scoped.leave_scope().unwrap();
        scoped.leave_scope().unwrap();
        let ret = scoped.leave_scope();
        assert_matches!(ret, Err(CannotLeaveRootScopeError));
    }
}
