use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

/// A lexical scope: a mutable name table plus an optional parent. Scopes are
/// shared (`Rc`) because closures keep their defining environment alive and
/// the executor walks the same chain concurrently.
pub struct Environment {
    parent: Option<Rc<Environment>>,
    bindings: RefCell<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Rc<Environment> {
        Rc::new(Environment {
            parent: None,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    pub fn with_parent(parent: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            parent: Some(Rc::clone(parent)),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Reads a name, walking the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = self;
        loop {
            if let Some(value) = env.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            match &env.parent {
                Some(parent) => env = parent,
                None => return None,
            }
        }
    }

    /// Assigns a name using the scope-walk rule: the nearest scope that
    /// already holds the name is updated in place; otherwise the name is
    /// defined in this scope. Assigning to an existing outer name mutates
    /// it rather than shadowing it.
    pub fn assign(&self, name: &str, value: Value) {
        let mut env = self;
        loop {
            if env.bindings.borrow().contains_key(name) {
                env.bindings.borrow_mut().insert(name.to_string(), value);
                return;
            }
            match &env.parent {
                Some(parent) => env = parent,
                None => break,
            }
        }
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Binds a name in this scope unconditionally, shadowing any outer
    /// binding of the same name.
    pub fn define(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Snapshot of the bindings local to this scope (used to build module
    /// member tables).
    pub fn local_bindings(&self) -> HashMap<String, Value> {
        self.bindings.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_the_parent_chain() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        let inner = Environment::with_parent(&global);
        assert!(matches!(inner.get("x"), Some(Value::Int(1))));
        assert!(inner.get("y").is_none());
    }

    #[test]
    fn assign_updates_the_nearest_existing_binding() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        let inner = Environment::with_parent(&global);
        inner.assign("x", Value::Int(2));
        assert!(matches!(global.get("x"), Some(Value::Int(2))));
        assert!(inner.local_bindings().is_empty());
    }

    #[test]
    fn assign_defines_locally_when_name_is_new() {
        let global = Environment::new();
        let inner = Environment::with_parent(&global);
        inner.assign("x", Value::Int(5));
        assert!(matches!(inner.get("x"), Some(Value::Int(5))));
        assert!(global.get("x").is_none());
    }

    #[test]
    fn define_shadows_outer_bindings() {
        let global = Environment::new();
        global.define("x", Value::Int(1));
        let inner = Environment::with_parent(&global);
        inner.define("x", Value::Int(9));
        assert!(matches!(inner.get("x"), Some(Value::Int(9))));
        assert!(matches!(global.get("x"), Some(Value::Int(1))));
    }
}
