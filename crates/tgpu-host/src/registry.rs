//! Kernel metadata registry
//!
//! Emitted modules record `{ v, name, ast, externals }` for every kernel in
//! `globalThis.__TYPEGPU_META__`. The interpreter backs that store with an
//! injectable [`MetaRegistry`], so each test or host gets its own.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::value::{Obj, Object, Value};

pub(crate) type SharedRegistry = Rc<RefCell<dyn MetaRegistry>>;

/// Opaque, non-owning key for a function (or any object) value
#[derive(Clone)]
pub struct FnHandle {
    target: Weak<RefCell<Object>>,
}

impl FnHandle {
    pub fn of(value: &Value) -> Option<Self> {
        value.as_obj().map(|obj| FnHandle {
            target: Rc::downgrade(&obj.0),
        })
    }

    /// Whether the keyed value is still reachable
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    pub fn same(&self, other: &FnHandle) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }

    pub fn upgrade(&self) -> Option<Value> {
        self.target.upgrade().map(|rc| Value::Object(Obj(rc)))
    }
}

impl std::fmt::Debug for FnHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnHandle({:p})", self.target.as_ptr())
    }
}

pub trait MetaRegistry {
    fn set(&mut self, key: FnHandle, meta: Value);

    fn get(&self, key: &FnHandle) -> Option<Value>;

    fn has(&self, key: &FnHandle) -> bool {
        self.get(key).is_some()
    }

    fn delete(&mut self, key: &FnHandle) -> bool;

    /// Live entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Weakly keyed store; entries disappear with their key
#[derive(Default)]
pub struct WeakRegistry {
    entries: Vec<(FnHandle, Value)>,
}

impl WeakRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&mut self) {
        self.entries.retain(|(key, _)| key.is_alive());
    }
}

impl MetaRegistry for WeakRegistry {
    fn set(&mut self, key: FnHandle, meta: Value) {
        self.prune();
        match self.entries.iter_mut().find(|(existing, _)| existing.same(&key)) {
            Some(entry) => entry.1 = meta,
            None => self.entries.push((key, meta)),
        }
    }

    fn get(&self, key: &FnHandle) -> Option<Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.is_alive() && existing.same(key))
            .map(|(_, meta)| meta.clone())
    }

    fn delete(&mut self, key: &FnHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| !existing.same(key));
        before != self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.iter().filter(|(key, _)| key.is_alive()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_replace() {
        let mut registry = WeakRegistry::new();
        let f = Value::Object(Obj::plain());
        let key = FnHandle::of(&f).unwrap();
        registry.set(key.clone(), Value::Number(1.0));
        registry.set(key.clone(), Value::Number(2.0));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&key), Some(Value::Number(2.0)));
        assert!(registry.delete(&key));
        assert!(!registry.has(&key));
    }

    #[test]
    fn test_entries_are_weak() {
        let mut registry = WeakRegistry::new();
        let kept = Value::Object(Obj::plain());
        registry.set(FnHandle::of(&kept).unwrap(), Value::Null);
        {
            let dropped = Value::Object(Obj::plain());
            registry.set(FnHandle::of(&dropped).unwrap(), Value::Null);
            assert_eq!(registry.len(), 2);
        }
        assert_eq!(registry.len(), 1);
        assert!(FnHandle::of(&Value::Number(1.0)).is_none());
    }
}
