//! Node → type environment.
//!
//! [`TypeEnv`] is a cheap handle over two layers:
//! - the **pass cache**, shared by every handle derived from the same
//!   [`TypeEnv::new`] and written by every inference (successful or not);
//! - a **scoped overlay** of binder types, replaced wholesale by
//!   [`TypeEnv::extend_with`] and never mutated in place.
//!
//! Lookups consult the overlay first. Writes always go to the pass cache.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use deon_types::ast::NodeId;

use crate::ty::TypeTag;

#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    cache: Rc<RefCell<HashMap<NodeId, TypeTag>>>,
    scope: Rc<HashMap<NodeId, TypeTag>>,
}

impl TypeEnv {
    /// Fresh, empty environment for one analysis pass.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, node: NodeId) -> Option<TypeTag> {
        if let Some(ty) = self.scope.get(&node) {
            return Some(ty.clone());
        }
        self.cache.borrow().get(&node).cloned()
    }

    /// Record `node`'s type in the pass cache, replacing any previous entry.
    pub fn set(&self, node: NodeId, ty: TypeTag) {
        self.cache.borrow_mut().insert(node, ty);
    }

    /// New handle whose overlay is this one's plus `pairs` (`pairs` win on
    /// collision). `self` is left untouched; the pass cache stays shared.
    pub fn extend_with<I>(&self, pairs: I) -> TypeEnv
    where
        I: IntoIterator<Item = (NodeId, TypeTag)>,
    {
        let mut scope = (*self.scope).clone();
        scope.extend(pairs);
        TypeEnv {
            cache: Rc::clone(&self.cache),
            scope: Rc::new(scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_lookup() {
        let env = TypeEnv::new();
        assert!(env.lookup(NodeId(1)).is_none());
        env.set(NodeId(1), TypeTag::Integer(None));
        assert_eq!(env.lookup(NodeId(1)), Some(TypeTag::Integer(None)));
    }

    #[test]
    fn extend_with_does_not_touch_parent() {
        let env = TypeEnv::new();
        let scoped = env.extend_with([(NodeId(7), TypeTag::Boolean(None))]);
        assert_eq!(scoped.lookup(NodeId(7)), Some(TypeTag::Boolean(None)));
        assert!(env.lookup(NodeId(7)).is_none());
    }

    #[test]
    fn overlay_wins_on_collision() {
        let env = TypeEnv::new();
        env.set(NodeId(2), TypeTag::String(None));
        let scoped = env.extend_with([(NodeId(2), TypeTag::Integer(None))]);
        assert_eq!(scoped.lookup(NodeId(2)), Some(TypeTag::Integer(None)));
        assert_eq!(env.lookup(NodeId(2)), Some(TypeTag::String(None)));

        let inner = scoped.extend_with([(NodeId(2), TypeTag::Boolean(None))]);
        assert_eq!(inner.lookup(NodeId(2)), Some(TypeTag::Boolean(None)));
        assert_eq!(scoped.lookup(NodeId(2)), Some(TypeTag::Integer(None)));
    }

    #[test]
    fn scoped_writes_reach_the_pass_cache() {
        let env = TypeEnv::new();
        let scoped = env.extend_with([(NodeId(1), TypeTag::Integer(None))]);
        scoped.set(NodeId(9), TypeTag::String(None));
        assert_eq!(env.lookup(NodeId(9)), Some(TypeTag::String(None)));
    }
}
