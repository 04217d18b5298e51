use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag that nests: a child scope is triggered
/// whenever it or any ancestor is (spec.md §5 -- "the parent driver's scope
/// dominates").
pub struct ShutdownScope {
    flag: AtomicBool,
    parent: Option<Arc<ShutdownScope>>,
}

impl ShutdownScope {
    pub fn root() -> Arc<Self> {
        Arc::new(Self { flag: AtomicBool::new(false), parent: None })
    }

    pub fn child(parent: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self { flag: AtomicBool::new(false), parent: Some(Arc::clone(parent)) })
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.parent.as_ref().is_some_and(|p| p.is_triggered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_scope_is_not_triggered() {
        let root = ShutdownScope::root();
        assert!(!root.is_triggered());
    }

    #[test]
    fn triggering_the_parent_propagates_to_the_child() {
        let root = ShutdownScope::root();
        let child = ShutdownScope::child(&root);
        assert!(!child.is_triggered());
        root.trigger();
        assert!(child.is_triggered());
    }

    #[test]
    fn triggering_a_child_does_not_affect_its_parent() {
        let root = ShutdownScope::root();
        let child = ShutdownScope::child(&root);
        child.trigger();
        assert!(child.is_triggered());
        assert!(!root.is_triggered());
    }
}
