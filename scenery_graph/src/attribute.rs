// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change tracking for attributes that decide when a node repaints its own cache.
//!
//! This is separate from invalidation: an attribute remembers that it changed until the node
//! that owns it acknowledges the change with [`StatefulAttribute::update_change_state`].

use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell};
use core::fmt;

/// Something that remembers whether it changed.
pub trait StatefulAttribute {
    /// True if the value changed since the last acknowledgement.
    fn has_changed(&self) -> bool;

    /// Acknowledge the change.
    fn update_change_state(&self);
}

/// Named value with a sticky changed flag.
///
/// ```
/// use scenery_graph::{NodeAttribute, StatefulAttribute};
///
/// let attr = NodeAttribute::new("width", 1.0);
/// assert!(!attr.has_changed());
/// attr.set(1.0);
/// assert!(!attr.has_changed(), "same value");
/// attr.set(2.0);
/// attr.set(2.0);
/// assert!(attr.has_changed(), "stays changed until acknowledged");
/// attr.update_change_state();
/// assert!(!attr.has_changed());
/// ```
pub struct NodeAttribute<T> {
    name: &'static str,
    value: RefCell<T>,
    changed: Cell<bool>,
}

impl<T> NodeAttribute<T> {
    /// Create an unchanged attribute.
    pub const fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            value: RefCell::new(value),
            changed: Cell::new(false),
        }
    }

    /// Name of the attribute.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Borrow the value.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }
}

impl<T: Clone> NodeAttribute<T> {
    /// Current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: PartialEq> NodeAttribute<T> {
    /// Store `value`. Returns true if it differs from the previous value.
    pub fn set(&self, value: T) -> bool {
        let differs = *self.value.borrow() != value;
        self.value.replace(value);
        self.changed.set(self.changed.get() || differs);
        differs
    }
}

impl<T> StatefulAttribute for NodeAttribute<T> {
    fn has_changed(&self) -> bool {
        self.changed.get()
    }

    fn update_change_state(&self) {
        self.changed.set(false);
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeAttribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeAttribute")
            .field("name", &self.name)
            .field("value", &*self.value.borrow())
            .field("changed", &self.changed.get())
            .finish()
    }
}

/// How an [`AttributeStateGroup`] combines its members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeStateGroupOp {
    /// Changed when every member changed.
    And,
    /// Changed when any member changed.
    Or,
}

/// Several attributes viewed as one.
pub struct AttributeStateGroup<'a> {
    attributes: Vec<&'a dyn StatefulAttribute>,
    op: AttributeStateGroupOp,
}

impl<'a> AttributeStateGroup<'a> {
    /// Group `attributes` under `op`.
    pub fn new(
        attributes: impl IntoIterator<Item = &'a dyn StatefulAttribute>,
        op: AttributeStateGroupOp,
    ) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
            op,
        }
    }
}

impl StatefulAttribute for AttributeStateGroup<'_> {
    fn has_changed(&self) -> bool {
        match self.op {
            AttributeStateGroupOp::And => self.attributes.iter().all(|a| a.has_changed()),
            AttributeStateGroupOp::Or => self.attributes.iter().any(|a| a.has_changed()),
        }
    }

    fn update_change_state(&self) {
        for attribute in &self.attributes {
            attribute.update_change_state();
        }
    }
}

impl fmt::Debug for AttributeStateGroup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeStateGroup")
            .field("len", &self.attributes.len())
            .field("op", &self.op)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_ops_combine_members() {
        let a = NodeAttribute::new("a", 0_u32);
        let b = NodeAttribute::new("b", 0_u32);
        let members: [&dyn StatefulAttribute; 2] = [&a, &b];
        let or = AttributeStateGroup::new(members, AttributeStateGroupOp::Or);
        let and = AttributeStateGroup::new(members, AttributeStateGroupOp::And);

        assert!(!or.has_changed() && !and.has_changed());
        a.set(1);
        assert!(or.has_changed());
        assert!(!and.has_changed());
        b.set(1);
        assert!(and.has_changed());

        or.update_change_state();
        assert!(!a.has_changed() && !b.has_changed());
        assert_eq!(a.get(), 1, "acknowledging keeps the value");
        assert_eq!(a.name(), "a");
    }
}
