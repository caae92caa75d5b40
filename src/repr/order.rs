//! An order of identifiers: the level structure of an SDD.
//!
//! An order is an immutable linked list. Each node associates a
//! library-assigned [`VarLabel`] with a user identifier and, for hierarchical
//! levels, a nested order describing the structure below that identifier.
//! Prepending to an order hands out the successor of the current head
//! variable, so the head of a chain always carries its largest label.

use crate::config::Config;
use crate::repr::var_label::VarLabel;
use std::fmt::{self, Display};
use std::rc::Rc;

#[derive(Debug)]
struct OrderNode<C: Config> {
    var: VarLabel,
    /// `None` marks an artificial node, scaffolding generated by the library
    /// rather than named by the user. A `Local` never matches one.
    identifier: Option<C::Identifier>,
    nested: Order<C>,
    next: Order<C>,
}

#[derive(Debug)]
pub struct Order<C: Config> {
    head: Option<Rc<OrderNode<C>>>,
}

impl<C: Config> Clone for Order<C> {
    fn clone(&self) -> Self {
        Order {
            head: self.head.clone(),
        }
    }
}

impl<C: Config> Default for Order<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Config> Order<C> {
    /// The empty order. Only `add` is meaningful on it.
    pub fn new() -> Self {
        Order { head: None }
    }

    /// Build a flat order so that the first identifier becomes the outermost
    /// level (the identifiers are prepended in reverse).
    pub fn from_identifiers<T>(ids: T) -> Self
    where
        T: IntoIterator<Item = C::Identifier>,
    {
        let ids: Vec<_> = ids.into_iter().collect();
        let mut order = Order::new();
        for id in ids.into_iter().rev() {
            order = order.add(id);
        }
        order
    }

    /// Prepend a flat level for `id`.
    pub fn add(&self, id: C::Identifier) -> Self {
        self.push(Some(id), Order::new())
    }

    /// Prepend a hierarchical level for `id`, structured by `nested`.
    pub fn add_nested(&self, id: C::Identifier, nested: &Order<C>) -> Self {
        self.push(Some(id), nested.clone())
    }

    /// Prepend an artificial level: a hierarchical grouping of `nested`
    /// with no user identifier. A `Local` never matches such a node, so
    /// homomorphisms only ever cross it through skip descent. An anonymous
    /// level with an empty `nested` cannot be valuated.
    pub fn add_anonymous(&self, nested: &Order<C>) -> Self {
        self.push(None, nested.clone())
    }

    fn push(&self, identifier: Option<C::Identifier>, nested: Order<C>) -> Self {
        let var = match &self.head {
            None => C::first_variable(),
            Some(node) => node.var.next(),
        };
        Order {
            head: Some(Rc::new(OrderNode {
                var,
                identifier,
                nested,
                next: self.clone(),
            })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// The variable of the head level.
    ///
    /// Panics if the order is empty.
    pub fn variable(&self) -> VarLabel {
        match &self.head {
            Some(node) => node.var,
            None => panic!("called variable() on an empty order"),
        }
    }

    /// The identifier of the head level, `None` for an artificial node.
    ///
    /// Panics if the order is empty.
    pub fn identifier(&self) -> Option<&C::Identifier> {
        match &self.head {
            Some(node) => node.identifier.as_ref(),
            None => panic!("called identifier() on an empty order"),
        }
    }

    /// The order below the head level (the remaining spine).
    pub fn next(&self) -> Order<C> {
        match &self.head {
            Some(node) => node.next.clone(),
            None => Order::new(),
        }
    }

    /// The order nested inside the head level; empty for a flat level.
    pub fn nested(&self) -> Order<C> {
        match &self.head {
            Some(node) => node.nested.clone(),
            None => Order::new(),
        }
    }

    /// Find the variable assigned to `id`, searching nested orders too.
    pub fn identifier_variable(&self, id: &C::Identifier) -> Option<VarLabel> {
        let node = self.head.as_ref()?;
        if node.identifier.as_ref() == Some(id) {
            return Some(node.var);
        }
        if let Some(var) = node.nested.identifier_variable(id) {
            return Some(var);
        }
        node.next.identifier_variable(id)
    }

    /// A stable token for this order position, used to key memo tables. Two
    /// clones of the same position share it; the keyed table must keep a
    /// clone alive so the position cannot be recycled.
    pub(crate) fn token(&self) -> usize {
        match &self.head {
            Some(rc) => Rc::as_ptr(rc) as usize,
            None => 0,
        }
    }
}

impl<C: Config> PartialEq for Order<C> {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl<C: Config> Eq for Order<C> {}

impl<C: Config> std::hash::Hash for Order<C> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.token().hash(state);
    }
}

impl<C: Config> Display for Order<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(node) = &self.head {
            match &node.identifier {
                Some(id) => write!(f, "{}", id)?,
                None => write!(f, "<{}>", node.var)?,
            }
            if !node.nested.is_empty() {
                write!(f, " | ({})", node.nested)?;
            }
            if !node.next.is_empty() {
                write!(f, " >> {}", node.next)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Conf64;

    fn flat(ids: &[&str]) -> Order<Conf64> {
        Order::from_identifiers(ids.iter().map(|s| s.to_string()))
    }

    #[test]
    fn variables_grow_toward_the_head() {
        let o = flat(&["a", "b", "c"]);
        assert_eq!(o.variable(), VarLabel::new(2));
        assert_eq!(o.next().variable(), VarLabel::new(1));
        assert_eq!(o.next().next().variable(), VarLabel::new(0));
        assert!(o.next().next().next().is_empty());
    }

    #[test]
    fn identifier_lookup_descends_nested_orders() {
        let inner = flat(&["x", "y"]);
        let o = Order::<Conf64>::new().add_nested("A".to_string(), &inner);
        assert_eq!(o.identifier(), Some(&"A".to_string()));
        assert_eq!(
            o.identifier_variable(&"y".to_string()),
            Some(VarLabel::new(0))
        );
        assert_eq!(o.identifier_variable(&"z".to_string()), None);
        assert_eq!(o.nested().variable(), VarLabel::new(1));
    }

    #[test]
    fn anonymous_levels_have_no_identifier() {
        let inner = flat(&["x", "y"]);
        let o = flat(&["b"]).add_anonymous(&inner);
        assert_eq!(o.identifier(), None);
        assert_eq!(o.variable(), VarLabel::new(1));
        assert_eq!(
            o.identifier_variable(&"x".to_string()),
            Some(VarLabel::new(1))
        );
        assert_eq!(o.to_string(), "<x1> | (x >> y) >> b");
    }

    #[test]
    fn clones_share_position() {
        let o = flat(&["a", "b"]);
        assert_eq!(o, o.clone());
        assert_ne!(o, o.next());
        assert_eq!(Order::<Conf64>::new(), flat(&[]).next());
    }
}
