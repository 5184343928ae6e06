//! Search-tree nodes.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::candidate::BrCand;

/// How a node was created from its parent: the winning candidate and the
/// primal value of the branched variable at the parent solve.
#[derive(Debug)]
pub struct BranchRecord {
    /// Candidate that produced this node.
    pub cand: Rc<BrCand>,

    /// Primal value of the branched variable at the parent.
    pub activity: f64,
}

/// One node of the branch-and-bound tree.
///
/// Nodes are created by the driver and shared through `Rc`; the parent
/// link is `Weak` so the owning chain stays driver -> store -> nodes.
/// Only the driver writes `lb`, after the node's relaxation solve.
#[derive(Debug)]
pub struct Node {
    id: u64,
    depth: u32,

    /// Lower bound from the node's relaxation; `-inf` until solved.
    lb: Cell<f64>,

    parent: Option<Weak<Node>>,
    branch: Option<BranchRecord>,
}

impl Node {
    /// Create a node. `depth` must be `parent.depth() + 1` when a parent
    /// is given; prefer [`Node::root`] and [`Node::child`].
    pub fn new(
        id: u64,
        depth: u32,
        parent: Option<&Rc<Node>>,
        branch: Option<BranchRecord>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id,
            depth,
            lb: Cell::new(f64::NEG_INFINITY),
            parent: parent.map(Rc::downgrade),
            branch,
        })
    }

    /// Create the root node.
    pub fn root(id: u64) -> Rc<Self> {
        Self::new(id, 0, None, None)
    }

    /// Create a child of `parent` branched on `cand` at `activity`.
    pub fn child(parent: &Rc<Node>, id: u64, cand: Rc<BrCand>, activity: f64) -> Rc<Self> {
        Self::new(
            id,
            parent.depth + 1,
            Some(parent),
            Some(BranchRecord { cand, activity }),
        )
    }

    /// Node identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Depth in the tree, 0 at the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Lower bound.
    pub fn lb(&self) -> f64 {
        self.lb.get()
    }

    /// Set the lower bound after the node's relaxation solve.
    pub fn set_lb(&self, lb: f64) {
        self.lb.set(lb);
    }

    /// Parent node, `None` at the root or when the parent is gone.
    pub fn parent(&self) -> Option<Rc<Node>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Branching record, `None` at the root.
    pub fn branch(&self) -> Option<&BranchRecord> {
        self.branch.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = Node::root(0);
        assert_eq!(root.id(), 0);
        assert_eq!(root.depth(), 0);
        assert!(root.parent().is_none());
        assert!(root.branch().is_none());
        assert_eq!(root.lb(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_child_links() {
        let root = Node::root(0);
        root.set_lb(3.0);

        let cand = Rc::new(BrCand::new_var(1, 0.3, 0.7, "x1"));
        let child = Node::child(&root, 1, cand, 2.3);

        assert_eq!(child.depth(), 1);
        let p = child.parent().unwrap();
        assert_eq!(p.id(), 0);
        assert_eq!(p.lb(), 3.0);

        let rec = child.branch().unwrap();
        assert_eq!(rec.cand.pcost_index(), Some(1));
        assert_eq!(rec.activity, 2.3);
    }

    #[test]
    fn test_parent_link_is_non_owning() {
        let child = {
            let root = Node::root(0);
            Node::child(&root, 1, Rc::new(BrCand::new_var(0, 0.5, 0.5, "x0")), 0.5)
        };
        // Root dropped; the weak link reports it.
        assert!(child.parent().is_none());
    }
}
