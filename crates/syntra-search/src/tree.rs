//! The AND/OR search tree.
//!
//! Nodes live in an index arena: a node owns the list of its children's
//! indices and carries its parent's index for label propagation, so there is
//! no owning cycle. Node kinds alternate between controller choice (OR) and
//! environment choice (AND), starting with the controller at the root.

use std::collections::BTreeSet;
use std::fmt;

use syntra_automata::regions::RegionIndex;
use syntra_automata::Action;
use syntra_display_utils::join_iterator;

use crate::canonical_word::{display_word, CanonicalWord};

/// Index of a node in the search tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Which player resolves the choice at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The controller picks one child (OR node)
    Controller,
    /// The environment picks any child (AND node)
    Environment,
}

impl NodeKind {
    /// The kind of the children of a node of this kind
    pub fn flipped(self) -> NodeKind {
        match self {
            NodeKind::Controller => NodeKind::Environment,
            NodeKind::Environment => NodeKind::Controller,
        }
    }
}

/// The label of a search tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    /// Not decided yet
    Unknown,
    /// The controller wins from this node
    Top,
    /// The controller loses from this node
    Bottom,
    /// Covered by an ancestor with an equal or weaker word set
    Canceled,
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLabel::Unknown => write!(f, "?"),
            NodeLabel::Top => write!(f, "⊤"),
            NodeLabel::Bottom => write!(f, "⊥"),
            NodeLabel::Canceled => write!(f, "↺"),
        }
    }
}

/// A node of the search tree
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// The canonical words of this node
    pub words: BTreeSet<CanonicalWord>,
    /// Who resolves the choice at this node
    pub kind: NodeKind,
    /// The label of the node
    pub label: NodeLabel,
    /// The parent, `None` for the root
    pub parent: Option<NodeId>,
    /// The action this node was reached by and the region increments after
    /// which firing it leads here; `None` for the root
    pub incoming: Option<(BTreeSet<RegionIndex>, Action)>,
    /// The children, one per (action, successor class)
    pub children: Vec<NodeId>,
    /// Whether the successors of this node have been materialized
    pub expanded: bool,
    /// For canceled nodes: the covering ancestor
    pub dominating_ancestor: Option<NodeId>,
}

/// The search tree arena
#[derive(Debug, Clone, Default)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl SearchTree {
    /// Create a tree holding only the root with the given word set
    pub fn new(words: BTreeSet<CanonicalWord>) -> Self {
        SearchTree {
            nodes: vec![SearchNode {
                words,
                kind: NodeKind::Controller,
                label: NodeLabel::Unknown,
                parent: None,
                incoming: None,
                children: Vec::new(),
                expanded: false,
                dominating_ancestor: None,
            }],
        }
    }

    /// The root node's id
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty (it never is; the root always exists)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Access a node
    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }

    /// Mutably access a node
    pub fn node_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0]
    }

    /// Append a child under the given parent
    pub fn add_child(
        &mut self,
        parent: NodeId,
        words: BTreeSet<CanonicalWord>,
        incoming: (BTreeSet<RegionIndex>, Action),
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let kind = self.node(parent).kind.flipped();
        self.nodes.push(SearchNode {
            words,
            kind,
            label: NodeLabel::Unknown,
            parent: Some(parent),
            incoming: Some(incoming),
            children: Vec::new(),
            expanded: false,
            dominating_ancestor: None,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Iterate over the proper ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |current| {
            self.node(*current).parent
        })
    }

    /// Iterate over all node ids in creation order
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    fn fmt_subtree(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let node = self.node(id);
        for _ in 0..indent {
            write!(f, "  ")?;
        }
        write!(f, "({id}) -> {{ ")?;
        if let Some((increments, action)) = &node.incoming {
            write!(
                f,
                "({{{}}}, {action}) ",
                join_iterator(increments.iter(), ", ")
            )?;
        }
        writeln!(
            f,
            "}} -> {{ {} }}: {}",
            join_iterator(node.words.iter().map(display_word), ", "),
            node.label
        )?;
        for child in &node.children {
            self.fmt_subtree(f, *child, indent + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SearchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_subtree(f, self.root(), 0)
    }
}
