//! Symbol lookup by name
//!
//! Nodes and connectors carry symbol names taken from their templates.
//! Lookups walk the tree alternating node -> connector -> node, one
//! generation per step. A pattern containing `*` matches every name that
//! contains the part before the `*`, so `"*"` alone matches any symbol.

use crate::ids::{ConnectorIndex, NodeIndex};
use crate::model::NodeModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Node(NodeIndex),
    Connector(ConnectorIndex),
}

/// Name comparison with `*` wildcard support
pub fn symbol_matches(name: &str, pattern: &str) -> bool {
    match pattern.find('*') {
        Some(star) => name.contains(&pattern[..star]),
        None => name == pattern,
    }
}

impl NodeModel {
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Node(node) => self.node(node).name(),
            Symbol::Connector(connector) => self.connector(connector).name(),
        }
    }

    fn symbol_children(&self, symbol: Symbol) -> Vec<Symbol> {
        match symbol {
            Symbol::Node(node) => self
                .node(node)
                .connectors()
                .iter()
                .map(|&connector| Symbol::Connector(connector))
                .collect(),
            Symbol::Connector(connector) => self
                .connector(connector)
                .connected_node()
                .map(Symbol::Node)
                .into_iter()
                .collect(),
        }
    }

    fn symbol_parent(&self, symbol: Symbol) -> Option<Symbol> {
        match symbol {
            Symbol::Node(node) => self.node(node).parent_connector().map(Symbol::Connector),
            Symbol::Connector(connector) => Some(Symbol::Node(self.connector(connector).parent())),
        }
    }

    /// Follow `path` down from `start`.
    ///
    /// `path[0]` names a child of `start`, `path[1]` a grandchild and so on.
    /// Returns the first symbol, in depth-first order, at the end of a
    /// matching path. An empty path yields `start`.
    pub fn find_symbol_in_descendants(&self, start: Symbol, path: &[&str]) -> Option<Symbol> {
        let Some((pattern, rest)) = path.split_first() else {
            return Some(start);
        };
        self.symbol_children(start)
            .into_iter()
            .filter(|&child| symbol_matches(self.symbol_name(child), pattern))
            .find_map(|child| self.find_symbol_in_descendants(child, rest))
    }

    /// Look for `name` among the ancestors of `start`.
    ///
    /// Generation 0 is `start` itself, 1 its parent, and so on. With
    /// `to_top` the search continues past `generation` up to the root and
    /// returns the nearest match; without it only that one generation is
    /// checked.
    pub fn find_symbol_in_ancestors(
        &self,
        start: Symbol,
        name: &str,
        generation: usize,
        to_top: bool,
    ) -> Option<Symbol> {
        let mut current = start;
        let mut remaining = generation;
        loop {
            if remaining == 0 {
                if symbol_matches(self.symbol_name(current), name) {
                    return Some(current);
                }
                if !to_top {
                    return None;
                }
            }
            current = self.symbol_parent(current)?;
            remaining = remaining.saturating_sub(1);
        }
    }
}
