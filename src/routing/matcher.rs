//! Segment trie used for path matching.
//!
//! # Design Decisions
//! - One trie per HTTP method; nodes keyed by literal text plus a single
//!   parameter edge, so patterns of the same shape land on the same node
//! - Lookup tries the literal edge before the parameter edge at every depth
//!   and backtracks, giving literal-beats-parameter precedence
//! - No regex; matching is a walk bounded by the number of segments

use std::collections::HashMap;

use super::pattern::{PathPattern, Segment};

#[derive(Debug, Default)]
struct Node {
    literals: HashMap<String, Node>,
    param: Option<Box<Node>>,
    value: Option<usize>,
}

/// Maps pattern shapes to route indices.
#[derive(Debug, Default)]
pub struct PathTrie {
    root: Node,
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pattern. Fails with the index already stored at that shape.
    pub fn insert(&mut self, pattern: &PathPattern, value: usize) -> Result<(), usize> {
        let mut node = &mut self.root;
        for segment in pattern.segments() {
            node = match segment {
                Segment::Literal(text) => node.literals.entry(text.clone()).or_default(),
                Segment::Param(_) => &mut **node.param.get_or_insert_with(Box::default),
            };
        }
        match node.value {
            Some(existing) => Err(existing),
            None => {
                node.value = Some(value);
                Ok(())
            }
        }
    }

    /// Find the most specific pattern matching `segments`.
    ///
    /// Returns the stored index and the segment values captured at parameter
    /// positions, in order.
    pub fn find<'p>(&self, segments: &[&'p str]) -> Option<(usize, Vec<&'p str>)> {
        let mut captured = Vec::new();
        find_in(&self.root, segments, &mut captured).map(|v| (v, captured))
    }

    /// Whether any pattern matches.
    pub fn matches(&self, segments: &[&str]) -> bool {
        self.find(segments).is_some()
    }
}

fn find_in<'p>(node: &Node, segments: &[&'p str], captured: &mut Vec<&'p str>) -> Option<usize> {
    let Some((head, tail)) = segments.split_first() else {
        return node.value;
    };

    if let Some(child) = node.literals.get(*head) {
        if let Some(found) = find_in(child, tail, captured) {
            return Some(found);
        }
    }

    if let Some(child) = &node.param {
        captured.push(*head);
        if let Some(found) = find_in(child, tail, captured) {
            return Some(found);
        }
        captured.pop();
    }

    None
}
