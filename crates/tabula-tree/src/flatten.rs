//! Parent-pointer list to depth-first ordered tree rows.

use std::collections::HashMap;

use tabula_model::{RowAccess, RowId, RowKey};

use crate::ExpandedSet;

/// Derived position of one row in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Index of the row in the input slice.
    pub index: usize,
    pub id: RowId,
    /// Declared parent id, as found on the row.
    pub parent: Option<RowId>,
    pub depth: usize,
    /// Some row in the input declares this row as its parent.
    pub has_children: bool,
    /// Emitted in the trailing pass because no root reaches it (cycles).
    pub orphan: bool,
}

impl TreeNode {
    /// Left indentation for this row, in pixels.
    pub fn indent(&self, indent_size: u16) -> usize {
        self.depth * usize::from(indent_size)
    }
}

/// Rows in parent-before-child order with depth and child flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatTree {
    nodes: Vec<TreeNode>,
    /// Input index of the parent row, per input index.
    parent_index: Vec<Option<usize>>,
    /// Input index to position in `nodes`.
    order: Vec<usize>,
}

/// Rebuilds the hierarchy from a flat list.
///
/// - Rows whose parent is empty or unknown are roots, kept in input order.
/// - Children follow their parent immediately, siblings keep input order.
/// - Rows no root reaches (parent cycles and whatever hangs off them) are
///   appended at the end, each once, with cycle members at depth 0.
pub fn flatten<R: RowAccess>(rows: &[R], key: &RowKey<R>, parent_key: &str) -> FlatTree {
    let ids: Vec<RowId> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| key.resolve(row, index))
        .collect();
    let parents: Vec<Option<RowId>> = rows
        .iter()
        .map(|row| {
            row.field_text(parent_key)
                .filter(|p| !p.is_empty())
                .map(|p| RowId::new(p.into_owned()))
        })
        .collect();

    let mut by_id: HashMap<&RowId, usize> = HashMap::with_capacity(rows.len());
    for (index, id) in ids.iter().enumerate() {
        by_id.entry(id).or_insert(index);
    }

    let parent_index: Vec<Option<usize>> = parents
        .iter()
        .map(|p| p.as_ref().and_then(|p| by_id.get(p).copied()))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots = Vec::new();
    for (index, parent) in parent_index.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(index),
            None => roots.push(index),
        }
    }

    let has_children: Vec<bool> = {
        let declared: std::collections::HashSet<&RowId> =
            parents.iter().flatten().collect();
        ids.iter().map(|id| declared.contains(id)).collect()
    };
    let depths = compute_depths(&parent_index);

    let mut visited = vec![false; rows.len()];
    let mut emitted = Vec::with_capacity(rows.len());
    for &root in &roots {
        walk(root, &children, &mut visited, &mut emitted);
    }
    let reached = emitted.len();
    for index in 0..rows.len() {
        if !visited[index] {
            walk(index, &children, &mut visited, &mut emitted);
        }
    }
    if emitted.len() > reached {
        tracing::debug!(
            orphans = emitted.len() - reached,
            "rows unreachable from any root appended after the tree"
        );
    }

    let mut order = vec![0; rows.len()];
    let nodes = emitted
        .iter()
        .enumerate()
        .map(|(position, &index)| {
            order[index] = position;
            TreeNode {
                index,
                id: ids[index].clone(),
                parent: parents[index].clone(),
                depth: depths[index],
                has_children: has_children[index],
                orphan: position >= reached,
            }
        })
        .collect();

    FlatTree {
        nodes,
        parent_index,
        order,
    }
}

/// Pre-order walk from `start`, skipping anything already emitted.
fn walk(start: usize, children: &[Vec<usize>], visited: &mut [bool], out: &mut Vec<usize>) {
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        if visited[index] {
            continue;
        }
        visited[index] = true;
        out.push(index);
        stack.extend(children[index].iter().rev().filter(|&&c| !visited[c]));
    }
}

/// Depth per input index: 0 for roots and cycle members, else parent + 1.
fn compute_depths(parent_index: &[Option<usize>]) -> Vec<usize> {
    let mut depth: Vec<Option<usize>> = vec![None; parent_index.len()];
    let mut chain: Vec<usize> = Vec::new();
    let mut on_chain: HashMap<usize, usize> = HashMap::new();

    for start in 0..parent_index.len() {
        if depth[start].is_some() {
            continue;
        }
        chain.clear();
        on_chain.clear();
        let mut current = start;
        let base = loop {
            if let Some(known) = depth[current] {
                break known;
            }
            if let Some(&pos) = on_chain.get(&current) {
                for &member in &chain[pos..] {
                    depth[member] = Some(0);
                }
                chain.truncate(pos);
                break 0;
            }
            on_chain.insert(current, chain.len());
            chain.push(current);
            match parent_index[current] {
                Some(parent) => current = parent,
                None => {
                    depth[current] = Some(0);
                    chain.pop();
                    break 0;
                }
            }
        };
        let mut level = base;
        for &member in chain.iter().rev() {
            level += 1;
            depth[member] = Some(level);
        }
    }

    depth.into_iter().map(Option::unwrap_or_default).collect()
}

impl FlatTree {
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node for the row at input `index`.
    pub fn node_for_index(&self, index: usize) -> Option<&TreeNode> {
        self.order.get(index).and_then(|&pos| self.nodes.get(pos))
    }

    pub fn node(&self, id: &RowId) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Whether every ancestor up to the nearest depth-0 row is expanded.
    ///
    /// Depth-0 rows (roots, rows with unknown parents, cycle members) are
    /// always visible.
    pub fn is_visible(&self, node: &TreeNode, expanded: &ExpandedSet) -> bool {
        let mut current = node;
        while current.depth > 0 {
            let Some(parent) = self.parent_node(current) else {
                return true;
            };
            if !expanded.contains(&parent.id) {
                return false;
            }
            current = parent;
        }
        true
    }

    /// Nodes in display order, with collapsed subtrees filtered out.
    pub fn visible<'a>(&'a self, expanded: &'a ExpandedSet) -> impl Iterator<Item = &'a TreeNode> {
        self.nodes
            .iter()
            .filter(move |node| self.is_visible(node, expanded))
    }

    /// Ids of the row's ancestors, nearest first, stopping at depth 0.
    pub fn ancestors(&self, id: &RowId) -> Vec<RowId> {
        let mut out = Vec::new();
        let Some(mut current) = self.node(id) else {
            return out;
        };
        while current.depth > 0 {
            let Some(parent) = self.parent_node(current) else {
                break;
            };
            out.push(parent.id.clone());
            current = parent;
        }
        out
    }

    /// Every row that has children, for "expand all".
    pub fn expandable_ids(&self) -> impl Iterator<Item = &RowId> {
        self.nodes.iter().filter(|n| n.has_children).map(|n| &n.id)
    }

    fn parent_node(&self, node: &TreeNode) -> Option<&TreeNode> {
        self.parent_index
            .get(node.index)
            .copied()
            .flatten()
            .and_then(|p| self.node_for_index(p))
    }
}
