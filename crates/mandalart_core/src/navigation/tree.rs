//! In-memory goal tree and root-to-node path resolution.
//!
//! # Responsibility
//! - Assemble a board's flat cell list into a checked tree.
//! - Resolve breadcrumb paths by depth-first search.
//! - Summarize completion progress below a node.
//!
//! # Invariants
//! - An assembled tree has exactly one root, every child depth equals its
//!   parent depth + 1, and sibling positions are unique.
//! - A resolved path starts at the root and ends at the target; each
//!   consecutive pair is a parent-child pair.

use crate::model::cell::{Cell, CellId, CELL_FAN_OUT};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One cell with its loaded children, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellNode {
    pub cell: Cell,
    pub children: Vec<CellNode>,
}

/// Tree assembly failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeBuildError {
    /// No cell without parent was found.
    MissingRoot,
    /// More than one cell without parent was found.
    MultipleRoots { first: CellId, second: CellId },
    /// A cell references a parent that is not in the list.
    OrphanCell(CellId),
    /// A cell's depth is not its parent's depth + 1.
    DepthMismatch { cell_id: CellId, expected: u32, actual: u32 },
    /// Two siblings share one position.
    DuplicatePosition { parent_id: CellId, position: u8 },
    /// A parent has more children than the grid can show.
    TooManyChildren(CellId),
}

impl Display for TreeBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRoot => write!(f, "cell list has no root cell"),
            Self::MultipleRoots { first, second } => {
                write!(f, "cell list has multiple roots: {first}, {second}")
            }
            Self::OrphanCell(id) => write!(f, "cell {id} references a missing parent"),
            Self::DepthMismatch {
                cell_id,
                expected,
                actual,
            } => write!(
                f,
                "cell {cell_id} has depth {actual}, expected {expected}"
            ),
            Self::DuplicatePosition {
                parent_id,
                position,
            } => write!(
                f,
                "cell {parent_id} has more than one child at position {position}"
            ),
            Self::TooManyChildren(id) => {
                write!(f, "cell {id} has more than {CELL_FAN_OUT} children")
            }
        }
    }
}

impl Error for TreeBuildError {}

/// Completion counts for one subtree (the node itself excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
}

impl Progress {
    /// Completed share in `0.0..=1.0`; an empty subtree reports `0.0`.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

impl CellNode {
    pub fn leaf(cell: Cell) -> Self {
        Self {
            cell,
            children: Vec::new(),
        }
    }

    /// Assembles a tree from an unordered flat list of one board's cells.
    pub fn build(cells: Vec<Cell>) -> Result<CellNode, TreeBuildError> {
        let mut root: Option<Cell> = None;
        let mut by_parent: HashMap<CellId, Vec<Cell>> = HashMap::new();
        let known_ids: HashSet<CellId> = cells.iter().map(|cell| cell.id).collect();

        for cell in cells {
            match cell.parent_id {
                None => {
                    if let Some(existing) = &root {
                        return Err(TreeBuildError::MultipleRoots {
                            first: existing.id,
                            second: cell.id,
                        });
                    }
                    root = Some(cell);
                }
                Some(parent_id) => {
                    if !known_ids.contains(&parent_id) {
                        return Err(TreeBuildError::OrphanCell(cell.id));
                    }
                    by_parent.entry(parent_id).or_default().push(cell);
                }
            }
        }

        let root = root.ok_or(TreeBuildError::MissingRoot)?;
        let node = attach_children(root, &mut by_parent)?;

        // Anything left was unreachable from the root (a parent cycle).
        if let Some(stray) = by_parent.values().flatten().next() {
            return Err(TreeBuildError::OrphanCell(stray.id));
        }
        Ok(node)
    }

    /// Returns the node with `target` in this subtree.
    pub fn find(&self, target: CellId) -> Option<&CellNode> {
        if self.cell.id == target {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(target))
    }

    /// Number of cells in this subtree, the node itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CellNode::size).sum::<usize>()
    }

    /// Completion counts over all descendants.
    pub fn progress(&self) -> Progress {
        self.children
            .iter()
            .fold(Progress::default(), |acc, child| {
                let below = child.progress();
                Progress {
                    total: acc.total + 1 + below.total,
                    completed: acc.completed
                        + usize::from(child.cell.is_completed)
                        + below.completed,
                }
            })
    }
}

fn attach_children(
    cell: Cell,
    by_parent: &mut HashMap<CellId, Vec<Cell>>,
) -> Result<CellNode, TreeBuildError> {
    let mut children = by_parent.remove(&cell.id).unwrap_or_default();
    if children.len() > CELL_FAN_OUT {
        return Err(TreeBuildError::TooManyChildren(cell.id));
    }
    children.sort_by_key(|child| child.position);

    let mut seen_positions = HashSet::new();
    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        if child.depth != cell.depth + 1 {
            return Err(TreeBuildError::DepthMismatch {
                cell_id: child.id,
                expected: cell.depth + 1,
                actual: child.depth,
            });
        }
        if !seen_positions.insert(child.position) {
            return Err(TreeBuildError::DuplicatePosition {
                parent_id: cell.id,
                position: child.position,
            });
        }
        nodes.push(attach_children(child, by_parent)?);
    }

    Ok(CellNode {
        cell,
        children: nodes,
    })
}

/// Resolves the root-to-target path by depth-first search.
///
/// Returns `None` when `target` is not in the tree.
pub fn find_path(root: &CellNode, target: CellId) -> Option<Vec<&Cell>> {
    let mut path = Vec::new();
    if collect_path(root, target, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn collect_path<'a>(node: &'a CellNode, target: CellId, path: &mut Vec<&'a Cell>) -> bool {
    path.push(&node.cell);
    if node.cell.id == target {
        return true;
    }
    for child in &node.children {
        if collect_path(child, target, path) {
            return true;
        }
    }
    path.pop();
    false
}

/// Resolves the path to `target`, falling back to the root alone when the
/// target is unknown.
pub fn resolve_path_or_root(root: &CellNode, target: CellId) -> Vec<&Cell> {
    find_path(root, target).unwrap_or_else(|| vec![&root.cell])
}

#[cfg(test)]
mod tests {
    use super::{find_path, resolve_path_or_root, CellNode, TreeBuildError};
    use crate::model::cell::Cell;
    use uuid::Uuid;

    fn sample() -> (Cell, Cell, Cell, Cell) {
        let root = Cell::new_root(Uuid::new_v4(), "r");
        let a = Cell::new_child(&root, 0, "a");
        let b = Cell::new_child(&root, 1, "b");
        let b1 = Cell::new_child(&b, 4, "b1");
        (root, a, b, b1)
    }

    #[test]
    fn path_to_direct_child_is_root_then_child() {
        let (root, a, b, b1) = sample();
        let tree = CellNode::build(vec![b1, b.clone(), a, root.clone()]).unwrap();

        let path = find_path(&tree, b.id).unwrap();
        let topics: Vec<&str> = path.iter().map(|cell| cell.topic.as_str()).collect();
        assert_eq!(topics, vec!["r", "b"]);
        assert_eq!(path[0].id, root.id);
    }

    #[test]
    fn path_pairs_are_parent_child() {
        let (root, a, b, b1) = sample();
        let tree = CellNode::build(vec![root, a, b, b1.clone()]).unwrap();

        let path = find_path(&tree, b1.id).unwrap();
        assert_eq!(path.len(), 3);
        for pair in path.windows(2) {
            assert_eq!(pair[1].parent_id, Some(pair[0].id));
        }
    }

    #[test]
    fn path_to_root_is_single_element() {
        let (root, a, b, b1) = sample();
        let tree = CellNode::build(vec![root.clone(), a, b, b1]).unwrap();
        let path = find_path(&tree, root.id).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn missing_target_falls_back_to_root() {
        let (root, a, b, b1) = sample();
        let tree = CellNode::build(vec![root.clone(), a, b, b1]).unwrap();
        let unknown = Uuid::new_v4();

        assert!(find_path(&tree, unknown).is_none());
        let fallback = resolve_path_or_root(&tree, unknown);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].id, root.id);
    }

    #[test]
    fn build_rejects_depth_mismatch_and_duplicates() {
        let (root, a, b, _) = sample();
        let mut deep = Cell::new_child(&root, 2, "bad");
        deep.depth = 3;
        let err = CellNode::build(vec![root.clone(), deep.clone()]).unwrap_err();
        assert!(matches!(err, TreeBuildError::DepthMismatch { cell_id, .. } if cell_id == deep.id));

        let mut clash = b.clone();
        clash.id = Uuid::new_v4();
        clash.position = a.position;
        let err = CellNode::build(vec![root, a, clash]).unwrap_err();
        assert!(matches!(err, TreeBuildError::DuplicatePosition { position: 0, .. }));
    }

    #[test]
    fn build_rejects_orphans_and_missing_root() {
        let (root, a, _, b1) = sample();
        let err = CellNode::build(vec![root, a.clone(), b1.clone()]).unwrap_err();
        assert_eq!(err, TreeBuildError::OrphanCell(b1.id));

        let err = CellNode::build(vec![a]).unwrap_err();
        assert!(matches!(err, TreeBuildError::OrphanCell(_) | TreeBuildError::MissingRoot));
    }

    #[test]
    fn progress_counts_completed_descendants() {
        let (root, mut a, b, mut b1) = sample();
        a.is_completed = true;
        b1.is_completed = true;
        let tree = CellNode::build(vec![root, a, b, b1]).unwrap();

        let progress = tree.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 2);
        assert!((progress.ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(tree.size(), 4);
    }
}
