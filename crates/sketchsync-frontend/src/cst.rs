//! Helpers over the tree-sitter concrete syntax tree.

use tree_sitter::{Node, TreeCursor};

/// Whether a traversal callback sees a node before or after its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversePhase {
    Enter,
    Exit,
}

/// Top-down traversal visiting each node on entry and on exit.
///
/// The visitor returns `true` on [`TraversePhase::Enter`] to descend into
/// the node's children.
pub fn topdown_traverse<'t, F>(cursor: &mut TreeCursor<'t>, visitor: &mut F)
where
    F: FnMut(&Node<'t>, TraversePhase) -> bool,
{
    let mut stack: Vec<u8> = vec![0];
    while let Some(state) = stack.pop() {
        match state {
            0 => {
                stack.push(2); // exit
                if visitor(&cursor.node(), TraversePhase::Enter) && cursor.goto_first_child() {
                    stack.push(1); // back to parent
                    stack.push(3); // next sibling
                    stack.push(0); // recurse
                }
            }
            1 => {
                cursor.goto_parent();
            }
            2 => {
                visitor(&cursor.node(), TraversePhase::Exit);
            }
            _ => {
                if cursor.goto_next_sibling() {
                    stack.push(3);
                    stack.push(0);
                }
            }
        }
    }
}

/// Leaf nodes under `node` in source order, `node` itself if it has no
/// children. Zero-width MISSING leaves are skipped.
pub fn leaves<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    topdown_traverse(&mut cursor, &mut |n, phase| {
        if phase == TraversePhase::Enter && n.child_count() == 0 && !n.is_missing() {
            out.push(*n);
        }
        true
    });
    out
}

/// The last non-missing leaf that ends at or before `offset`.
pub fn leaf_before<'t>(root: Node<'t>, offset: usize) -> Option<Node<'t>> {
    let mut found: Option<Node<'t>> = None;
    let mut cursor = root.walk();
    topdown_traverse(&mut cursor, &mut |n, phase| {
        if phase == TraversePhase::Exit || n.start_byte() > offset {
            return false;
        }
        if n.child_count() == 0 && !n.is_missing() && n.end_byte() <= offset && n.end_byte() > n.start_byte() {
            found = Some(*n);
        }
        true
    });
    found
}

pub fn text<'s>(node: &Node, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Named children, comments excluded.
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

/// All children including anonymous tokens, comments excluded.
pub fn children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).filter(|c| !c.is_extra()).collect()
}

pub fn field<'t>(node: &Node<'t>, name: &str) -> Option<Node<'t>> {
    node.child_by_field_name(name)
}

pub fn fields<'t>(node: &Node<'t>, name: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(name, &mut cursor).collect()
}

/// First named child of kind `kind`.
pub fn child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

/// Whether an anonymous token `token` is a direct child of `node`.
pub fn has_token(node: &Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && !c.is_missing() && c.kind() == token);
    found
}
