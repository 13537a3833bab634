// src/structure.rs

//! Order-preserving transforms between flat forum lists and the nested
//! hierarchy, plus the list projections consumers ask for.
//!
//! Everything here is pure: no I/O, no shared state, and every produced node
//! is an independent copy of its source. Mutating a projection never corrupts
//! the structure it came from or any other projection.

use std::collections::HashMap;

use crate::models::Forum;

/// Output shape for [`ListBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// The complete hierarchy, nested, in pre-order
    FullTree,
    /// At most two levels: entries with their descendant subtrees collapsed
    /// (pre-order) into a single child list each
    TwoLevel,
    /// A single ordered sequence with no nesting at all
    Flat,
}

/// An ordered forum hierarchy.
///
/// Build one from the flat stored record list with
/// [`build_from_ordered_list`](Self::build_from_ordered_list), or from an
/// existing tree (re-parenting it) with
/// [`build_from_tree`](Self::build_from_tree).
#[derive(Debug, Clone, PartialEq)]
pub struct ForumStructure {
    tree: Vec<Forum>,
}

impl ForumStructure {
    /// Build a hierarchy from an ordered, flat list of forums.
    ///
    /// Forums are indexed by ID (on a duplicate ID the last value wins, the
    /// first occurrence keeps its position), then attached in input order:
    /// a forum whose `parent_id` equals `top_level_id` becomes a root, any
    /// other forum is appended to its parent's subforum list. Root and child
    /// ordering mirrors the input exactly.
    ///
    /// A forum whose parent is neither the sentinel nor a known ID is an
    /// orphan: it is excluded together with everything beneath it, with a
    /// diagnostic logged. Passing a real forum's ID as `top_level_id` selects
    /// just that forum's subtree. Subforum lists on the input are ignored;
    /// only the ID links count.
    pub fn build_from_ordered_list(forums: &[Forum], top_level_id: i32) -> Self {
        let mut order: Vec<i32> = Vec::with_capacity(forums.len());
        let mut by_id: HashMap<i32, Forum> = HashMap::with_capacity(forums.len());
        for forum in forums {
            if by_id.insert(forum.id, forum.detached_copy()).is_none() {
                order.push(forum.id);
            }
        }

        let mut roots: Vec<i32> = Vec::new();
        let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
        for id in &order {
            let parent_id = by_id[id].parent_id;
            if parent_id == top_level_id {
                roots.push(*id);
            } else if by_id.contains_key(&parent_id) {
                children.entry(parent_id).or_default().push(*id);
            } else {
                log::warn!("Unable to find parent forum with ID: {}", parent_id);
            }
        }

        // Nodes caught in a parent cycle are never reachable from a root and
        // drop out here along with ordinary orphans.
        let tree = roots
            .iter()
            .map(|id| Self::materialize(*id, &by_id, &children))
            .collect();
        ForumStructure { tree }
    }

    fn materialize(
        id: i32,
        by_id: &HashMap<i32, Forum>,
        children: &HashMap<i32, Vec<i32>>,
    ) -> Forum {
        let mut forum = by_id[&id].detached_copy();
        if let Some(child_ids) = children.get(&id) {
            forum.subforums = child_ids
                .iter()
                .map(|child| Self::materialize(*child, by_id, children))
                .collect();
        }
        forum
    }

    /// Build a hierarchy from an existing tree of forums.
    ///
    /// The subforum links are treated as ground truth: the result is a deep
    /// copy whose `parent_id`s are recomputed from each copy's structural
    /// position, discarding whatever parent IDs the input carried. Node order
    /// is preserved at every level. An empty forest yields an empty structure.
    pub fn build_from_tree(tree: &[Forum], top_level_id: i32) -> Self {
        ForumStructure {
            tree: copy_tree_with_parent_id(tree, top_level_id),
        }
    }

    /// The root-level forums of this hierarchy.
    pub fn tree(&self) -> &[Forum] {
        &self.tree
    }

    /// Consume the structure, returning its root list.
    pub fn into_tree(self) -> Vec<Forum> {
        self.tree
    }

    /// Total number of forums at every level.
    pub fn node_count(&self) -> usize {
        self.tree.iter().map(Forum::subtree_len).sum()
    }

    /// Whether the hierarchy holds no forums at all.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Start building a list projection of this hierarchy.
    ///
    /// Defaults to the full nested tree with section headers included.
    pub fn as_list(&self) -> ListBuilder<'_> {
        ListBuilder {
            tree: &self.tree,
            include_sections: true,
            format: ListFormat::FullTree,
        }
    }

    /// Render the hierarchy as an indented textual tree for logs and the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for forum in &self.tree {
            render_node(forum, 0, &mut out);
        }
        out
    }
}

/// Projection builder returned by [`ForumStructure::as_list`].
///
/// `include_sections` controls whether the root-level section headers appear
/// in the output; the format picks the shape. Every emitted node is an
/// independent copy.
#[derive(Debug, Clone)]
pub struct ListBuilder<'a> {
    tree: &'a [Forum],
    include_sections: bool,
    format: ListFormat,
}

impl ListBuilder<'_> {
    /// Keep or drop the root-level section entries.
    pub fn include_sections(mut self, include: bool) -> Self {
        self.include_sections = include;
        self
    }

    /// Select the output shape.
    pub fn format(mut self, format: ListFormat) -> Self {
        self.format = format;
        self
    }

    /// Produce the projection.
    pub fn build(self) -> Vec<Forum> {
        match self.format {
            ListFormat::FullTree => {
                if self.include_sections {
                    deep_copy(self.tree)
                } else {
                    // drop the headers, promote their subforums to the top
                    self.tree
                        .iter()
                        .flat_map(|root| deep_copy(&root.subforums))
                        .collect()
                }
            }
            ListFormat::TwoLevel => {
                if self.include_sections {
                    // childless section headers, then each of their direct
                    // subforums with its whole subtree collapsed beneath it
                    let mut out = Vec::new();
                    for section in self.tree {
                        out.push(section.detached_copy());
                        for forum in &section.subforums {
                            let mut entry = forum.detached_copy();
                            collect_subforums(&forum.subforums, &mut entry.subforums);
                            out.push(entry);
                        }
                    }
                    out
                } else {
                    // each root entry with its whole subtree collapsed
                    self.tree
                        .iter()
                        .map(|root| {
                            let mut entry = root.detached_copy();
                            collect_subforums(&root.subforums, &mut entry.subforums);
                            entry
                        })
                        .collect()
                }
            }
            ListFormat::Flat => {
                let mut out = Vec::new();
                for root in self.tree {
                    if self.include_sections {
                        out.push(root.detached_copy());
                    }
                    collect_subforums(&root.subforums, &mut out);
                }
                out
            }
        }
    }
}

/// Recursively copy a node list, assigning the parent ID each copy sits under.
fn copy_tree_with_parent_id(source: &[Forum], parent_id: i32) -> Vec<Forum> {
    source
        .iter()
        .map(|forum| {
            let mut copy = forum.detached_copy();
            copy.parent_id = parent_id;
            copy.subforums = copy_tree_with_parent_id(&forum.subforums, forum.id);
            copy
        })
        .collect()
}

/// Recursively copy a node list with its full nesting intact.
fn deep_copy(source: &[Forum]) -> Vec<Forum> {
    source
        .iter()
        .map(|forum| {
            let mut copy = forum.detached_copy();
            copy.subforums = deep_copy(&forum.subforums);
            copy
        })
        .collect()
}

/// Recursively copy all subforums in a tree into a flat list, pre-order.
fn collect_subforums(source: &[Forum], out: &mut Vec<Forum>) {
    for forum in source {
        out.push(forum.detached_copy());
        collect_subforums(&forum.subforums, out);
    }
}

fn render_node(forum: &Forum, depth: usize, out: &mut String) {
    out.push_str(&"-".repeat(depth));
    out.push_str(&forum.title);
    out.push_str(":\n");
    if !forum.subtitle.is_empty() {
        out.push_str(&"-".repeat(depth));
        out.push_str(&forum.subtitle);
        out.push('\n');
    }
    for subforum in &forum.subforums {
        render_node(subforum, depth + 1, out);
    }
}
