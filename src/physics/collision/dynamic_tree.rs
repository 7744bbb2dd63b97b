//! A dynamic AABB tree for speeding up collision detection and other spatial queries.
//!
//! Leaves hold slightly enlarged ("fat") boxes so that bodies can move a little
//! without the tree having to change. The tree is kept balanced with AVL rotations.

use super::{aabb::ray_aabb, Pair, PairId, Ray, AABB};
use crate::physics::{config::DynamicTreeConfig, Body, BodyKey, CollisionType, EntitySet};

use std::collections::HashSet;

/// Padding added to a body's bounds when it is first tracked.
const TRACK_PADDING: f64 = 2.0;

//
// Internal types
//

#[derive(Clone, Copy, Debug)]
struct Node {
    aabb: AABB,
    parent: Option<usize>,
    /// Leaves have height 0.
    height: i32,
    kind: NodeKind,
}

#[derive(Clone, Copy, Debug)]
enum NodeKind {
    Branch { left: usize, right: usize },
    Leaf { body: BodyKey },
    Free { next: Option<usize> },
}

/// A "call stack" for efficient recursion through the tree.
#[derive(Clone, Debug, Default)]
struct Stack(Vec<usize>);

//
// Tree itself
//

/// A binary tree of bounding boxes, one leaf per tracked body.
#[derive(Clone, Debug)]
pub struct DynamicTree {
    nodes: Vec<Node>,
    root: Option<usize>,
    free_list: Option<usize>,
    leaf_count: usize,
    /// Single stack that is kept around so that we don't need to
    /// allocate a separate one for every traversal.
    shared_stack: Stack,
    config: DynamicTreeConfig,
    world_bounds: Option<AABB>,
}

impl DynamicTree {
    pub fn new(config: DynamicTreeConfig, world_bounds: Option<AABB>) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            free_list: None,
            leaf_count: 0,
            shared_stack: Stack::default(),
            config,
            world_bounds,
        }
    }

    pub fn set_config(&mut self, config: DynamicTreeConfig, world_bounds: Option<AABB>) {
        self.config = config;
        self.world_bounds = world_bounds;
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.free_list = None;
        self.leaf_count = 0;
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Height of the root node, zero for a tree with a single leaf or none.
    #[inline]
    pub fn height(&self) -> i32 {
        self.root.map_or(0, |r| self.nodes[r].height)
    }

    /// The fat box stored for a tracked body.
    pub fn fat_aabb(&self, body: &Body) -> Option<AABB> {
        let idx = body.proxy?;
        match self.nodes.get(idx)?.kind {
            NodeKind::Leaf { .. } => Some(self.nodes[idx].aabb),
            _ => None,
        }
    }

    //
    // Body tracking
    //

    /// Add a body to the tree. Does nothing if it is already tracked.
    pub fn track(&mut self, key: BodyKey, body: &mut Body) {
        if body.proxy.is_some() {
            return;
        }
        let leaf = self.allocate(Node {
            aabb: body.bounds().padded(TRACK_PADDING),
            parent: None,
            height: 0,
            kind: NodeKind::Leaf { body: key },
        });
        self.insert_leaf(leaf);
        self.leaf_count += 1;
        body.proxy = Some(leaf);
    }

    pub fn untrack(&mut self, body: &mut Body) {
        let Some(leaf) = body.proxy.take() else { return };
        if !matches!(self.nodes.get(leaf), Some(Node { kind: NodeKind::Leaf { .. }, .. })) {
            return;
        }
        self.remove_leaf(leaf);
        self.free(leaf);
        self.leaf_count -= 1;
    }

    /// Move a body's leaf if it has left its fat box.
    /// Returns true if the tree changed.
    pub fn update_body(&mut self, key: BodyKey, body: &mut Body) -> bool {
        let Some(leaf) = body.proxy else { return false };
        let bounds = body.bounds();

        if let Some(world) = self.world_bounds {
            if !world.overlaps(&bounds, 0.0) {
                log::warn!(
                    "body {:?} left the world bounds at {:?}, removing it from collision detection",
                    key,
                    body.pos()
                );
                self.untrack(body);
                return false;
            }
        }

        if self.nodes[leaf].aabb.contains(&bounds) {
            return false;
        }

        self.remove_leaf(leaf);
        let lookahead =
            body.velocity.linear * (32.0 / 1000.0) * self.config.velocity_multiplier;
        self.nodes[leaf].aabb = bounds
            .padded(self.config.bounds_padding)
            .extended(lookahead);
        self.insert_leaf(leaf);
        true
    }

    //
    // Queries
    //

    /// Call `callback` for every body whose fat box overlaps the given box
    /// until it returns true. `exclude` is never reported.
    pub fn query(
        &mut self,
        aabb: AABB,
        exclude: Option<BodyKey>,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    ) {
        for body in self.traverse(|node_aabb| node_aabb.overlaps(&aabb, 0.0)) {
            if Some(body) != exclude && callback(body) {
                return;
            }
        }
    }

    /// Call `callback` for every body whose fat box is hit by the ray
    /// within `max_distance` until it returns true.
    pub fn ray_cast_query(
        &mut self,
        ray: Ray,
        max_distance: f64,
        callback: &mut dyn FnMut(BodyKey) -> bool,
    ) {
        for body in self.traverse(|node_aabb| {
            matches!(ray_aabb(ray, *node_aabb), Some(t) if t <= max_distance)
        }) {
            if callback(body) {
                return;
            }
        }
    }

    /// Every pair of collidable bodies whose bounds overlap.
    pub fn pairs(&mut self, bodies: &EntitySet) -> Vec<Pair> {
        let _span = tracy_span!("dynamic tree pairs", "pairs");

        let mut seen: HashSet<PairId> = HashSet::new();
        let mut pairs = Vec::new();
        for (key, body) in bodies.iter() {
            if body.proxy.is_none() || body.collision_type == CollisionType::PreventCollision {
                continue;
            }
            let bounds = body.bounds();
            for other_key in self.traverse(|node_aabb| node_aabb.overlaps(&bounds, 0.0)) {
                let Some(other) = bodies.get(other_key) else { continue };
                if !Pair::can_collide(key, body, other_key, other)
                    || !bounds.overlaps(&other.bounds(), 0.0)
                {
                    continue;
                }
                let pair = Pair::new(key, other_key);
                if seen.insert(pair.id) {
                    pairs.push(pair);
                }
            }
        }
        pairs
    }

    fn traverse<F>(&mut self, predicate: F) -> TreeIter<'_, F>
    where
        F: Fn(&AABB) -> bool,
    {
        let next_node = self.root.filter(|&r| predicate(&self.nodes[r].aabb));
        TreeIter {
            predicate,
            stack: &mut self.shared_stack,
            nodes: &self.nodes,
            next_node,
        }
    }

    //
    // Node management
    //

    fn allocate(&mut self, node: Node) -> usize {
        match self.free_list {
            Some(idx) => {
                if let NodeKind::Free { next } = self.nodes[idx].kind {
                    self.free_list = next;
                }
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn free(&mut self, idx: usize) {
        self.nodes[idx] = Node {
            aabb: AABB::zero(),
            parent: None,
            height: -1,
            kind: NodeKind::Free {
                next: self.free_list,
            },
        };
        self.free_list = Some(idx);
    }

    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: usize) {
        match parent {
            Some(p) => {
                if let NodeKind::Branch { left, right } = &mut self.nodes[p].kind {
                    if *left == old {
                        *left = new;
                    } else {
                        *right = new;
                    }
                }
            }
            None => self.root = Some(new),
        }
    }

    fn insert_leaf(&mut self, leaf: usize) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.nodes[leaf].parent = None;
            return;
        };

        // find the best sibling by descending towards the cheapest child
        let leaf_aabb = self.nodes[leaf].aabb;
        let mut index = root;
        while let NodeKind::Branch { left, right } = self.nodes[index].kind {
            let perimeter = self.nodes[index].aabb.perimeter();
            let combined = self.nodes[index].aabb.union(&leaf_aabb).perimeter();

            // cost of creating a new parent for this node and the new leaf
            let cost = 2.0 * combined;
            // minimum cost of pushing the leaf further down the tree
            let inheritance = 2.0 * (combined - perimeter);

            let child_cost = |child: usize| {
                let node = &self.nodes[child];
                let union = leaf_aabb.union(&node.aabb).perimeter();
                match node.kind {
                    NodeKind::Leaf { .. } => union + inheritance,
                    _ => union - node.aabb.perimeter() + inheritance,
                }
            };
            let cost_left = child_cost(left);
            let cost_right = child_cost(right);

            if cost < cost_left && cost < cost_right {
                break;
            }
            index = if cost_left < cost_right { left } else { right };
        }

        let sibling = index;
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate(Node {
            aabb: leaf_aabb.union(&self.nodes[sibling].aabb),
            parent: old_parent,
            height: self.nodes[sibling].height + 1,
            kind: NodeKind::Branch {
                left: sibling,
                right: leaf,
            },
        });
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);
        self.replace_child(old_parent, sibling, new_parent);

        self.refit(Some(new_parent));
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }
        let Some(parent) = self.nodes[leaf].parent else { return };
        let NodeKind::Branch { left, right } = self.nodes[parent].kind else { return };
        let sibling = if left == leaf { right } else { left };
        let grandparent = self.nodes[parent].parent;

        // the sibling takes the parent's place
        self.replace_child(grandparent, parent, sibling);
        self.nodes[sibling].parent = grandparent;
        self.free(parent);
        self.nodes[leaf].parent = None;

        self.refit(grandparent);
    }

    /// Walk up from a node to the root, rebalancing and recomputing boxes and heights.
    fn refit(&mut self, from: Option<usize>) {
        let mut index = from;
        while let Some(i) = index {
            let i = self.balance(i);
            if let NodeKind::Branch { left, right } = self.nodes[i].kind {
                self.nodes[i].height = 1 + self.nodes[left].height.max(self.nodes[right].height);
                self.nodes[i].aabb = self.nodes[left].aabb.union(&self.nodes[right].aabb);
            }
            index = self.nodes[i].parent;
        }
    }

    /// Perform a left or right rotation if node `a` is imbalanced.
    /// Returns the new root of the subtree.
    fn balance(&mut self, a: usize) -> usize {
        let NodeKind::Branch { left: b, right: c } = self.nodes[a].kind else {
            return a;
        };
        if self.nodes[a].height < 2 {
            return a;
        }

        let balance = self.nodes[c].height - self.nodes[b].height;
        if balance > 1 {
            self.rotate_up(a, c, b, true)
        } else if balance < -1 {
            self.rotate_up(a, b, c, false)
        } else {
            a
        }
    }

    /// Rotate `child` of `a` up to take `a`'s place.
    /// `other` is `a`'s other child, which stays under `a`.
    fn rotate_up(&mut self, a: usize, child: usize, other: usize, child_is_right: bool) -> usize {
        let NodeKind::Branch {
            left: f,
            right: g,
        } = self.nodes[child].kind
        else {
            return a;
        };

        // swap a and child
        let a_parent = self.nodes[a].parent;
        self.nodes[child].parent = a_parent;
        self.nodes[a].parent = Some(child);
        self.replace_child(a_parent, a, child);

        // the taller grandchild stays with child, the shorter one moves under a
        let (kept, moved) = if self.nodes[f].height > self.nodes[g].height {
            (f, g)
        } else {
            (g, f)
        };
        self.nodes[child].kind = NodeKind::Branch {
            left: a,
            right: kept,
        };
        self.nodes[a].kind = if child_is_right {
            NodeKind::Branch {
                left: other,
                right: moved,
            }
        } else {
            NodeKind::Branch {
                left: moved,
                right: other,
            }
        };
        self.nodes[moved].parent = Some(a);

        self.nodes[a].aabb = self.nodes[other].aabb.union(&self.nodes[moved].aabb);
        self.nodes[a].height = 1 + self.nodes[other].height.max(self.nodes[moved].height);
        self.nodes[child].aabb = self.nodes[a].aabb.union(&self.nodes[kept].aabb);
        self.nodes[child].height = 1 + self.nodes[a].height.max(self.nodes[kept].height);

        child
    }
}

//
// Iterators
//

/// An iterator that yields every body whose leaf box, and every ancestor box,
/// satisfies a predicate.
struct TreeIter<'a, F> {
    predicate: F,
    stack: &'a mut Stack,
    nodes: &'a [Node],
    next_node: Option<usize>,
}

impl<'a, F> Iterator for TreeIter<'a, F>
where
    F: Fn(&AABB) -> bool,
{
    type Item = BodyKey;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next_node = self.next_node?;

            match self.nodes[next_node].kind {
                NodeKind::Branch { left, right } => {
                    match (
                        (self.predicate)(&self.nodes[left].aabb),
                        (self.predicate)(&self.nodes[right].aabb),
                    ) {
                        (true, true) => {
                            // need to visit both children, push to stack to return to later
                            self.stack.0.push(right);
                            self.next_node = Some(left);
                        }
                        (true, false) => {
                            self.next_node = Some(left);
                        }
                        (false, true) => {
                            self.next_node = Some(right);
                        }
                        (false, false) => {
                            // nothing below this, return back up the stack
                            self.next_node = self.stack.0.pop();
                        }
                    }
                }
                NodeKind::Leaf { body } => {
                    self.next_node = self.stack.0.pop();
                    return Some(body);
                }
                NodeKind::Free { .. } => {
                    self.next_node = self.stack.0.pop();
                }
            }
        }
    }
}

impl<'a, F> Drop for TreeIter<'a, F> {
    fn drop(&mut self) {
        // clear the stack on drop; it may not be empty
        // if the iteration didn't finish
        self.stack.0.clear();
    }
}
