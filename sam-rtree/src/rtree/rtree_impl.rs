//! RTree implementation.

use log::{debug, trace};

use crate::bounding_box::BoundingBox;
use crate::hilbert::hilbert_key;

use super::partition::split_node;
use super::rtree_config::RTreeConfig;
use super::rtree_constants::BULK_LOAD_HILBERT_ORDER;
use super::rtree_types::{
    Branch, BranchPayload, IntegrityReport, Node, RTreeStats, RebuildStats, SpatialResult,
};

/// A memory-resident R-tree over 2D bounding boxes.
///
/// Values are stored by value at the leaves and handed back as clones by the
/// queries. They need equality so that [`RTree::remove`] can find them.
///
/// The tree is a plain data structure with no internal locking: mutation
/// needs `&mut self`. Wrap it in a [`SyncRTree`](crate::SyncRTree) to share it
/// between threads.
///
/// # Example
///
/// ```rust
/// use sam_rtree::{BoundingBox, RTree};
///
/// let mut tree = RTree::new();
/// tree.insert(BoundingBox::new(0.0, 0.0, 1.0, 1.0), "a");
/// tree.insert(BoundingBox::new(2.0, 2.0, 3.0, 3.0), "b");
/// tree.insert(BoundingBox::new(10.0, 10.0, 11.0, 11.0), "c");
///
/// let mut found = Vec::new();
/// let count = tree.search(&BoundingBox::new(0.0, 0.0, 3.0, 3.0), &mut found);
/// assert_eq!(count, 2);
///
/// assert!(tree.remove(&BoundingBox::new(2.0, 2.0, 3.0, 3.0), &"b"));
/// assert!(!tree.remove(&BoundingBox::new(2.0, 2.0, 3.0, 3.0), &"b"));
/// ```
#[derive(Debug)]
pub struct RTree<V> {
    root: Box<Node<V>>,
    /// Advisory bounding box of everything inserted, see [`RTree::mbr`]
    mbr: BoundingBox,
    /// Allocated nodes, the root included
    size: usize,
    entries: usize,
    config: RTreeConfig,
}

impl<V: Clone + PartialEq> Default for RTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq> RTree<V> {
    /// Creates an empty tree with 8 branches per node and a minimum fill of 4.
    pub fn new() -> Self {
        Self::build(RTreeConfig::default(), BoundingBox::empty())
    }

    /// Creates an empty tree with custom node capacities.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidConfig`](super::SpatialError::InvalidConfig)
    /// if the capacities cannot produce valid splits.
    pub fn with_config(config: RTreeConfig) -> SpatialResult<Self> {
        config.validate()?;
        Ok(Self::build(config, BoundingBox::empty()))
    }

    /// Creates an empty tree whose overall bounding box starts at `mbr`.
    pub fn with_mbr(mbr: BoundingBox) -> Self {
        debug_assert!(mbr.is_valid(), "initial bounding box must be valid");
        Self::build(RTreeConfig::default(), mbr)
    }

    /// Creates an empty tree with custom capacities and an initial overall bounding box.
    ///
    /// # Errors
    ///
    /// Same as [`RTree::with_config`].
    pub fn with_config_and_mbr(config: RTreeConfig, mbr: BoundingBox) -> SpatialResult<Self> {
        config.validate()?;
        debug_assert!(mbr.is_valid(), "initial bounding box must be valid");
        Ok(Self::build(config, mbr))
    }

    fn build(config: RTreeConfig, mbr: BoundingBox) -> Self {
        Self {
            root: Self::empty_root(&config),
            mbr,
            size: 1,
            entries: 0,
            config,
        }
    }

    fn empty_root(config: &RTreeConfig) -> Box<Node<V>> {
        Box::new(Node::new(0, config.max_nodes()))
    }

    /// Bulk loads entries into a new tree.
    ///
    /// Entries are sorted along a Hilbert curve laid over their common extent
    /// and then inserted one by one, so neighbouring rectangles tend to share
    /// leaves. The result is an ordinary mutable tree.
    ///
    /// # Errors
    ///
    /// Same as [`RTree::with_config`].
    pub fn bulk_load<I>(config: RTreeConfig, entries: I) -> SpatialResult<Self>
    where
        I: IntoIterator<Item = (BoundingBox, V)>,
    {
        let mut tree = Self::with_config(config)?;
        let entries: Vec<(BoundingBox, V)> = entries.into_iter().collect();
        let count = entries.len();

        for (mbr, _) in &entries {
            tree.mbr.expand(mbr);
        }
        tree.load_hilbert_sorted(entries);

        debug!(
            "Bulk loaded {} entries into {} nodes (height {})",
            count,
            tree.size,
            tree.height()
        );
        Ok(tree)
    }

    fn load_hilbert_sorted(&mut self, entries: Vec<(BoundingBox, V)>) {
        let mut extent = BoundingBox::empty();
        for (mbr, _) in &entries {
            extent.expand(mbr);
        }

        let mut keyed: Vec<(u64, BoundingBox, V)> = entries
            .into_iter()
            .map(|(mbr, value)| {
                (hilbert_key(&mbr, &extent, BULK_LOAD_HILBERT_ORDER), mbr, value)
            })
            .collect();
        keyed.sort_by_key(|entry| entry.0);

        for (_, mbr, value) in keyed {
            self.insert_branch(Branch::value(mbr, value), 0);
            self.entries += 1;
        }
    }

    /// Number of **nodes** currently allocated, the root included.
    ///
    /// This is not the number of stored values; use
    /// [`RTree::entry_count`] for that. An empty tree has size 1.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of values stored in the tree.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Returns true if the root holds no branches.
    pub fn is_empty(&self) -> bool {
        self.root.count() == 0
    }

    /// Number of levels; a lone leaf root has height 1.
    pub fn height(&self) -> u32 {
        self.root.level + 1
    }

    /// Node capacities this tree was built with.
    pub fn config(&self) -> &RTreeConfig {
        &self.config
    }

    /// Bounding box of all elements, as tracked by [`RTree::insert`] and
    /// [`RTree::set_mbr`].
    ///
    /// It only ever grows on insert and is not shrunk by removals or
    /// [`RTree::clear`]; it is advisory bookkeeping, not a cover of the
    /// current contents.
    pub fn mbr(&self) -> &BoundingBox {
        &self.mbr
    }

    /// Overrides the tracked bounding box of all elements.
    pub fn set_mbr(&mut self, mbr: BoundingBox) {
        self.mbr = mbr;
    }

    /// Drops every node and value, leaving a single empty leaf root.
    pub fn clear(&mut self) {
        let released = self.size;
        self.root = Self::empty_root(&self.config);
        self.size = 1;
        self.entries = 0;
        debug!("Cleared R-Tree, released {} nodes", released);
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Inserts `value` covering `mbr`.
    ///
    /// The same value may be inserted several times, under the same or
    /// different rectangles.
    pub fn insert(&mut self, mbr: BoundingBox, value: V) {
        self.insert_branch(Branch::value(mbr, value), 0);
        self.entries += 1;
        self.mbr.expand(&mbr);
    }

    /// Adds `branch` to a node at `level`, growing a new root if the old one splits.
    fn insert_branch(&mut self, branch: Branch<V>, level: u32) {
        let mut allocated = 0;
        let split = Self::choose_leaf(&mut self.root, branch, level, &self.config, &mut allocated);
        self.size += allocated;

        if let Some(sibling) = split {
            let new_level = self.root.level + 1;
            let old_root = std::mem::replace(
                &mut self.root,
                Box::new(Node::new(new_level, self.config.max_nodes())),
            );
            self.root.branches.push(Branch::child(old_root));
            self.root.branches.push(Branch::child(sibling));
            self.size += 1;
            debug!("Root split, tree grew to height {}", self.height());
        }
    }

    /// Descends to `level` and adds `branch` there. Returns the new sibling
    /// of `node` if `node` had to split.
    fn choose_leaf(
        node: &mut Node<V>,
        branch: Branch<V>,
        level: u32,
        config: &RTreeConfig,
        allocated: &mut usize,
    ) -> Option<Box<Node<V>>> {
        if node.level <= level {
            debug_assert_eq!(node.level, level, "descended below the insertion level");
            return Self::add_branch(node, branch, config, allocated);
        }

        let node_level = node.level;
        let mbr = branch.mbr;
        let i = Self::pick_branch(&mbr, node);
        let target = &mut node.branches[i];
        let BranchPayload::Child(child) = &mut target.payload else {
            unreachable!("internal node at level {} holds a value", node_level);
        };

        match Self::choose_leaf(child, branch, level, config, allocated) {
            None => {
                target.mbr = mbr.union(&target.mbr);
                None
            }
            Some(sibling) => {
                target.mbr = child.cover();
                Self::add_branch(node, Branch::child(sibling), config, allocated)
            }
        }
    }

    fn add_branch(
        node: &mut Node<V>,
        branch: Branch<V>,
        config: &RTreeConfig,
        allocated: &mut usize,
    ) -> Option<Box<Node<V>>> {
        if node.count() < config.max_nodes() {
            node.branches.push(branch);
            None
        } else {
            *allocated += 1;
            Some(split_node(node, branch, config.min_nodes()))
        }
    }

    /// Index of the branch needing the least area enlargement to cover
    /// `mbr`; ties go to the smaller branch.
    fn pick_branch(mbr: &BoundingBox, node: &Node<V>) -> usize {
        let mut best = 0;
        let mut best_increase = 0.0;
        let mut best_area = 0.0;

        for (i, branch) in node.branches.iter().enumerate() {
            let area = branch.mbr.area();
            let increase = branch.mbr.enlargement(mbr);

            if i == 0
                || increase < best_increase
                || (increase == best_increase && area < best_area)
            {
                best = i;
                best_increase = increase;
                best_area = area;
            }
        }
        best
    }

    // ------------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------------

    /// Removes one occurrence of `value` reachable through branches
    /// intersecting `mbr`.
    ///
    /// Returns `false`, leaving the tree untouched, if no such value exists.
    /// Nodes left underfull are detached and their branches reinserted.
    /// An internal root with a single child is then replaced by that child;
    /// this happens at most once per call, so the height shrinks by at most
    /// one level per removal. Call [`RTree::rebuild`] to compact eagerly.
    pub fn remove(&mut self, mbr: &BoundingBox, value: &V) -> bool {
        let mut orphans = Vec::new();
        if !Self::remove_entry(&mut self.root, mbr, value, self.config.min_nodes(), &mut orphans) {
            return false;
        }
        self.entries -= 1;

        if !orphans.is_empty() {
            trace!("Reinserting branches of {} underfull nodes", orphans.len());
        }
        for orphan in orphans {
            let Node { branches, level } = *orphan;
            for branch in branches {
                self.insert_branch(branch, level);
            }
            self.size -= 1;
        }

        if self.root.is_internal() && self.root.count() == 1 {
            if let Some(Branch {
                payload: BranchPayload::Child(child),
                ..
            }) = self.root.branches.pop()
            {
                self.root = child;
                self.size -= 1;
                debug!("Collapsed redundant root, tree shrank to height {}", self.height());
            }
        } else if self.root.is_internal() && self.root.count() == 0 {
            self.root = Self::empty_root(&self.config);
            debug!("Internal root lost its last child, reset to an empty leaf");
        }

        true
    }

    /// Removes `value` from the subtree under `node`. Children that drop
    /// below `min_fill` are detached and pushed to `orphans`.
    fn remove_entry(
        node: &mut Node<V>,
        mbr: &BoundingBox,
        value: &V,
        min_fill: usize,
        orphans: &mut Vec<Box<Node<V>>>,
    ) -> bool {
        if node.is_leaf() {
            let found = node
                .branches
                .iter()
                .position(|b| matches!(&b.payload, BranchPayload::Value(v) if v == value));
            return match found {
                Some(i) => {
                    node.branches.swap_remove(i);
                    true
                }
                None => false,
            };
        }

        for i in 0..node.count() {
            if !mbr.intersects(&node.branches[i].mbr) {
                continue;
            }
            let branch = &mut node.branches[i];
            let BranchPayload::Child(child) = &mut branch.payload else {
                continue;
            };
            if !Self::remove_entry(child, mbr, value, min_fill, orphans) {
                continue;
            }

            if child.count() >= min_fill {
                branch.mbr = child.cover();
            } else if let BranchPayload::Child(orphan) = node.branches.swap_remove(i).payload {
                orphans.push(orphan);
            }
            return true;
        }
        false
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Appends to `report` every value whose rectangle intersects `mbr` and
    /// returns how many were appended.
    ///
    /// Results come in storage order, which carries no meaning.
    pub fn search(&self, mbr: &BoundingBox, report: &mut Vec<V>) -> usize {
        Self::search_node(&self.root, mbr, report)
    }

    fn search_node(node: &Node<V>, mbr: &BoundingBox, report: &mut Vec<V>) -> usize {
        let mut found = 0;
        for branch in &node.branches {
            if !mbr.intersects(&branch.mbr) {
                continue;
            }
            match &branch.payload {
                BranchPayload::Child(child) => found += Self::search_node(child, mbr, report),
                BranchPayload::Value(value) => {
                    report.push(value.clone());
                    found += 1;
                }
            }
        }
        found
    }

    /// Every value whose rectangle intersects `mbr`.
    pub fn find_intersecting(&self, mbr: &BoundingBox) -> Vec<V> {
        let mut results = Vec::new();
        self.search(mbr, &mut results);
        results
    }

    /// Every value whose rectangle lies entirely inside `mbr`.
    pub fn find_contained(&self, mbr: &BoundingBox) -> Vec<V> {
        let mut results = Vec::new();
        Self::search_contained_node(&self.root, mbr, &mut results);
        results
    }

    fn search_contained_node(node: &Node<V>, mbr: &BoundingBox, results: &mut Vec<V>) {
        for branch in &node.branches {
            match &branch.payload {
                // a contained entry can sit under a branch that only partially intersects
                BranchPayload::Child(child) => {
                    if mbr.intersects(&branch.mbr) {
                        Self::search_contained_node(child, mbr, results);
                    }
                }
                BranchPayload::Value(value) => {
                    if mbr.contains(&branch.mbr) {
                        results.push(value.clone());
                    }
                }
            }
        }
    }

    /// Finds the `k` values nearest to `(x, y)`, nearest first.
    ///
    /// Distance is measured from the point to the closest edge of each
    /// value's rectangle, so values whose rectangle contains the point are at
    /// distance 0. Entries farther than `max_distance` are skipped.
    pub fn find_nearest(
        &self,
        x: f64,
        y: f64,
        k: usize,
        max_distance: Option<f64>,
    ) -> Vec<(V, f64)> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<(V, f64)> = Vec::with_capacity(k.min(self.entries));
        let mut bound = max_distance.unwrap_or(f64::INFINITY);
        Self::nearest_node(&self.root, x, y, k, &mut results, &mut bound);
        results
    }

    /// Branch-and-bound descent; `results` stays sorted by distance and
    /// `bound` shrinks to the k-th distance once `k` results are held.
    fn nearest_node(
        node: &Node<V>,
        x: f64,
        y: f64,
        k: usize,
        results: &mut Vec<(V, f64)>,
        bound: &mut f64,
    ) {
        let mut candidates: Vec<(&Branch<V>, f64)> = node
            .branches
            .iter()
            .map(|branch| (branch, branch.mbr.min_distance_to_point(x, y)))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (branch, distance) in candidates {
            if distance > *bound {
                break;
            }
            match &branch.payload {
                BranchPayload::Child(child) => {
                    Self::nearest_node(child, x, y, k, results, bound);
                }
                BranchPayload::Value(value) => {
                    let at = results.partition_point(|(_, d)| *d <= distance);
                    results.insert(at, (value.clone(), distance));
                    results.truncate(k);
                    if results.len() == k {
                        *bound = bound.min(results[k - 1].1);
                    }
                }
            }
        }
    }

    /// Iterates over every stored `(rectangle, value)` pair in storage order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: vec![self.root.branches.iter()],
        }
    }

    // ------------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------------

    /// Reconstructs the tree from its current entries using bulk loading.
    ///
    /// Useful after many removals: the result has minimal height for the
    /// insertion heuristic and no leftover single-child root. The tracked
    /// overall bounding box is kept as is.
    pub fn rebuild(&mut self) -> RebuildStats {
        let nodes_before = self.size;
        let height_before = self.height();

        let old_root = std::mem::replace(&mut self.root, Self::empty_root(&self.config));
        let mut entries = Vec::with_capacity(self.entries);
        Self::drain_node(*old_root, &mut entries);
        self.size = 1;
        self.entries = 0;

        let entries_reindexed = entries.len();
        self.load_hilbert_sorted(entries);

        let stats = RebuildStats {
            entries_reindexed,
            nodes_before,
            nodes_after: self.size,
            height_before,
            height_after: self.height(),
        };
        debug!("Rebuilt R-Tree: {:?}", stats);
        stats
    }

    fn drain_node(node: Node<V>, entries: &mut Vec<(BoundingBox, V)>) {
        for branch in node.branches {
            match branch.payload {
                BranchPayload::Child(child) => Self::drain_node(*child, entries),
                BranchPayload::Value(value) => entries.push((branch.mbr, value)),
            }
        }
    }

    /// Shape statistics gathered by walking the whole tree.
    pub fn stats(&self) -> RTreeStats {
        let mut node_count = 0;
        let mut leaf_count = 0;
        let mut leaf_branches = 0;
        let mut stack: Vec<&Node<V>> = vec![&self.root];

        while let Some(node) = stack.pop() {
            node_count += 1;
            if node.is_leaf() {
                leaf_count += 1;
                leaf_branches += node.count();
            }
            for branch in &node.branches {
                if let BranchPayload::Child(child) = &branch.payload {
                    stack.push(child);
                }
            }
        }

        let leaf_fill_factor = if leaf_count > 0 {
            leaf_branches as f64 / (leaf_count * self.config.max_nodes()) as f64
        } else {
            0.0
        };

        RTreeStats {
            node_count,
            leaf_count,
            total_entries: leaf_branches,
            tree_height: self.height(),
            leaf_fill_factor,
        }
    }

    /// Verifies every structural invariant of the tree.
    ///
    /// - every node holds at most `max_nodes` branches, and every non-root
    ///   node at least `min_nodes`
    /// - children sit exactly one level below their parent, leaves hold
    ///   values and internal nodes hold children
    /// - every internal branch rectangle is the exact cover of its child
    /// - the node and value counters match the tree
    pub fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport::new();
        self.check_node(&self.root, true, &mut report);

        if report.nodes_checked != self.size {
            report.violation(format!(
                "size() reports {} nodes but {} are reachable",
                self.size, report.nodes_checked
            ));
        }
        if report.entries_checked != self.entries {
            report.violation(format!(
                "entry_count() reports {} values but {} are reachable",
                self.entries, report.entries_checked
            ));
        }
        report
    }

    fn check_node(&self, node: &Node<V>, is_root: bool, report: &mut IntegrityReport) {
        report.nodes_checked += 1;

        if node.count() > self.config.max_nodes() {
            report.violation(format!(
                "node at level {} holds {} branches, capacity is {}",
                node.level,
                node.count(),
                self.config.max_nodes()
            ));
        }
        if !is_root && node.count() < self.config.min_nodes() {
            report.violation(format!(
                "node at level {} holds {} branches, minimum is {}",
                node.level,
                node.count(),
                self.config.min_nodes()
            ));
        }

        for branch in &node.branches {
            match &branch.payload {
                BranchPayload::Value(_) => {
                    report.entries_checked += 1;
                    if node.is_internal() {
                        report.violation(format!(
                            "internal node at level {} holds a value",
                            node.level
                        ));
                    }
                }
                BranchPayload::Child(child) => {
                    if node.is_leaf() {
                        report.violation("leaf node holds a child node".to_string());
                    } else if child.level + 1 != node.level {
                        report.violation(format!(
                            "child at level {} under node at level {}",
                            child.level, node.level
                        ));
                    }
                    let cover = child.cover();
                    if branch.mbr != cover {
                        report.violation(format!(
                            "branch rectangle {} differs from child cover {}",
                            branch.mbr, cover
                        ));
                    }
                    self.check_node(child, false, report);
                }
            }
        }
    }
}

/// Iterator over the `(rectangle, value)` pairs of an [`RTree`].
pub struct Iter<'a, V> {
    stack: Vec<std::slice::Iter<'a, Branch<V>>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a BoundingBox, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(branch) => match &branch.payload {
                    BranchPayload::Child(child) => self.stack.push(child.branches.iter()),
                    BranchPayload::Value(value) => return Some((&branch.mbr, value)),
                },
            }
        }
    }
}

impl<'a, V: Clone + PartialEq> IntoIterator for &'a RTree<V> {
    type Item = (&'a BoundingBox, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
