//! Quadratic-cost node split.
//!
//! An overflowing node holds `max_nodes + 1` branches. They are divided in two
//! phases: two seeds that are the farthest apart along the better separated
//! axis anchor the groups, then every other branch is pigeonholed into the
//! group whose cover grows the least. The donor node keeps group 0 and a new
//! sibling at the same level receives group 1.

use log::trace;

use crate::bounding_box::BoundingBox;

use super::rtree_types::{Branch, Node};

/// Bookkeeping for one split: the group of every buffered branch and the
/// running cover of both groups.
#[derive(Debug)]
pub(crate) struct PartitionVars {
    partition: Vec<Option<usize>>,
    count: [usize; 2],
    cover: [BoundingBox; 2],
    area: [f64; 2],
    cover_split: BoundingBox,
    min_fill: usize,
}

impl PartitionVars {
    fn new(mbrs: &[BoundingBox], min_fill: usize) -> Self {
        let mut cover_split = BoundingBox::empty();
        for mbr in mbrs {
            cover_split.expand(mbr);
        }

        Self {
            partition: vec![None; mbrs.len()],
            count: [0; 2],
            cover: [BoundingBox::empty(); 2],
            area: [0.0; 2],
            cover_split,
            min_fill,
        }
    }

    /// Assigns every rectangle of `mbrs` to group 0 or 1.
    ///
    /// Both groups end up with at least `min_fill` members as long as
    /// `mbrs.len() >= 2 * min_fill`.
    pub(crate) fn partition(mbrs: &[BoundingBox], min_fill: usize) -> Vec<usize> {
        let mut p = Self::new(mbrs, min_fill);
        p.pick_seeds(mbrs);
        p.pigeonhole(mbrs);

        p.partition
            .into_iter()
            .map(|group| group.unwrap_or(0))
            .collect()
    }

    fn pick_seeds(&mut self, mbrs: &[BoundingBox]) {
        let (x_low, x_high, x_sep) = Self::farthest_pair(
            mbrs,
            |r| r.min_x,
            |r| r.max_x,
            self.cover_split.width(),
        );
        let (y_low, y_high, y_sep) = Self::farthest_pair(
            mbrs,
            |r| r.min_y,
            |r| r.max_y,
            self.cover_split.height(),
        );

        let (seed0, seed1) = if y_sep > x_sep {
            (y_low, y_high)
        } else {
            (x_low, x_high)
        };

        // a single branch can be both extremes; pigeonholing alone decides then
        if seed0 != seed1 {
            self.classify(seed0, 0, mbrs);
            self.classify(seed1, 1, mbrs);
        }
    }

    /// Along one axis, finds the branch with the least high coordinate and the
    /// branch with the greatest low coordinate, and their gap normalized by
    /// the span of the whole set.
    fn farthest_pair(
        mbrs: &[BoundingBox],
        low: impl Fn(&BoundingBox) -> f64,
        high: impl Fn(&BoundingBox) -> f64,
        width: f64,
    ) -> (usize, usize, f64) {
        let mut greatest_lower = 0;
        let mut least_upper = 0;

        for (i, r) in mbrs.iter().enumerate().skip(1) {
            if low(r) > low(&mbrs[greatest_lower]) {
                greatest_lower = i;
            }
            if high(r) < high(&mbrs[least_upper]) {
                least_upper = i;
            }
        }

        let w = if width == 0.0 { 1.0 } else { width };
        let separation = (low(&mbrs[greatest_lower]) - high(&mbrs[least_upper])) / w;

        (least_upper, greatest_lower, separation)
    }

    fn classify(&mut self, i: usize, group: usize, mbrs: &[BoundingBox]) {
        self.partition[i] = Some(group);

        if self.count[group] == 0 {
            self.cover[group] = mbrs[i];
        } else {
            self.cover[group] = mbrs[i].union(&self.cover[group]);
        }
        self.area[group] = self.cover[group].area();
        self.count[group] += 1;
    }

    fn pigeonhole(&mut self, mbrs: &[BoundingBox]) {
        let limit = mbrs.len() - self.min_fill;

        for i in 0..mbrs.len() {
            if self.partition[i].is_some() {
                continue;
            }

            // if one group is too full, the rest must go to the other
            if self.count[0] >= limit {
                self.classify(i, 1, mbrs);
                continue;
            }
            if self.count[1] >= limit {
                self.classify(i, 0, mbrs);
                continue;
            }

            let mut increase = [0.0; 2];
            for (group, inc) in increase.iter_mut().enumerate() {
                let new_cover = if self.count[group] > 0 {
                    mbrs[i].union(&self.cover[group])
                } else {
                    mbrs[i]
                };
                *inc = new_cover.area() - self.area[group];
            }

            let group = if increase[0] < increase[1] {
                0
            } else if increase[1] < increase[0] {
                1
            } else if self.area[0] < self.area[1] {
                0
            } else if self.area[1] < self.area[0] {
                1
            } else if self.count[0] < self.count[1] {
                0
            } else {
                1
            };
            self.classify(i, group, mbrs);
        }
    }
}

/// Splits `node`, which is full, while adding `overflow`.
///
/// `node` is reset and refilled with the first group; the returned sibling,
/// at the same level, holds the second.
pub(crate) fn split_node<V>(
    node: &mut Node<V>,
    overflow: Branch<V>,
    min_fill: usize,
) -> Box<Node<V>> {
    let capacity = node.branches.capacity().max(node.count() + 1);
    let mut buffer: Vec<Branch<V>> = node.branches.drain(..).collect();
    buffer.push(overflow);
    node.init();

    let mbrs: Vec<BoundingBox> = buffer.iter().map(|b| b.mbr).collect();
    let groups = PartitionVars::partition(&mbrs, min_fill);

    let mut sibling = Box::new(Node::new(node.level, capacity));
    for (branch, group) in buffer.into_iter().zip(groups) {
        if group == 0 {
            node.branches.push(branch);
        } else {
            sibling.branches.push(branch);
        }
    }

    trace!(
        "Split node at level {} into {} + {} branches",
        node.level,
        node.count(),
        sibling.count()
    );
    sibling
}
