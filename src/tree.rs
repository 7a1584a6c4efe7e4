//! Recursive tree growth and the leaf slot pool.
//!
//! Branch geometry is a pure function of the parameters; only the leaf
//! colors are random, assigned once at generation time. The pool itself is
//! fixed for the tree's lifetime: leaves are never added or removed, they
//! only transition from unused to used.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::FRAC_PI_2;

use crate::note::{NoteName, PaletteColor};
use crate::params::TreeParams;
use crate::scene::Scene;

const BARK_RGB: [u8; 3] = [101, 72, 50];

/// One branch segment of the generated tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    pub start: Vec2,
    pub end: Vec2,
    /// Remaining depth at this segment; the trunk carries the full depth.
    pub depth: u32,
}

/// Pure output of the growth recursion: segments plus leaf slot positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Growth {
    pub branches: Vec<Branch>,
    pub leaf_slots: Vec<Vec2>,
}

/// Grow the branching structure from `origin`, trunk pointing straight up.
///
/// Deterministic: identical params and origin produce identical output.
pub fn grow(params: &TreeParams, origin: Vec2) -> Growth {
    let mut growth = Growth {
        branches: Vec::new(),
        leaf_slots: Vec::new(),
    };
    grow_branch(
        params,
        &mut growth,
        origin,
        -FRAC_PI_2,
        params.trunk_len_px,
        params.depth,
    );
    growth
}

fn grow_branch(
    params: &TreeParams,
    out: &mut Growth,
    start: Vec2,
    angle: f32,
    length: f32,
    depth: u32,
) {
    let end = start + Vec2::new(angle.cos(), angle.sin()) * length;
    out.branches.push(Branch { start, end, depth });

    if depth <= 1 {
        out.leaf_slots.push(end);
        return;
    }

    let children = if depth > params.triple_above_depth {
        3
    } else {
        2
    };
    let spread = params.fan_arc_rad;
    let step = spread / (children - 1) as f32;
    for i in 0..children {
        let child_angle = angle - spread / 2.0 + step * i as f32;
        grow_branch(
            params,
            out,
            end,
            child_angle,
            length * params.shrink,
            depth - 1,
        );
    }
}

/// A leaf slot: fixed position and color, consumable exactly once.
#[derive(Debug, Clone, Copy)]
struct Leaf {
    position: Vec2,
    size: f32,
    color: PaletteColor,
    used: bool,
}

/// The generated tree plus its leaf pool.
///
/// The raw collections stay private; callers get counting, consuming and
/// painting operations only.
pub struct Tree {
    branches: Vec<Branch>,
    leaves: Vec<Leaf>,
}

impl Tree {
    /// Grow the structure and assign each leaf slot a uniformly random
    /// palette color. Color balance is not guaranteed.
    pub fn generate(params: &TreeParams, origin: Vec2, rng: &mut impl Rng) -> Self {
        let growth = grow(params, origin);
        let leaves = growth
            .leaf_slots
            .into_iter()
            .map(|position| Leaf {
                position,
                size: params.leaf_size_px,
                color: NoteName::ALL[rng.gen_range(0..12)].palette(),
                used: false,
            })
            .collect();
        Self {
            branches: growth.branches,
            leaves,
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn used_count(&self) -> usize {
        self.leaves.iter().filter(|l| l.used).count()
    }

    /// Leaves still eligible to spawn, optionally restricted to one color.
    pub fn eligible_count(&self, color: Option<PaletteColor>) -> usize {
        self.leaves
            .iter()
            .filter(|l| !l.used && color.map_or(true, |c| l.color == c))
            .count()
    }

    /// Consume up to `count` eligible leaves, chosen uniformly at random
    /// without replacement. Returns the consumed positions and colors; the
    /// chosen leaves are marked used and never revert.
    pub fn take_leaves(
        &mut self,
        color: Option<PaletteColor>,
        count: usize,
        rng: &mut impl Rng,
    ) -> Vec<(Vec2, PaletteColor)> {
        let eligible: Vec<usize> = self
            .leaves
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.used && color.map_or(true, |c| l.color == c))
            .map(|(i, _)| i)
            .collect();

        let take = count.min(eligible.len());
        if take == 0 {
            return Vec::new();
        }

        let mut taken = Vec::with_capacity(take);
        for pick in rand::seq::index::sample(rng, eligible.len(), take) {
            let leaf = &mut self.leaves[eligible[pick]];
            leaf.used = true;
            taken.push((leaf.position, leaf.color));
        }
        taken
    }

    /// Paint branches and the remaining (unused) leaves.
    pub fn paint(&self, scene: &mut Scene) {
        for branch in &self.branches {
            scene.line(branch.start, branch.end, BARK_RGB);
        }
        for leaf in self.leaves.iter().filter(|l| !l.used) {
            let s = leaf.size;
            scene.push();
            scene.translate(leaf.position);
            scene.triangle(
                Vec2::new(0.0, -s),
                Vec2::new(-s * 0.6, s * 0.4),
                Vec2::new(s * 0.6, s * 0.4),
                leaf.color.rgb(),
            );
            scene.pop();
        }
    }
}
