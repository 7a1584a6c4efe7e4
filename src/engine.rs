//! Animation engine: owns the leaf pool and the live bird set.
//!
//! All mutation happens on the UI thread inside the frame tick. The engine
//! reports through `needs_frames` whether continuous redraws are still
//! worth requesting; an empty aviary lets the frame pump go idle until the
//! next successful spawn.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::FRAC_PI_2;

use crate::note::PaletteColor;
use crate::params::FlightParams;
use crate::scene::Scene;
use crate::tree::Tree;

/// A bird in flight. Created from exactly one leaf, destroyed off-canvas.
#[derive(Debug, Clone, Copy)]
struct Bird {
    position: Vec2,
    velocity: Vec2,
    size: f32,
    color: PaletteColor,
}

pub struct AnimationEngine {
    tree: Tree,
    birds: Vec<Bird>,
    params: FlightParams,
    /// Square canvas side length (pixels), for the cull bounds
    canvas_px: f32,
    rng: StdRng,
}

impl AnimationEngine {
    pub fn new(tree: Tree, params: FlightParams, canvas_px: f32) -> Self {
        Self::with_rng(tree, params, canvas_px, StdRng::from_entropy())
    }

    pub fn with_rng(tree: Tree, params: FlightParams, canvas_px: f32, rng: StdRng) -> Self {
        Self {
            tree,
            birds: Vec::new(),
            params,
            canvas_px,
            rng,
        }
    }

    /// Launch up to `count` birds from unused leaves of the given color
    /// (any color when `None`). Returns the number actually launched, which
    /// is `min(count, eligible)`.
    pub fn spawn(&mut self, color: Option<PaletteColor>, count: usize) -> usize {
        let taken = self.tree.take_leaves(color, count, &mut self.rng);
        let arc = self.params.launch_arc_rad;
        let (speed_lo, speed_hi) = self.params.speed_px_s;

        for (position, color) in &taken {
            let angle = -FRAC_PI_2 + self.rng.gen_range(-arc / 2.0..=arc / 2.0);
            let speed = self.rng.gen_range(speed_lo..=speed_hi);
            self.birds.push(Bird {
                position: *position,
                velocity: Vec2::new(angle.cos(), angle.sin()) * speed,
                size: self.params.bird_size_px,
                color: *color,
            });
        }
        taken.len()
    }

    /// Advance every bird and retire the ones past the cull margin.
    pub fn advance(&mut self, dt: f32) {
        for bird in &mut self.birds {
            bird.position += bird.velocity * dt;
        }

        let margin = self.params.cull_margin_px;
        let max = self.canvas_px + margin;
        self.birds.retain(|b| {
            b.position.x >= -margin
                && b.position.x <= max
                && b.position.y >= -margin
                && b.position.y <= max
        });
    }

    /// True while at least one bird is alive; the frame pump keys off this.
    pub fn needs_frames(&self) -> bool {
        !self.birds.is_empty()
    }

    pub fn bird_count(&self) -> usize {
        self.birds.len()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Paint the static tree, the unused leaves, and every live bird.
    pub fn paint(&self, scene: &mut Scene) {
        self.tree.paint(scene);

        for bird in &self.birds {
            let s = bird.size;
            scene.push();
            scene.translate(bird.position);
            scene.rotate(bird.velocity.y.atan2(bird.velocity.x));
            // Arrowhead pointing along the flight direction.
            scene.triangle(
                Vec2::new(s, 0.0),
                Vec2::new(-s * 0.6, s * 0.45),
                Vec2::new(-s * 0.6, -s * 0.45),
                bird.color.rgb(),
            );
            scene.pop();
        }
    }
}
