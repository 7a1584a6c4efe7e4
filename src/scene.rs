//! Per-frame 2D primitive accumulation with a transform stack.
//!
//! The animation paints into a `Scene` each frame; the render system uploads
//! the resulting vertex lists. Coordinates are canvas pixels, y-down.

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2};

/// Vertex data shared by the line and triangle pipelines.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Primitive lists plus a translate/rotate transform stack.
pub struct Scene {
    line_vertices: Vec<Vertex>,
    triangle_vertices: Vec<Vertex>,
    stack: Vec<Affine2>,
    current: Affine2,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            line_vertices: Vec::new(),
            triangle_vertices: Vec::new(),
            stack: Vec::new(),
            current: Affine2::IDENTITY,
        }
    }

    /// Drop all primitives and reset the transform stack for a new frame.
    pub fn clear(&mut self) {
        self.line_vertices.clear();
        self.triangle_vertices.clear();
        self.stack.clear();
        self.current = Affine2::IDENTITY;
    }

    pub fn push(&mut self) {
        self.stack.push(self.current);
    }

    pub fn pop(&mut self) {
        self.current = self.stack.pop().unwrap_or(Affine2::IDENTITY);
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.current = self.current * Affine2::from_translation(offset);
    }

    pub fn rotate(&mut self, angle_rad: f32) {
        self.current = self.current * Affine2::from_angle(angle_rad);
    }

    /// Line segment between two points in the current transform.
    pub fn line(&mut self, a: Vec2, b: Vec2, rgb: [u8; 3]) {
        let color = linear_rgba(rgb);
        self.line_vertices.push(self.vertex(a, color));
        self.line_vertices.push(self.vertex(b, color));
    }

    /// Filled triangle in the current transform.
    pub fn triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, rgb: [u8; 3]) {
        let color = linear_rgba(rgb);
        self.triangle_vertices.push(self.vertex(a, color));
        self.triangle_vertices.push(self.vertex(b, color));
        self.triangle_vertices.push(self.vertex(c, color));
    }

    pub fn line_vertices(&self) -> &[Vertex] {
        &self.line_vertices
    }

    pub fn triangle_vertices(&self) -> &[Vertex] {
        &self.triangle_vertices
    }

    fn vertex(&self, p: Vec2, color: [f32; 4]) -> Vertex {
        let p = self.current.transform_point2(p);
        Vertex {
            position: p.to_array(),
            color,
        }
    }
}

/// 8-bit sRGB channels to linear RGBA for an sRGB surface.
fn linear_rgba(rgb: [u8; 3]) -> [f32; 4] {
    let to_linear = |c: u8| {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [to_linear(rgb[0]), to_linear(rgb[1]), to_linear(rgb[2]), 1.0]
}
