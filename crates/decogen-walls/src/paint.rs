use serde::{Deserialize, Serialize};

/// Colors closer than this per channel snap straight to the target instead
/// of lerping, so repeated strokes converge.
pub const COLOR_APPROXIMATION: f32 = 0.1;

/// RGBA vertex color. The alpha channel is repurposed by the shader and is
/// preserved by brush strokes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn approx_eq(&self, other: &Color, tol: f32) -> bool {
        (self.r - other.r).abs() <= tol
            && (self.g - other.g).abs() <= tol
            && (self.b - other.b).abs() <= tol
            && (self.a - other.a).abs() <= tol
    }

    /// Unclamped per-channel lerp; weights above 1 overshoot on purpose.
    pub fn lerp_unclamped(&self, target: &Color, t: f32) -> Color {
        Color::new(
            self.r + (target.r - self.r) * t,
            self.g + (target.g - self.g) * t,
            self.b + (target.b - self.b) * t,
            self.a + (target.a - self.a) * t,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintTool {
    /// Gradual recolor, preserving each vertex's alpha channel.
    Brush,
    /// Plaster tint applied at full lerp weight.
    Spatula,
    /// Bare-wall tint applied instantly.
    Hammer,
}

/// The per-vertex color buffer of one wall mesh. Grows on demand up to the
/// source vertex count; the whole buffer is the save payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaintBuffer {
    colors: Vec<Color>,
}

impl PaintBuffer {
    pub fn new(vertex_count: usize, fill: Color) -> Self {
        Self {
            colors: vec![fill; vertex_count],
        }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Color {
        self.colors.get(index).copied().unwrap_or_default()
    }

    pub fn ensure_vertex_count(&mut self, vertex_count: usize, fill: Color) {
        if self.colors.len() < vertex_count {
            self.colors.resize(vertex_count, fill);
        }
    }

    /// Apply one stroke over the vertices a neighbor query produced. Brush
    /// blends toward (color.rgb, current alpha) by lerp_weight times the
    /// falloff alpha, snapping when already close; Spatula does the same at
    /// full weight toward its tint; Hammer overwrites outright.
    pub fn apply<I>(&mut self, tool: PaintTool, color: Color, lerp_weight: f32, vertices: I)
    where
        I: IntoIterator<Item = (usize, f32)>,
    {
        for (index, alpha) in vertices {
            if index >= self.colors.len() {
                continue;
            }
            let current = self.colors[index];
            let target = match tool {
                PaintTool::Brush => Color::new(color.r, color.g, color.b, current.a),
                PaintTool::Spatula | PaintTool::Hammer => color,
            };
            self.colors[index] = match tool {
                PaintTool::Hammer => target,
                _ if current.approx_eq(&target, COLOR_APPROXIMATION) => target,
                PaintTool::Brush => current.lerp_unclamped(&target, lerp_weight * alpha),
                PaintTool::Spatula => current.lerp_unclamped(&target, alpha),
            };
        }
    }
}
