//! Paintable wall surfaces: classifies a mesh's vertices into coplanar wall
//! groups, arranges each group into a dense row/column grid, and answers
//! neighbor queries for brush-style vertex painting.

pub mod grid;
pub mod paint;
pub mod plane_split;
pub mod query;

pub use grid::{build_grids, WallGrid, WallGridConfig};
pub use paint::{Color, PaintBuffer, PaintTool};
pub use plane_split::{group_by_plane, world_vertices, GridVertex, PlaneGroup, WallOrientation};
pub use query::{neighbors, resolve_cell, BrushQuery, BrushShape, Neighbors};
