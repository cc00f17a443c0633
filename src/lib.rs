//! Layered packing of rectangular blocks into a fixed-size container.
//!
//! Blocks are grouped into depth layers stacked along the depth axis; each
//! layer packs its 2D footprint with a free-rectangle heuristic that may
//! rotate blocks by 90°.

pub mod api;
pub mod config;
pub mod geometry;
pub mod layer;
pub mod model;
pub mod optimizer;
pub mod types;
