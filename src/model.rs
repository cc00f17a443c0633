//! Data models for layered block packing.
//!
//! This module defines the fundamental item type:
//! - `Block`: a cuboid with fixed extents and at most one assigned position
//! - `Placement`: whether a block has been positioned inside a layer
//!
//! Layers and the container live in `layer` and `optimizer`.

use thiserror::Error;

use crate::types::{Dimensional, Point2, Rect, is_valid_extent};

/// Validation error for block and container data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
}

/// Helper function to validate a single dimension.
pub(crate) fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if !is_valid_extent(value) {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates width, height and depth together.
pub(crate) fn validate_extents(
    width: f64,
    height: f64,
    depth: f64,
    prefix: &str,
) -> Result<(), ValidationError> {
    validate_dimension(width, &format!("{prefix} width"))?;
    validate_dimension(height, &format!("{prefix} height"))?;
    validate_dimension(depth, &format!("{prefix} depth"))?;
    Ok(())
}

/// Placement state of a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    Unplaced,
    PlacedAt(Point2),
}

/// A rectangular cuboid to be packed.
///
/// Width and height span the footprint plane of a layer, depth runs along
/// the stacking axis. The extents never change; a rotated orientation is a
/// new value produced by [`Block::rotated`].
///
/// # Fields
/// * `id` - Caller-supplied identification number
/// * `width`, `height`, `depth` - Extents in units, always positive
/// * `placement` - Assigned once by the layer that accepts the block
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    id: usize,
    width: f64,
    height: f64,
    depth: f64,
    rotated: bool,
    placement: Placement,
}

impl Block {
    /// Creates a new unplaced block with validation.
    ///
    /// # Examples
    /// ```
    /// use layer_pack::model::Block;
    ///
    /// assert!(Block::new(1, 180.0, 77.0, 12.0).is_ok());
    /// assert!(Block::new(2, 0.0, 77.0, 12.0).is_err());
    /// ```
    pub fn new(id: usize, width: f64, height: f64, depth: f64) -> Result<Self, ValidationError> {
        validate_extents(width, height, depth, "Block")?;
        Ok(Self {
            id,
            width,
            height,
            depth,
            rotated: false,
            placement: Placement::Unplaced,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Whether width and height are swapped relative to the block built by
    /// [`Block::new`]. Each call to [`Block::rotated`] toggles it.
    pub fn is_rotated(&self) -> bool {
        self.rotated
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Position of the minimum footprint corner, `None` until placed.
    pub fn position(&self) -> Option<Point2> {
        match self.placement {
            Placement::Unplaced => None,
            Placement::PlacedAt(point) => Some(point),
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self.placement, Placement::PlacedAt(_))
    }

    /// Returns the 90° rotated orientation as a new unplaced block.
    ///
    /// Depth is unchanged.
    pub fn rotated(&self) -> Self {
        Self {
            id: self.id,
            width: self.height,
            height: self.width,
            depth: self.depth,
            rotated: !self.rotated,
            placement: Placement::Unplaced,
        }
    }

    /// A square footprint looks the same in both orientations.
    pub fn is_square(&self) -> bool {
        (self.width - self.height).abs() <= crate::types::EPSILON_GENERAL
    }

    /// Footprint rectangle `(x, y, width, height)`, `None` if unplaced.
    pub fn footprint(&self) -> Option<Rect> {
        self.position()
            .map(|origin| Rect::from_origin(origin, self.width, self.height))
    }

    /// Checks whether `rect` fully contains this block's footprint.
    ///
    /// An unplaced block occupies nothing.
    pub fn occupies(&self, rect: &Rect) -> bool {
        match self.footprint() {
            Some(frame) => rect.contains(&frame),
            None => false,
        }
    }

    /// Assigns the final position. Only layers call this, and only on a
    /// fresh unplaced candidate.
    pub(crate) fn placed_at(&self, origin: Point2) -> Self {
        debug_assert!(!self.is_placed(), "block {} is already placed", self.id);
        Self {
            placement: Placement::PlacedAt(origin),
            ..self.clone()
        }
    }

    /// The same block in its current orientation, without a position.
    pub(crate) fn unplaced(&self) -> Self {
        Self {
            placement: Placement::Unplaced,
            ..self.clone()
        }
    }
}

impl Dimensional for Block {
    fn dimensions(&self) -> (f64, f64, f64) {
        (self.width, self.height, self.depth)
    }
}
