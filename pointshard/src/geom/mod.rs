//! Geometry primitives for the quartering hierarchy.
//!
//! Provides the axis-aligned [`Bounds`] volume with exact quadrant
//! subdivision, the [`Point`] it contains, and the [`ScaleOffset`]
//! fixed-point transform some point-cloud readers expose.

mod types;

pub use types::{Bounds, Point, ScaleOffset};
