//! Geometry type definitions.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in 3-dimensional space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    /// Create a new point from its three coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// An axis-aligned bounding volume.
///
/// Construction normalizes the two corners per axis, so any pair of opposite
/// corners produces the same volume regardless of argument ordering.
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: Point,
    max: Point,
}

impl Bounds {
    /// Create bounds from six scalars (two opposite corners, any ordering).
    pub fn new(ax: f64, ay: f64, az: f64, bx: f64, by: f64, bz: f64) -> Self {
        Self {
            min: Point::new(ax.min(bx), ay.min(by), az.min(bz)),
            max: Point::new(ax.max(bx), ay.max(by), az.max(bz)),
        }
    }

    /// Minimum corner.
    pub fn min(&self) -> Point {
        self.min
    }

    /// Maximum corner.
    pub fn max(&self) -> Point {
        self.max
    }

    /// Center point of the volume.
    pub fn mid(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Whether the point lies within the volume (corner-inclusive).
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Subdivide into 4 equal children along X and Y, holding Z full height.
    ///
    /// Children are ordered row-major from the minimum corner:
    /// `(x-, y-), (x+, y-), (x-, y+), (x+, y+)`. The child index is the
    /// base-4 digit appended to the parent's linear node address, so this
    /// ordering defines the address space of the quartering hierarchy.
    pub fn quarter(&self) -> [Bounds; 4] {
        let m = self.mid();
        [
            Bounds::new(self.min.x, self.min.y, self.min.z, m.x, m.y, self.max.z),
            Bounds::new(m.x, self.min.y, self.min.z, self.max.x, m.y, self.max.z),
            Bounds::new(self.min.x, m.y, self.min.z, m.x, self.max.y, self.max.z),
            Bounds::new(m.x, m.y, self.min.z, self.max.x, self.max.y, self.max.z),
        ]
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}, {}, {}]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

// The wire form is the flat 6-element array `[minx, miny, minz, maxx, maxy, maxz]`.

impl Serialize for Bounds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(6))?;
        for v in [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ] {
            seq.serialize_element(&v)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BoundsVisitor;

        impl<'de> Visitor<'de> for BoundsVisitor {
            type Value = Bounds;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of 6 numbers")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bounds, A::Error> {
                let mut v = [0.0f64; 6];
                for (i, slot) in v.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Bounds::new(v[0], v[1], v[2], v[3], v[4], v[5]))
            }
        }

        deserializer.deserialize_seq(BoundsVisitor)
    }
}

/// Fixed-point coordinate transform exposed by some readers (LAS-style
/// headers): `world = raw * scale + offset` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleOffset {
    pub scale: [f64; 3],
    pub offset: [f64; 3],
}

impl ScaleOffset {
    pub fn new(scale: [f64; 3], offset: [f64; 3]) -> Self {
        Self { scale, offset }
    }
}
