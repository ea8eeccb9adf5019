use std::fmt;

/// Index of a vertex record in [`Topology::vertices`](crate::core::topology::Topology).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VertexIdx(usize);
/// Index of an edge record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EdgeIdx(usize);
/// Index of a loop record. Loops are numbered face by face, so the loops of one
/// face always occupy a contiguous range.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LoopIdx(usize);
/// Index of a face record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FaceIdx(usize);

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];

macro_rules! idx_impl {
    ($($t:ty),*) => {
        $(
            impl From<usize> for $t {
                fn from(idx: usize) -> Self {
                    Self(idx)
                }
            }

            impl From<$t> for usize {
                fn from(idx: $t) -> Self {
                    idx.0
                }
            }

            impl $t {
                /// Returns the index as a `usize`.
                pub fn get(self) -> usize {
                    self.0
                }
            }

            impl fmt::Debug for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }

            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }
        )*
    };
}

idx_impl! {
    VertexIdx,
    EdgeIdx,
    LoopIdx,
    FaceIdx
}

/// Newell's method. Works for non-planar and concave polygons; returns `None`
/// when the polygon has no area.
pub fn polygon_normal(points: impl Iterator<Item = Vec3> + Clone) -> Option<Vec3> {
    let mut n = [0.0f32; 3];
    let next = points.clone().cycle().skip(1);
    for (p, q) in points.zip(next) {
        n[0] += (p[1] - q[1]) * (p[2] + q[2]);
        n[1] += (p[2] - q[2]) * (p[0] + q[0]);
        n[2] += (p[0] - q[0]) * (p[1] + q[1]);
    }
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > f32::EPSILON && len.is_finite() {
        Some([n[0] / len, n[1] / len, n[2] / len])
    } else {
        None
    }
}

/// The normal used when a face has no well defined one.
pub const UP: Vec3 = [0.0, 0.0, 1.0];
