//! Integer axis-aligned 3D boxes used for crop bounds.

/// Half-open axis-aligned box in voxel coordinates: `min` inclusive,
/// `max` exclusive, both stored as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    /// Inclusive lower corner `[x, y, z]`.
    pub min: [i64; 3],
    /// Exclusive upper corner `[x, y, z]`.
    pub max: [i64; 3],
}

impl BoundingBox {
    pub fn new(min: [i64; 3], max: [i64; 3]) -> Self {
        Self { min, max }
    }

    /// Smallest integer box covering `center ± radii`.
    pub fn around(center: [f64; 3], radii: [f64; 3]) -> Self {
        let mut min = [0i64; 3];
        let mut max = [0i64; 3];
        for i in 0..3 {
            min[i] = (center[i] - radii[i]).floor() as i64;
            max[i] = (center[i] + radii[i]).ceil() as i64 + 1;
        }
        Self { min, max }
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        let mut min = [0i64; 3];
        let mut max = [0i64; 3];
        for i in 0..3 {
            min[i] = self.min[i].min(other.min[i]);
            max[i] = self.max[i].max(other.max[i]);
        }
        Self { min, max }
    }

    /// Box grown by the given padding on every side, per axis.
    pub fn expanded(&self, dx: i64, dy: i64, dz: i64) -> Self {
        let pad = [dx, dy, dz];
        let mut min = self.min;
        let mut max = self.max;
        for i in 0..3 {
            min[i] -= pad[i];
            max[i] += pad[i];
        }
        Self { min, max }
    }

    /// Intersection with a volume of shape `(depth, rows, columns)`.
    ///
    /// Returns `None` when the clipped box is empty, e.g. for a box lying
    /// entirely outside the volume.
    pub fn clipped(&self, shape: (usize, usize, usize)) -> Option<Self> {
        let dims = [shape.2 as i64, shape.1 as i64, shape.0 as i64];
        let mut min = [0i64; 3];
        let mut max = [0i64; 3];
        for i in 0..3 {
            min[i] = self.min[i].max(0);
            max[i] = self.max[i].min(dims[i]);
            if max[i] <= min[i] {
                return None;
            }
        }
        Some(Self { min, max })
    }

    /// Box size `[x, y, z]`; zero for inverted axes.
    pub fn size(&self) -> [usize; 3] {
        let mut out = [0usize; 3];
        for i in 0..3 {
            out[i] = (self.max[i] - self.min[i]).max(0) as usize;
        }
        out
    }

    /// Lower corner as continuous coordinates, for blob translation.
    pub fn origin(&self) -> [f64; 3] {
        [self.min[0] as f64, self.min[1] as f64, self.min[2] as f64]
    }
}
