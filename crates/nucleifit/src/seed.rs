//! Segmentation-derived seeds: per-label initial ellipsoid estimates.

use crate::bbox::BoundingBox;

/// A cheap pre-fit ellipsoid estimate for one labeled region.
///
/// Produced by an upstream segmentation stage and consumed read-only; only
/// the extent (for overlap tests and crop sizing) and the center (for the
/// initial guess) matter here.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Seed {
    /// Stable identity of the region, unique within one run.
    pub tag: usize,
    /// Approximate center `[x, y, z]` in voxel coordinates.
    pub center: [f64; 3],
    /// Approximate semi-extent `[rx, ry, rz]` of the ellipsoid, in voxels.
    pub radii: [f64; 3],
}

impl Seed {
    pub fn new(tag: usize, center: [f64; 3], radii: [f64; 3]) -> Self {
        Self { tag, center, radii }
    }

    /// Axis-aligned bounding box of the ellipsoid extent.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::around(self.center, self.radii)
    }

    /// Whether the two ellipsoid extents intersect.
    ///
    /// Normalized center-distance test: exact for spheres, a close
    /// approximation for moderately anisotropic axis-aligned ellipsoids.
    pub fn overlaps(&self, other: &Seed) -> bool {
        let mut q = 0.0;
        for i in 0..3 {
            let span = self.radii[i] + other.radii[i];
            if span <= 0.0 {
                return false;
            }
            let d = (self.center[i] - other.center[i]) / span;
            q += d * d;
        }
        q <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_symmetric() {
        let a = Seed::new(0, [10.0, 10.0, 5.0], [4.0, 4.0, 2.0]);
        let b = Seed::new(1, [15.0, 10.0, 5.0], [4.0, 4.0, 2.0]);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn distant_seeds_do_not_overlap() {
        let a = Seed::new(0, [10.0, 10.0, 5.0], [4.0, 4.0, 2.0]);
        let b = Seed::new(1, [30.0, 10.0, 5.0], [4.0, 4.0, 2.0]);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn zero_extent_never_overlaps() {
        let a = Seed::new(0, [10.0, 10.0, 5.0], [0.0, 0.0, 0.0]);
        let b = Seed::new(1, [10.0, 10.0, 5.0], [0.0, 0.0, 0.0]);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn bounds_cover_extent() {
        let s = Seed::new(3, [10.5, 8.0, 4.0], [2.5, 3.0, 1.0]);
        let b = s.bounds();
        assert_eq!(b.min, [8, 5, 3]);
        assert_eq!(b.max, [14, 12, 6]);
    }
}
