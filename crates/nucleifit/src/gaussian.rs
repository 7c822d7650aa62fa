//! Three-dimensional anisotropic Gaussian intensity bumps.
//!
//! A [`Gaussian3`] models one nucleus as `a·exp(−½ (x−μ)ᵀ Σ⁻¹ (x−μ))` with a
//! full symmetric covariance encoded as six scalars. Rendering is restricted
//! to a truncation window derived from the covariance diagonal and
//! accumulates additively, so a superposition of blobs can be composed into
//! one volume by drawing them in turn onto a zeroed buffer.

use nalgebra::{Matrix3, Vector3};
use ndarray::{s, Array3};

use crate::error::FitError;

/// Number of scalar parameters per blob in a flattened parameter vector.
pub const PARAMS_PER_BLOB: usize = 10;

/// One 3D anisotropic Gaussian intensity bump.
///
/// Immutable value type: every transform returns a new instance. Equality
/// covers the full 10-tuple of parameters and serves as a render-memo key,
/// not as a domain identity. Positive-definiteness of the covariance is the
/// caller's concern; the optimizer may transiently step through non-PD
/// matrices, which rendering reports as invalid instead of panicking.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gaussian3 {
    /// Peak intensity at the mean position.
    pub a: f64,
    /// Mean x, continuous voxel coordinates.
    pub mu_x: f64,
    /// Mean y.
    pub mu_y: f64,
    /// Mean z.
    pub mu_z: f64,
    /// Covariance entry (x, x).
    pub cov_xx: f64,
    /// Covariance entry (y, y).
    pub cov_yy: f64,
    /// Covariance entry (z, z).
    pub cov_zz: f64,
    /// Covariance entry (x, y).
    pub cov_xy: f64,
    /// Covariance entry (x, z).
    pub cov_xz: f64,
    /// Covariance entry (y, z).
    pub cov_yz: f64,
}

/// Exact-bit-pattern memo key for rendered blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey([u64; PARAMS_PER_BLOB]);

/// A blob rasterized into its truncation window, with placement offset.
///
/// Returned by [`Gaussian3::draw`] so a caller can redraw the same blob
/// without recomputing, as long as the parameters are unchanged.
#[derive(Debug, Clone)]
pub struct RenderedBlob {
    /// Lower corner `[x, y, z]` of the window inside the target volume.
    pub min: [usize; 3],
    /// Rendered intensities, `(depth, rows, columns)` of the window.
    pub data: Array3<f64>,
}

impl RenderedBlob {
    /// Additively accumulate the window into `image`.
    pub fn add_into(&self, image: &mut Array3<f64>) {
        let (dz, dy, dx) = self.data.dim();
        let [x0, y0, z0] = self.min;
        let mut view = image.slice_mut(s![z0..z0 + dz, y0..y0 + dy, x0..x0 + dx]);
        view += &self.data;
    }
}

/// Truncation window in voxel indices, half-open per axis.
struct Window {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
    z0: usize,
    z1: usize,
}

#[allow(clippy::too_many_arguments)]
impl Gaussian3 {
    pub fn new(
        a: f64,
        mu_x: f64,
        mu_y: f64,
        mu_z: f64,
        cov_xx: f64,
        cov_yy: f64,
        cov_zz: f64,
        cov_xy: f64,
        cov_xz: f64,
        cov_yz: f64,
    ) -> Self {
        Self {
            a,
            mu_x,
            mu_y,
            mu_z,
            cov_xx,
            cov_yy,
            cov_zz,
            cov_xy,
            cov_xz,
            cov_yz,
        }
    }

    /// Canonical parameter flattening for optimizer interop.
    pub fn to_params(&self) -> [f64; PARAMS_PER_BLOB] {
        [
            self.a, self.mu_x, self.mu_y, self.mu_z, self.cov_xx, self.cov_yy, self.cov_zz,
            self.cov_xy, self.cov_xz, self.cov_yz,
        ]
    }

    /// Split a flattened multi-blob vector into blobs.
    ///
    /// The length must be an exact multiple of [`PARAMS_PER_BLOB`]; anything
    /// else marks a defect upstream of the fitter.
    pub fn split_params(params: &[f64]) -> Result<Vec<Gaussian3>, FitError> {
        if params.len() % PARAMS_PER_BLOB != 0 {
            return Err(FitError::MalformedParams { len: params.len() });
        }
        Ok(params
            .chunks_exact(PARAMS_PER_BLOB)
            .map(Self::from_chunk)
            .collect())
    }

    pub(crate) fn from_chunk(p: &[f64]) -> Self {
        debug_assert_eq!(p.len(), PARAMS_PER_BLOB);
        Self::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], p[8], p[9])
    }

    /// Memo key over the exact bit patterns of all 10 parameters.
    pub fn key(&self) -> RenderKey {
        let p = self.to_params();
        let mut bits = [0u64; PARAMS_PER_BLOB];
        for (b, v) in bits.iter_mut().zip(p.iter()) {
            *b = v.to_bits();
        }
        RenderKey(bits)
    }

    /// New blob with the mean shifted by `(dx, dy, dz)`.
    pub fn translated(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            mu_x: self.mu_x + dx,
            mu_y: self.mu_y + dy,
            mu_z: self.mu_z + dz,
            ..*self
        }
    }

    /// New blob scaled by the linear factor `s` about the origin: the mean
    /// scales by `s`, every covariance entry by `s²`.
    pub fn scaled(&self, s: f64) -> Self {
        let s2 = s * s;
        Self {
            a: self.a,
            mu_x: self.mu_x * s,
            mu_y: self.mu_y * s,
            mu_z: self.mu_z * s,
            cov_xx: self.cov_xx * s2,
            cov_yy: self.cov_yy * s2,
            cov_zz: self.cov_zz * s2,
            cov_xy: self.cov_xy * s2,
            cov_xz: self.cov_xz * s2,
            cov_yz: self.cov_yz * s2,
        }
    }

    /// Tolerance comparison, parameter-group-wise.
    pub fn almost_equal(&self, other: &Self, a_delta: f64, mu_delta: f64, cov_delta: f64) -> bool {
        (self.a - other.a).abs() < a_delta
            && (self.mu_x - other.mu_x).abs() < mu_delta
            && (self.mu_y - other.mu_y).abs() < mu_delta
            && (self.mu_z - other.mu_z).abs() < mu_delta
            && (self.cov_xx - other.cov_xx).abs() < cov_delta
            && (self.cov_yy - other.cov_yy).abs() < cov_delta
            && (self.cov_zz - other.cov_zz).abs() < cov_delta
            && (self.cov_xy - other.cov_xy).abs() < cov_delta
            && (self.cov_xz - other.cov_xz).abs() < cov_delta
            && (self.cov_yz - other.cov_yz).abs() < cov_delta
    }

    fn covariance(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.cov_xx,
            self.cov_xy,
            self.cov_xz,
            self.cov_xy,
            self.cov_yy,
            self.cov_yz,
            self.cov_xz,
            self.cov_yz,
            self.cov_zz,
        )
    }

    fn precision(&self) -> Option<Matrix3<f64>> {
        self.covariance().try_inverse()
    }

    /// Truncation window clipped to a volume of shape `(depth, rows, cols)`,
    /// or `None` for blobs that cannot be rendered: negative diagonal
    /// covariance, or a mean outside the volume.
    fn window(&self, shape: (usize, usize, usize)) -> Option<Window> {
        let (dz, dy, dx) = shape;
        if self.cov_xx < 0.0 || self.cov_yy < 0.0 || self.cov_zz < 0.0 {
            return None;
        }
        if self.mu_x < 0.0
            || self.mu_x > dx as f64
            || self.mu_y < 0.0
            || self.mu_y > dy as f64
            || self.mu_z < 0.0
            || self.mu_z > dz as f64
        {
            return None;
        }
        let lo = |mu: f64, cov: f64| (mu - 3.0 * cov).max(0.0) as usize;
        let hi = |mu: f64, cov: f64, dim: usize| ((mu + 3.0 * cov + 1.0) as usize).min(dim);
        Some(Window {
            x0: lo(self.mu_x, self.cov_xx),
            x1: hi(self.mu_x, self.cov_xx, dx),
            y0: lo(self.mu_y, self.cov_yy),
            y1: hi(self.mu_y, self.cov_yy, dy),
            z0: lo(self.mu_z, self.cov_zz),
            z1: hi(self.mu_z, self.cov_zz, dz),
        })
    }

    /// Rasterize the blob into its truncation window for a volume of the
    /// given shape. `None` for invalid blobs (see [`Self::window`]) or a
    /// non-invertible covariance.
    pub fn render(&self, shape: (usize, usize, usize)) -> Option<RenderedBlob> {
        let w = self.window(shape)?;
        let p = self.precision()?;
        let mut data = Array3::zeros((
            w.z1.saturating_sub(w.z0),
            w.y1.saturating_sub(w.y0),
            w.x1.saturating_sub(w.x0),
        ));
        for zi in w.z0..w.z1 {
            for yi in w.y0..w.y1 {
                for xi in w.x0..w.x1 {
                    let d = Vector3::new(
                        xi as f64 - self.mu_x,
                        yi as f64 - self.mu_y,
                        zi as f64 - self.mu_z,
                    );
                    let q = d.dot(&(p * d));
                    data[[zi - w.z0, yi - w.y0, xi - w.x0]] = self.a * (-0.5 * q).exp();
                }
            }
        }
        Some(RenderedBlob {
            min: [w.x0, w.y0, w.z0],
            data,
        })
    }

    /// Additively draw the blob into `image`.
    ///
    /// Pass a previously returned [`RenderedBlob`] to skip recomputation;
    /// the cache is only valid for identical parameters and an identical
    /// image shape. Returns the render for reuse, or `None` when the blob
    /// is invalid and nothing was drawn.
    pub fn draw(
        &self,
        image: &mut Array3<f64>,
        cached: Option<RenderedBlob>,
    ) -> Option<RenderedBlob> {
        let rendered = match cached {
            Some(r) => r,
            None => self.render(image.dim())?,
        };
        rendered.add_into(image);
        Some(rendered)
    }

    /// Additively draw `∂G/∂param` into `image` over the truncation window.
    ///
    /// Parameter indices follow [`Self::to_params`]: `0` is the amplitude,
    /// `1..=3` the mean, `4..=6` the covariance diagonal, `7..=9` the
    /// off-diagonal entries. Invalid blobs draw nothing.
    ///
    /// With the precision matrix `P = Σ⁻¹` and `d = x − μ`:
    /// `∂G/∂a = exp(−½q)`, `∂G/∂μᵢ = G·(Pd)ᵢ`, `∂G/∂Σᵢᵢ = ½·G·(Pd)ᵢ²`,
    /// `∂G/∂Σᵢⱼ = G·(Pd)ᵢ(Pd)ⱼ` for `i ≠ j`.
    pub fn draw_gradient(&self, image: &mut Array3<f64>, param: usize) {
        debug_assert!(param < PARAMS_PER_BLOB);
        let Some(w) = self.window(image.dim()) else {
            return;
        };
        let Some(p) = self.precision() else {
            return;
        };
        for zi in w.z0..w.z1 {
            for yi in w.y0..w.y1 {
                for xi in w.x0..w.x1 {
                    let d = Vector3::new(
                        xi as f64 - self.mu_x,
                        yi as f64 - self.mu_y,
                        zi as f64 - self.mu_z,
                    );
                    let pd = p * d;
                    let e = (-0.5 * d.dot(&pd)).exp();
                    let g = self.a * e;
                    let value = match param {
                        0 => e,
                        1..=3 => g * pd[param - 1],
                        4..=6 => 0.5 * g * pd[param - 4] * pd[param - 4],
                        7 => g * pd[0] * pd[1],
                        8 => g * pd[0] * pd[2],
                        _ => g * pd[1] * pd[2],
                    };
                    image[[zi, yi, xi]] += value;
                }
            }
        }
    }
}
