//! Staggered horizontal grid context.
//!
//! The grid is an external collaborator of the island/streamfunction engine:
//! it supplies dimensions, the land/ocean topology (bottom-level index per
//! column, `0` = land), metric arrays and masks, and is read-only to the rest
//! of this crate. Arrays are `(nx+4) × (ny+4)` with a two-cell halo on every
//! side; the interior is `i ∈ [2, nx+1]`, `j ∈ [2, ny+1]`, matching the
//! Arakawa layout of structured ocean models.
//!
//! [`StaggeredGrid::uniform`] builds an all-ocean grid with unit metrics and
//! unit depth, which together with [`StaggeredGrid::set_land`] is how the
//! synthetic topologies in the tests are constructed. Real model grids come
//! from a grid-generation stage out of scope here and fill the same fields.

mod field;
mod halo;

pub use field::Field2;
pub use halo::{Exchange, SingleProcess};
pub(crate) use halo::wrap_cyclic_x;

use std::ops::Range;

/// Horizontal grid: extents, topology, metrics, masks.
///
/// Velocity-point inverse depths `hur`/`hvr` and the land/ocean masks are
/// derived from `kbot` by [`finalize_masks`](Self::finalize_masks); they are
/// zero on land, which is what makes the elliptic stencil mask-dependent.
#[derive(Clone, Debug)]
pub struct StaggeredGrid {
    /// Interior zonal extent (number of x cells without halo).
    pub nx: usize,
    /// Interior meridional extent.
    pub ny: usize,
    /// Zonal wraparound boundary condition.
    pub cyclic_x: bool,

    /// Bottom-level index per column; `0` means land.
    pub kbot: Field2<i32>,

    /// Zonal cell widths on tracer / velocity points, length `nx+4`.
    pub dxt: Vec<f64>,
    pub dxu: Vec<f64>,
    /// Meridional cell widths on tracer / velocity points, length `ny+4`.
    pub dyt: Vec<f64>,
    pub dyu: Vec<f64>,
    /// Coriolis-metric cosines on tracer / velocity rows, length `ny+4`.
    pub cost: Vec<f64>,
    pub cosu: Vec<f64>,

    /// Inverse total depth on u points (zero on land).
    pub hur: Field2<f64>,
    /// Inverse total depth on v points (zero on land).
    pub hvr: Field2<f64>,

    /// Surface-level land/ocean masks (1.0 ocean, 0.0 land).
    pub mask_t: Field2<f64>,
    pub mask_u: Field2<f64>,
    pub mask_v: Field2<f64>,
    /// Mask on streamfunction (corner) points.
    pub mask_z: Field2<f64>,
}

impl StaggeredGrid {
    /// All-ocean grid with unit metrics and unit depth.
    pub fn uniform(nx: usize, ny: usize, cyclic_x: bool) -> Self {
        let ni = nx + 4;
        let nj = ny + 4;
        let mut kbot = Field2::zeros(ni, nj);
        kbot.fill(1);
        let mut grid = Self {
            nx,
            ny,
            cyclic_x,
            kbot,
            dxt: vec![1.0; ni],
            dxu: vec![1.0; ni],
            dyt: vec![1.0; nj],
            dyu: vec![1.0; nj],
            cost: vec![1.0; nj],
            cosu: vec![1.0; nj],
            hur: Field2::zeros(ni, nj),
            hvr: Field2::zeros(ni, nj),
            mask_t: Field2::zeros(ni, nj),
            mask_u: Field2::zeros(ni, nj),
            mask_v: Field2::zeros(ni, nj),
            mask_z: Field2::zeros(ni, nj),
        };
        grid.finalize_masks();
        grid
    }

    /// Padded zonal extent.
    pub fn ni(&self) -> usize {
        self.nx + 4
    }

    /// Padded meridional extent.
    pub fn nj(&self) -> usize {
        self.ny + 4
    }

    /// Interior zonal index range.
    pub fn interior_i(&self) -> Range<usize> {
        2..self.nx + 2
    }

    /// Interior meridional index range.
    pub fn interior_j(&self) -> Range<usize> {
        2..self.ny + 2
    }

    /// Mark cell `(i, j)` as land. Call [`finalize_masks`](Self::finalize_masks)
    /// after the topology is complete.
    pub fn set_land(&mut self, i: usize, j: usize) {
        self.kbot[(i, j)] = 0;
    }

    /// Recompute masks and inverse depths from `kbot`.
    ///
    /// `mask_u`/`mask_v` vanish wherever either adjacent tracer cell is land,
    /// `mask_z` wherever any of the three tracer cells around the corner
    /// point is land. On the uniform unit-depth grid the inverse depths equal
    /// the velocity masks.
    pub fn finalize_masks(&mut self) {
        let ni = self.ni();
        let nj = self.nj();
        for i in 0..ni {
            for j in 0..nj {
                self.mask_t[(i, j)] = if self.kbot[(i, j)] > 0 { 1.0 } else { 0.0 };
            }
        }
        for i in 0..ni {
            for j in 0..nj {
                let t = self.mask_t[(i, j)];
                let te = if i + 1 < ni { self.mask_t[(i + 1, j)] } else { t };
                let tn = if j + 1 < nj { self.mask_t[(i, j + 1)] } else { t };
                self.mask_u[(i, j)] = t.min(te);
                self.mask_v[(i, j)] = t.min(tn);
                self.mask_z[(i, j)] = t.min(te).min(tn);
            }
        }
        for i in 0..ni {
            for j in 0..nj {
                self.hur[(i, j)] = self.mask_u[(i, j)];
                self.hvr[(i, j)] = self.mask_v[(i, j)];
            }
        }
    }

    /// Number of land cells in the interior.
    pub fn land_cell_count(&self) -> usize {
        let mut n = 0;
        for i in self.interior_i() {
            for j in self.interior_j() {
                if self.kbot[(i, j)] == 0 {
                    n += 1;
                }
            }
        }
        n
    }
}
