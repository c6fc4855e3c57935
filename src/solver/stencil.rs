//! The five-point elliptic operator on streamfunction points.
//!
//! The streamfunction lives on the corner (Z) points of the staggered grid,
//! so the zonal couplings carry the v-point inverse depths and the
//! meridional couplings the u-point ones; both vanish on land, which is how
//! the topology enters the operator. Rows whose couplings all vanish (deep
//! land) are replaced by identity rows so the system stays nonsingular, and
//! rows on the prescribed island boundaries are replaced by identity rows
//! outright.
//!
//! The stencil is the one shared description of the operator: the iterative
//! backend applies it matrix-free against a halo-exchanged field, the direct
//! backend flattens it into a dense matrix, and both split the right-hand
//! side through [`PoissonStencil::build_rhs`].

use crate::grid::{Field2, StaggeredGrid};

/// Assembled five-point stencil with per-row Dirichlet flags.
pub struct PoissonStencil {
    pub main: Field2<f64>,
    pub east: Field2<f64>,
    pub west: Field2<f64>,
    pub north: Field2<f64>,
    pub south: Field2<f64>,
    pub dirichlet: Field2<bool>,
}

impl PoissonStencil {
    /// Assemble the operator for the given grid and Dirichlet rows.
    pub fn assemble(grid: &StaggeredGrid, dirichlet: &Field2<bool>) -> Self {
        let ni = grid.ni();
        let nj = grid.nj();
        let mut stencil = Self {
            main: Field2::zeros(ni, nj),
            east: Field2::zeros(ni, nj),
            west: Field2::zeros(ni, nj),
            north: Field2::zeros(ni, nj),
            south: Field2::zeros(ni, nj),
            dirichlet: dirichlet.clone(),
        };

        for i in grid.interior_i() {
            for j in grid.interior_j() {
                let east = grid.hvr[(i + 1, j)]
                    / (grid.dxu[i] * grid.dxt[i + 1])
                    / (grid.cosu[j] * grid.cosu[j]);
                let west = grid.hvr[(i, j)]
                    / (grid.dxu[i] * grid.dxt[i])
                    / (grid.cosu[j] * grid.cosu[j]);
                let north = grid.hur[(i, j + 1)] * grid.cost[j + 1]
                    / (grid.dyu[j] * grid.dyt[j + 1] * grid.cosu[j]);
                let south = grid.hur[(i, j)] * grid.cost[j]
                    / (grid.dyu[j] * grid.dyt[j] * grid.cosu[j]);
                stencil.east[(i, j)] = east;
                stencil.west[(i, j)] = west;
                stencil.north[(i, j)] = north;
                stencil.south[(i, j)] = south;
                stencil.main[(i, j)] = -(east + west + north + south);
            }
        }

        for i in grid.interior_i() {
            for j in grid.interior_j() {
                // boundary rows and fully decoupled land rows become identity
                if dirichlet[(i, j)] || stencil.main[(i, j)] == 0.0 {
                    stencil.main[(i, j)] = 1.0;
                    stencil.east[(i, j)] = 0.0;
                    stencil.west[(i, j)] = 0.0;
                    stencil.north[(i, j)] = 0.0;
                    stencil.south[(i, j)] = 0.0;
                }
            }
        }
        stencil
    }

    /// Matrix-free application `y = A x` over the interior.
    ///
    /// `x` must have its halo refreshed first; on a cyclic grid the wrap
    /// columns stand in for the seam neighbors, and on a bounded grid the
    /// zero halo removes the outward couplings.
    pub fn apply(&self, grid: &StaggeredGrid, x: &Field2<f64>, y: &mut Field2<f64>) {
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                y[(i, j)] = self.main[(i, j)] * x[(i, j)]
                    + self.east[(i, j)] * x[(i + 1, j)]
                    + self.west[(i, j)] * x[(i - 1, j)]
                    + self.north[(i, j)] * x[(i, j + 1)]
                    + self.south[(i, j)] * x[(i, j - 1)];
            }
        }
    }

    /// Split right-hand side: boundary values on Dirichlet rows, forcing on
    /// the rest.
    pub fn build_rhs(
        &self,
        grid: &StaggeredGrid,
        forcing: &Field2<f64>,
        boundary_val: &Field2<f64>,
        rhs: &mut Field2<f64>,
    ) {
        rhs.fill(0.0);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                rhs[(i, j)] = if self.dirichlet[(i, j)] {
                    boundary_val[(i, j)]
                } else {
                    forcing[(i, j)]
                };
            }
        }
    }
}
