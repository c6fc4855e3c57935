//! Inter-island coupling through boundary line integrals.
//!
//! Each island response function `psin` induces depth-integrated transports;
//! integrating those around every island's traced boundary yields the dense
//! coupling matrix that the time-stepping code later inverts to enforce the
//! island circulation constraints. Entry `(m, n)` is the circulation of
//! island `n`'s response around island `m`'s boundary.

use faer::Mat;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::grid::{Field2, StaggeredGrid};
use crate::topology::IslandBoundaries;

/// Zonal and meridional transport contributions of one response function.
///
/// `fpx` lives on U points, `fpy` on V points; both are zero on land through
/// the masks and the inverse depths.
fn transports(grid: &StaggeredGrid, psin: &Field2<f64>) -> (Field2<f64>, Field2<f64>) {
    let ni = grid.ni();
    let nj = grid.nj();
    let mut fpx = Field2::zeros(ni, nj);
    let mut fpy = Field2::zeros(ni, nj);
    for i in 1..ni {
        for j in 1..nj {
            fpx[(i, j)] = -grid.mask_u[(i, j)] * (psin[(i, j)] - psin[(i, j - 1)])
                / grid.dyt[j]
                * grid.hur[(i, j)];
            fpy[(i, j)] = grid.mask_v[(i, j)] * (psin[(i, j)] - psin[(i - 1, j)])
                / (grid.cosu[j] * grid.dxt[i])
                * grid.hvr[(i, j)];
        }
    }
    (fpx, fpy)
}

/// Closed line integral of one response function around one island boundary.
fn line_integral(
    grid: &StaggeredGrid,
    boundaries: &IslandBoundaries,
    isle: usize,
    fpx: &Field2<f64>,
    fpy: &Field2<f64>,
) -> f64 {
    let nx = grid.nx;
    let ny = grid.ny;
    let mut total = 0.0;
    for i in 1..nx + 2 {
        for j in 1..ny + 2 {
            if boundaries.dir_east[isle][(i, j)] {
                total += fpy[(i, j)] * grid.dyu[j]
                    + fpx[(i, j + 1)] * grid.dxu[i] * grid.cost[j + 1];
            }
            if boundaries.dir_west[isle][(i, j)] {
                total += -fpy[(i + 1, j)] * grid.dyu[j]
                    - fpx[(i, j)] * grid.dxu[i] * grid.cost[j];
            }
            if boundaries.dir_north[isle][(i, j)] {
                total += fpy[(i, j)] * grid.dyu[j]
                    - fpx[(i, j)] * grid.dxu[i] * grid.cost[j];
            }
            if boundaries.dir_south[isle][(i, j)] {
                total += -fpy[(i + 1, j)] * grid.dyu[j]
                    + fpx[(i, j + 1)] * grid.dxu[i] * grid.cost[j + 1];
            }
        }
    }
    total
}

/// Assemble the dense island coupling matrix from the solved responses.
pub fn assemble_coupling_matrix(
    grid: &StaggeredGrid,
    boundaries: &IslandBoundaries,
    psin: &[Field2<f64>],
) -> Mat<f64> {
    let nisle = boundaries.nisle();
    let mut line_psin = Mat::<f64>::zeros(nisle, nisle);

    let columns = column_integrals(grid, boundaries, psin);
    for (n, column) in columns.into_iter().enumerate() {
        for (m, value) in column.into_iter().enumerate() {
            line_psin[(m, n)] = value;
        }
    }
    line_psin
}

/// One column per response function; columns are independent, so the pair
/// loop parallelizes over them.
#[cfg(feature = "parallel")]
fn column_integrals(
    grid: &StaggeredGrid,
    boundaries: &IslandBoundaries,
    psin: &[Field2<f64>],
) -> Vec<Vec<f64>> {
    psin.par_iter()
        .map(|response| {
            let (fpx, fpy) = transports(grid, response);
            (0..boundaries.nisle())
                .map(|m| line_integral(grid, boundaries, m, &fpx, &fpy))
                .collect()
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn column_integrals(
    grid: &StaggeredGrid,
    boundaries: &IslandBoundaries,
    psin: &[Field2<f64>],
) -> Vec<Vec<f64>> {
    psin.iter()
        .map(|response| {
            let (fpx, fpy) = transports(grid, response);
            (0..boundaries.nisle())
                .map(|m| line_integral(grid, boundaries, m, &fpx, &fpy))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{label_land_masses, trace_island_boundaries};

    fn island_grid() -> (StaggeredGrid, IslandBoundaries) {
        let mut grid = StaggeredGrid::uniform(10, 10, false);
        grid.set_land(5, 5);
        grid.set_land(6, 5);
        grid.set_land(5, 6);
        grid.set_land(6, 6);
        grid.finalize_masks();
        let (land_map, nisle) = label_land_masses(&grid);
        let boundaries = trace_island_boundaries(&grid, &land_map, nisle).unwrap();
        (grid, boundaries)
    }

    /// A constant response function induces no transport, hence a zero
    /// column.
    #[test]
    fn test_constant_response_has_zero_circulation() {
        let (grid, boundaries) = island_grid();
        let mut psin: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        psin.fill(1.0);
        let m = assemble_coupling_matrix(&grid, &boundaries, &[psin]);
        assert_eq!(m.nrows(), 1);
        assert!(m[(0, 0)].abs() < 1e-14);
    }

    /// The characteristic response of an island (one on its boundary,
    /// decaying outward) circulates around its own boundary with a nonzero
    /// diagonal entry.
    #[test]
    fn test_step_response_has_nonzero_diagonal() {
        let (grid, boundaries) = island_grid();
        let mut psin: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        for i in 0..grid.ni() {
            for j in 0..grid.nj() {
                if boundaries.boundary_mask[0][(i, j)] {
                    psin[(i, j)] = 1.0;
                }
            }
        }
        let m = assemble_coupling_matrix(&grid, &boundaries, &[psin]);
        assert!(m[(0, 0)].abs() > 1e-10, "diagonal = {}", m[(0, 0)]);
    }
}
