//! Barotropic streamfunction initialization.
//!
//! Ties the stages together: label the land masses, trace each island's
//! boundary, solve one elliptic boundary-value problem per island for its
//! streamfunction response, and integrate the responses around every
//! boundary into the island coupling matrix. The resulting
//! [`StreamfunctionState`] carries everything the barotropic mode needs at
//! every later time step, including the constructed solver handle.

pub mod coupling;

pub use coupling::assemble_coupling_matrix;

use faer::Mat;
use log::{debug, info};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use thiserror::Error;

use crate::grid::{Exchange, Field2, StaggeredGrid};
use crate::solver::{create_backend, BackendKind, SolverBackend, SolverConfig, SolverError};
use crate::topology::{
    ascii_map, label_land_masses, trace_island_boundaries, IslandBoundaries, TracingError,
};

/// Errors surfaced by [`streamfunction_init`].
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Tracing(#[from] TracingError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Initialization settings.
#[derive(Clone, Debug)]
pub struct StreamfunctionConfig {
    /// Requested linear solver backend.
    pub solver: BackendKind,
    /// Relative residual tolerance for the island solves.
    pub tolerance: f64,
    /// Iteration budget for iterative backends.
    pub max_iterations: usize,
    /// Seed for the random initial guesses of the island solves.
    pub noise_seed: u64,
}

impl Default for StreamfunctionConfig {
    fn default() -> Self {
        Self {
            solver: BackendKind::Best,
            tolerance: 1e-12,
            max_iterations: 1000,
            noise_seed: 1234,
        }
    }
}

/// Everything the barotropic mode carries forward from initialization.
pub struct StreamfunctionState {
    /// Dense island labels over the grid, zero on ocean.
    pub land_map: Field2<i32>,
    /// Number of distinct land masses.
    pub nisle: usize,
    /// Traced boundary and directional masks, one set per island.
    pub boundaries: IslandBoundaries,
    /// Streamfunction response of each island.
    pub psin: Vec<Field2<f64>>,
    /// Per-island boundary streamfunction tendencies, three time levels.
    pub dpsin: Vec<[f64; 3]>,
    /// Island coupling matrix of boundary line integrals.
    pub line_psin: Mat<f64>,
    /// The solver handle, reused for the surface pressure solves later on.
    pub solver: Box<dyn SolverBackend>,
}

/// Label, trace, solve and couple; runs once after the grid is finalized.
pub fn streamfunction_init(
    grid: &StaggeredGrid,
    exchange: &dyn Exchange,
    config: &StreamfunctionConfig,
) -> Result<StreamfunctionState, InitError> {
    let (mut land_map, nisle) = label_land_masses(grid);
    info!("found {nisle} land masses");
    info!("{}", ascii_map(&land_map));
    exchange.exchange_i32(grid, &mut land_map);

    let boundaries = trace_island_boundaries(grid, &land_map, nisle)?;

    // union of all island boundaries: the Dirichlet rows of the operator
    let mut dirichlet: Field2<bool> = Field2::zeros(grid.ni(), grid.nj());
    for isle in 0..nisle {
        for i in 0..grid.ni() {
            for j in 0..grid.nj() {
                if boundaries.boundary_mask[isle][(i, j)] {
                    dirichlet[(i, j)] = true;
                }
            }
        }
    }

    let solver_config = SolverConfig {
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
    };
    let mut solver = create_backend(
        grid,
        &dirichlet,
        config.solver,
        &solver_config,
        exchange.num_partitions(),
    )?;
    info!("using {} linear solver", solver.name());

    let mut rng = SmallRng::seed_from_u64(config.noise_seed);
    let forcing: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
    let mut psin = Vec::with_capacity(nisle);
    for isle in 0..nisle {
        info!("solving for boundary contribution by island {isle}");

        let mut sol: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                sol[(i, j)] = rng.gen::<f64>() * grid.mask_z[(i, j)];
            }
        }
        let mut boundary_val: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        for i in 0..grid.ni() {
            for j in 0..grid.nj() {
                if boundaries.boundary_mask[isle][(i, j)] {
                    boundary_val[(i, j)] = 1.0;
                }
            }
        }

        let stats = solver.solve(grid, exchange, &forcing, &mut sol, &boundary_val)?;
        debug!(
            "island {isle} solve finished after {} iterations (residual {:.3e})",
            stats.iterations, stats.residual
        );
        exchange.exchange(grid, &mut sol);
        psin.push(sol);
    }

    let line_psin = assemble_coupling_matrix(grid, &boundaries, &psin);

    Ok(StreamfunctionState {
        land_map,
        nisle,
        boundaries,
        psin,
        dpsin: vec![[0.0; 3]; nisle],
        line_psin,
        solver,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SingleProcess;

    /// A single square island in a closed basin: one response that is one on
    /// the island boundary and a one-by-one coupling matrix.
    #[test]
    fn test_single_island_init() {
        let nx = 10;
        let ny = 10;
        let mut grid = StaggeredGrid::uniform(nx, ny, false);
        grid.set_land(6, 6);
        grid.set_land(7, 6);
        grid.set_land(6, 7);
        grid.set_land(7, 7);
        grid.finalize_masks();

        let config = StreamfunctionConfig::default();
        let state = streamfunction_init(&grid, &SingleProcess, &config).unwrap();
        assert_eq!(state.nisle, 1);
        assert_eq!(state.psin.len(), 1);
        assert_eq!(state.line_psin.nrows(), 1);
        assert_eq!(state.dpsin, vec![[0.0; 3]]);

        for i in 0..grid.ni() {
            for j in 0..grid.nj() {
                if state.boundaries.boundary_mask[0][(i, j)] {
                    assert!(
                        (state.psin[0][(i, j)] - 1.0).abs() < 1e-8,
                        "({i}, {j}) = {}",
                        state.psin[0][(i, j)]
                    );
                }
            }
        }
        assert!(state.line_psin[(0, 0)].abs() > 1e-10);
    }

    /// An all-ocean grid has nothing to do and yields an empty state.
    #[test]
    fn test_all_ocean_grid() {
        let mut grid = StaggeredGrid::uniform(6, 6, false);
        grid.finalize_masks();
        let state =
            streamfunction_init(&grid, &SingleProcess, &StreamfunctionConfig::default()).unwrap();
        assert_eq!(state.nisle, 0);
        assert!(state.psin.is_empty());
        assert_eq!(state.line_psin.nrows(), 0);
    }
}
