//! Dense LU backend for small single-partition grids.
//!
//! Materializes the five-point stencil as a dense matrix over the interior
//! cells and factors it once; every island solve is then a cheap triangular
//! substitution. On cyclic grids the east-west seam couplings are folded
//! into the matrix directly, so no halo exchange is needed during the solve.
//! Only worth it when the interior is small enough for an `n x n` factor to
//! fit comfortably, which is exactly the regime where the iterative method
//! wastes its setup.

use faer::{
    linalg::solvers::{PartialPivLu, Solve},
    Mat,
};

use crate::grid::{Exchange, Field2, StaggeredGrid};
use crate::solver::stencil::PoissonStencil;
use crate::solver::{SolverBackend, SolverConfig, SolverError, SolverStats};

const NAME: &str = "direct";

/// Direct solver handle: the assembled matrix and its LU factorization.
pub struct DirectSolver {
    stencil: PoissonStencil,
    matrix: Mat<f64>,
    lu: PartialPivLu<f64>,
    tolerance: f64,
    nx: usize,
    ny: usize,
}

impl DirectSolver {
    /// Assemble the dense interior matrix and factor it.
    pub fn new(grid: &StaggeredGrid, dirichlet: &Field2<bool>, config: &SolverConfig) -> Self {
        let stencil = PoissonStencil::assemble(grid, dirichlet);
        let nx = grid.nx;
        let ny = grid.ny;
        let n = nx * ny;
        let row = |i: usize, j: usize| (i - 2) * ny + (j - 2);

        let mut matrix = Mat::<f64>::zeros(n, n);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                let r = row(i, j);
                matrix[(r, r)] = stencil.main[(i, j)];
                // east / west neighbors, wrapping across the seam when cyclic
                let east = stencil.east[(i, j)];
                if east != 0.0 {
                    if i + 1 <= nx + 1 {
                        matrix[(r, row(i + 1, j))] += east;
                    } else if grid.cyclic_x {
                        matrix[(r, row(2, j))] += east;
                    }
                }
                let west = stencil.west[(i, j)];
                if west != 0.0 {
                    if i - 1 >= 2 {
                        matrix[(r, row(i - 1, j))] += west;
                    } else if grid.cyclic_x {
                        matrix[(r, row(nx + 1, j))] += west;
                    }
                }
                // north / south never wrap
                let north = stencil.north[(i, j)];
                if north != 0.0 && j + 1 <= ny + 1 {
                    matrix[(r, row(i, j + 1))] += north;
                }
                let south = stencil.south[(i, j)];
                if south != 0.0 && j - 1 >= 2 {
                    matrix[(r, row(i, j - 1))] += south;
                }
            }
        }

        let lu = matrix.as_ref().partial_piv_lu();
        Self {
            stencil,
            matrix,
            lu,
            tolerance: config.tolerance,
            nx,
            ny,
        }
    }
}

impl SolverBackend for DirectSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn solve(
        &mut self,
        grid: &StaggeredGrid,
        _exchange: &dyn Exchange,
        forcing: &Field2<f64>,
        sol: &mut Field2<f64>,
        boundary_val: &Field2<f64>,
    ) -> Result<SolverStats, SolverError> {
        let ny = self.ny;
        let n = self.nx * ny;
        let row = |i: usize, j: usize| (i - 2) * ny + (j - 2);

        let mut rhs_field = Field2::zeros(grid.ni(), grid.nj());
        self.stencil
            .build_rhs(grid, forcing, boundary_val, &mut rhs_field);

        let mut rhs = Mat::<f64>::zeros(n, 1);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                rhs[(row(i, j), 0)] = rhs_field[(i, j)];
            }
        }

        let x = self.lu.solve(&rhs);

        let b_norm = rhs.norm_l2();
        let residual = (&self.matrix * &x - &rhs).norm_l2();
        let relative = if b_norm > 0.0 { residual / b_norm } else { 0.0 };
        if relative > self.tolerance {
            return Err(SolverError::ConvergenceFailure {
                backend: NAME,
                iterations: 1,
                residual: relative,
                tolerance: self.tolerance,
            });
        }

        for i in grid.interior_i() {
            for j in grid.interior_j() {
                sol[(i, j)] = x[(row(i, j), 0)];
            }
        }
        Ok(SolverStats {
            iterations: 1,
            residual: relative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SingleProcess;

    fn ring_problem(
        grid: &StaggeredGrid,
        cells: &[(usize, usize)],
        value: f64,
    ) -> (Field2<bool>, Field2<f64>) {
        let mut dirichlet: Field2<bool> = Field2::zeros(grid.ni(), grid.nj());
        let mut boundary_val: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        for &(i, j) in cells {
            dirichlet[(i, j)] = true;
            boundary_val[(i, j)] = value;
        }
        (dirichlet, boundary_val)
    }

    /// Constant Dirichlet data in a closed basin must yield the constant.
    #[test]
    fn test_constant_boundary_value_solution() {
        let nx = 8;
        let ny = 8;
        let mut grid = StaggeredGrid::uniform(nx, ny, false);
        for i in 2..nx + 2 {
            for j in 2..ny + 2 {
                if i == 2 || i == nx + 1 || j == 2 || j == ny + 1 {
                    grid.set_land(i, j);
                }
            }
        }
        grid.set_land(5, 5);
        grid.finalize_masks();

        let (dirichlet, boundary_val) =
            ring_problem(&grid, &[(4, 4), (4, 5), (5, 4), (5, 5)], 1.0);
        let config = SolverConfig::default();
        let mut solver = DirectSolver::new(&grid, &dirichlet, &config);
        let forcing: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        let mut sol: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        let stats = solver
            .solve(&grid, &SingleProcess, &forcing, &mut sol, &boundary_val)
            .expect("solve failed");
        assert_eq!(stats.iterations, 1);

        // decoupled rows next to the basin frame are identity rows with a
        // zero right-hand side; only coupled rows carry the constant
        let stencil = PoissonStencil::assemble(&grid, &dirichlet);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                let coupled = stencil.east[(i, j)]
                    + stencil.west[(i, j)]
                    + stencil.north[(i, j)]
                    + stencil.south[(i, j)];
                if dirichlet[(i, j)] || coupled != 0.0 {
                    assert!(
                        (sol[(i, j)] - 1.0).abs() < 1e-10,
                        "({i}, {j}) = {}",
                        sol[(i, j)]
                    );
                } else {
                    assert!(sol[(i, j)].abs() < 1e-10, "({i}, {j}) = {}", sol[(i, j)]);
                }
            }
        }
    }

    /// The seam couplings must make the cyclic operator annihilate constants
    /// on a zonally reentrant channel, so constant Dirichlet data again
    /// yields the constant everywhere in the ocean.
    #[test]
    fn test_cyclic_channel_constant_solution() {
        let nx = 10;
        let ny = 6;
        let mut grid = StaggeredGrid::uniform(nx, ny, true);
        for i in 2..nx + 2 {
            grid.set_land(i, 2);
            grid.set_land(i, ny + 1);
        }
        grid.finalize_masks();

        let mut cells = Vec::new();
        for i in 2..nx + 2 {
            cells.push((i, 2));
            cells.push((i, 3));
        }
        let (dirichlet, boundary_val) = ring_problem(&grid, &cells, 2.5);
        let config = SolverConfig::default();
        let mut solver = DirectSolver::new(&grid, &dirichlet, &config);
        let forcing: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        let mut sol: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        solver
            .solve(&grid, &SingleProcess, &forcing, &mut sol, &boundary_val)
            .expect("solve failed");

        for i in grid.interior_i() {
            for j in grid.interior_j() {
                if grid.kbot[(i, j)] > 0 || dirichlet[(i, j)] {
                    assert!(
                        (sol[(i, j)] - 2.5).abs() < 1e-10,
                        "({i}, {j}) = {}",
                        sol[(i, j)]
                    );
                }
            }
        }
    }

    /// Direct and iterative backends must agree on the same problem.
    #[test]
    fn test_matches_bicgstab() {
        use crate::solver::bicgstab::BiCgStabSolver;

        let nx = 8;
        let ny = 8;
        let mut grid = StaggeredGrid::uniform(nx, ny, false);
        for i in 2..nx + 2 {
            for j in 2..ny + 2 {
                if i == 2 || i == nx + 1 || j == 2 || j == ny + 1 {
                    grid.set_land(i, j);
                }
            }
        }
        grid.set_land(6, 6);
        grid.finalize_masks();

        let (dirichlet, boundary_val) =
            ring_problem(&grid, &[(5, 5), (5, 6), (6, 5), (6, 6)], 1.0);
        let config = SolverConfig {
            tolerance: 1e-13,
            max_iterations: 1000,
        };
        let forcing: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());

        let mut direct = DirectSolver::new(&grid, &dirichlet, &config);
        let mut sol_d: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        direct
            .solve(&grid, &SingleProcess, &forcing, &mut sol_d, &boundary_val)
            .expect("direct solve failed");

        let mut bicg = BiCgStabSolver::new(&grid, &dirichlet, &config);
        let mut sol_b: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        bicg.solve(&grid, &SingleProcess, &forcing, &mut sol_b, &boundary_val)
            .expect("bicgstab solve failed");

        for i in grid.interior_i() {
            for j in grid.interior_j() {
                assert!(
                    (sol_d[(i, j)] - sol_b[(i, j)]).abs() < 1e-8,
                    "({i}, {j}): {} vs {}",
                    sol_d[(i, j)],
                    sol_b[(i, j)]
                );
            }
        }
    }
}
