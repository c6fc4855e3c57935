//! Jacobi-preconditioned BiCGStab backend.
//!
//! The reference backend: always available, matrix-free, and
//! distributed-capable. The stencil is applied against a halo-exchanged
//! field, so under domain decomposition every operator application is a
//! ghost-cell synchronization point, and every inner product is a global
//! reduction; both go through the [`Exchange`] handed to `solve`, which is
//! what lets the same code run serially and across partitions.
//!
//! Preconditioning is a diagonal (Jacobi) scaling of the system, applied
//! once to the cached stencil at construction; convergence is measured on
//! the scaled residual relative to the scaled right-hand side.
//!
//! A vanishing scalar denominator (shadow-residual product or one of the
//! step sizes) discards the Krylov space and restarts from the true
//! residual with a fresh shadow vector; only a restart that has made no
//! progress since the previous one is reported as a convergence failure.

use crate::grid::{Exchange, Field2, StaggeredGrid};
use crate::solver::stencil::PoissonStencil;
use crate::solver::{SolverBackend, SolverConfig, SolverError, SolverStats};

const NAME: &str = "bicgstab";

// breakdown guard for the BiCGStab scalar denominators
const TINY: f64 = 1e-300;

/// BiCGStab solver handle: scaled stencil plus reusable scratch fields.
pub struct BiCgStabSolver {
    stencil: PoissonStencil,
    inv_diag: Field2<f64>,
    tolerance: f64,
    max_iterations: usize,
    x: Field2<f64>,
    rhs: Field2<f64>,
    r: Field2<f64>,
    r_hat: Field2<f64>,
    p: Field2<f64>,
    v: Field2<f64>,
    s: Field2<f64>,
    t: Field2<f64>,
}

impl BiCgStabSolver {
    /// Assemble and diagonally scale the operator; allocate scratch space.
    pub fn new(grid: &StaggeredGrid, dirichlet: &Field2<bool>, config: &SolverConfig) -> Self {
        let mut stencil = PoissonStencil::assemble(grid, dirichlet);
        let ni = grid.ni();
        let nj = grid.nj();
        let mut inv_diag = Field2::zeros(ni, nj);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                let d = 1.0 / stencil.main[(i, j)];
                inv_diag[(i, j)] = d;
                stencil.main[(i, j)] = 1.0;
                stencil.east[(i, j)] *= d;
                stencil.west[(i, j)] *= d;
                stencil.north[(i, j)] *= d;
                stencil.south[(i, j)] *= d;
            }
        }
        let field = || Field2::zeros(ni, nj);
        Self {
            stencil,
            inv_diag,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            x: field(),
            rhs: field(),
            r: field(),
            r_hat: field(),
            p: field(),
            v: field(),
            s: field(),
            t: field(),
        }
    }
}

impl SolverBackend for BiCgStabSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn solve(
        &mut self,
        grid: &StaggeredGrid,
        exchange: &dyn Exchange,
        forcing: &Field2<f64>,
        sol: &mut Field2<f64>,
        boundary_val: &Field2<f64>,
    ) -> Result<SolverStats, SolverError> {
        // scaled right-hand side
        self.stencil.build_rhs(grid, forcing, boundary_val, &mut self.rhs);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                self.rhs[(i, j)] *= self.inv_diag[(i, j)];
            }
        }
        let b_norm = norm(grid, exchange, &self.rhs);
        if b_norm == 0.0 {
            for i in grid.interior_i() {
                for j in grid.interior_j() {
                    sol[(i, j)] = 0.0;
                }
            }
            return Ok(SolverStats {
                iterations: 0,
                residual: 0.0,
            });
        }
        let target = self.tolerance * b_norm;

        // initial guess from the caller's field, zeroed halo
        self.x.fill(0.0);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                self.x[(i, j)] = sol[(i, j)];
            }
        }

        // r = b - A x, r_hat = r
        exchange.exchange(grid, &mut self.x);
        self.stencil.apply(grid, &self.x, &mut self.r);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                self.r[(i, j)] = self.rhs[(i, j)] - self.r[(i, j)];
            }
        }
        self.r_hat.copy_from(&self.r);
        self.p.fill(0.0);
        self.v.fill(0.0);

        let mut rho = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;
        let mut res_norm = norm(grid, exchange, &self.r);
        let mut restart_res = f64::INFINITY;

        for iteration in 1..=self.max_iterations {
            if res_norm <= target {
                write_back(grid, &self.x, sol);
                return Ok(SolverStats {
                    iterations: iteration - 1,
                    residual: res_norm / b_norm,
                });
            }

            let rho_next = dot(grid, exchange, &self.r_hat, &self.r);
            if rho_next.abs() < TINY {
                res_norm =
                    self.restart(grid, exchange, iteration, res_norm, b_norm, &mut restart_res)?;
                rho = 1.0;
                alpha = 1.0;
                omega = 1.0;
                continue;
            }
            let beta = (rho_next / rho) * (alpha / omega);
            rho = rho_next;
            for i in grid.interior_i() {
                for j in grid.interior_j() {
                    self.p[(i, j)] =
                        self.r[(i, j)] + beta * (self.p[(i, j)] - omega * self.v[(i, j)]);
                }
            }

            exchange.exchange(grid, &mut self.p);
            self.stencil.apply(grid, &self.p, &mut self.v);
            let denom = dot(grid, exchange, &self.r_hat, &self.v);
            if denom.abs() < TINY {
                res_norm =
                    self.restart(grid, exchange, iteration, res_norm, b_norm, &mut restart_res)?;
                rho = 1.0;
                alpha = 1.0;
                omega = 1.0;
                continue;
            }
            alpha = rho / denom;

            for i in grid.interior_i() {
                for j in grid.interior_j() {
                    self.s[(i, j)] = self.r[(i, j)] - alpha * self.v[(i, j)];
                }
            }
            let s_norm = norm(grid, exchange, &self.s);
            if s_norm <= target {
                for i in grid.interior_i() {
                    for j in grid.interior_j() {
                        self.x[(i, j)] += alpha * self.p[(i, j)];
                    }
                }
                write_back(grid, &self.x, sol);
                return Ok(SolverStats {
                    iterations: iteration,
                    residual: s_norm / b_norm,
                });
            }

            exchange.exchange(grid, &mut self.s);
            self.stencil.apply(grid, &self.s, &mut self.t);
            let tt = dot(grid, exchange, &self.t, &self.t);
            if tt.abs() < TINY {
                res_norm =
                    self.restart(grid, exchange, iteration, s_norm, b_norm, &mut restart_res)?;
                rho = 1.0;
                alpha = 1.0;
                omega = 1.0;
                continue;
            }
            omega = dot(grid, exchange, &self.t, &self.s) / tt;

            for i in grid.interior_i() {
                for j in grid.interior_j() {
                    self.x[(i, j)] += alpha * self.p[(i, j)] + omega * self.s[(i, j)];
                    self.r[(i, j)] = self.s[(i, j)] - omega * self.t[(i, j)];
                }
            }
            res_norm = norm(grid, exchange, &self.r);
        }

        if res_norm <= target {
            write_back(grid, &self.x, sol);
            return Ok(SolverStats {
                iterations: self.max_iterations,
                residual: res_norm / b_norm,
            });
        }
        Err(self.failure(self.max_iterations, res_norm / b_norm))
    }
}

impl BiCgStabSolver {
    /// Recompute the true residual and reset the shadow vector and search
    /// directions; fails if the residual has not improved since the last
    /// restart.
    fn restart(
        &mut self,
        grid: &StaggeredGrid,
        exchange: &dyn Exchange,
        iteration: usize,
        res_norm: f64,
        b_norm: f64,
        restart_res: &mut f64,
    ) -> Result<f64, SolverError> {
        if res_norm >= *restart_res {
            return Err(self.failure(iteration, res_norm / b_norm));
        }
        *restart_res = res_norm;

        exchange.exchange(grid, &mut self.x);
        self.stencil.apply(grid, &self.x, &mut self.t);
        for i in grid.interior_i() {
            for j in grid.interior_j() {
                self.r[(i, j)] = self.rhs[(i, j)] - self.t[(i, j)];
            }
        }
        self.r_hat.copy_from(&self.r);
        self.p.fill(0.0);
        self.v.fill(0.0);
        Ok(norm(grid, exchange, &self.r))
    }

    fn failure(&self, iterations: usize, residual: f64) -> SolverError {
        SolverError::ConvergenceFailure {
            backend: NAME,
            iterations,
            residual,
            tolerance: self.tolerance,
        }
    }
}

/// Interior inner product reduced over all partitions.
fn dot(grid: &StaggeredGrid, exchange: &dyn Exchange, a: &Field2<f64>, b: &Field2<f64>) -> f64 {
    let mut local = 0.0;
    for i in grid.interior_i() {
        for j in grid.interior_j() {
            local += a[(i, j)] * b[(i, j)];
        }
    }
    exchange.global_sum(local)
}

fn norm(grid: &StaggeredGrid, exchange: &dyn Exchange, a: &Field2<f64>) -> f64 {
    dot(grid, exchange, a, a).sqrt()
}

fn write_back(grid: &StaggeredGrid, x: &Field2<f64>, sol: &mut Field2<f64>) {
    for i in grid.interior_i() {
        for j in grid.interior_j() {
            sol[(i, j)] = x[(i, j)];
        }
    }
}
