//! Pluggable elliptic solver backends.
//!
//! A backend solves the streamfunction boundary-value problem
//! `A x = forcing` with prescribed values on the island-boundary rows, where
//! `A` is the stencil from [`stencil::PoissonStencil`]. Backends are
//! interchangeable and selected by name through an explicit registry; the
//! `Best` choice walks a priority-ordered fallback chain, preferring a
//! distributed-capable method when running across multiple partitions and
//! the cheapest local method otherwise, with the iterative reference method
//! as the always-available last resort.
//!
//! A constructed backend doubles as the solver handle: whatever it caches
//! (scaled diagonals, factorizations, scratch fields) is built once and
//! reused by every island's solve, and the handle is carried onward in the
//! persistent state for later time stepping.

pub mod bicgstab;
#[cfg(feature = "direct")]
pub mod direct;
pub mod stencil;

pub use bicgstab::BiCgStabSolver;
#[cfg(feature = "direct")]
pub use direct::DirectSolver;
pub use stencil::PoissonStencil;

use log::warn;
use thiserror::Error;

use crate::grid::{Exchange, Field2, StaggeredGrid};

/// Solver backend selection, parsed from a configuration name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Pick automatically via the fallback chain.
    Best,
    /// Jacobi-preconditioned BiCGStab (reference, always available).
    BiCgStab,
    /// Dense LU factorization.
    Direct,
}

impl std::str::FromStr for BackendKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, SolverError> {
        match s {
            "best" => Ok(BackendKind::Best),
            "bicgstab" => Ok(BackendKind::BiCgStab),
            "direct" => Ok(BackendKind::Direct),
            other => Err(SolverError::UnknownBackend(other.to_string())),
        }
    }
}

/// Convergence and iteration-budget configuration shared by all backends.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    /// Relative residual tolerance.
    pub tolerance: f64,
    /// Iteration budget for iterative backends.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 1000,
        }
    }
}

/// Outcome of a successful solve.
#[derive(Clone, Copy, Debug)]
pub struct SolverStats {
    pub iterations: usize,
    /// Final relative residual.
    pub residual: f64,
}

/// Errors raised by backend selection and the solves themselves.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unrecognized linear solver {0:?}")]
    UnknownBackend(String),

    #[error("linear solver backend \"{0}\" is not available in this build")]
    BackendUnavailable(&'static str),

    #[error("no linear solver backend available")]
    NoBackendAvailable,

    #[error(
        "{backend} did not converge after {iterations} iterations \
         (residual {residual:.3e}, tolerance {tolerance:.3e})"
    )]
    ConvergenceFailure {
        backend: &'static str,
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },
}

/// A linear solver for the streamfunction problem.
///
/// `solve` reads the forcing and the prescribed boundary values, uses the
/// interior of `sol` as the initial guess, and writes the solution back into
/// the interior of `sol`; halo cells are left to the caller's exchange.
pub trait SolverBackend {
    fn name(&self) -> &'static str;

    fn solve(
        &mut self,
        grid: &StaggeredGrid,
        exchange: &dyn Exchange,
        forcing: &Field2<f64>,
        sol: &mut Field2<f64>,
        boundary_val: &Field2<f64>,
    ) -> Result<SolverStats, SolverError>;
}

/// One registry entry: identity, capability flags, and a constructor.
struct BackendFactory {
    kind: BackendKind,
    name: &'static str,
    available: bool,
    distributed_capable: bool,
    build: fn(&StaggeredGrid, &Field2<bool>, &SolverConfig) -> Box<dyn SolverBackend>,
}

/// Backends in local-preference order; the last entry is the reference
/// method and is always available.
fn registry() -> Vec<BackendFactory> {
    vec![
        BackendFactory {
            kind: BackendKind::Direct,
            name: "direct",
            available: cfg!(feature = "direct"),
            distributed_capable: false,
            build: build_direct,
        },
        BackendFactory {
            kind: BackendKind::BiCgStab,
            name: "bicgstab",
            available: true,
            distributed_capable: true,
            build: |grid, dirichlet, config| {
                Box::new(BiCgStabSolver::new(grid, dirichlet, config))
            },
        },
    ]
}

#[cfg(feature = "direct")]
fn build_direct(
    grid: &StaggeredGrid,
    dirichlet: &Field2<bool>,
    config: &SolverConfig,
) -> Box<dyn SolverBackend> {
    Box::new(DirectSolver::new(grid, dirichlet, config))
}

#[cfg(not(feature = "direct"))]
fn build_direct(
    _grid: &StaggeredGrid,
    _dirichlet: &Field2<bool>,
    _config: &SolverConfig,
) -> Box<dyn SolverBackend> {
    unreachable!("direct backend selected despite being unavailable")
}

/// Pure selection over (requested kind, availability, partition count).
fn select(
    entries: &[BackendFactory],
    requested: BackendKind,
    num_partitions: usize,
) -> Result<usize, SolverError> {
    if requested != BackendKind::Best {
        let idx = entries
            .iter()
            .position(|e| e.kind == requested)
            .ok_or(SolverError::NoBackendAvailable)?;
        if !entries[idx].available {
            return Err(SolverError::BackendUnavailable(entries[idx].name));
        }
        return Ok(idx);
    }

    if num_partitions > 1 {
        if let Some(idx) = entries
            .iter()
            .position(|e| e.available && e.distributed_capable)
        {
            return Ok(idx);
        }
        warn!("no distributed-capable linear solver available, falling back");
    }
    for (idx, entry) in entries.iter().enumerate() {
        if entry.available {
            return Ok(idx);
        }
        warn!(
            "linear solver {} not available, falling back to the next candidate",
            entry.name
        );
    }
    Err(SolverError::NoBackendAvailable)
}

/// Select and construct the backend for this run.
///
/// The returned box is the solver handle: it is created once per
/// initialization and reused for every island.
pub fn create_backend(
    grid: &StaggeredGrid,
    dirichlet: &Field2<bool>,
    requested: BackendKind,
    config: &SolverConfig,
    num_partitions: usize,
) -> Result<Box<dyn SolverBackend>, SolverError> {
    let entries = registry();
    let idx = select(&entries, requested, num_partitions)?;
    Ok((entries[idx].build)(grid, dirichlet, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_entries(direct_available: bool) -> Vec<BackendFactory> {
        let mut entries = registry();
        entries[0].available = direct_available;
        entries
    }

    #[test]
    fn test_parse_backend_names() {
        assert_eq!("best".parse::<BackendKind>().unwrap(), BackendKind::Best);
        assert_eq!(
            "bicgstab".parse::<BackendKind>().unwrap(),
            BackendKind::BiCgStab
        );
        assert!(matches!(
            "pyamg".parse::<BackendKind>(),
            Err(SolverError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_best_prefers_direct_locally() {
        let entries = fake_entries(true);
        let idx = select(&entries, BackendKind::Best, 1).unwrap();
        assert_eq!(entries[idx].name, "direct");
    }

    #[test]
    fn test_best_prefers_distributed_capable_across_partitions() {
        let entries = fake_entries(true);
        let idx = select(&entries, BackendKind::Best, 4).unwrap();
        assert_eq!(entries[idx].name, "bicgstab");
    }

    #[test]
    fn test_best_falls_back_when_direct_missing() {
        let entries = fake_entries(false);
        let idx = select(&entries, BackendKind::Best, 1).unwrap();
        assert_eq!(entries[idx].name, "bicgstab");
    }

    #[test]
    fn test_explicit_request_of_missing_backend_is_fatal() {
        let entries = fake_entries(false);
        assert!(matches!(
            select(&entries, BackendKind::Direct, 1),
            Err(SolverError::BackendUnavailable("direct"))
        ));
    }
}
