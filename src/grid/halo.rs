//! Halo synchronization and global reductions.
//!
//! Everything that distinguishes a single-process run from a domain-decomposed
//! one goes through the [`Exchange`] trait: refreshing halo (ghost) cells
//! after a field has been updated, and reducing scalars across partitions.
//! The island solves and the iterative solver backend are written against
//! `&dyn Exchange`, so both execution modes run the identical code path.
//!
//! [`SingleProcess`] is the serial implementation: its halo refresh applies
//! the cyclic-x wrap (the two eastern halo columns mirror the two westernmost
//! interior columns and vice versa) and its reductions are the identity.
//! Domain-decomposed deployments supply their own implementation on top of
//! whatever transport they use; from this crate's perspective an exchange is
//! a synchronization point (see the solver loop).

use super::{Field2, StaggeredGrid};

/// Halo refresh and cross-partition reduction interface.
pub trait Exchange {
    /// Number of horizontal partitions participating in the run.
    fn num_partitions(&self) -> usize;

    /// Sum a locally reduced scalar over all partitions.
    fn global_sum(&self, local: f64) -> f64;

    /// Refresh the halo cells of a scalar field.
    fn exchange(&self, grid: &StaggeredGrid, field: &mut Field2<f64>);

    /// Refresh the halo cells of an integer field (label maps).
    fn exchange_i32(&self, grid: &StaggeredGrid, field: &mut Field2<i32>);
}

/// Serial execution: cyclic wrap only, reductions are the identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

/// Copy the cyclic-x halo columns: `0,1 <- nx,nx+1` and `nx+2,nx+3 <- 2,3`.
pub(crate) fn wrap_cyclic_x<T: Copy + Default>(grid: &StaggeredGrid, field: &mut Field2<T>) {
    if !grid.cyclic_x {
        return;
    }
    let nx = grid.nx;
    for j in 0..field.nj() {
        field[(0, j)] = field[(nx, j)];
        field[(1, j)] = field[(nx + 1, j)];
        field[(nx + 2, j)] = field[(2, j)];
        field[(nx + 3, j)] = field[(3, j)];
    }
}

impl Exchange for SingleProcess {
    fn num_partitions(&self) -> usize {
        1
    }

    fn global_sum(&self, local: f64) -> f64 {
        local
    }

    fn exchange(&self, grid: &StaggeredGrid, field: &mut Field2<f64>) {
        wrap_cyclic_x(grid, field);
    }

    fn exchange_i32(&self, grid: &StaggeredGrid, field: &mut Field2<i32>) {
        wrap_cyclic_x(grid, field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_wrap_copies_columns() {
        let grid = StaggeredGrid::uniform(6, 4, true);
        let mut f: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        for j in 0..f.nj() {
            f[(2, j)] = 2.0;
            f[(3, j)] = 3.0;
            f[(6, j)] = 6.0;
            f[(7, j)] = 7.0;
        }
        SingleProcess.exchange(&grid, &mut f);
        for j in 0..f.nj() {
            assert_eq!(f[(0, j)], 6.0);
            assert_eq!(f[(1, j)], 7.0);
            assert_eq!(f[(8, j)], 2.0);
            assert_eq!(f[(9, j)], 3.0);
        }
    }

    #[test]
    fn test_non_cyclic_leaves_halo_untouched() {
        let grid = StaggeredGrid::uniform(6, 4, false);
        let mut f: Field2<f64> = Field2::zeros(grid.ni(), grid.nj());
        f[(2, 2)] = 1.0;
        SingleProcess.exchange(&grid, &mut f);
        assert_eq!(f[(8, 2)], 0.0);
        assert_eq!(f[(0, 2)], 0.0);
    }

    #[test]
    fn test_global_sum_identity() {
        assert_eq!(SingleProcess.global_sum(4.5), 4.5);
        assert_eq!(SingleProcess.num_partitions(), 1);
    }
}
