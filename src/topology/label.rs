//! Land-mass labeling.
//!
//! Partitions the land cells of the grid (`kbot == 0`) into 4-connected
//! components and assigns each one a dense label `1..=N` in a fixed
//! deterministic order: cells are scanned row-major (`i` outer, `j` inner)
//! and each newly discovered component receives the next unused label, so
//! identical topologies always produce identical label maps.
//!
//! Under cyclic-x the easternmost interior column is treated as adjacent to
//! the westernmost one, merging components that straddle the seam. Labels are
//! assigned to interior cells; the halo is filled by the caller's exchange.

use crate::grid::{Field2, StaggeredGrid};

/// Label map over the padded grid (`0` = ocean, `k` = island `k`) plus the
/// number of islands found.
pub fn label_land_masses(grid: &StaggeredGrid) -> (Field2<i32>, usize) {
    let mut land_map: Field2<i32> = Field2::zeros(grid.ni(), grid.nj());
    let mut nisle = 0;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for i in grid.interior_i() {
        for j in grid.interior_j() {
            if grid.kbot[(i, j)] != 0 || land_map[(i, j)] != 0 {
                continue;
            }
            nisle += 1;
            land_map[(i, j)] = nisle;
            stack.push((i, j));
            while let Some((ci, cj)) = stack.pop() {
                for (ni, nj) in neighbors(grid, ci, cj) {
                    if grid.kbot[(ni, nj)] == 0 && land_map[(ni, nj)] == 0 {
                        land_map[(ni, nj)] = nisle;
                        stack.push((ni, nj));
                    }
                }
            }
        }
    }

    (land_map, nisle as usize)
}

/// Interior von-Neumann neighbors of `(i, j)`, wrapping the zonal seam when
/// cyclic.
fn neighbors(grid: &StaggeredGrid, i: usize, j: usize) -> impl Iterator<Item = (usize, usize)> {
    let nx = grid.nx;
    let ny = grid.ny;
    let cyclic = grid.cyclic_x;
    let steps = [(1i64, 0i64), (-1, 0), (0, 1), (0, -1)];
    steps.into_iter().filter_map(move |(di, dj)| {
        let mut ii = i as i64 + di;
        let jj = j as i64 + dj;
        if cyclic {
            if ii == nx as i64 + 2 {
                ii = 2;
            } else if ii == 1 {
                ii = nx as i64 + 1;
            }
        }
        if ii < 2 || ii > nx as i64 + 1 || jj < 2 || jj > ny as i64 + 1 {
            return None;
        }
        Some((ii as usize, jj as usize))
    })
}
