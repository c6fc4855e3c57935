//! Boundary tracing.
//!
//! For each island the tracer derives a boundary map (`1` = the island's
//! land, `-1` = perimeter ocean cells touching it, `0` = everything else) and
//! walks once around the island, recording for every visited cell the single
//! outward travel direction to the next one. The walk keeps land on its right
//! hand, so every loop winds counterclockwise around its island; following
//! the recorded directions from any boundary cell returns to it after exactly
//! `|boundary|` steps.
//!
//! The walk is a small state machine. At every step it inspects the two
//! boundary-map cells ahead and ahead-right of the current heading and applies
//! a fixed turn table: go straight, turn left, or turn right; any other
//! pattern means the tracer lost the perimeter, which aborts the whole
//! initialization. Crossing the zonal seam under cyclic boundaries shifts the
//! column index by `nx` as a single post-step rule.

use log::debug;
use thiserror::Error;

use crate::grid::{wrap_cyclic_x, Field2, StaggeredGrid};

/// Travel direction along a boundary loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Grid offset of one step in this direction.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    fn turn_left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    fn turn_right(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }
}

/// Outcome of inspecting the 2×2 pattern ahead of the walker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Turn {
    Forward,
    Left,
    Right,
    Invalid,
}

/// Turn table keyed by the boundary-map values (ahead, ahead-right).
fn turn_rule(ahead: i8, ahead_right: i8) -> Turn {
    match (ahead, ahead_right) {
        (-1, 1) => Turn::Forward,
        (-1, -1) => Turn::Right,
        (1, 1) => Turn::Left,
        (1, -1) => Turn::Left,
        _ => Turn::Invalid,
    }
}

/// Fatal failures of the boundary walk; these indicate malformed or
/// unsupported topology and abort the whole initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("found no starting point for the boundary of island {island}")]
    NoStartingPoint { island: usize },

    #[error("lost track of the boundary of island {island} at ({i}, {j}) heading {direction:?}")]
    LostTrack {
        island: usize,
        i: i64,
        j: i64,
        direction: Direction,
    },

    #[error("boundary walk of island {island} did not close after {steps} steps")]
    RunawayWalk { island: usize, steps: usize },
}

/// Boundary and directional masks for every island, indexed by label - 1.
#[derive(Clone, Debug)]
pub struct IslandBoundaries {
    pub boundary_mask: Vec<Field2<bool>>,
    pub dir_north: Vec<Field2<bool>>,
    pub dir_south: Vec<Field2<bool>>,
    pub dir_east: Vec<Field2<bool>>,
    pub dir_west: Vec<Field2<bool>>,
}

impl IslandBoundaries {
    fn empty(ni: usize, nj: usize, nisle: usize) -> Self {
        let blank = || (0..nisle).map(|_| Field2::zeros(ni, nj)).collect();
        Self {
            boundary_mask: blank(),
            dir_north: blank(),
            dir_south: blank(),
            dir_east: blank(),
            dir_west: blank(),
        }
    }

    /// Number of islands.
    pub fn nisle(&self) -> usize {
        self.boundary_mask.len()
    }

    /// Number of cells on island `isle`'s boundary loop (zero-based index).
    pub fn loop_len(&self, isle: usize) -> usize {
        self.boundary_mask[isle]
            .as_slice()
            .iter()
            .filter(|&&b| b)
            .count()
    }

    /// The directional mask entry of a boundary cell, if exactly one mask is
    /// set there.
    pub fn direction_at(&self, isle: usize, i: usize, j: usize) -> Option<Direction> {
        let dirs = [
            (Direction::North, &self.dir_north),
            (Direction::South, &self.dir_south),
            (Direction::East, &self.dir_east),
            (Direction::West, &self.dir_west),
        ];
        let mut found = None;
        for (d, mask) in dirs {
            if mask[isle][(i, j)] {
                if found.is_some() {
                    return None;
                }
                found = Some(d);
            }
        }
        found
    }
}

/// Trace the boundary loop of every island in the label map.
pub fn trace_island_boundaries(
    grid: &StaggeredGrid,
    land_map: &Field2<i32>,
    nisle: usize,
) -> Result<IslandBoundaries, TracingError> {
    // the walk reads labels in the halo columns, so refresh them here
    // instead of relying on the caller having exchanged the map
    let mut land_map = land_map.clone();
    wrap_cyclic_x(grid, &mut land_map);

    let mut out = IslandBoundaries::empty(grid.ni(), grid.nj(), nisle);
    for isle in 0..nisle {
        debug!("processing land mass #{}", isle + 1);
        let bmap = boundary_map(grid, &land_map, (isle + 1) as i32);
        walk_island(grid, &bmap, isle, &mut out)?;
    }
    Ok(out)
}

/// Per-island boundary map: `1` on the island's land cells, `-1` on ocean
/// cells within the 8-neighborhood of that land (the perimeter), `0` elsewhere.
pub(crate) fn boundary_map(
    grid: &StaggeredGrid,
    land_map: &Field2<i32>,
    label: i32,
) -> Field2<i8> {
    let ni = grid.ni();
    let nj = grid.nj();
    let mut bmap: Field2<i8> = Field2::zeros(ni, nj);
    for i in 0..ni {
        for j in 0..nj {
            if land_map[(i, j)] == label {
                bmap[(i, j)] = 1;
            }
        }
    }
    for i in 0..ni {
        for j in 0..nj {
            if bmap[(i, j)] != 0 {
                continue;
            }
            'dilate: for di in -1i64..=1 {
                for dj in -1i64..=1 {
                    let (wi, wj) = wrap_column(grid, i as i64 + di, j as i64 + dj);
                    if bmap.get(wi, wj) == Some(1) {
                        bmap[(i, j)] = -1;
                        break 'dilate;
                    }
                }
            }
        }
    }
    bmap
}

/// Apply the cyclic-x seam to a zonal index when enabled.
fn wrap_column(grid: &StaggeredGrid, mut i: i64, j: i64) -> (i64, i64) {
    if grid.cyclic_x {
        if i == grid.nx as i64 + 2 {
            i = 2;
        } else if i == 1 {
            i = grid.nx as i64 + 1;
        }
    }
    (i, j)
}

/// Walk state of the tracer for one island.
#[derive(Debug)]
enum WalkState {
    Tracing {
        i: i64,
        j: i64,
        direction: Direction,
        start: (i64, i64),
    },
    Done,
}

fn walk_island(
    grid: &StaggeredGrid,
    bmap: &Field2<i8>,
    isle: usize,
    out: &mut IslandBoundaries,
) -> Result<(), TracingError> {
    let mut state = seek_start(grid, bmap, isle, out)?;
    if let WalkState::Tracing { i, j, .. } = state {
        out.boundary_mask[isle][(i as usize, j as usize)] = true;
    }
    // hard bound against malformed boundaries that never close
    let max_steps = 4 * grid.ni() * grid.nj();
    let mut steps = 0;

    while let WalkState::Tracing {
        i,
        j,
        direction,
        start,
    } = state
    {
        steps += 1;
        if steps > max_steps {
            return Err(TracingError::RunawayWalk { island: isle + 1, steps });
        }

        // the two cells ahead and ahead-right of the heading
        let (ap, ar) = match direction {
            Direction::North => ((i, j + 1), (i + 1, j + 1)),
            Direction::West => ((i, j), (i, j + 1)),
            Direction::South => ((i + 1, j), (i, j)),
            Direction::East => ((i + 1, j + 1), (i + 1, j)),
        };
        let lost = |i, j| TracingError::LostTrack {
            island: isle + 1,
            i,
            j,
            direction,
        };
        let ahead = bmap.get(ap.0, ap.1).ok_or_else(|| lost(i, j))?;
        let ahead_right = bmap.get(ar.0, ar.1).ok_or_else(|| lost(i, j))?;

        let new_dir = match turn_rule(ahead, ahead_right) {
            Turn::Forward => direction,
            Turn::Left => direction.turn_left(),
            Turn::Right => direction.turn_right(),
            Turn::Invalid => return Err(lost(i, j)),
        };
        debug!(
            "at ({}, {}) heading {:?}, ahead ({}, {}), continuing {:?}",
            i, j, direction, ahead, ahead_right, new_dir
        );

        set_direction(out, isle, i as usize, j as usize, new_dir);
        let (di, dj) = new_dir.offset();
        let mut next = (i + di, j + dj);
        if next == start {
            state = WalkState::Done;
            continue;
        }
        // crossing the zonal seam shifts the column by the interior extent
        if grid.cyclic_x && new_dir == Direction::East && next.0 > grid.nx as i64 + 1 {
            next.0 -= grid.nx as i64;
        }
        if grid.cyclic_x && new_dir == Direction::West && next.0 < 2 {
            next.0 += grid.nx as i64;
        }
        if next == start {
            state = WalkState::Done;
            continue;
        }
        out.boundary_mask[isle][(next.0 as usize, next.1 as usize)] = true;
        state = WalkState::Tracing {
            i: next.0,
            j: next.1,
            direction: new_dir,
            start,
        };
    }

    debug!("boundary of island {} has {} cells", isle + 1, out.loop_len(isle));
    Ok(())
}

/// Find a valid starting cell and direction, searching eastward from the
/// domain center first and then westward, to stay clear of the cyclic seam.
fn seek_start(
    grid: &StaggeredGrid,
    bmap: &Field2<i8>,
    isle: usize,
    out: &mut IslandBoundaries,
) -> Result<WalkState, TracingError> {
    let nx = grid.nx as i64;
    let ny = grid.ny as i64;
    let east_half = (nx / 2 + 1)..(nx + 2);
    let west_half = (0..=nx / 2).rev();

    for i in east_half.chain(west_half) {
        for j in 1..(ny + 2) {
            let here = bmap.get(i, j).unwrap_or(0);
            let above = bmap.get(i, j + 1).unwrap_or(0);
            if here == 1 && above == -1 {
                // land below perimeter: start eastward, coming from the west
                out.dir_east[isle][((i - 1) as usize, j as usize)] = true;
                out.boundary_mask[isle][((i - 1) as usize, j as usize)] = true;
                return Ok(WalkState::Tracing {
                    i,
                    j,
                    direction: Direction::East,
                    start: (i - 1, j),
                });
            }
            if here == -1 && above == 1 {
                // perimeter below land: start westward, coming from the east
                out.dir_west[isle][(i as usize, j as usize)] = true;
                out.boundary_mask[isle][(i as usize, j as usize)] = true;
                return Ok(WalkState::Tracing {
                    i: i - 1,
                    j,
                    direction: Direction::West,
                    start: (i, j),
                });
            }
        }
    }
    Err(TracingError::NoStartingPoint { island: isle + 1 })
}

fn set_direction(out: &mut IslandBoundaries, isle: usize, i: usize, j: usize, dir: Direction) {
    let mask = match dir {
        Direction::North => &mut out.dir_north,
        Direction::South => &mut out.dir_south,
        Direction::East => &mut out.dir_east,
        Direction::West => &mut out.dir_west,
    };
    mask[isle][(i, j)] = true;
}
