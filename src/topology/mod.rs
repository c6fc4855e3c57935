//! Island topology: land-mass labeling and boundary tracing.
//!
//! The topology stage runs once per grid. [`label_land_masses`] partitions
//! land cells into 4-connected islands with deterministic dense labels, and
//! [`trace_island_boundaries`] walks once around each island to produce the
//! boundary mask and the four directional masks consumed by the line
//! integrals. [`ascii_map`] renders either map for the log.

mod ascii;
mod label;
mod perimeter;

pub use ascii::ascii_map;
pub use label::label_land_masses;
pub use perimeter::{trace_island_boundaries, Direction, IslandBoundaries, TracingError};
