//! Island topology and barotropic streamfunction coupling for ocean models.
//!
//! Given a staggered horizontal grid with a land-sea mask, this crate
//! labels the connected land masses, traces a closed boundary loop around
//! each one, solves an elliptic boundary-value problem per island for its
//! streamfunction response, and assembles the dense coupling matrix of
//! boundary line integrals. The entry point is
//! [`streamfunction::streamfunction_init`]; its [`StreamfunctionState`]
//! result is what a barotropic mode solver consumes every time step.
//!
//! # Layout
//!
//! - [`grid`]: padded staggered fields, masks and halo exchange
//! - [`topology`]: land-mass labeling and boundary tracing
//! - [`solver`]: the elliptic operator and pluggable linear solvers
//! - [`streamfunction`]: the initialization driver and coupling integrals
//!
//! [`StreamfunctionState`]: streamfunction::StreamfunctionState

pub mod grid;
pub mod solver;
pub mod streamfunction;
pub mod topology;

pub use grid::{Exchange, Field2, SingleProcess, StaggeredGrid};
pub use solver::{BackendKind, SolverConfig, SolverError};
pub use streamfunction::{
    streamfunction_init, InitError, StreamfunctionConfig, StreamfunctionState,
};
pub use topology::{IslandBoundaries, TracingError};
