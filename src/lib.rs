//! frey - message passing inference on factor graphs.
//!
//! A factor graph is a bipartite graph of variable nodes and factor nodes that
//! represents the factorization of a joint function. This crate builds such graphs,
//! attaches potentials (discrete probability tables or Gaussian canonical forms) to
//! the factor nodes, and runs sum-product, max-product or max-sum message passing
//! over them - exactly on trees via a two-pass schedule, approximately on cyclic
//! graphs via an iterative flooding schedule with convergence detection.

extern crate bidir_map;
extern crate indexmap;
#[macro_use]
extern crate itertools;
#[macro_use]
extern crate log;
extern crate nalgebra;
#[macro_use]
extern crate ndarray;
extern crate ndarray_rand;
extern crate rand;

pub mod graph;
pub mod inference;
pub mod init;
pub mod potential;
pub mod util;
pub mod variable;
pub use util::{Result, FreyError};
