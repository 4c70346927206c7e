//! Interaction and optimistic-state engine for task boards.
//!
//! [`board`] holds the engine: selection, the optimistic mutation
//! coordinator, the drag controller and the session that wires them
//! together. [`io`] holds the remote service boundary and file storage,
//! [`model`] the data types, and [`ops`] the pure transforms they share.

pub mod board;
pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
