//! # Track interface crate.
//!
//! Provides the interfaces shared between the line generator, the controller and whatever hosts
//! them: the track description consumed at load time and the per-tick vehicle exchange.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Track geometry input
pub mod track;

/// Vehicle tick input and drive command output
pub mod vehicle;
