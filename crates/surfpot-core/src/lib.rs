//! # Surfpot Core
//!
//! The numerical backbone of Surfpot. This crate computes the electrostatics
//! of a metal-insulator-semiconductor stack: surface potential, field,
//! charge, force and polarization as functions of gate bias and insulator
//! thickness.
//!
//! ## Architecture
//!
//! A [`bulk::BulkState`] is derived once per material/device pair. Solvers
//! implement the [`solver::ElectrostaticSolver`] trait; the physical
//! implementation is [`solver::SurfacePotentialSolver`], a safeguarded
//! Newton iteration on the charge-balance equation. The
//! [`sweep::SweepEngine`] evaluates any solver over bias, thickness or tip
//! trajectories on a `surfpot-compute` backend.
//!
//! ## Modules
//!
//! - [`constants`] — Physical constants and unit conversions.
//! - [`types`] — Material/device parameters, regimes, operating points.
//! - [`bulk`] — Equilibrium bulk state (Fermi level, CPD, Debye length).
//! - [`solver`] — Root finding and the surface-potential solver.
//! - [`derived`] — Field, charge, force, capacitance, regime classification.
//! - [`profile`] — Band-bending profile into the semiconductor.
//! - [`sweep`] — Parallel bias / thickness / trajectory sweeps.
//! - [`afm`] — Dynamic-mode probe frequency shift and dissipation.

pub mod afm;
pub mod bulk;
pub mod constants;
pub mod derived;
pub mod profile;
pub mod solver;
pub mod sweep;
pub mod types;
