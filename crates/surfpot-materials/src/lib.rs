//! # Surfpot Materials
//!
//! Named parameter sets for the Surfpot solvers. Every preset implements
//! the [`PresetProvider`](provider::PresetProvider) trait, which turns
//! human-scale inputs (nm, cm⁻³) into validated SI parameter records.
//!
//! ## Available presets
//!
//! | Preset | Module | Doping |
//! |--------|--------|--------|
//! | MoSe2 | [`library`] | n |
//! | Si_A … Si_D | [`library`] | n |
//! | Si_E | [`library`] | undoped (rejected on use) |
//! | Pentacene | [`library`] | p |
//! | Figure_ntype / Figure_ptype | [`library`] | n / p |
//!
//! Dynamic-probe presets (`Figure`, `Silicon_A`, `MoSe2`) live in
//! [`probes`].

pub mod library;
pub mod probes;
pub mod provider;

pub use library::{find_material, material_presets, MaterialPreset};
pub use probes::{find_probe, probe_presets, ProbePreset};
pub use provider::{MaterialError, PresetProvider};
