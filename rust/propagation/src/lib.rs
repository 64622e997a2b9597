//! Noisefield propagation engine
//!
//! Per-receiver outdoor sound propagation over third-octave bands:
//! adaptive-radius source search, specular reflection through mirrored
//! receiver images, corner-graph diffraction and energetic band
//! accumulation, driven cell by cell over a spatial grid.

pub mod acoustics;
pub mod cell;
pub mod config;
mod diffraction;
pub mod error;
pub mod grid;
pub mod mirror;
pub mod process;
pub mod sources;

pub use acoustics::{dba_to_w, w_to_dba, THIRD_OCTAVE_BANDS};
pub use cell::{
    evaluate_cell, CellInputs, CellResult, CellStats, GroundArea, ProgressHandle, ReceiverLevel,
    ResultRecord, TriangleLevels, BASE_POWER,
};
pub use config::PropagationConfig;
pub use error::{Error, Result};
pub use grid::CellGrid;
pub use mirror::{mirrored_receivers, MirrorReceiver};
pub use process::CellEvaluator;
pub use sources::{PointsMerge, SourceGeometry, SourceIndex, SourceRecord};
