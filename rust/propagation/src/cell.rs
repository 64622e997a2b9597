// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cell driver: evaluate every receiver of one spatial grid cell.
//!
//! A cell is an independent unit of work with read-only inputs; receivers
//! are embarrassingly parallel, so they run on the rayon pool and the
//! per-worker outcomes merge after the join. Cancellation is cooperative and
//! checked between receivers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nalgebra::Point2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use noisefield_geometry::{FreeFieldTest, Triangle};

use crate::config::PropagationConfig;
use crate::error::{Error, Result};
use crate::process::CellEvaluator;
use crate::sources::SourceIndex;

/// Baseline reference power (0 dB); receiver levels never drop below it in
/// emitted records
pub const BASE_POWER: f64 = 1.0;

/// A soil-type area carried alongside the inputs.
///
/// Reserved for ground-effect evaluation; the band accumulator itself does
/// not consume it, matching the engine's scope.
#[derive(Clone, Debug)]
pub struct GroundArea {
    pub contour: Vec<Point2<f64>>,
    /// Ground factor G in [0, 1]
    pub ground_factor: f64,
}

/// Cooperative progress and cancellation handle.
///
/// Cloned handles share state: the driver ticks the done counter after each
/// receiver and aborts the cell between receivers once cancelled.
#[derive(Clone, Debug, Default)]
pub struct ProgressHandle {
    cancelled: Arc<AtomicBool>,
    done: Arc<AtomicUsize>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn tick(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of receivers completed so far.
    pub fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

/// Read-only inputs of one cell evaluation.
///
/// In triangle output mode the receivers are the mesh vertices and
/// `triangles` selects the per-triangle record layout; otherwise one record
/// per receiver is emitted, labelled through `receiver_row_ids` when
/// present.
pub struct CellInputs<'a> {
    pub receivers: &'a [Point2<f64>],
    pub receiver_row_ids: Option<&'a [u64]>,
    pub triangles: Option<&'a [Triangle]>,
    pub free_field: &'a (dyn FreeFieldTest + Sync),
    pub sources: &'a SourceIndex,
    pub frequencies: &'a [u32],
    pub config: PropagationConfig,
    pub cell_id: u32,
    pub progress: Option<&'a ProgressHandle>,
    pub soil_areas: Option<&'a [GroundArea]>,
}

/// Aggregate counters of one cell evaluation; mergeable across cells.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CellStats {
    pub obstruction_tests: u64,
    pub image_receivers: u64,
    pub source_pairs: u64,
    pub reflection_paths: u64,
    pub diffraction_paths: u64,
    pub receivers: u64,
    pub cells: u64,
    pub min_receiver_time: Duration,
    pub max_receiver_time: Duration,
    pub total_receiver_time: Duration,
}

impl CellStats {
    pub fn merge(&mut self, other: &CellStats) {
        self.obstruction_tests += other.obstruction_tests;
        self.image_receivers += other.image_receivers;
        self.source_pairs += other.source_pairs;
        self.reflection_paths += other.reflection_paths;
        self.diffraction_paths += other.diffraction_paths;
        self.receivers += other.receivers;
        self.cells += other.cells;
        if other.receivers > 0 {
            self.min_receiver_time = if self.receivers > 0 {
                self.min_receiver_time.min(other.min_receiver_time)
            } else {
                other.min_receiver_time
            };
            self.max_receiver_time = self.max_receiver_time.max(other.max_receiver_time);
        }
        self.total_receiver_time += other.total_receiver_time;
    }
}

/// Level at one receiver, linear power floored at [`BASE_POWER`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiverLevel {
    pub receiver_id: u64,
    pub cell_id: u32,
    pub power: f64,
}

/// Levels at the three corner receivers of one mesh triangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriangleLevels {
    pub triangle_id: u32,
    pub cell_id: u32,
    pub levels: [f64; 3],
}

/// One output record; the two variants never mix within a cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ResultRecord {
    Receiver(ReceiverLevel),
    Triangle(TriangleLevels),
}

/// Outcome of one cell evaluation.
#[derive(Clone, Debug, Default)]
pub struct CellResult {
    pub records: Vec<ResultRecord>,
    pub stats: CellStats,
}

/// Evaluate every receiver of a cell and assemble its result records.
pub fn evaluate_cell(inputs: &CellInputs) -> Result<CellResult> {
    if inputs.frequencies.is_empty() {
        return Err(Error::InvalidInput("no frequency bands".to_string()));
    }
    if let Some(ids) = inputs.receiver_row_ids {
        if ids.len() != inputs.receivers.len() {
            return Err(Error::InvalidInput(
                "receiver_row_ids length differs from receivers".to_string(),
            ));
        }
    }
    if let Some(triangles) = inputs.triangles {
        let receiver_count = inputs.receivers.len() as u32;
        if triangles
            .iter()
            .any(|t| t.a >= receiver_count || t.b >= receiver_count || t.c >= receiver_count)
        {
            return Err(Error::InvalidInput(
                "triangle vertex index out of receiver range".to_string(),
            ));
        }
    }
    debug!(
        cell = inputs.cell_id,
        receivers = inputs.receivers.len(),
        sources = inputs.sources.len(),
        "evaluating cell"
    );

    let evaluator = CellEvaluator::new(inputs);
    let tests_before = inputs.free_field.obstruction_test_count();

    let outcomes: Vec<Option<ReceiverOutcome>> = inputs
        .receivers
        .par_iter()
        .map(|receiver| {
            if inputs.progress.map(|p| p.is_cancelled()).unwrap_or(false) {
                return None;
            }
            let started = Instant::now();
            let (bands, receiver_stats) = evaluator.evaluate_receiver(*receiver);
            let elapsed = started.elapsed();
            if let Some(progress) = inputs.progress {
                progress.tick();
            }
            let power: f64 = bands.iter().sum();
            Some(ReceiverOutcome {
                power: power.max(BASE_POWER),
                elapsed,
                stats: receiver_stats,
            })
        })
        .collect();

    if outcomes.iter().any(|o| o.is_none()) {
        return Err(Error::Cancelled);
    }
    let outcomes: Vec<ReceiverOutcome> = outcomes.into_iter().flatten().collect();

    let mut stats = CellStats {
        cells: 1,
        receivers: outcomes.len() as u64,
        ..CellStats::default()
    };
    for outcome in &outcomes {
        stats.image_receivers += outcome.stats.image_receivers;
        stats.source_pairs += outcome.stats.source_pairs;
        stats.reflection_paths += outcome.stats.reflection_paths;
        stats.diffraction_paths += outcome.stats.diffraction_paths;
        stats.total_receiver_time += outcome.elapsed;
        stats.max_receiver_time = stats.max_receiver_time.max(outcome.elapsed);
    }
    if let Some(min) = outcomes.iter().map(|o| o.elapsed).min() {
        stats.min_receiver_time = min;
    }
    stats.obstruction_tests = inputs
        .free_field
        .obstruction_test_count()
        .saturating_sub(tests_before);

    let records: Vec<ResultRecord> = match inputs.triangles {
        Some(triangles) => triangles
            .iter()
            .enumerate()
            .map(|(id, t)| {
                ResultRecord::Triangle(TriangleLevels {
                    triangle_id: id as u32,
                    cell_id: inputs.cell_id,
                    levels: [
                        outcomes[t.a as usize].power,
                        outcomes[t.b as usize].power,
                        outcomes[t.c as usize].power,
                    ],
                })
            })
            .collect(),
        None => outcomes
            .iter()
            .enumerate()
            .map(|(id, outcome)| {
                let receiver_id = inputs
                    .receiver_row_ids
                    .map(|ids| ids[id])
                    .unwrap_or(id as u64);
                ResultRecord::Receiver(ReceiverLevel {
                    receiver_id,
                    cell_id: inputs.cell_id,
                    power: outcome.power,
                })
            })
            .collect(),
    };

    debug!(
        cell = inputs.cell_id,
        records = records.len(),
        obstruction_tests = stats.obstruction_tests,
        "cell done"
    );
    Ok(CellResult { records, stats })
}

struct ReceiverOutcome {
    power: f64,
    elapsed: Duration,
    stats: crate::process::ReceiverStats,
}
