// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Propagation configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs of the per-receiver propagation computation.
///
/// The first group mirrors the usual engineering inputs (path orders and
/// distance caps). The second group exposes the adaptive-search thresholds:
/// they trade accuracy against run time and are deliberately configuration,
/// not constants, but their defaults reproduce the reference behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Maximum number of specular reflections per path (0 disables
    /// reflection search)
    pub reflection_order: u32,
    /// Maximum number of diffraction corners per path (0 disables
    /// diffraction search)
    pub diffraction_order: u32,
    /// Maximum source-receiver propagation distance, meters
    pub max_source_distance: f64,
    /// Maximum receiver-wall distance considered for reflection, meters
    pub max_reflection_distance: f64,
    /// Minimum effective receiver-source distance, meters
    pub min_receiver_distance: f64,
    /// Wall absorption coefficient in [0, 1); each bounce keeps
    /// `1 - wall_absorption` of the power
    pub wall_absorption: f64,

    /// Level shift (dB) below which a remaining source or search ring is
    /// considered negligible
    pub forget_source_db: f64,
    /// Radius of the first source-search ring, meters
    pub first_step_range: f64,
    /// Worst-case source power, dB(A), bounding the unexplored area during
    /// the adaptive search
    pub worst_case_source_db: f64,
    /// Distance under which discretized emitters merge into one, meters
    pub source_merge_distance: f64,
    /// Hard cap on mirrored receiver images per receiver
    pub receiver_image_limit: usize,
    /// Hard cap on contributing diffraction paths per receiver
    pub diffraction_path_limit: usize,
    /// Account for propagation over building roofs (reserved; the horizontal
    /// engine does not evaluate vertical planes)
    pub vertical_diffraction: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            reflection_order: 2,
            diffraction_order: 1,
            max_source_distance: 170.0,
            max_reflection_distance: 50.0,
            min_receiver_distance: 1.0,
            wall_absorption: 0.2,
            forget_source_db: 0.03,
            first_step_range: 90.0,
            worst_case_source_db: 94.0,
            source_merge_distance: 1.0,
            receiver_image_limit: 1000,
            diffraction_path_limit: 1000,
            vertical_diffraction: false,
        }
    }
}
