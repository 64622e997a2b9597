// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-receiver propagation: adaptive source search and energetic
//! accumulation of direct, reflected and diffracted contributions.
//!
//! The search expands over a fixed ring sequence up to the maximum
//! propagation distance. Inside each ring, sources are discretized, merged
//! into emitters and processed nearest first; a source whose worst-case
//! contribution cannot shift the running total is skipped, and the ring
//! expansion stops early once the whole unexplored area has become
//! negligible. All band math stays in linear watts.

use nalgebra::Point2;
use rstar::{primitives::GeomWithData, RTree};
use rustc_hash::FxHashSet;

use noisefield_geometry::contour::{segment_intersection, Envelope};
use noisefield_geometry::WallSegment;

use crate::acoustics::{
    atmospheric_alpha, attenuated_by_atmosphere, attenuated_by_distance, dba_to_w, w_to_dba,
    wavelength,
};
use crate::cell::{CellInputs, BASE_POWER};
use crate::diffraction::explore_corner_chains;
use crate::mirror::{mirrored_receivers, wall_faces_point, MirrorReceiver};
use crate::sources::{split_line_into_points, PointsMerge, SourceGeometry};

/// Open-angle band outside which a corner cannot diffract: just over
/// straight up to just under a full turn
const WIDE_ANGLE_MIN: f64 = std::f64::consts::PI * (1.0 + 1.0 / 16.0);
const WIDE_ANGLE_MAX: f64 = std::f64::consts::PI * (2.0 - 1.0 / 16.0);

/// Offset pulling a reflection point off its wall before visibility testing,
/// meters
const REFLECTION_EPSILON: f64 = 0.01;

/// Per-receiver path counters, merged into the cell statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReceiverStats {
    pub image_receivers: u64,
    pub source_pairs: u64,
    pub reflection_paths: u64,
    pub diffraction_paths: u64,
}

/// A merged point emitter with its per-band power.
struct Emitter {
    position: Point2<f64>,
    wj: Vec<f64>,
}

/// Shared per-cell evaluation state: band constants and the diffraction
/// corner index, built once and read by every receiver worker.
pub struct CellEvaluator<'a> {
    inputs: &'a CellInputs<'a>,
    alpha_atmo: Vec<f64>,
    freq_lambda: Vec<f64>,
    corners: Vec<Point2<f64>>,
    corner_tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl<'a> CellEvaluator<'a> {
    pub fn new(inputs: &'a CellInputs<'a>) -> Self {
        let alpha_atmo: Vec<f64> = inputs
            .frequencies
            .iter()
            .map(|&f| atmospheric_alpha(f))
            .collect();
        let freq_lambda: Vec<f64> = inputs.frequencies.iter().map(|&f| wavelength(f)).collect();

        let corners = if inputs.config.diffraction_order > 0 {
            inputs
                .free_field
                .wide_angle_corners(WIDE_ANGLE_MIN, WIDE_ANGLE_MAX)
        } else {
            Vec::new()
        };
        let corner_tree = RTree::bulk_load(
            corners
                .iter()
                .enumerate()
                .map(|(id, c)| GeomWithData::new([c.x, c.y], id))
                .collect(),
        );

        Self {
            inputs,
            alpha_atmo,
            freq_lambda,
            corners,
            corner_tree,
        }
    }

    /// Per-band energetic sum at one receiver, in linear watts. No baseline
    /// floor is applied, so a receiver without any valid path sums to zero
    /// (minus infinity dB).
    pub fn band_levels(&self, receiver: Point2<f64>) -> Vec<f64> {
        self.evaluate_receiver(receiver).0
    }

    /// Band sums plus the path counters of one receiver.
    pub fn evaluate_receiver(&self, receiver: Point2<f64>) -> (Vec<f64>, ReceiverStats) {
        let cfg = &self.inputs.config;
        let bands = self.inputs.frequencies.len();
        let mut energetic_sum = vec![0.0; bands];
        let mut stats = ReceiverStats::default();

        // Walls and mirrored receiver images for reflection
        let mut walls: Vec<WallSegment> = Vec::new();
        let mut mirrors: Vec<MirrorReceiver> = Vec::new();
        if cfg.reflection_order > 0 {
            walls = self
                .inputs
                .free_field
                .walls_in_range(cfg.max_reflection_distance, receiver);
            mirrors = mirrored_receivers(
                receiver,
                &walls,
                cfg.reflection_order,
                cfg.max_reflection_distance * 2.0,
                cfg.receiver_image_limit,
            );
            stats.image_receivers = mirrors.len() as u64;
        }

        // Diffraction corner candidates around the receiver
        let mut region_corners: Vec<Point2<f64>> = Vec::new();
        let mut corners_free_to_receiver: Vec<usize> = Vec::new();
        if cfg.diffraction_order > 0 {
            let query = Envelope::around(receiver, cfg.max_reflection_distance);
            let mut hits: Vec<usize> = self
                .corner_tree
                .locate_in_envelope_intersecting(&query.aabb())
                .map(|g| g.data)
                .filter(|&id| (self.corners[id] - receiver).norm() <= cfg.max_reflection_distance)
                .collect();
            hits.sort_unstable();
            region_corners = hits.iter().map(|&id| self.corners[id]).collect();
            corners_free_to_receiver = (0..region_corners.len())
                .filter(|&i| {
                    self.inputs
                        .free_field
                        .is_free_field(receiver, region_corners[i])
                })
                .collect();
        }

        // Expanding source search; the global energetic sum of all processed
        // sources opens at the baseline so the termination test stays finite
        let mut src_energetic_sum = BASE_POWER;
        let worst_case_power = dba_to_w(cfg.worst_case_source_db);
        let ranges = [
            cfg.first_step_range,
            cfg.max_source_distance / 5.0,
            cfg.max_source_distance / 4.0,
            cfg.max_source_distance / 2.0,
            cfg.max_source_distance,
        ];
        let mut processed: FxHashSet<usize> = FxHashSet::default();

        for search_distance in ranges {
            let region = Envelope::around(receiver, search_distance);
            let mut merger = PointsMerge::new(cfg.source_merge_distance);
            let mut emitters: Vec<Emitter> = Vec::new();
            let mut scratch: Vec<Point2<f64>> = Vec::new();

            let candidates: Vec<usize> = self.inputs.sources.query(&region).collect();
            for source_id in candidates {
                if !processed.insert(source_id) {
                    continue;
                }
                let record = self.inputs.sources.record(source_id);
                match &record.geometry {
                    SourceGeometry::Point(position) => {
                        insert_point_source(&mut emitters, &mut merger, *position, &record.spectrum, 1.0);
                    }
                    SourceGeometry::Line(points) => {
                        scratch.clear();
                        let li = split_line_into_points(
                            points,
                            receiver,
                            cfg.min_receiver_distance,
                            &mut scratch,
                        );
                        for &point in &scratch {
                            insert_point_source(&mut emitters, &mut merger, point, &record.spectrum, li);
                        }
                    }
                }
            }

            // Nearest emitters first so the relevance threshold can cut the
            // tail
            let mut order: Vec<usize> = (0..emitters.len()).collect();
            order.sort_by(|&a, &b| {
                let da = (emitters[a].position - receiver).norm();
                let db = (emitters[b].position - receiver).norm();
                da.partial_cmp(&db).unwrap()
            });

            for emitter_id in order {
                let emitter = &emitters[emitter_id];
                let receiver_level: f64 = energetic_sum.iter().sum();
                let source_level: f64 = emitter.wj.iter().sum();
                let distance = (emitter.position - receiver).norm();
                let attenuated = attenuated_by_distance(source_level, distance);
                src_energetic_sum += attenuated;
                // NaN (silent source onto silent receiver) fails the test and
                // skips the emitter
                if (w_to_dba(attenuated + receiver_level) - w_to_dba(receiver_level)).abs()
                    > cfg.forget_source_db
                {
                    stats.source_pairs += 1;
                    self.receiver_source_propagation(
                        emitter.position,
                        receiver,
                        &mut energetic_sum,
                        &emitter.wj,
                        &mirrors,
                        &walls,
                        &region_corners,
                        &corners_free_to_receiver,
                        &mut stats,
                    );
                }
            }

            // Could anything beyond this ring still matter?
            let remainder = attenuated_by_distance(worst_case_power, search_distance);
            if (w_to_dba(remainder + src_energetic_sum) - w_to_dba(src_energetic_sum)).abs()
                < cfg.forget_source_db
            {
                break;
            }
        }

        (energetic_sum, stats)
    }

    /// Accumulate the direct, reflected and diffracted contributions of one
    /// emitter.
    #[allow(clippy::too_many_arguments)]
    fn receiver_source_propagation(
        &self,
        src: Point2<f64>,
        receiver: Point2<f64>,
        energetic_sum: &mut [f64],
        wj: &[f64],
        mirrors: &[MirrorReceiver],
        walls: &[WallSegment],
        region_corners: &[Point2<f64>],
        corners_free_to_receiver: &[usize],
        stats: &mut ReceiverStats,
    ) {
        let cfg = &self.inputs.config;
        let bands = self.inputs.frequencies.len();
        let src_receiver_distance = (src - receiver).norm();
        if src_receiver_distance >= cfg.max_source_distance {
            return;
        }

        let something_hides_receiver = !self.inputs.free_field.is_free_field(receiver, src);
        if !something_hides_receiver {
            for band in 0..bands {
                let wj_band = wj.get(band).copied().unwrap_or(0.0);
                let attenuated = attenuated_by_distance(wj_band, src_receiver_distance);
                let attenuated = attenuated_by_atmosphere(
                    attenuated,
                    src_receiver_distance,
                    self.alpha_atmo[band],
                );
                energetic_sum[band] += attenuated;
            }
        }

        // Specular reflection over the mirrored receiver images
        if cfg.reflection_order > 0 {
            for mirror in mirrors {
                let reflected_distance = (mirror.position - src).norm();
                if reflected_distance >= cfg.max_source_distance {
                    continue;
                }
                if let Some(bounces) = self.validate_reflection(mirror, mirrors, walls, src, receiver)
                {
                    stats.reflection_paths += 1;
                    let wall_keep = (1.0 - cfg.wall_absorption).powi(bounces as i32);
                    for band in 0..bands {
                        let wj_band = wj.get(band).copied().unwrap_or(0.0);
                        // Geometric dispersion over the unfolded path
                        let attenuated = attenuated_by_distance(wj_band, reflected_distance);
                        // Wall material loss per bounce
                        let attenuated = attenuated * wall_keep;
                        let attenuated = attenuated_by_atmosphere(
                            attenuated,
                            reflected_distance,
                            self.alpha_atmo[band],
                        );
                        energetic_sum[band] += attenuated;
                    }
                }
            }
        }

        // Diffraction around corners, only worth searching when the direct
        // sight line is blocked
        if something_hides_receiver
            && cfg.diffraction_order > 0
            && !corners_free_to_receiver.is_empty()
        {
            explore_corner_chains(
                src,
                region_corners,
                corners_free_to_receiver,
                cfg.diffraction_order,
                self.inputs.free_field,
                |chain| {
                    // Corner-to-corner length of the chain
                    let mut elength = 0.0;
                    for pair in chain.windows(2) {
                        elength += (region_corners[pair[1]] - region_corners[pair[0]]).norm();
                    }
                    let full_distance = (region_corners[chain[0]] - receiver).norm()
                        + elength
                        + (region_corners[*chain.last().unwrap()] - src).norm();
                    if full_distance >= cfg.max_source_distance {
                        return true;
                    }
                    stats.diffraction_paths += 1;
                    let delta = full_distance - src_receiver_distance;

                    for band in 0..bands {
                        let lambda = self.freq_lambda[band];
                        // C'' correction: single diffraction needs none,
                        // multiple diffraction scales with the inter-corner
                        // path
                        let cprime = if chain.len() == 1 {
                            1.0
                        } else {
                            let gamma_part = ((5.0 * lambda) / elength).powi(2);
                            (1.0 + gamma_part) / (1.0 / 3.0 + gamma_part)
                        };
                        let test_form = (40.0 / lambda) * cprime * delta;
                        // Diffraction never adds energy
                        let diffraction_db = if test_form >= -2.0 {
                            (10.0 * (3.0 + test_form).log10()).max(0.0)
                        } else {
                            0.0
                        };
                        let wj_band = wj.get(band).copied().unwrap_or(0.0);
                        let attenuated = attenuated_by_distance(wj_band, src_receiver_distance);
                        let attenuated = dba_to_w(w_to_dba(attenuated) - diffraction_db);
                        let attenuated = attenuated_by_atmosphere(
                            attenuated,
                            full_distance,
                            self.alpha_atmo[band],
                        );
                        energetic_sum[band] += attenuated;
                    }

                    stats.diffraction_paths <= cfg.diffraction_path_limit as u64
                },
            );
        }
    }

    /// Walk a mirror chain from the outermost image back to the receiver,
    /// checking that every reflection point lands on its wall and sees the
    /// next link. Returns the number of bounces of a valid path.
    fn validate_reflection(
        &self,
        start: &MirrorReceiver,
        mirrors: &[MirrorReceiver],
        walls: &[WallSegment],
        src: Point2<f64>,
        receiver: Point2<f64>,
    ) -> Option<u32> {
        let free_field = self.inputs.free_field;
        let mut cursor = start;
        let mut destination = src;
        let mut wall = &walls[cursor.wall_id];
        let mut intersection =
            segment_intersection(wall.p0, wall.p1, cursor.position, destination);
        let mut bounces = 0u32;
        let mut valid = false;

        while let Some(point) = intersection {
            if !wall_faces_point(wall, destination) {
                break;
            }
            bounces += 1;
            // Pull the reflection point towards the destination to avoid the
            // wall occluding its own reflection
            let mut reflection_point = point;
            let offset = reflection_point - destination;
            let length = offset.norm();
            if length > 0.0 {
                reflection_point -= offset / length * REFLECTION_EPSILON;
            }
            valid = free_field.is_free_field(reflection_point, destination);
            if !valid {
                break;
            }
            match cursor.parent {
                None => {
                    // Last link: the reflection point must see the receiver
                    valid = free_field.is_free_field(reflection_point, receiver);
                    break;
                }
                Some(parent) => {
                    destination = reflection_point;
                    cursor = &mirrors[parent];
                    wall = &walls[cursor.wall_id];
                    intersection =
                        segment_intersection(wall.p0, wall.p1, cursor.position, destination);
                    valid = false;
                }
            }
        }

        valid.then_some(bounces)
    }
}

fn insert_point_source(
    emitters: &mut Vec<Emitter>,
    merger: &mut PointsMerge,
    position: Point2<f64>,
    spectrum: &[f64],
    li: f64,
) {
    let index = merger.get_or_append(position);
    if index < emitters.len() {
        // An emitter close enough already exists: energetic merge
        let merged = &mut emitters[index];
        for (band, w) in merged.wj.iter_mut().zip(spectrum) {
            *band += w * li;
        }
    } else {
        emitters.push(Emitter {
            position,
            wj: spectrum.iter().map(|w| w * li).collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellInputs;
    use crate::config::PropagationConfig;
    use crate::sources::{SourceIndex, SourceRecord};
    use approx::assert_relative_eq;
    use noisefield_geometry::{merge_footprints, Footprint, FootprintIndex};

    fn open_field_index() -> FootprintIndex {
        FootprintIndex::new(merge_footprints(&[]))
    }

    fn config() -> PropagationConfig {
        PropagationConfig {
            reflection_order: 0,
            diffraction_order: 0,
            max_source_distance: 200.0,
            max_reflection_distance: 50.0,
            wall_absorption: 0.0,
            ..PropagationConfig::default()
        }
    }

    #[test]
    fn open_field_level_is_pure_spreading_and_atmosphere() {
        let free_field = open_field_index();
        let mut sources = SourceIndex::new();
        sources.add(SourceRecord::point(
            Point2::new(0.0, 0.0),
            vec![dba_to_w(100.0)],
        ));
        let frequencies = [125u32];
        let inputs = CellInputs {
            receivers: &[],
            receiver_row_ids: None,
            triangles: None,
            free_field: &free_field,
            sources: &sources,
            frequencies: &frequencies,
            config: config(),
            cell_id: 0,
            progress: None,
            soil_areas: None,
        };
        let evaluator = CellEvaluator::new(&inputs);
        let bands = evaluator.band_levels(Point2::new(10.0, 0.0));
        let expected = attenuated_by_atmosphere(
            attenuated_by_distance(dba_to_w(100.0), 10.0),
            10.0,
            atmospheric_alpha(125),
        );
        assert_relative_eq!(bands[0], expected, max_relative = 1e-9);
    }

    #[test]
    fn emitters_within_tolerance_merge_energetically() {
        let free_field = open_field_index();
        let mut sources = SourceIndex::new();
        // Two collocated sources of power P...
        sources.add(SourceRecord::point(
            Point2::new(0.0, 0.0),
            vec![dba_to_w(100.0)],
        ));
        sources.add(SourceRecord::point(
            Point2::new(0.0, 0.0),
            vec![dba_to_w(100.0)],
        ));
        let frequencies = [125u32];
        let inputs = CellInputs {
            receivers: &[],
            receiver_row_ids: None,
            triangles: None,
            free_field: &free_field,
            sources: &sources,
            frequencies: &frequencies,
            config: config(),
            cell_id: 0,
            progress: None,
            soil_areas: None,
        };
        let evaluator = CellEvaluator::new(&inputs);
        let duplicated = evaluator.band_levels(Point2::new(20.0, 0.0));

        // ...equal one source of power 2P
        let mut single = SourceIndex::new();
        single.add(SourceRecord::point(
            Point2::new(0.0, 0.0),
            vec![2.0 * dba_to_w(100.0)],
        ));
        let inputs_single = CellInputs {
            receivers: &[],
            receiver_row_ids: None,
            triangles: None,
            free_field: &free_field,
            sources: &single,
            frequencies: &frequencies,
            config: config(),
            cell_id: 0,
            progress: None,
            soil_areas: None,
        };
        let evaluator_single = CellEvaluator::new(&inputs_single);
        let doubled = evaluator_single.band_levels(Point2::new(20.0, 0.0));

        assert_relative_eq!(duplicated[0], doubled[0], max_relative = 1e-9);
    }

    #[test]
    fn faraway_source_is_out_of_range() {
        let free_field = open_field_index();
        let mut sources = SourceIndex::new();
        sources.add(SourceRecord::point(
            Point2::new(500.0, 0.0),
            vec![dba_to_w(100.0)],
        ));
        let frequencies = [125u32];
        let inputs = CellInputs {
            receivers: &[],
            receiver_row_ids: None,
            triangles: None,
            free_field: &free_field,
            sources: &sources,
            frequencies: &frequencies,
            config: config(),
            cell_id: 0,
            progress: None,
            soil_areas: None,
        };
        let evaluator = CellEvaluator::new(&inputs);
        let bands = evaluator.band_levels(Point2::new(0.0, 0.0));
        assert_eq!(bands[0], 0.0);
    }

    #[test]
    fn blocked_receiver_without_paths_is_silent() {
        let merged = merge_footprints(&[Footprint::new(vec![
            Point2::new(-5.0, -5.0),
            Point2::new(5.0, -5.0),
            Point2::new(5.0, 5.0),
            Point2::new(-5.0, 5.0),
        ])]);
        let free_field = FootprintIndex::new(merged);
        let mut sources = SourceIndex::new();
        sources.add(SourceRecord::point(
            Point2::new(20.0, 0.0),
            vec![dba_to_w(100.0)],
        ));
        let frequencies = [125u32];
        let inputs = CellInputs {
            receivers: &[],
            receiver_row_ids: None,
            triangles: None,
            free_field: &free_field,
            sources: &sources,
            frequencies: &frequencies,
            config: PropagationConfig {
                reflection_order: 2,
                diffraction_order: 2,
                max_source_distance: 200.0,
                wall_absorption: 0.0,
                ..PropagationConfig::default()
            },
            cell_id: 0,
            progress: None,
            soil_areas: None,
        };
        let evaluator = CellEvaluator::new(&inputs);
        // Receiver inside the building: no direct, reflected or diffracted path
        let bands = evaluator.band_levels(Point2::new(0.0, 0.0));
        assert_eq!(bands[0], 0.0);
        assert!(w_to_dba(bands[0]).is_infinite());
    }
}
