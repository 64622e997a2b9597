// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Acoustic conversions and band attenuation primitives.
//!
//! Everything inside the accumulator works in linear watts; decibel
//! conversions happen only at the spectrum input and level output
//! boundaries.

use std::f64::consts::PI;

/// Sound celerity in air, m/s
pub const SOUND_CELERITY: f64 = 344.23935;

/// Third-octave band center frequencies covered by the atmospheric
/// absorption table, Hz
pub const THIRD_OCTAVE_BANDS: [u32; 18] = [
    100, 125, 160, 200, 250, 315, 400, 500, 630, 800, 1000, 1250, 1600, 2000, 2500, 3150, 4000,
    5000,
];

/// Convert a dB(A) level to linear power.
#[inline]
pub fn dba_to_w(dba: f64) -> f64 {
    10f64.powf(dba / 10.0)
}

/// Convert linear power to a dB(A) level. Zero power maps to -inf.
#[inline]
pub fn w_to_dba(w: f64) -> f64 {
    10.0 * w.log10()
}

/// Geometric spreading of a point source over `distance` meters.
/// Distances under one meter are clamped so the level stays finite.
#[inline]
pub fn attenuated_by_distance(wj: f64, distance: f64) -> f64 {
    if distance < 1.0 {
        wj / (4.0 * PI)
    } else {
        wj / (4.0 * PI * distance * distance)
    }
}

/// Atmospheric absorption over `distance` meters with `alpha` in dB/km.
#[inline]
pub fn attenuated_by_atmosphere(wj: f64, distance: f64, alpha: f64) -> f64 {
    dba_to_w(w_to_dba(wj) - (alpha * distance) / 1000.0)
}

/// ISO 9613-1 atmospheric absorption at 15 deg C and 70 % humidity, dB/km.
/// Frequencies outside the table absorb nothing.
pub fn atmospheric_alpha(freq: u32) -> f64 {
    match freq {
        100 => 0.25,
        125 => 0.38,
        160 => 0.57,
        200 => 0.82,
        250 => 1.13,
        315 => 1.51,
        400 => 1.92,
        500 => 2.36,
        630 => 2.84,
        800 => 3.38,
        1000 => 4.08,
        1250 => 5.05,
        1600 => 6.51,
        2000 => 8.75,
        2500 => 12.2,
        3150 => 17.7,
        4000 => 26.4,
        5000 => 39.9,
        _ => 0.0,
    }
}

/// Wavelength of a band center frequency; non-positive frequencies fall back
/// to one meter.
#[inline]
pub fn wavelength(freq: u32) -> f64 {
    if freq > 0 {
        SOUND_CELERITY / freq as f64
    } else {
        1.0
    }
}
