//! Attendance and quorum, weighted by participation coefficient.

use std::collections::HashSet;

use serde::Serialize;

use agora_types::{Coefficient, PropertyUnit, PropertyUnitId};

use crate::rate::{bps_to_percent, meets_bps, percent_to_bps, ratio_bps};

/// Share of units, and of ownership, that took part.
///
/// Coefficients are summed exactly in micro-units; each rate is one division
/// of two exact sums.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumReport {
    pub total_units: u64,
    pub attended_units: u64,
    pub unit_rate: f64,
    pub unit_rate_pct: f64,
    pub unit_rate_bps: u32,
    pub total_coefficient: Coefficient,
    pub attended_coefficient: Coefficient,
    pub coefficient_rate: f64,
    pub coefficient_rate_pct: f64,
    pub coefficient_rate_bps: u32,
    #[serde(skip)]
    total_micros: u128,
    #[serde(skip)]
    attended_micros: u128,
}

impl QuorumReport {
    /// Whether the attended share of ownership reaches `threshold_percent`.
    /// A property with no ownership recorded never reaches quorum.
    pub fn reached(&self, threshold_percent: f64) -> bool {
        meets_bps(
            self.attended_micros,
            self.total_micros,
            percent_to_bps(threshold_percent),
        )
    }
}

/// Compute attendance for `units`, counting those in `attended`.
///
/// Ids in `attended` that are not among `units` are ignored.
pub fn quorum_for(units: &[PropertyUnit], attended: &HashSet<PropertyUnitId>) -> QuorumReport {
    let mut total_units = 0u64;
    let mut attended_units = 0u64;
    let mut total_micros = 0u128;
    let mut attended_micros = 0u128;
    for unit in units {
        let micros = unit.participation_coefficient.micros() as u128;
        total_units += 1;
        total_micros += micros;
        if attended.contains(&unit.id) {
            attended_units += 1;
            attended_micros += micros;
        }
    }

    let unit_rate_bps = ratio_bps(attended_units as u128, total_units as u128);
    let coefficient_rate_bps = ratio_bps(attended_micros, total_micros);
    QuorumReport {
        total_units,
        attended_units,
        unit_rate: rate(attended_units as u128, total_units as u128),
        unit_rate_pct: bps_to_percent(unit_rate_bps),
        unit_rate_bps,
        total_coefficient: saturating_coefficient(total_micros),
        attended_coefficient: saturating_coefficient(attended_micros),
        coefficient_rate: rate(attended_micros, total_micros),
        coefficient_rate_pct: bps_to_percent(coefficient_rate_bps),
        coefficient_rate_bps,
        total_micros,
        attended_micros,
    }
}

/// Free-function form of [`QuorumReport::reached`].
pub fn quorum_reached(report: &QuorumReport, threshold_percent: f64) -> bool {
    report.reached(threshold_percent)
}

fn rate(part: u128, whole: u128) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn saturating_coefficient(micros: u128) -> Coefficient {
    Coefficient::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
}
