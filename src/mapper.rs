//! Projection of raw records into display values
//!
//! Most fields resolve through the static table in [`crate::fields`]. Two
//! areas need logic beyond the table: the PV block, whose matrix layout
//! differs between firmware families and is re-detected on every record, and
//! the `*_today` energy counters, which pass through a per-counter glitch
//! filter before being exposed.

use crate::config::GlitchFilterConfig;
use crate::energy::EnergyTodayFilter;
use crate::fields::{self, FieldSpec, Transform};
use crate::record::{PathSeg::Idx, PathSeg::Key, RawRecord};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Round half away from zero to `digits` decimal places
fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Truncate (toward zero) to `digits` decimal places. Matches the vendor
/// app, which never rounds energy counters up.
fn trunc_decimals(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).trunc() / factor
}

fn num(value: f64) -> Option<Value> {
    Number::from_f64(value).map(Value::Number)
}

/// Detect the aggregated PV matrix layout used by some firmwares.
///
/// Observed layouts in runtime telemetry:
///   * Per-MPPT:    PV[0]=[V1,I1,P1], PV[1]=[V2,I2,P2], PV[2]=[V3,I3,P3],
///                  PV[3]=[Ptotal]
///   * Aggregated:  PV[0]=[Vpv,0,0], PV[1]=[Ipv*10,0,0], PV[2]=[Ppv,0,0],
///                  PV[3]=[Ptotal]
fn pv_is_aggregated(record: &RawRecord) -> bool {
    // Voltage is usually tens/hundreds of volts, so raw > 500 (>= 50.0 V).
    let Some(v0) = record.get_path_f64(&[Key("PV"), Idx(0), Idx(0)]) else {
        return false;
    };
    if v0 <= 500.0 {
        return false;
    }

    // Non-zero PV[0][1] (current) or PV[0][2] (power) means per-MPPT layout.
    if record
        .get_path_f64(&[Key("PV"), Idx(0), Idx(1)])
        .is_some_and(|i0| i0 != 0.0)
    {
        return false;
    }
    if record
        .get_path_f64(&[Key("PV"), Idx(0), Idx(2)])
        .is_some_and(|p0| p0 != 0.0)
    {
        return false;
    }

    let v1 = record.get_path_f64(&[Key("PV"), Idx(1), Idx(0)]);
    let p2 = record.get_path_f64(&[Key("PV"), Idx(2), Idx(0)]);
    let pt = record.get_path_f64(&[Key("PV"), Idx(3), Idx(0)]);

    // PV[1][0] looks like current*10 (0..30 A => raw 0..300)
    let current_like = v1.is_some_and(|v| v > 0.0 && v < 300.0);

    // PV[2][0] tracks PV[3][0] (both power in watts)
    let power_like = match (pt, p2) {
        (Some(pt), Some(p2)) => {
            pt >= 0.0
                && p2 >= 0.0
                && (pt - p2).abs() <= 5f64.max(0.05 * pt.max(1.0))
                && p2 < 20000.0
        }
        _ => false,
    };

    current_like || power_like
}

/// PV1 power with both layout fallbacks applied
fn pv1_power(record: &RawRecord) -> Option<Value> {
    let total = record.get_path_f64(&[Key("PV"), Idx(3), Idx(0)]);

    if pv_is_aggregated(record) {
        // In the aggregated layout PV1 power is PV[2][0], not PV[0][2].
        // Some firmwares keep PV[2][0]=0 while the total has a value.
        return match record.get_path_f64(&[Key("PV"), Idx(2), Idx(0)]) {
            Some(p1) if p1 == 0.0 && total.is_some_and(|t| t != 0.0) => {
                num(round_to(total?, 0))
            }
            Some(p1) => num(round_to(p1, 0)),
            None => total.and_then(|t| num(round_to(t, 0))),
        };
    }

    // Some firmwares report the PV total only, leaving PV1 power at 0. Map
    // PV1 power to the total when PV2 is absent (all three values missing
    // or zero).
    let p1 = record.get_path_f64(&[Key("PV"), Idx(0), Idx(2)]);
    if let Some(p1) = p1 {
        if p1 != 0.0 {
            return num(round_to(p1, 0));
        }
    }

    let pv2_absent = [Idx(0), Idx(1), Idx(2)].iter().all(|col| {
        record
            .get_path_f64(&[Key("PV"), Idx(1), *col])
            .is_none_or(|v| v == 0.0)
    });
    if pv2_absent {
        if let Some(total) = total {
            return num(round_to(total, 0));
        }
    }

    match (p1, total) {
        (Some(p1), _) => num(round_to(p1, 0)),
        (None, Some(total)) => num(round_to(total, 0)),
        (None, None) => None,
    }
}

/// Keys whose resolution depends on the PV layout heuristic
fn pv_override(record: &RawRecord, key: &str) -> Option<Option<Value>> {
    match key {
        "pv1_current" => {
            let path: &[_] = if pv_is_aggregated(record) {
                &[Key("PV"), Idx(1), Idx(0)]
            } else {
                &[Key("PV"), Idx(0), Idx(1)]
            };
            Some(
                record
                    .get_path_f64(path)
                    .and_then(|raw| num(round_to(raw * 0.1, 1))),
            )
        }
        "pv1_power" => Some(pv1_power(record)),
        "pv2_voltage" | "pv2_current" | "pv2_power" | "pv3_voltage" | "pv3_current"
        | "pv3_power"
            if pv_is_aggregated(record) =>
        {
            // Channels 2 and 3 do not exist in the aggregated layout.
            Some(num(0.0))
        }
        _ => None,
    }
}

fn apply_transform(
    record: &RawRecord,
    spec: &FieldSpec,
    filter: Option<&mut EnergyTodayFilter>,
) -> Option<Value> {
    match spec.transform {
        Transform::Scale { factor, digits } => record
            .get_path_f64(spec.path)
            .and_then(|raw| num(round_to(raw * factor, digits))),
        Transform::Round => record
            .get_path_f64(spec.path)
            .and_then(|raw| num(round_to(raw, 0))),
        Transform::EnergyKwh => record
            .get_path_f64(spec.path)
            .and_then(|raw| num(trunc_decimals(raw / 1000.0, 2))),
        Transform::EnergyKwhToday => {
            let kwh = trunc_decimals(record.get_path_f64(spec.path)? / 1000.0, 2);
            match filter {
                Some(filter) => num(filter.apply(kwh, record.date_str())),
                None => num(kwh),
            }
        }
        Transform::Raw => record.get_path(spec.path).cloned(),
        Transform::GreaterThan { threshold } => record
            .get_path_f64(spec.path)
            .map(|raw| Value::Bool(raw > threshold)),
        Transform::NonZero => record
            .get_path_f64(spec.path)
            .map(|raw| Value::Bool(raw != 0.0)),
    }
}

/// Resolve one field from a record.
///
/// Returns `None` when the field key is unknown, the path is absent, or the
/// raw value has the wrong shape for the field's transform. `filter` is
/// consulted only for `*_today` energy counters.
pub fn project(
    record: &RawRecord,
    key: &str,
    filter: Option<&mut EnergyTodayFilter>,
) -> Option<Value> {
    if let Some(resolved) = pv_override(record, key) {
        return resolved;
    }
    let spec = fields::get(key)?;
    apply_transform(record, spec, filter)
}

/// Resolve every known field from a record, skipping unavailable ones.
///
/// `filters` holds the per-counter glitch filter state across polls; missing
/// entries are created from `glitch` on first use.
pub fn project_all(
    record: &RawRecord,
    filters: &mut HashMap<&'static str, EnergyTodayFilter>,
    glitch: &GlitchFilterConfig,
) -> Map<String, Value> {
    let mut out = Map::new();
    for spec in fields::FIELDS {
        // A counter's filter state is created on its first actual reading;
        // counters the device never reports get no state at all.
        let filter = if spec.transform == Transform::EnergyKwhToday
            && record.get_path_f64(spec.path).is_some()
        {
            Some(filters.entry(spec.key).or_insert_with(|| {
                EnergyTodayFilter::new(glitch.max_power_kw, glitch.margin_kwh)
            }))
        } else {
            None
        };
        if let Some(value) = project(record, spec.key, filter) {
            out.insert(spec.key.to_string(), value);
        }
    }
    out
}
