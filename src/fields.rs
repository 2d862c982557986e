//! Static field table: logical field key -> (record path, numeric transform)
//!
//! The table is data, not code: the mapper walks the path and applies the
//! transform, so adding a field is one row here. Paths and scale factors are
//! reverse-engineered from observed device output across firmware variants;
//! entries marked `_raw` expose registers whose semantics are unconfirmed.

use crate::record::PathSeg::{self, Idx, Key};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Numeric transform applied to a resolved raw value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// `round(raw * factor, digits)` for voltages, currents, frequencies,
    /// percentages
    Scale { factor: f64, digits: u32 },
    /// Round to whole units; power fields are already in watts
    Round,
    /// Wh -> kWh, truncated (not rounded) to 2 decimals to match the vendor
    /// app display
    EnergyKwh,
    /// Like `EnergyKwh`, but routed through the per-counter glitch filter
    EnergyKwhToday,
    /// Value passed through untouched (codes, strings, unconfirmed registers)
    Raw,
    /// Boolean: numeric raw strictly greater than the threshold
    GreaterThan { threshold: f64 },
    /// Boolean: numeric raw is anything other than zero
    NonZero,
}

/// One row of the field table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Logical field key exposed to consumers
    pub key: &'static str,
    /// Fixed lookup path into the record
    pub path: &'static [PathSeg],
    /// Transform applied when the resolved value is numeric
    pub transform: Transform,
}

const fn field(key: &'static str, path: &'static [PathSeg], transform: Transform) -> FieldSpec {
    FieldSpec {
        key,
        path,
        transform,
    }
}

const SCALE_DECI: Transform = Transform::Scale {
    factor: 0.1,
    digits: 1,
};
const SCALE_CENTI: Transform = Transform::Scale {
    factor: 0.01,
    digits: 2,
};

/// Every exposed field, in display order
pub static FIELDS: &[FieldSpec] = &[
    // --- Main telemetry ---
    field(
        "battery_soc",
        &[Key("Batsoc"), Idx(0), Idx(0)],
        Transform::Scale {
            factor: 0.01,
            digits: 1,
        },
    ),
    field(
        "battery_voltage",
        &[Key("Batt"), Idx(0), Idx(0)],
        Transform::Scale {
            factor: 0.001,
            digits: 2,
        },
    ),
    field("load_percent", &[Key("lPerc")], SCALE_DECI),
    field("power_flow", &[Key("pFlow")], Transform::Raw),
    field("bus_voltage_p", &[Key("busVp")], SCALE_DECI),
    field("bus_voltage_n", &[Key("busVn")], SCALE_DECI),
    // --- AC input ---
    field("ac_in_voltage", &[Key("ACin"), Idx(0), Idx(0)], SCALE_DECI),
    field("ac_in_current", &[Key("ACin"), Idx(1), Idx(0)], SCALE_DECI),
    field("ac_in_frequency", &[Key("ACin"), Idx(2), Idx(0)], SCALE_CENTI),
    field("ac_in_power", &[Key("ACin"), Idx(3), Idx(0)], Transform::Round),
    field(
        "ac_in_apparent_power",
        &[Key("ACin"), Idx(3), Idx(1)],
        Transform::Round,
    ),
    // --- AC output ---
    field("ac_out_voltage", &[Key("ACout"), Idx(0), Idx(0)], SCALE_DECI),
    field("ac_out_current", &[Key("ACout"), Idx(1), Idx(0)], SCALE_DECI),
    field(
        "ac_out_frequency",
        &[Key("ACout"), Idx(2), Idx(0)],
        SCALE_CENTI,
    ),
    field(
        "ac_out_power",
        &[Key("ACout"), Idx(3), Idx(0)],
        Transform::Round,
    ),
    field(
        "ac_out_apparent_power",
        &[Key("ACout"), Idx(3), Idx(1)],
        Transform::Round,
    ),
    field(
        "ac_out_reactive_power",
        &[Key("ACout"), Idx(3), Idx(2)],
        Transform::Round,
    ),
    // --- PV input ---
    // pv1_current/pv1_power and the pv2/pv3 rows are overridden by the
    // layout heuristics in the mapper; these are the per-channel defaults.
    field("pv1_voltage", &[Key("PV"), Idx(0), Idx(0)], SCALE_DECI),
    field("pv1_current", &[Key("PV"), Idx(0), Idx(1)], SCALE_DECI),
    field("pv1_power", &[Key("PV"), Idx(0), Idx(2)], Transform::Round),
    field("pv2_voltage", &[Key("PV"), Idx(1), Idx(0)], SCALE_DECI),
    field("pv2_current", &[Key("PV"), Idx(1), Idx(1)], SCALE_DECI),
    field("pv2_power", &[Key("PV"), Idx(1), Idx(2)], Transform::Round),
    field("pv3_voltage", &[Key("PV"), Idx(2), Idx(0)], SCALE_DECI),
    field("pv3_current", &[Key("PV"), Idx(2), Idx(1)], SCALE_DECI),
    field("pv3_power", &[Key("PV"), Idx(2), Idx(2)], Transform::Round),
    field(
        "pv_total_power",
        &[Key("PV"), Idx(3), Idx(0)],
        Transform::Round,
    ),
    // --- Energy counters (Energy[group][0,total,day,month,year], Wh) ---
    field(
        "energy_pv_total",
        &[Key("Energy"), Idx(0), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_pv_today",
        &[Key("Energy"), Idx(0), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_pv_month",
        &[Key("Energy"), Idx(0), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_pv_year",
        &[Key("Energy"), Idx(0), Idx(4)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_backup_load_total",
        &[Key("Energy"), Idx(1), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_backup_load_today",
        &[Key("Energy"), Idx(1), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_backup_load_month",
        &[Key("Energy"), Idx(1), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_backup_load_year",
        &[Key("Energy"), Idx(1), Idx(4)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_grid_import_total",
        &[Key("Energy"), Idx(2), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_grid_import_today",
        &[Key("Energy"), Idx(2), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_grid_import_month",
        &[Key("Energy"), Idx(2), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_grid_import_year",
        &[Key("Energy"), Idx(2), Idx(4)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_grid_export_total",
        &[Key("Energy"), Idx(3), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_grid_export_today",
        &[Key("Energy"), Idx(3), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_grid_export_month",
        &[Key("Energy"), Idx(3), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_grid_export_year",
        &[Key("Energy"), Idx(3), Idx(4)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_battery_charge_total",
        &[Key("Energy"), Idx(4), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_battery_charge_today",
        &[Key("Energy"), Idx(4), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_battery_charge_month",
        &[Key("Energy"), Idx(4), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_battery_charge_year",
        &[Key("Energy"), Idx(4), Idx(4)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_battery_discharge_total",
        &[Key("Energy"), Idx(5), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_battery_discharge_today",
        &[Key("Energy"), Idx(5), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_battery_discharge_month",
        &[Key("Energy"), Idx(5), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_battery_discharge_year",
        &[Key("Energy"), Idx(5), Idx(4)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_home_load_total",
        &[Key("Energy"), Idx(6), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_home_load_today",
        &[Key("Energy"), Idx(6), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_home_load_month",
        &[Key("Energy"), Idx(6), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_home_load_year",
        &[Key("Energy"), Idx(6), Idx(4)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_total_load_total",
        &[Key("Energy"), Idx(7), Idx(1)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_total_load_today",
        &[Key("Energy"), Idx(7), Idx(2)],
        Transform::EnergyKwhToday,
    ),
    field(
        "energy_total_load_month",
        &[Key("Energy"), Idx(7), Idx(3)],
        Transform::EnergyKwh,
    ),
    field(
        "energy_total_load_year",
        &[Key("Energy"), Idx(7), Idx(4)],
        Transform::EnergyKwh,
    ),
    // --- Temperatures ---
    field("temp_1", &[Key("Temp"), Idx(0), Idx(0)], SCALE_DECI),
    field("temp_2", &[Key("Temp"), Idx(0), Idx(2)], SCALE_DECI),
    field("temp_3", &[Key("Temp"), Idx(0), Idx(3)], SCALE_DECI),
    field("temp_4", &[Key("Temp"), Idx(0), Idx(4)], SCALE_DECI),
    // --- Diagnostics / codes ---
    field("work_mode", &[Key("workM")], Transform::Raw),
    field("warning_code", &[Key("warn")], Transform::Raw),
    field("fault_code", &[Key("fault")], Transform::Raw),
    field("warning_flags_raw", &[Key("wan2F")], Transform::Raw),
    field("warning_flags2_raw", &[Key("wan3F")], Transform::Raw),
    field("parallel_status", &[Key("ParStu")], Transform::Raw),
    field("last_update_raw", &[Key("date")], Transform::Raw),
    field("serial_number", &[Key("DevSN")], Transform::Raw),
    field("wifi_serial", &[Key("wifiSN")], Transform::Raw),
    field(
        "firmware_version",
        &[Key("_basic"), Key("version")],
        Transform::Raw,
    ),
    field("device_type", &[Key("_basic"), Key("Type")], Transform::Raw),
    field(
        "device_subtype",
        &[Key("_basic"), Key("SubType")],
        Transform::Raw,
    ),
    // --- Presence / problem flags ---
    field("fault_active", &[Key("fault")], Transform::NonZero),
    field("warning_active", &[Key("warn")], Transform::NonZero),
    // ACin[0][0] is voltage*10; >50 means more than 5 V present
    field(
        "ac_input_present",
        &[Key("ACin"), Idx(0), Idx(0)],
        Transform::GreaterThan { threshold: 50.0 },
    ),
    // Batt[0][0] is mV; >10000 means a battery above 10 V is attached
    field(
        "battery_present",
        &[Key("Batt"), Idx(0), Idx(0)],
        Transform::GreaterThan { threshold: 10000.0 },
    ),
    // --- Settings mirror (_settings namespace) ---
    field(
        "set_operating_mode",
        &[Key("_settings"), Key("OperM")],
        Transform::Raw,
    ),
    field(
        "set_ac_nominal_voltage",
        &[Key("_settings"), Key("Aorvol")],
        SCALE_DECI,
    ),
    field(
        "set_ac_nominal_frequency_raw",
        &[Key("_settings"), Key("Aorfre")],
        Transform::Raw,
    ),
    field(
        "set_grid_over_voltage",
        &[Key("_settings"), Key("FGOV")],
        SCALE_DECI,
    ),
    field(
        "set_grid_under_voltage",
        &[Key("_settings"), Key("FGUV")],
        SCALE_DECI,
    ),
    field(
        "set_grid_over_frequency",
        &[Key("_settings"), Key("FGOFq")],
        SCALE_CENTI,
    ),
    field(
        "set_grid_under_frequency",
        &[Key("_settings"), Key("FGUF")],
        SCALE_CENTI,
    ),
    field(
        "set_grid_over_voltage_time_raw",
        &[Key("_settings"), Key("FGOVT")],
        Transform::Raw,
    ),
    field(
        "set_grid_under_voltage_time_raw",
        &[Key("_settings"), Key("FGUVT")],
        Transform::Raw,
    ),
    field(
        "set_grid_over_frequency_time_raw",
        &[Key("_settings"), Key("FGOFqT")],
        Transform::Raw,
    ),
    field(
        "set_grid_under_frequency_time_raw",
        &[Key("_settings"), Key("FGUFT")],
        Transform::Raw,
    ),
    field(
        "set_grid_over_voltage_10min",
        &[Key("_settings"), Key("tenGOV")],
        SCALE_DECI,
    ),
    field(
        "set_secondary_grid_over_voltage",
        &[Key("_settings"), Key("sGOV")],
        SCALE_DECI,
    ),
    field(
        "set_secondary_grid_under_voltage",
        &[Key("_settings"), Key("sGUV")],
        SCALE_DECI,
    ),
    field(
        "set_generator_cooldown_time_raw",
        &[Key("_settings"), Key("GCWT")],
        Transform::Raw,
    ),
    field(
        "set_generator_pv_start_delay_raw",
        &[Key("_settings"), Key("GPSl")],
        Transform::Raw,
    ),
    field(
        "set_battery_type",
        &[Key("_settings"), Key("batTy")],
        Transform::Raw,
    ),
    field(
        "set_battery_count",
        &[Key("_settings"), Key("BNum")],
        Transform::Raw,
    ),
    field(
        "set_battery_charge_voltage",
        &[Key("_settings"), Key("BChgV")],
        SCALE_DECI,
    ),
    field(
        "set_battery_float_voltage",
        &[Key("_settings"), Key("BFChV")],
        SCALE_DECI,
    ),
    field(
        "set_battery_max_charge_current",
        &[Key("_settings"), Key("BMChC")],
        SCALE_DECI,
    ),
    field(
        "set_battery_max_discharge_current",
        &[Key("_settings"), Key("BMDCu")],
        SCALE_DECI,
    ),
    field(
        "set_battery_cv_over_grid",
        &[Key("_settings"), Key("BCVOG")],
        SCALE_DECI,
    ),
    field(
        "set_battery_cv_float_grid",
        &[Key("_settings"), Key("BCVFG")],
        SCALE_DECI,
    ),
    field(
        "set_battery_rv_over_grid",
        &[Key("_settings"), Key("BRVOG")],
        SCALE_DECI,
    ),
    field(
        "set_battery_bddog_raw",
        &[Key("_settings"), Key("BDDOG")],
        Transform::Raw,
    ),
    field(
        "set_battery_bddfg_raw",
        &[Key("_settings"), Key("BDDFG")],
        Transform::Raw,
    ),
    field(
        "set_battery_brdfg_raw",
        &[Key("_settings"), Key("BRDFG")],
        Transform::Raw,
    ),
    field(
        "set_zero_export_mode",
        &[Key("_settings"), Key("ZEMode")],
        Transform::Raw,
    ),
    field(
        "set_zero_export_power",
        &[Key("_settings"), Key("ZeroEP")],
        Transform::Raw,
    ),
    field(
        "set_buzzer_enabled",
        &[Key("_settings"), Key("buzEn")],
        Transform::Raw,
    ),
    field(
        "set_stand",
        &[Key("_settings"), Key("Stand")],
        Transform::Raw,
    ),
];

static FIELDS_BY_KEY: Lazy<HashMap<&'static str, &'static FieldSpec>> =
    Lazy::new(|| FIELDS.iter().map(|spec| (spec.key, spec)).collect());

/// Look up one field's spec by key
pub fn get(key: &str) -> Option<&'static FieldSpec> {
    FIELDS_BY_KEY.get(key).copied()
}
