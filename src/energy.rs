//! Glitch filter for inverter-reported daily energy counters
//!
//! Around local midnight the device sometimes emits a short-lived bogus
//! "today" value (momentarily including yesterday's kWh, or dropping to zero
//! and snapping back). The filter rejects increases that are implausible for
//! the elapsed time between payload timestamps and keeps reporting the last
//! accepted value instead.

use chrono::NaiveDateTime;

/// Sliding one-sample state for one daily energy counter.
///
/// Owned by whatever persists across polls (the driver keeps one per
/// `*_today` field); the filter itself is a plain value so the logic can be
/// tested without any transport.
#[derive(Debug, Clone)]
pub struct EnergyTodayFilter {
    max_power_kw: f64,
    margin_kwh: f64,
    last_kwh: Option<f64>,
    last_ts: Option<NaiveDateTime>,
    last_date: Option<String>,
}

impl EnergyTodayFilter {
    /// Create a filter with the given plausibility ceiling parameters
    pub fn new(max_power_kw: f64, margin_kwh: f64) -> Self {
        Self {
            max_power_kw,
            margin_kwh,
            last_kwh: None,
            last_ts: None,
            last_date: None,
        }
    }

    /// Run one candidate reading through the filter and return the value to
    /// report.
    ///
    /// A payload with the same raw date string as the previous one is the
    /// same payload; the cached value is returned without re-evaluating the
    /// ceiling. A candidate whose increase over the last accepted value
    /// exceeds `max_power_kw * elapsed_hours + margin_kwh` is rejected, but
    /// the remembered timestamp/date still advance so the spurious payload is
    /// not reprocessed on a later call.
    pub fn apply(&mut self, candidate_kwh: f64, date_str: Option<&str>) -> f64 {
        if let (Some(date), Some(last_date), Some(last_kwh)) =
            (date_str, self.last_date.as_deref(), self.last_kwh)
        {
            if date == last_date {
                return last_kwh;
            }
        }

        let ts = date_str.and_then(parse_payload_timestamp);

        if let (Some(last_kwh), Some(last_ts), Some(ts)) = (self.last_kwh, self.last_ts, ts) {
            let elapsed_secs = (ts - last_ts).num_seconds().max(0) as f64;
            let allowed_jump = self.max_power_kw * (elapsed_secs / 3600.0) + self.margin_kwh;

            if candidate_kwh - last_kwh > allowed_jump {
                self.last_ts = Some(ts);
                self.last_date = date_str.map(str::to_string);
                return last_kwh;
            }
        }

        if ts.is_some() {
            self.last_ts = ts;
        }
        self.last_kwh = Some(candidate_kwh);
        self.last_date = date_str.map(str::to_string);
        candidate_kwh
    }
}

/// Parse the 14-digit `YYYYMMDDHHMMSS` prefix of a payload date string
pub fn parse_payload_timestamp(date_str: &str) -> Option<NaiveDateTime> {
    if date_str.len() < 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(&date_str[..14], "%Y%m%d%H%M%S").ok()
}
