//! CF-convention decoding shared by the file readers.
//!
//! Two things are decoded when a file is opened:
//! - packed values (`scale_factor`, `add_offset`, `_FillValue`, `missing_value`)
//! - time coordinates expressed as `<unit> since <epoch>`, which are
//!   rewritten to seconds since 1970-01-01 so that files with different
//!   epochs align when merged.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Units written onto decoded time coordinates.
pub const EPOCH_UNITS: &str = "seconds since 1970-01-01 00:00:00";

/// Unpacking parameters read from a variable's attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
    pub fill_values: Vec<f64>,
}

impl Packing {
    pub fn from_attributes(attrs: &BTreeMap<String, Value>) -> Self {
        let number = |key: &str| attrs.get(key).and_then(first_number);
        let mut fill_values = Vec::new();
        for key in ["_FillValue", "missing_value"] {
            match attrs.get(key) {
                Some(Value::Array(items)) => {
                    fill_values.extend(items.iter().filter_map(Value::as_f64))
                }
                Some(other) => fill_values.extend(other.as_f64()),
                None => {}
            }
        }
        Self {
            scale_factor: number("scale_factor"),
            add_offset: number("add_offset"),
            fill_values,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.scale_factor.is_none() && self.add_offset.is_none() && self.fill_values.is_empty()
    }

    /// Replace fill values with NaN, then apply scale and offset.
    pub fn apply(&self, raw: &mut [f64]) {
        if self.is_identity() {
            return;
        }
        let scale = self.scale_factor.unwrap_or(1.0);
        let offset = self.add_offset.unwrap_or(0.0);
        for v in raw.iter_mut() {
            if self.fill_values.iter().any(|f| f == v) {
                *v = f64::NAN;
            } else {
                *v = *v * scale + offset;
            }
        }
    }
}

fn first_number(value: &Value) -> Option<f64> {
    match value {
        Value::Array(items) => items.first().and_then(Value::as_f64),
        other => other.as_f64(),
    }
}

/// A parsed `<unit> since <epoch>` string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub seconds_per_unit: f64,
    pub epoch: DateTime<Utc>,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Option<Self> {
        let lower = units.trim().to_lowercase();
        let (unit, epoch) = lower.split_once(" since ")?;
        let seconds_per_unit = match unit.trim() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86_400.0,
            _ => return None,
        };
        Some(Self {
            seconds_per_unit,
            epoch: parse_epoch(epoch.trim())?,
        })
    }

    pub fn to_epoch_seconds(&self, value: f64) -> f64 {
        self.epoch.timestamp() as f64 + value * self.seconds_per_unit
    }
}

fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw
        .trim_end_matches(" utc")
        .trim_end_matches('z')
        .trim_end_matches("+00:00")
        .trim_end_matches(" 0:00")
        .trim();
    let normalized = trimmed.replacen('t', " ", 1);

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Rewrite time values to seconds since 1970 when `units` says they are
/// relative to some epoch. Returns whether anything changed.
pub fn decode_time(values: &mut [f64], attrs: &mut BTreeMap<String, Value>) -> bool {
    let Some(units) = attrs
        .get("units")
        .and_then(Value::as_str)
        .and_then(TimeUnits::parse)
    else {
        return false;
    };
    for v in values.iter_mut() {
        if !v.is_nan() {
            *v = units.to_epoch_seconds(*v);
        }
    }
    attrs.insert("units".to_string(), Value::from(EPOCH_UNITS));
    true
}
