// src/serialize.rs
//
// Conversions between stored BSON values and their transport form: ids as
// hex strings, instants as ISO-8601 strings.

use bson::{oid::ObjectId, DateTime as BsonDateTime};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

pub fn iso(dt: &BsonDateTime) -> String {
    dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn iso_opt(dt: &Option<BsonDateTime>) -> Option<String> {
    dt.as_ref().map(iso)
}

pub fn hex_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

pub fn parse_id(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw.trim()).ok()
}

/// Accepts RFC 3339 or a naive ISO timestamp, the latter read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<BsonDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(BsonDateTime::from_chrono(dt.with_timezone(&Utc)));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| BsonDateTime::from_chrono(naive.and_utc()))
}

/// Keeps the first occurrence of each value.
pub fn dedup_preserving_order<T: PartialEq + Clone>(values: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}
