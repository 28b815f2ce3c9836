// 📈 History Aggregator - summaries derived from a user's audit entries
//
// Pure functions of the entries passed in. No state of their own.

use crate::audit::AuditLogEntry;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// UTC+05:30
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// (timestamp, price) points sorted ascending by time.
pub fn time_series(entries: &[AuditLogEntry]) -> Vec<(DateTime<Utc>, f64)> {
    let mut points: Vec<(DateTime<Utc>, f64)> = entries
        .iter()
        .map(|e| (e.timestamp, e.price_estimate))
        .collect();
    points.sort_by_key(|(ts, _)| *ts);
    points
}

/// Mean price per city. Cities without entries are absent, not zero.
pub fn average_by_city(entries: &[AuditLogEntry]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for entry in entries {
        let slot = sums.entry(entry.city.clone()).or_insert((0.0, 0));
        slot.0 += entry.price_estimate;
        slot.1 += 1;
    }

    sums.into_iter()
        .map(|(city, (total, count))| (city, total / count as f64))
        .collect()
}

// ============================================================================
// TABULAR HISTORY (display / CSV export)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    #[serde(rename = "Time (IST)")]
    pub time_ist: DateTime<FixedOffset>,
    #[serde(rename = "Price (Lacs)")]
    pub price_lacs: f64,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Area")]
    pub area: String,
    #[serde(rename = "BHK")]
    pub bhk: Option<i64>,
    #[serde(rename = "Sq Ft")]
    pub square_ft: Option<f64>,
}

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Rows in ascending time order. Payload fields that cannot be read are left empty.
pub fn history_rows(entries: &[AuditLogEntry]) -> Vec<HistoryRow> {
    let offset = ist();
    let mut rows: Vec<HistoryRow> = entries
        .iter()
        .map(|e| HistoryRow {
            time_ist: e.timestamp.with_timezone(&offset),
            price_lacs: e.price_estimate,
            city: e.city.clone(),
            area: e.area.clone(),
            bhk: e.feature_payload.get("BHK_NO.").and_then(|v| v.as_i64()),
            square_ft: e.feature_payload.get("SQUARE_FT").and_then(|v| v.as_f64()),
        })
        .collect();
    rows.sort_by_key(|r| r.time_ist);
    rows
}

pub fn write_csv<W: Write>(rows: &[HistoryRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("Failed to write history row")?;
    }
    wtr.flush().context("Failed to flush history CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(id: i64, minutes: i64, price: f64, city: &str) -> AuditLogEntry {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        AuditLogEntry {
            id,
            username: "alice".to_string(),
            timestamp: base + Duration::minutes(minutes),
            price_estimate: price,
            city: city.to_string(),
            area: "Baner".to_string(),
            feature_payload: serde_json::json!({
                "POSTED_BY": 2, "UNDER_CONSTRUCTION": 0, "RERA": 1, "BHK_NO.": 3,
                "BHK_OR_RK": 0, "SQUARE_FT": 1200.0, "READY_TO_MOVE": 1, "RESALE": 1,
                "LONGITUDE": 73.8, "LATITUDE": 18.5
            }),
        }
    }

    #[test]
    fn test_average_by_city() {
        let entries = vec![
            entry(1, 0, 50.0, "City A"),
            entry(2, 1, 70.0, "City A"),
            entry(3, 2, 100.0, "City B"),
        ];

        let avg = average_by_city(&entries);
        assert_eq!(avg.len(), 2);
        assert_eq!(avg["City A"], 60.0);
        assert_eq!(avg["City B"], 100.0);
        assert!(!avg.contains_key("City C"));
    }

    #[test]
    fn test_average_by_city_empty() {
        assert!(average_by_city(&[]).is_empty());
    }

    #[test]
    fn test_time_series_ascending() {
        // Audit log hands entries back newest first
        let entries = vec![
            entry(3, 20, 90.0, "Pune"),
            entry(2, 10, 70.0, "Pune"),
            entry(1, 0, 50.0, "Pune"),
        ];

        let series = time_series(&entries);
        let prices: Vec<f64> = series.iter().map(|(_, p)| *p).collect();
        assert_eq!(prices, vec![50.0, 70.0, 90.0]);
        assert!(series.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_history_rows_shift_to_ist() {
        let rows = history_rows(&[entry(1, 0, 62.5, "Pune")]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_ist.to_rfc3339(), "2024-06-01T15:30:00+05:30");
        assert_eq!(rows[0].bhk, Some(3));
        assert_eq!(rows[0].square_ft, Some(1200.0));
    }

    #[test]
    fn test_history_rows_tolerate_bad_payload() {
        let mut e = entry(1, 0, 62.5, "Pune");
        e.feature_payload = serde_json::json!({ "garbage": true });

        let rows = history_rows(&[e]);
        assert_eq!(rows[0].bhk, None);
        assert_eq!(rows[0].price_lacs, 62.5);
    }

    #[test]
    fn test_history_rows_read_each_column_on_its_own() {
        let mut e = entry(1, 0, 62.5, "Pune");
        e.feature_payload = serde_json::json!({ "BHK_NO.": 2, "AGE": 7 });

        let rows = history_rows(&[e]);
        assert_eq!(rows[0].bhk, Some(2));
        assert_eq!(rows[0].square_ft, None);

        let mut e = entry(2, 1, 40.0, "Pune");
        e.feature_payload = serde_json::Value::Null;
        let rows = history_rows(&[e]);
        assert_eq!((rows[0].bhk, rows[0].square_ft), (None, None));
    }

    #[test]
    fn test_write_csv() {
        let rows = history_rows(&[entry(2, 5, 70.0, "Mumbai"), entry(1, 0, 50.0, "Pune")]);

        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Time (IST),Price (Lacs),City,Area,BHK,Sq Ft");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Pune"));
        assert!(lines[2].contains("Mumbai"));
    }
}
