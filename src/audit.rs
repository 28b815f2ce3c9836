// 📜 Prediction Audit Log - one immutable row per completed prediction
//
// Append-only: no update or delete exists. Timestamps are assigned here,
// never by the caller, and never go backwards between inserts.

use crate::db::{format_timestamp, parse_timestamp, Store};
use crate::error::Result;
use crate::features::FeatureVector;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub username: String,
    pub timestamp: DateTime<Utc>,
    /// Lacs
    pub price_estimate: f64,
    pub city: String,
    pub area: String,
    /// Serialized copy of the model input
    pub feature_payload: serde_json::Value,
}

/// Caller-supplied part of an entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry<'a> {
    pub username: &'a str,
    pub price_estimate: f64,
    pub city: &'a str,
    pub area: &'a str,
    pub features: &'a FeatureVector,
}

pub struct PredictionAuditLog {
    store: Store,
}

impl PredictionAuditLog {
    pub fn new(store: Store) -> Self {
        PredictionAuditLog { store }
    }

    /// Persist one entry and return its id.
    pub fn append(&self, entry: &NewAuditEntry<'_>) -> Result<i64> {
        let payload = serde_json::to_string(entry.features)?;

        let mut conn = self.store.connect()?;
        // IMMEDIATE takes the write lock before reading the latest timestamp
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let latest: Option<String> = tx
            .query_row("SELECT MAX(ts) FROM audit_logs", [], |row| row.get(0))
            .optional()?
            .flatten();

        let mut ts = Utc::now();
        if let Some(raw) = latest {
            let last = parse_timestamp(0, &raw)?;
            if last > ts {
                ts = last;
            }
        }

        tx.execute(
            "INSERT INTO audit_logs (username, ts, price_lacs, city, area, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.username,
                format_timestamp(ts),
                entry.price_estimate,
                entry.city,
                entry.area,
                payload,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(username = entry.username, id, "prediction logged");
        Ok(id)
    }

    /// Up to `limit` entries for `username`, most recent first.
    pub fn list_for_user(&self, username: &str, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let conn = self.store.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, ts, price_lacs, city, area, payload
             FROM audit_logs
             WHERE username = ?1
             ORDER BY ts DESC, id DESC
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![username, limit], |row| {
                let ts: String = row.get(2)?;
                // Older databases allow NULL in these three columns
                let city: Option<String> = row.get(4)?;
                let area: Option<String> = row.get(5)?;
                let payload: Option<String> = row.get(6)?;

                let feature_payload = match payload {
                    Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            6,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    None => serde_json::Value::Null,
                };

                Ok(AuditLogEntry {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    timestamp: parse_timestamp(2, &ts)?,
                    price_estimate: row.get(3)?,
                    city: city.unwrap_or_default(),
                    area: area.unwrap_or_default(),
                    feature_payload,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn count_for_user(&self, username: &str) -> Result<i64> {
        let conn = self.store.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM audit_logs WHERE username = ?1",
            [username],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
