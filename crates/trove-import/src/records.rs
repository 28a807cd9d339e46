//! Record types for the historical dataset format
//!
//! Each dataset file is changeset-shaped: one user, one timestamp, one
//! comment and a list of events. An event either declares a location
//! path or adds an asset whose placement references another record,
//! possibly one that has not been seen yet.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// One dataset file
#[derive(Debug, Clone, Deserialize)]
pub struct ChangesetRecord {
    /// Author of the historical change
    pub user: String,
    /// Timestamp, RFC 3339 or naive `YYYY-MM-DDTHH:MM:SS`
    pub timestamp: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl ChangesetRecord {
    /// Parse the record's timestamp; naive timestamps are taken as UTC.
    pub fn parsed_timestamp(&self) -> Result<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|_| Error::InvalidTimestamp(self.timestamp.clone()))
    }
}

/// One event within a dataset file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EventRecord {
    /// An asset entering the inventory
    Add {
        /// The asset being added
        asset: AssetRecord,
    },
    /// A declared location path, slash-separated
    Location {
        /// Path of location names, e.g. `"L1/L2"`
        path: String,
    },
}

/// An asset-creation record
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRecord {
    /// The asset's code in the source system
    pub asset_code: String,
    /// Optional explicit code type tag; inferred when absent
    #[serde(default)]
    pub code_type: Option<String>,
    /// Model name, get-or-created on import
    pub asset_type: String,
    /// Placement reference: another asset's code or a location path
    pub location: String,
    /// Extension payload carried onto the asset
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_changeset_record() {
        let content = r#"
        {
            "user": "alice@example.com",
            "timestamp": "2019-01-01T12:00:00",
            "comment": "initial stocktake",
            "events": [
                { "event": "location", "path": "L1/L2" },
                {
                    "event": "add",
                    "asset": {
                        "asset_code": "srABCABJ",
                        "asset_type": "Medium Widget",
                        "location": "L1/L2",
                        "data": { "colour": "red" }
                    }
                }
            ]
        }
        "#;

        let record: ChangesetRecord = serde_json::from_str(content).unwrap();
        assert_eq!(record.user, "alice@example.com");
        assert_eq!(record.events.len(), 2);
        assert!(matches!(record.events[0], EventRecord::Location { .. }));
        match &record.events[1] {
            EventRecord::Add { asset } => {
                assert_eq!(asset.asset_code, "srABCABJ");
                assert_eq!(asset.location, "L1/L2");
                assert!(asset.code_type.is_none());
            }
            other => panic!("expected add event, got {other:?}"),
        }
        assert_eq!(
            record.parsed_timestamp().unwrap().timestamp(),
            1_546_344_000
        );
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let record = ChangesetRecord {
            user: "a".to_string(),
            timestamp: "2019-01-01T12:00:00Z".to_string(),
            comment: String::new(),
            events: Vec::new(),
        };
        assert_eq!(record.parsed_timestamp().unwrap().timestamp(), 1_546_344_000);
    }

    #[test]
    fn test_bad_timestamp() {
        let record = ChangesetRecord {
            user: "a".to_string(),
            timestamp: "yesterday".to_string(),
            comment: String::new(),
            events: Vec::new(),
        };
        assert!(matches!(
            record.parsed_timestamp(),
            Err(Error::InvalidTimestamp(_))
        ));
    }
}
