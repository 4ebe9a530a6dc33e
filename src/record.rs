//! Sensor records.
//!
//! A record is created once on ingestion and never mutated afterwards, apart
//! from the insertion sequence the record store stamps on append. On the wire
//! it is a flat JSON object:
//!
//! ```json
//! {"id": 101, "location": "Building_A", "sensor_type": "temperature", "value": 72.5}
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{now_ms, GroupKey, RecordHandle, RecordId};

/// Payload of a sensor record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Kind of measurement, e.g. `temperature` or `humidity`
    pub sensor_type: String,
    /// Measured value
    pub value: f64,
}

impl SensorReading {
    pub fn new(sensor_type: impl Into<String>, value: f64) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            value,
        }
    }
}

/// An immutable, timestamped record.
///
/// The insertion sequence is stamped by the record store on append and is
/// never read from input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique among resident records
    pub id: RecordId,
    /// Location the reading came from; the group index key
    #[serde(rename = "location")]
    pub group: GroupKey,
    #[serde(flatten)]
    pub reading: SensorReading,
    /// Unix milliseconds; defaults to ingestion time when absent from input
    #[serde(default = "now_ms")]
    pub timestamp_ms: u64,
    #[serde(skip)]
    sequence: u64,
}

impl Record {
    /// Creates an unstored record.
    ///
    /// # Arguments
    /// - `id`: identifier, unique among resident records
    /// - `group`: location key used by the group index
    /// - `reading`: sensor payload
    /// - `timestamp_ms`: Unix milliseconds, used by expiry
    pub fn new(id: RecordId, group: GroupKey, reading: SensorReading, timestamp_ms: u64) -> Self {
        Self {
            id,
            group,
            reading,
            timestamp_ms,
            sequence: 0,
        }
    }

    /// Builds a record stamped with the current time.
    pub fn now(id: u64, group: &str, sensor_type: &str, value: f64) -> Self {
        Self::new(
            RecordId(id),
            GroupKey::new(group),
            SensorReading::new(sensor_type, value),
            now_ms(),
        )
    }

    /// Insertion sequence number. Zero until the record is stored.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Handle under which the record store holds this record.
    pub fn handle(&self) -> RecordHandle {
        RecordHandle(self.sequence)
    }

    pub(crate) fn stamp(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Approximate heap + inline footprint, used by byte-budgeted stores.
    pub fn approx_size(&self) -> usize {
        std::mem::size_of::<Record>() + self.group.0.len() + self.reading.sensor_type.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parses_ingest_line() {
        let line = r#"{"id":101,"location":"Building_A","sensor_type":"temperature","value":72.5,"timestamp_ms":1000}"#;
        let record: Record = serde_json::from_str(line).unwrap();

        assert_eq!(record.id, RecordId(101));
        assert_eq!(record.group.as_str(), "Building_A");
        assert_eq!(record.reading.sensor_type, "temperature");
        assert_eq!(record.timestamp_ms, 1000);
        assert_eq!(record.sequence(), 0);
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let before = now_ms();
        let line = r#"{"id":7,"location":"Lab","sensor_type":"humidity","value":45.2}"#;
        let record: Record = serde_json::from_str(line).unwrap();
        assert!(record.timestamp_ms >= before);
    }

    #[test]
    fn test_approx_size_grows_with_strings() {
        let small = Record::now(1, "A", "t", 1.0);
        let large = Record::now(2, "A-much-longer-location", "temperature", 1.0);
        assert!(large.approx_size() > small.approx_size());
    }
}
