//! # Lineage Export
//!
//! A lineage is the full ordered history of a fiber, keyed by its id.
//! Consumers should treat it as an opaque, append-only audit trail.
//!
//! Two encodings are provided:
//! - JSON, via serde: `{ "id": "...", "history": [...], "markers": [...] }`
//! - Canonical binary, a bit-exact `postcard` stream with a checksummed header:
//!
//! ```text
//! [header_len: u32 LE] [LineageHeader (postcard)] [Lineage (postcard)]
//! ```

use crate::primitives::{MAX_ID_LENGTH, MAX_IMPORT_HISTORY, MAX_IMPORT_MARKERS, MAX_LABEL_LENGTH};
use crate::{FiberId, HistoryEntry, Marker, WeaveError};
use serde::{Deserialize, Serialize};

// =============================================================================
// LINEAGE
// =============================================================================

/// Serialized snapshot of a fiber's provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    /// The fiber this lineage belongs to.
    pub id: FiberId,
    /// Every history entry, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Every marker, in insertion order.
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl Lineage {
    /// Check the history invariants and import limits.
    ///
    /// A valid lineage has an id and initial label that `Fiber::create`
    /// would accept, a non-empty history within `MAX_IMPORT_HISTORY`, at
    /// most `MAX_IMPORT_MARKERS` markers, and exactly one `"start"` entry
    /// which comes first. Every import path goes through here.
    pub fn validate(&self) -> Result<(), WeaveError> {
        let id_len = self.id.as_str().len();
        if id_len == 0 {
            return Err(WeaveError::LineageCorrupted("empty fiber id".to_string()));
        }
        if id_len > MAX_ID_LENGTH {
            return Err(WeaveError::LineageCorrupted(format!(
                "fiber id exceeds {} bytes",
                MAX_ID_LENGTH
            )));
        }
        if self.history.len() as u64 > MAX_IMPORT_HISTORY {
            return Err(WeaveError::LineageCorrupted(format!(
                "history length {} exceeds maximum allowed {}",
                self.history.len(),
                MAX_IMPORT_HISTORY
            )));
        }
        if self.markers.len() as u64 > MAX_IMPORT_MARKERS {
            return Err(WeaveError::LineageCorrupted(format!(
                "marker count {} exceeds maximum allowed {}",
                self.markers.len(),
                MAX_IMPORT_MARKERS
            )));
        }
        let Some(first) = self.history.first() else {
            return Err(WeaveError::LineageCorrupted("empty history".to_string()));
        };
        if !first.is_start() {
            return Err(WeaveError::LineageCorrupted(format!(
                "first entry has stage '{}', expected 'start'",
                first.stage
            )));
        }
        let label_len = first.label.as_str().len();
        if label_len == 0 || label_len > MAX_LABEL_LENGTH {
            return Err(WeaveError::LineageCorrupted(format!(
                "initial label must be 1..={} bytes",
                MAX_LABEL_LENGTH
            )));
        }
        if self.history.iter().skip(1).any(HistoryEntry::is_start) {
            return Err(WeaveError::LineageCorrupted(
                "start entry after creation".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of transforms recorded after creation.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, WeaveError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WeaveError::SerializationError(e.to_string()))
    }

    /// Decode from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self, WeaveError> {
        let lineage: Self = serde_json::from_str(json)
            .map_err(|e| WeaveError::DeserializationError(e.to_string()))?;
        lineage.validate()?;
        Ok(lineage)
    }

    /// Deterministic checksum of the lineage.
    ///
    /// XOR-rotate mixing over every byte, position-salted so that reordering
    /// entries changes the result.
    ///
    /// # Security Note
    ///
    /// This is **NOT** a cryptographic hash. It detects accidental corruption
    /// only; enable the `crypto-hash` feature for BLAKE3.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hash: u64 = 0;

        hash = mix_str(hash, self.id.as_str(), 31);

        for (index, entry) in self.history.iter().enumerate() {
            hash ^= (index as u64).rotate_left(17);
            hash = mix_str(hash, &entry.stage, 7);
            hash = mix_str(hash, entry.label.as_str(), 11);
            match &entry.context {
                Some(ctx) => hash = mix_str(hash, ctx, 13),
                None => hash ^= 0xA5A5_A5A5_u64.rotate_left(index as u32 % 64),
            }
        }

        for (index, marker) in self.markers.iter().enumerate() {
            hash ^= (index as u64).rotate_left(19);
            hash = mix_str(hash, marker.as_str(), 23);
        }

        hash ^= (self.history.len() as u64).rotate_left(3);
        hash ^= (self.markers.len() as u64).rotate_left(5);

        hash
    }
}

fn mix_str(mut hash: u64, s: &str, salt: u32) -> u64 {
    for (offset, byte) in s.bytes().enumerate() {
        hash = hash.rotate_left(salt) ^ (byte as u64).wrapping_add(offset as u64);
    }
    hash.rotate_left(1) ^ (s.len() as u64)
}

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for canonical lineage exports.
pub const CANONICAL_MAGIC: [u8; 4] = *b"WEAV";

/// Current canonical format version.
pub const CANONICAL_VERSION: u8 = 1;

/// Header for canonical lineage exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineageHeader {
    /// Magic bytes to identify the format.
    pub magic: [u8; 4],

    /// Format version for compatibility.
    pub version: u8,

    /// Number of history entries.
    pub entry_count: u64,

    /// Number of markers.
    pub marker_count: u64,

    /// Checksum of the payload (see [`Lineage::checksum`]).
    pub checksum: u64,
}

impl LineageHeader {
    #[must_use]
    pub fn new(entry_count: u64, marker_count: u64, checksum: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            entry_count,
            marker_count,
            checksum,
        }
    }

    /// Validate the magic bytes, version and size limits.
    ///
    /// Error messages are kept generic so they do not leak format details.
    pub fn validate(&self) -> Result<(), WeaveError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(WeaveError::DeserializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != CANONICAL_VERSION {
            return Err(WeaveError::DeserializationError(
                "Unsupported file version".to_string(),
            ));
        }
        if self.entry_count > MAX_IMPORT_HISTORY {
            return Err(WeaveError::DeserializationError(format!(
                "History length {} exceeds maximum allowed {}",
                self.entry_count, MAX_IMPORT_HISTORY
            )));
        }
        if self.marker_count > MAX_IMPORT_MARKERS {
            return Err(WeaveError::DeserializationError(format!(
                "Marker count {} exceeds maximum allowed {}",
                self.marker_count, MAX_IMPORT_MARKERS
            )));
        }
        Ok(())
    }
}

/// Export a lineage to the canonical postcard format.
pub fn export_canonical(lineage: &Lineage) -> Result<Vec<u8>, WeaveError> {
    let header = LineageHeader::new(
        lineage.history.len() as u64,
        lineage.markers.len() as u64,
        lineage.checksum(),
    );

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| WeaveError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(lineage)
        .map_err(|e| WeaveError::SerializationError(format!("Data: {}", e)))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);

    Ok(result)
}

/// Import a lineage from the canonical postcard format.
///
/// The header is validated before the payload is decoded; the payload is
/// then checked against the header's checksum and counts and against the
/// history invariants.
pub fn import_canonical(data: &[u8]) -> Result<Lineage, WeaveError> {
    let Some(len_bytes) = data.get(..4) else {
        return Err(WeaveError::DeserializationError(
            "Data too short".to_string(),
        ));
    };
    let header_len =
        u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

    let header_end = 4usize.saturating_add(header_len);
    let Some(header_bytes) = data.get(4..header_end) else {
        return Err(WeaveError::DeserializationError(
            "Data too short for header".to_string(),
        ));
    };

    let header: LineageHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| WeaveError::DeserializationError(format!("Header: {}", e)))?;
    header.validate()?;

    let lineage: Lineage = postcard::from_bytes(&data[header_end..])
        .map_err(|e| WeaveError::DeserializationError(format!("Data: {}", e)))?;

    let computed = lineage.checksum();
    if computed != header.checksum {
        return Err(WeaveError::DeserializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if lineage.history.len() as u64 != header.entry_count {
        return Err(WeaveError::DeserializationError(
            "History length mismatch".to_string(),
        ));
    }
    if lineage.markers.len() as u64 != header.marker_count {
        return Err(WeaveError::DeserializationError(
            "Marker count mismatch".to_string(),
        ));
    }

    lineage.validate()?;
    Ok(lineage)
}

/// Check that `canonical_data` decodes to exactly `lineage`.
pub fn verify_canonical(lineage: &Lineage, canonical_data: &[u8]) -> Result<bool, WeaveError> {
    let imported = import_canonical(canonical_data)?;
    Ok(imported == *lineage)
}

/// Compute the canonical checksum of a lineage.
#[must_use]
pub fn lineage_checksum(lineage: &Lineage) -> u64 {
    lineage.checksum()
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// BLAKE3 hash of the canonical export, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
pub fn lineage_crypto_hash(lineage: &Lineage) -> Result<String, WeaveError> {
    let data = export_canonical(lineage)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

/// Check a lineage against a BLAKE3 hex digest.
#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(lineage: &Lineage, expected_hash: &str) -> Result<bool, WeaveError> {
    Ok(lineage_crypto_hash(lineage)? == expected_hash)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fiber;

    fn sample_lineage() -> Lineage {
        let mut fiber = Fiber::create("fiber-1", "raw").expect("create");
        fiber
            .transform("spin", "blue", Some("bundled".to_string()))
            .transform("warp", "green", None)
            .add_marker("reviewed")
            .add_marker("reviewed");
        fiber.export_lineage()
    }

    #[test]
    fn json_shape() {
        let lineage = sample_lineage();
        let value = serde_json::to_value(&lineage).expect("to_value");

        assert_eq!(value["id"], "fiber-1");
        assert_eq!(value["history"][0]["stage"], "start");
        assert_eq!(value["history"][0]["label"], "raw");
        assert!(value["history"][0]["context"].is_null());
        assert_eq!(value["history"][1]["context"], "bundled");
        assert_eq!(value["markers"][1], "reviewed");
    }

    #[test]
    fn json_roundtrip_validates() {
        let lineage = sample_lineage();
        let json = lineage.to_json().expect("json");
        assert_eq!(Lineage::from_json(&json).expect("parse"), lineage);
    }

    #[test]
    fn json_missing_start_rejected() {
        let json = r#"{"id":"f","history":[{"stage":"spin","label":"x"}],"markers":[]}"#;
        assert!(matches!(
            Lineage::from_json(json),
            Err(WeaveError::LineageCorrupted(_))
        ));
    }

    #[test]
    fn json_oversized_id_rejected() {
        let json = format!(
            r#"{{"id":"{}","history":[{{"stage":"start","label":"raw"}}]}}"#,
            "x".repeat(MAX_ID_LENGTH + 1)
        );
        assert!(matches!(
            Lineage::from_json(&json),
            Err(WeaveError::LineageCorrupted(ref m)) if m.contains("id")
        ));
    }

    #[test]
    fn json_empty_initial_label_rejected() {
        let json = r#"{"id":"f","history":[{"stage":"start","label":""}]}"#;
        assert!(matches!(
            Lineage::from_json(json),
            Err(WeaveError::LineageCorrupted(_))
        ));
    }

    #[test]
    fn json_history_over_cap_rejected() {
        let entry = r#"{"stage":"spin","label":"x"}"#;
        let mut entries = vec![r#"{"stage":"start","label":"raw"}"#];
        entries.resize(MAX_IMPORT_HISTORY as usize + 1, entry);
        let json = format!(r#"{{"id":"f","history":[{}]}}"#, entries.join(","));

        assert!(matches!(
            Lineage::from_json(&json),
            Err(WeaveError::LineageCorrupted(ref m)) if m.contains("history length")
        ));
    }

    #[test]
    fn markers_over_cap_rejected() {
        let mut lineage = sample_lineage();
        lineage.markers = vec![Marker::new("m"); MAX_IMPORT_MARKERS as usize + 1];
        assert!(matches!(
            lineage.validate(),
            Err(WeaveError::LineageCorrupted(ref m)) if m.contains("marker count")
        ));
    }

    #[test]
    fn later_transforms_may_carry_any_label() {
        let mut fiber = Fiber::create("f", "raw").expect("create");
        fiber.transform("spin", "", None);
        assert!(fiber.export_lineage().validate().is_ok());
    }

    #[test]
    fn canonical_roundtrip() {
        let lineage = sample_lineage();
        let data = export_canonical(&lineage).expect("export");
        let imported = import_canonical(&data).expect("import");
        assert_eq!(imported, lineage);
        assert!(verify_canonical(&lineage, &data).expect("verify"));
    }

    #[test]
    fn canonical_export_deterministic() {
        let lineage = sample_lineage();
        assert_eq!(
            export_canonical(&lineage).expect("a"),
            export_canonical(&lineage).expect("b")
        );
    }

    #[test]
    fn checksum_changes_with_order() {
        let mut a = Fiber::create("f", "raw").expect("create");
        a.transform("spin", "x", None).transform("warp", "y", None);
        let mut b = Fiber::create("f", "raw").expect("create");
        b.transform("warp", "y", None).transform("spin", "x", None);

        assert_ne!(
            a.export_lineage().checksum(),
            b.export_lineage().checksum()
        );
    }

    #[test]
    fn checksum_distinguishes_absent_and_empty_context() {
        let mut a = Fiber::create("f", "raw").expect("create");
        a.transform("spin", "x", None);
        let mut b = Fiber::create("f", "raw").expect("create");
        b.transform("spin", "x", Some(String::new()));

        assert_ne!(
            a.export_lineage().checksum(),
            b.export_lineage().checksum()
        );
    }

    #[test]
    fn header_validation() {
        let mut header = LineageHeader::new(1, 0, 0);
        assert!(header.validate().is_ok());

        header.magic = *b"XXXX";
        assert!(header.validate().is_err());

        let mut header = LineageHeader::new(1, 0, 0);
        header.version = 99;
        assert!(header.validate().is_err());

        let header = LineageHeader::new(MAX_IMPORT_HISTORY + 1, 0, 0);
        assert!(header.validate().is_err());
    }

    #[test]
    fn corrupted_import_empty_data() {
        assert!(import_canonical(&[]).is_err());
    }

    #[test]
    fn corrupted_import_header_length_exceeds_data() {
        let data = [255u8, 255, 255, 255, 1, 2];
        assert!(import_canonical(&data).is_err());
    }

    #[test]
    fn corrupted_import_checksum_mismatch() {
        let lineage = sample_lineage();
        let header = LineageHeader::new(
            lineage.history.len() as u64,
            lineage.markers.len() as u64,
            lineage.checksum() ^ 1,
        );
        let header_bytes = postcard::to_allocvec(&header).expect("header");
        let data_bytes = postcard::to_allocvec(&lineage).expect("data");

        let mut data = Vec::new();
        data.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(&header_bytes);
        data.extend_from_slice(&data_bytes);

        let result = import_canonical(&data);
        assert!(
            matches!(result, Err(WeaveError::DeserializationError(ref m)) if m.contains("Checksum"))
        );
    }

    #[test]
    fn corrupted_import_count_mismatch() {
        let lineage = sample_lineage();
        let header = LineageHeader::new(99, lineage.markers.len() as u64, lineage.checksum());
        let header_bytes = postcard::to_allocvec(&header).expect("header");
        let data_bytes = postcard::to_allocvec(&lineage).expect("data");

        let mut data = Vec::new();
        data.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(&header_bytes);
        data.extend_from_slice(&data_bytes);

        assert!(import_canonical(&data).is_err());
    }

    #[test]
    fn corrupted_import_truncated_payload() {
        let data = export_canonical(&sample_lineage()).expect("export");
        let truncated = &data[..data.len() - 3];
        assert!(import_canonical(truncated).is_err());
    }

    #[test]
    fn verify_canonical_detects_other_lineage() {
        let data = export_canonical(&sample_lineage()).expect("export");
        let other = Fiber::create("fiber-2", "raw")
            .expect("create")
            .export_lineage();
        assert!(!verify_canonical(&other, &data).expect("verify"));
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn crypto_hash_is_hex_and_verifies() {
        let lineage = sample_lineage();
        let hash = lineage_crypto_hash(&lineage).expect("hash");
        assert_eq!(hash.len(), 64);
        assert!(verify_crypto_hash(&lineage, &hash).expect("verify"));
    }
}
