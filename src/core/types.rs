//! Core data types for the estimation pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Radio access technology of a drive-test file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technology {
    Lte,
    Nr,
    Wcdma,
    Gsm,
}

impl Technology {
    /// WCDMA reports Ec/Io instead of CINR as its quality metric
    pub fn is_ecio_based(&self) -> bool {
        matches!(self, Technology::Wcdma)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Technology::Lte => "LTE",
            Technology::Nr => "NR",
            Technology::Wcdma => "WCDMA",
            Technology::Gsm => "GSM",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Technology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LTE" => Ok(Technology::Lte),
            "NR" => Ok(Technology::Nr),
            "WCDMA" => Ok(Technology::Wcdma),
            "GSM" => Ok(Technology::Gsm),
            other => Err(format!("unknown technology '{}'", other)),
        }
    }
}

/// Composite key identifying one measured sector: channel plus cell id.
///
/// Ordering is channel first, then cell id, and is the iteration order used
/// everywhere groups are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub channel: u32,
    pub cell_id: u32,
}

impl CellKey {
    pub fn new(channel: u32, cell_id: u32) -> Self {
        Self { channel, cell_id }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}/cell{}", self.channel, self.cell_id)
    }
}

/// Geodetic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One drive-test sample of one detected cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Raw ticks on input, seconds after time normalization
    pub time_offset: f64,
    /// CINR in dB, or Ec/Io for WCDMA
    pub cinr: f64,
    pub channel: u32,
    pub cell_id: u32,
    #[serde(default)]
    pub cell_identity: Option<String>,
    #[serde(default)]
    pub mcc: Option<String>,
    #[serde(default)]
    pub mnc: Option<String>,
}

impl MeasurementPoint {
    pub fn key(&self) -> CellKey {
        CellKey::new(self.channel, self.cell_id)
    }

    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// Ordered measurements of a single sector
#[derive(Debug, Clone)]
pub struct CellGroup {
    pub key: CellKey,
    pub points: Vec<MeasurementPoint>,
}

/// Reliability label attached to every estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => f.write_str("High"),
            Confidence::Low => f.write_str("Low"),
        }
    }
}

/// Whether a record is a direct per-sector estimate or a synthesized tower summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Sector,
    Tower,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Sector => f.write_str("Sector"),
            RecordKind::Tower => f.write_str("Tower"),
        }
    }
}

/// Location estimate for one sector, or a tower derived from several sectors.
///
/// `cell_id`, `beam_index`, `mcc` and `mnc` are textual because tower records
/// carry the `/`-joined values of their members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub technology: Technology,
    pub channel: u32,
    pub cell_id: String,
    pub beam_index: Option<String>,
    pub kind: RecordKind,
    pub cell_identity: String,
    pub mnc: String,
    pub mcc: String,
    pub x_hat1: f64,
    pub y_hat1: f64,
    pub x_hat2: f64,
    pub y_hat2: f64,
    pub est_lat1: f64,
    pub est_lon1: f64,
    pub est_lat2: f64,
    pub est_lon2: f64,
    pub max_cinr: f64,
    pub num_points: usize,
    pub confidence: Confidence,
}

impl EstimateRecord {
    /// Cell identity as a single integer, if it is one
    pub fn identity_number(&self) -> Option<i64> {
        self.cell_identity.trim().parse().ok()
    }

    /// Refined (grid search) location
    pub fn refined_position(&self) -> Position {
        Position::new(self.est_lat2, self.est_lon2)
    }
}

/// Sort records by `(channel, cellIdentity)`; stable, so equal keys keep their order.
///
/// `cellIdentity` compares as text, so `1000` sorts before `999` and identities of
/// different digit lengths are not adjacent when towers are formed.
pub fn sort_records(records: &mut [EstimateRecord]) {
    records.sort_by(|a, b| {
        a.channel
            .cmp(&b.channel)
            .then_with(|| a.cell_identity.cmp(&b.cell_identity))
    });
}

/// Centroid of a dense group of estimates, with the joined identities of its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub technology: String,
    pub channel: String,
    pub cell_id: String,
    pub beam_index: String,
    pub cell_identity: String,
    pub mnc: String,
    pub mcc: String,
    pub est_lat2: f64,
    pub est_lon2: f64,
    pub num_points: usize,
}

impl ClusterRecord {
    pub const TYPE_LABEL: &'static str = "cluster entry";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technology_parsing() {
        assert_eq!("nr".parse::<Technology>().unwrap(), Technology::Nr);
        assert_eq!(" WCDMA ".parse::<Technology>().unwrap(), Technology::Wcdma);
        assert!("5G".parse::<Technology>().is_err());
        assert!(Technology::Wcdma.is_ecio_based());
        assert!(!Technology::Lte.is_ecio_based());
    }

    #[test]
    fn test_sort_records_compares_identity_as_text() {
        let record = |channel: u32, identity: &str| EstimateRecord {
            technology: Technology::Lte,
            channel,
            cell_id: "1".to_string(),
            beam_index: None,
            kind: RecordKind::Sector,
            cell_identity: identity.to_string(),
            mnc: "260".to_string(),
            mcc: "310".to_string(),
            x_hat1: 0.0,
            y_hat1: 0.0,
            x_hat2: 0.0,
            y_hat2: 0.0,
            est_lat1: 0.0,
            est_lon1: 0.0,
            est_lat2: 0.0,
            est_lon2: 0.0,
            max_cinr: 0.0,
            num_points: 4,
            confidence: Confidence::High,
        };
        let mut records = vec![record(5230, "999"), record(5230, "1001"), record(100, "5"), record(5230, "1000")];
        sort_records(&mut records);

        let order: Vec<(u32, &str)> = records.iter().map(|r| (r.channel, r.cell_identity.as_str())).collect();
        assert_eq!(order, vec![(100, "5"), (5230, "1000"), (5230, "1001"), (5230, "999")]);
    }

    #[test]
    fn test_cell_key_ordering() {
        let mut keys = vec![CellKey::new(2, 1), CellKey::new(1, 9), CellKey::new(1, 3)];
        keys.sort();
        assert_eq!(keys, vec![CellKey::new(1, 3), CellKey::new(1, 9), CellKey::new(2, 1)]);
    }
}
