use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::core::{Confidence, EstimateRecord};

/// Record field a cluster run can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterField {
    Channel,
    Mcc,
    Mnc,
}

impl ClusterField {
    fn value_of(&self, record: &EstimateRecord) -> String {
        match self {
            ClusterField::Channel => record.channel.to_string(),
            ClusterField::Mcc => record.mcc.clone(),
            ClusterField::Mnc => record.mnc.clone(),
        }
    }
}

impl fmt::Display for ClusterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterField::Channel => f.write_str("channel"),
            ClusterField::Mcc => f.write_str("mcc"),
            ClusterField::Mnc => f.write_str("mnc"),
        }
    }
}

/// Keep only records whose `field` equals `value`, or the field's most
/// common value when none is given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterFilter {
    pub field: ClusterField,
    pub value: Option<String>,
}

impl FromStr for ClusterFilter {
    type Err = String;

    /// Parses `FIELD` or `FIELD=VALUE`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name, Some(value.trim().to_string())),
            None => (s, None),
        };
        let field = match name.trim().to_ascii_lowercase().as_str() {
            "channel" => ClusterField::Channel,
            "mcc" => ClusterField::Mcc,
            "mnc" => ClusterField::Mnc,
            other => return Err(format!("unknown cluster filter field '{}'", other)),
        };
        Ok(Self { field, value })
    }
}

/// Most frequent non-blank value of `field`; ties go to the value seen first
fn most_common(records: &[EstimateRecord], field: ClusterField) -> Option<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (order, record) in records.iter().enumerate() {
        let value = field.value_of(record);
        if value.trim().is_empty() {
            continue;
        }
        counts.entry(value).or_insert((0, order)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

/// Drop low-confidence records, then apply the optional field filter
pub fn select_for_clustering(records: Vec<EstimateRecord>, filter: Option<&ClusterFilter>) -> Vec<EstimateRecord> {
    let confident: Vec<EstimateRecord> = records
        .into_iter()
        .filter(|r| r.confidence != Confidence::Low)
        .collect();

    let Some(filter) = filter else {
        return confident;
    };
    let target = match &filter.value {
        Some(value) => Some(value.clone()),
        None => most_common(&confident, filter.field),
    };
    let Some(target) = target else {
        return confident;
    };

    confident
        .into_iter()
        .filter(|r| filter.field.value_of(r) == target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RecordKind, Technology};

    fn record(channel: u32, mcc: &str, mnc: &str, confidence: Confidence) -> EstimateRecord {
        EstimateRecord {
            technology: Technology::Lte,
            channel,
            cell_id: "1".to_string(),
            beam_index: None,
            kind: RecordKind::Sector,
            cell_identity: "1001".to_string(),
            mnc: mnc.to_string(),
            mcc: mcc.to_string(),
            x_hat1: 0.0,
            y_hat1: 0.0,
            x_hat2: 0.0,
            y_hat2: 0.0,
            est_lat1: 32.0,
            est_lon1: -117.0,
            est_lat2: 32.0,
            est_lon2: -117.0,
            max_cinr: 10.0,
            num_points: 10,
            confidence,
        }
    }

    #[test]
    fn test_low_confidence_dropped() {
        let records = vec![
            record(100, "310", "260", Confidence::High),
            record(100, "310", "260", Confidence::Low),
        ];
        assert_eq!(select_for_clustering(records, None).len(), 1);
    }

    #[test]
    fn test_explicit_value() {
        let records = vec![
            record(100, "310", "260", Confidence::High),
            record(200, "310", "410", Confidence::High),
            record(100, "310", "410", Confidence::High),
        ];
        let filter: ClusterFilter = "mnc=410".parse().unwrap();
        let selected = select_for_clustering(records, Some(&filter));
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|r| r.mnc == "410"));
    }

    #[test]
    fn test_most_common_value() {
        let records = vec![
            record(100, "310", "260", Confidence::High),
            record(200, "310", "410", Confidence::High),
            record(200, "310", "410", Confidence::High),
            record(100, "310", "410", Confidence::Low),
        ];
        let filter: ClusterFilter = "channel".parse().unwrap();
        let selected = select_for_clustering(records, Some(&filter));
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|r| r.channel == 200));
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let records = vec![
            record(100, "310", "", Confidence::High),
            record(300, "310", "260", Confidence::High),
            record(200, "310", "410", Confidence::High),
        ];
        let filter = ClusterFilter { field: ClusterField::Mnc, value: None };
        let selected = select_for_clustering(records, Some(&filter));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].channel, 300);
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        assert!("region=west".parse::<ClusterFilter>().is_err());
    }
}
