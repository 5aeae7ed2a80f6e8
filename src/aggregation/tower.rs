//! Synthesis of tower records from sectors with adjacent identities
//!
//! Sector identities of one site are usually allocated consecutively, so
//! sectors on one channel whose `cellIdentity` values step by +1/+2 (or by
//! ×10 of that for some technologies) are merged into a tower summary.
//! Matching is first-found over the `(channel, cellIdentity)` sort order.

use std::collections::HashMap;

use crate::core::{sort_records, Confidence, EstimateRecord, RecordKind, Technology};
use crate::utils::config::TowerConfig;

const TRIPLE_STEPS: [(i64, i64); 3] = [(1, 1), (1, 2), (2, 1)];
const SCALED_TRIPLE_STEPS: [(i64, i64); 3] = [(10, 10), (10, 20), (20, 10)];
const PAIR_STEPS: [i64; 2] = [1, 2];
const SCALED_PAIR_STEPS: [i64; 2] = [10, 20];

pub struct TowerAggregator {
    scaled_technologies: Vec<Technology>,
}

impl TowerAggregator {
    pub fn new(config: &TowerConfig) -> Self {
        Self {
            scaled_technologies: config.scaled_technologies.clone(),
        }
    }

    fn uses_scaled_steps(&self, technology: Technology) -> bool {
        self.scaled_technologies.contains(&technology)
    }

    fn is_triple(&self, technology: Technology, a: i64, b: i64, c: i64) -> bool {
        let matches = |steps: &[(i64, i64)]| steps.iter().any(|&(s1, s2)| b == a + s1 && c == b + s2);
        matches(&TRIPLE_STEPS) || (self.uses_scaled_steps(technology) && matches(&SCALED_TRIPLE_STEPS))
    }

    fn is_pair(&self, technology: Technology, a: i64, b: i64) -> bool {
        let matches = |steps: &[i64]| steps.iter().any(|&s| b == a + s);
        matches(&PAIR_STEPS) || (self.uses_scaled_steps(technology) && matches(&SCALED_PAIR_STEPS))
    }

    /// Return all sectors plus the synthesized towers, sorted by `(channel, cellIdentity)`
    pub fn aggregate(&self, mut sectors: Vec<EstimateRecord>) -> Vec<EstimateRecord> {
        sort_records(&mut sectors);

        let mut towers = Vec::new();
        let mut start = 0;
        while start < sectors.len() {
            let channel = sectors[start].channel;
            let end = start + sectors[start..].iter().take_while(|r| r.channel == channel).count();
            towers.extend(self.aggregate_channel(&sectors[start..end]));
            start = end;
        }

        sectors.extend(towers);
        sort_records(&mut sectors);
        sectors
    }

    /// Towers for the sorted records of a single channel
    fn aggregate_channel(&self, records: &[EstimateRecord]) -> Vec<EstimateRecord> {
        if records.len() < 2 {
            return Vec::new();
        }

        let technology = records[0].technology;
        if technology == Technology::Nr {
            let beam_towers = beam_groups(records);
            if !beam_towers.is_empty() {
                return beam_towers
                    .iter()
                    .map(|members| merge_beams(records, members))
                    .collect();
            }
        }

        let identities: Vec<Option<i64>> = records.iter().map(EstimateRecord::identity_number).collect();
        let mut consumed = vec![false; records.len()];
        let mut towers = Vec::new();
        let n = records.len();

        for i in 0..n {
            if consumed[i] {
                continue;
            }
            let Some(a) = identities[i] else { continue };
            'search: for j in i + 1..n {
                if consumed[j] {
                    continue;
                }
                let Some(b) = identities[j] else { continue };
                for k in j + 1..n {
                    if consumed[k] {
                        continue;
                    }
                    let Some(c) = identities[k] else { continue };
                    if self.is_triple(technology, a, b, c) {
                        towers.push(merge_sectors(records, &[i, j, k]));
                        consumed[i] = true;
                        consumed[j] = true;
                        consumed[k] = true;
                        break 'search;
                    }
                }
            }
        }

        for i in 0..n {
            if consumed[i] {
                continue;
            }
            let Some(a) = identities[i] else { continue };
            for j in i + 1..n {
                if consumed[j] {
                    continue;
                }
                let Some(b) = identities[j] else { continue };
                if self.is_pair(technology, a, b) {
                    towers.push(merge_sectors(records, &[i, j]));
                    consumed[i] = true;
                    consumed[j] = true;
                    break;
                }
            }
        }

        towers
    }
}

/// Indices of records sharing `(cell_id, cell_identity)`, in order of first appearance
fn beam_groups(records: &[EstimateRecord]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        if record.cell_identity.trim().is_empty() {
            continue;
        }
        let key = (record.cell_id.as_str(), record.cell_identity.as_str());
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }
    groups.retain(|g| g.len() > 1);
    groups
}

fn last_three(identity: &str) -> &str {
    identity
        .char_indices()
        .rev()
        .nth(2)
        .map_or(identity, |(i, _)| &identity[i..])
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join("/")
}

/// Averaged location and combined quality of `members`, with identity fields left to the caller
fn tower_base(records: &[EstimateRecord], members: &[usize]) -> EstimateRecord {
    let group: Vec<&EstimateRecord> = members.iter().map(|&i| &records[i]).collect();
    let count = group.len() as f64;
    let mean = |f: fn(&EstimateRecord) -> f64| group.iter().map(|r| f(r)).sum::<f64>() / count;
    let first = group[0];

    EstimateRecord {
        technology: first.technology,
        channel: first.channel,
        cell_id: first.cell_id.clone(),
        beam_index: None,
        kind: RecordKind::Tower,
        cell_identity: first.cell_identity.clone(),
        mnc: join(group.iter().map(|r| r.mnc.as_str())),
        mcc: join(group.iter().map(|r| r.mcc.as_str())),
        x_hat1: 0.0,
        y_hat1: 0.0,
        x_hat2: 0.0,
        y_hat2: 0.0,
        est_lat1: mean(|r| r.est_lat1),
        est_lon1: mean(|r| r.est_lon1),
        est_lat2: mean(|r| r.est_lat2),
        est_lon2: mean(|r| r.est_lon2),
        max_cinr: group.iter().map(|r| r.max_cinr).fold(f64::NEG_INFINITY, f64::max),
        num_points: group.iter().map(|r| r.num_points).sum(),
        confidence: if group.iter().any(|r| r.confidence == Confidence::Low) {
            Confidence::Low
        } else {
            Confidence::High
        },
    }
}

fn joined_beams(records: &[EstimateRecord], members: &[usize]) -> String {
    join(members.iter().map(|&i| records[i].beam_index.as_deref().unwrap_or("")))
}

fn merge_sectors(records: &[EstimateRecord], members: &[usize]) -> EstimateRecord {
    let mut tower = tower_base(records, members);
    tower.cell_id = join(members.iter().map(|&i| records[i].cell_id.as_str()));

    let mut identity = records[members[0]].cell_identity.clone();
    for &i in &members[1..] {
        identity.push('_');
        identity.push_str(last_three(&records[i].cell_identity));
    }
    tower.cell_identity = identity;

    if tower.technology == Technology::Nr {
        tower.beam_index = Some(joined_beams(records, members));
    }
    tower
}

/// Beams of one NR cell keep the shared cell id and identity
fn merge_beams(records: &[EstimateRecord], members: &[usize]) -> EstimateRecord {
    let mut tower = tower_base(records, members);
    tower.beam_index = Some(joined_beams(records, members));
    tower
}
