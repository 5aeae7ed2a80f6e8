//! Density-based clustering of refined estimates (DBSCAN)
//!
//! Positions are compared as planar `(lat, lon)` in degrees with a Euclidean
//! metric. Points are visited in input order and cluster expansion is
//! breadth-first, so the member order of every cluster is deterministic.

use std::collections::VecDeque;

use crate::core::{ClusterRecord, EstimateRecord, Position};
use crate::utils::config::ClusteringConfig;

pub struct DensityClusterer {
    eps_degrees: f64,
    min_pts: usize,
}

impl DensityClusterer {
    pub fn new(config: &ClusteringConfig) -> Self {
        Self::with_params(config.eps_degrees(), config.min_pts)
    }

    pub fn with_params(eps_degrees: f64, min_pts: usize) -> Self {
        Self { eps_degrees, min_pts }
    }

    /// Indices within `eps` of `positions[index]`, itself included
    fn region_query(&self, positions: &[Position], index: usize) -> Vec<usize> {
        let centre = positions[index];
        positions
            .iter()
            .enumerate()
            .filter(|(_, p)| (p.lat - centre.lat).hypot(p.lon - centre.lon) <= self.eps_degrees)
            .map(|(i, _)| i)
            .collect()
    }

    /// Member indices of every cluster, in the order members were claimed.
    /// Noise points appear in no cluster.
    pub fn cluster_indices(&self, positions: &[Position]) -> Vec<Vec<usize>> {
        let n = positions.len();
        let mut visited = vec![false; n];
        let mut assigned = vec![false; n];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for i in 0..n {
            if visited[i] {
                continue;
            }
            visited[i] = true;

            let neighbours = self.region_query(positions, i);
            if neighbours.len() < self.min_pts {
                continue;
            }

            let mut members = vec![i];
            assigned[i] = true;
            let mut seeds: VecDeque<usize> = neighbours.into();
            while let Some(current) = seeds.pop_front() {
                if !visited[current] {
                    visited[current] = true;
                    let reachable = self.region_query(positions, current);
                    if reachable.len() >= self.min_pts {
                        seeds.extend(reachable.into_iter().filter(|&k| !assigned[k]));
                    }
                }
                // Border points first marked as noise are claimed here
                if !assigned[current] {
                    assigned[current] = true;
                    members.push(current);
                }
            }
            clusters.push(members);
        }

        clusters
    }

    /// One centroid record per dense group of refined estimates
    pub fn cluster(&self, records: &[EstimateRecord]) -> Vec<ClusterRecord> {
        let positions: Vec<Position> = records.iter().map(EstimateRecord::refined_position).collect();
        self.cluster_indices(&positions)
            .into_iter()
            .map(|members| summarize(records, &members))
            .collect()
    }
}

fn summarize(records: &[EstimateRecord], members: &[usize]) -> ClusterRecord {
    let group: Vec<&EstimateRecord> = members.iter().map(|&i| &records[i]).collect();
    let join = |f: fn(&EstimateRecord) -> String| group.iter().map(|r| f(r)).collect::<Vec<_>>().join("/");
    let count = group.len() as f64;

    ClusterRecord {
        technology: join(|r| r.technology.to_string()),
        channel: join(|r| r.channel.to_string()),
        cell_id: join(|r| r.cell_id.clone()),
        beam_index: join(|r| r.beam_index.clone().unwrap_or_default()),
        cell_identity: join(|r| r.cell_identity.clone()),
        mnc: join(|r| r.mnc.clone()),
        mcc: join(|r| r.mcc.clone()),
        est_lat2: group.iter().map(|r| r.est_lat2).sum::<f64>() / count,
        est_lon2: group.iter().map(|r| r.est_lon2).sum::<f64>() / count,
        num_points: group.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Confidence, RecordKind, Technology};

    fn estimate(cell_id: &str, lat: f64, lon: f64) -> EstimateRecord {
        EstimateRecord {
            technology: Technology::Lte,
            channel: 5230,
            cell_id: cell_id.to_string(),
            beam_index: None,
            kind: RecordKind::Sector,
            cell_identity: format!("1000{}", cell_id),
            mnc: "260".to_string(),
            mcc: "310".to_string(),
            x_hat1: 0.0,
            y_hat1: 0.0,
            x_hat2: 0.0,
            y_hat2: 0.0,
            est_lat1: lat,
            est_lon1: lon,
            est_lat2: lat,
            est_lon2: lon,
            max_cinr: 10.0,
            num_points: 12,
            confidence: Confidence::High,
        }
    }

    fn clusterer() -> DensityClusterer {
        DensityClusterer::new(&ClusteringConfig::default())
    }

    #[test]
    fn test_isolated_estimate_is_noise() {
        // eps is 0.5 mi ~ 0.0072 deg
        let records = vec![
            estimate("1", 32.7000, -117.1000),
            estimate("2", 32.7010, -117.1000),
            estimate("3", 32.7000, -117.1010),
            estimate("4", 32.7010, -117.1010),
            estimate("9", 33.5000, -117.1000),
        ];

        let clusters = clusterer().cluster(&records);
        assert_eq!(clusters.len(), 1);

        let cluster = &clusters[0];
        assert_eq!(cluster.num_points, 4);
        assert_eq!(cluster.cell_id, "1/2/3/4");
        assert_eq!(cluster.mcc, "310/310/310/310");
        assert_eq!(cluster.beam_index, "///");
        assert!((cluster.est_lat2 - 32.7005).abs() < 1e-9);
        assert!((cluster.est_lon2 - (-117.1005)).abs() < 1e-9);
        assert!(!cluster.cell_identity.contains("10009"));
    }

    #[test]
    fn test_too_sparse_for_any_cluster() {
        let records = vec![
            estimate("1", 32.7000, -117.1000),
            estimate("2", 32.7010, -117.1000),
            estimate("3", 32.7000, -117.1010),
        ];
        assert!(clusterer().cluster(&records).is_empty());
    }

    #[test]
    fn test_border_point_claimed_after_noise() {
        // Index 0 has only two neighbours so it is visited first as noise,
        // then claimed as a border point of the core at index 1
        let positions = vec![
            Position::new(0.0, 0.0),
            Position::new(0.0, 1.0),
            Position::new(0.0, 1.5),
            Position::new(0.5, 1.5),
            Position::new(-0.5, 1.5),
        ];
        let clusterer = DensityClusterer::with_params(1.0, 4);

        let clusters = clusterer.cluster_indices(&positions);
        assert_eq!(clusters.len(), 1);
        let mut members = clusters[0].clone();
        members.sort();
        assert_eq!(members, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_separate_clusters_in_visit_order() {
        let positions = vec![
            Position::new(10.0, 10.0),
            Position::new(0.0, 0.0),
            Position::new(10.0, 10.1),
            Position::new(0.0, 0.1),
            Position::new(10.1, 10.0),
            Position::new(0.1, 0.0),
        ];
        let clusterer = DensityClusterer::with_params(0.2, 3);

        let clusters = clusterer.cluster_indices(&positions);
        assert_eq!(clusters, vec![vec![0, 2, 4], vec![1, 3, 5]]);
    }
}
