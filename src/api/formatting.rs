//! CSV output of estimate and cluster records

use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::core::{ClusterRecord, EstimateRecord};

/// Errors reading or writing record files
#[derive(Error, Debug)]
pub enum RecordIoError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub const ESTIMATE_HEADER: [&str; 18] = [
    "Channel",
    "CellId",
    "BeamIndex",
    "Type",
    "cellIdentity",
    "mnc",
    "mcc",
    "xhat1",
    "yhat1",
    "xhat2",
    "yhat2",
    "est_Lat1",
    "est_Lon1",
    "est_Lat2",
    "est_Lon2",
    "Max_cinr",
    "Num_points",
    "Confidence",
];

pub const CLUSTER_HEADER: [&str; 11] = [
    "Technology",
    "Channel",
    "CellId",
    "BeamIndex",
    "Type",
    "cellIdentity",
    "mnc",
    "mcc",
    "est_Lat2",
    "est_Lon2",
    "Num_points",
];

fn estimate_row(record: &EstimateRecord) -> [String; 18] {
    [
        record.channel.to_string(),
        record.cell_id.clone(),
        record.beam_index.clone().unwrap_or_default(),
        record.kind.to_string(),
        record.cell_identity.clone(),
        record.mnc.clone(),
        record.mcc.clone(),
        format!("{:.4}", record.x_hat1),
        format!("{:.4}", record.y_hat1),
        format!("{:.4}", record.x_hat2),
        format!("{:.4}", record.y_hat2),
        format!("{:.6}", record.est_lat1),
        format!("{:.6}", record.est_lon1),
        format!("{:.6}", record.est_lat2),
        format!("{:.6}", record.est_lon2),
        format!("{:.2}", record.max_cinr),
        record.num_points.to_string(),
        record.confidence.to_string(),
    ]
}

fn cluster_row(record: &ClusterRecord) -> [String; 11] {
    [
        record.technology.clone(),
        record.channel.clone(),
        record.cell_id.clone(),
        record.beam_index.clone(),
        ClusterRecord::TYPE_LABEL.to_string(),
        record.cell_identity.clone(),
        record.mnc.clone(),
        record.mcc.clone(),
        format!("{:.6}", record.est_lat2),
        format!("{:.6}", record.est_lon2),
        record.num_points.to_string(),
    ]
}

pub fn write_estimates_to<W: Write>(writer: W, records: &[EstimateRecord]) -> Result<(), RecordIoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(ESTIMATE_HEADER)?;
    for record in records {
        wtr.write_record(estimate_row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write estimates with fixed precision: 4 decimals for local meters,
/// 6 for degrees and 2 for CINR
pub fn write_estimates<P: AsRef<Path>>(path: P, records: &[EstimateRecord]) -> Result<(), RecordIoError> {
    let file = std::fs::File::create(path)?;
    write_estimates_to(file, records)
}

pub fn write_clusters_to<W: Write>(writer: W, records: &[ClusterRecord]) -> Result<(), RecordIoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CLUSTER_HEADER)?;
    for record in records {
        wtr.write_record(cluster_row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_clusters<P: AsRef<Path>>(path: P, records: &[ClusterRecord]) -> Result<(), RecordIoError> {
    let file = std::fs::File::create(path)?;
    write_clusters_to(file, records)
}
