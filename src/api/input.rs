//! Canonical measurement CSV input
//!
//! Columns: `latitude, longitude, time_offset, cinr, channel, cell_id,
//! cell_identity, mcc, mnc`. The last three may be empty.

use std::io::Read;
use std::path::Path;

use super::formatting::RecordIoError;
use crate::core::MeasurementPoint;

pub fn read_measurements_from<R: Read>(reader: R) -> Result<Vec<MeasurementPoint>, RecordIoError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut points = Vec::new();
    for row in rdr.deserialize() {
        let point: MeasurementPoint = row?;
        points.push(point);
    }
    Ok(points)
}

pub fn read_measurements<P: AsRef<Path>>(path: P) -> Result<Vec<MeasurementPoint>, RecordIoError> {
    let file = std::fs::File::open(path)?;
    read_measurements_from(file)
}
