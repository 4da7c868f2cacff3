//! Incident Exporter
//!
//! Tabular export of the trigger history.

use std::io::Write;

use super::types::IncidentRecord;

pub const CSV_HEADER: [&str; 4] = ["Timestamp", "IP", "Path", "Reason"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write records as CSV, header first, one row per record in order
pub fn write_csv<W: Write>(records: &[IncidentRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;

    for record in records {
        wtr.write_record([
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            record.client_id.to_string(),
            record.path.clone(),
            record.reason.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// CSV document as bytes
pub fn to_csv(records: &[IncidentRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(buf)
}
