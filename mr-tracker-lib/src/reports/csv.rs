use super::{COLUMN_HEADERS, row_cells};
use crate::Result;
use crate::engine::ReportRow;
use std::io::Write;

pub fn generate<W: Write>(rows: &[ReportRow], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(COLUMN_HEADERS)?;
    for row in rows {
        csv.write_record(row_cells(row))?;
    }

    csv.flush()?;
    Ok(())
}
