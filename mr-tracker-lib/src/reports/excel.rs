use super::{COLUMN_HEADERS, SHEET_NAME, row_cells};
use crate::Result;
use crate::engine::ReportRow;
use rust_xlsxwriter::{DocProperties, Format, Workbook};
use std::io::Write;

#[expect(unused_results, reason = "rust_xlsxwriter methods return &mut Worksheet for chaining")]
pub fn generate<W: Write>(rows: &[ReportRow], writer: &mut W) -> Result<()> {
    let mut workbook = Workbook::new();

    let properties = DocProperties::new().set_author("mr-tracker").set_title(SHEET_NAME);
    workbook.set_properties(&properties);

    let worksheet = workbook.add_worksheet().set_name(SHEET_NAME)?;
    let bold_format = Format::new().set_bold();

    for (col, header) in (0u16..).zip(COLUMN_HEADERS) {
        worksheet.write_string_with_format(0, col, header, &bold_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (row_idx, row) in (1u32..).zip(rows) {
        for (col, cell) in (0u16..).zip(row_cells(row)) {
            worksheet.write_string(row_idx, col, cell)?;
        }
    }

    worksheet.autofit();

    let data = workbook.save_to_buffer()?;
    writer.write_all(&data)?;

    Ok(())
}
