#![cfg(feature = "excel")]

use rust_xlsxwriter::Workbook;

use tabular_etl::ingestion::excel::extract_excel_from_bytes;
use tabular_etl::ingestion::{extract, ExtractOptions, FileFormat, InputFile};
use tabular_etl::types::Value;

fn people_xlsx() -> Vec<u8> {
    let mut wb = Workbook::new();

    let ws = wb.add_worksheet();
    ws.set_name("People").unwrap();
    // A blank first row: the header is the first non-empty row.
    ws.write_string(1, 0, "id").unwrap();
    ws.write_string(1, 1, "name").unwrap();
    ws.write_string(1, 2, "score").unwrap();
    ws.write_string(1, 3, "active").unwrap();

    ws.write_number(2, 0, 1).unwrap();
    ws.write_string(2, 1, "Ada").unwrap();
    ws.write_number(2, 2, 98.5).unwrap();
    ws.write_boolean(2, 3, true).unwrap();

    ws.write_number(3, 0, 2).unwrap();
    ws.write_number(3, 2, 87.25).unwrap();
    ws.write_boolean(3, 3, false).unwrap();

    // Only the first sheet is read.
    let other = wb.add_worksheet();
    other.set_name("Ignored").unwrap();
    other.write_string(0, 0, "nope").unwrap();

    wb.save_to_buffer().unwrap()
}

#[test]
fn extract_excel_reads_first_sheet() {
    let ds = extract_excel_from_bytes(&people_xlsx()).unwrap();

    assert_eq!(ds.columns, vec!["id", "name", "score", "active"]);
    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Ada".to_string()),
            Value::Float64(98.5),
            Value::Bool(true),
        ]
    );
    assert_eq!(ds.rows[1][1], Value::Null);
}

#[test]
fn extract_dispatches_excel_by_declared_format() {
    let input = InputFile::new("people.xlsx", people_xlsx(), FileFormat::Excel);
    let out = extract(&input, &ExtractOptions::default()).unwrap();
    assert_eq!(out.encoding, None);
    assert_eq!(out.data.row_count(), 2);
}

#[test]
fn extract_excel_rejects_non_workbook_bytes() {
    let input = InputFile::new("people.xlsx", b"id,name\n1,Ada\n".to_vec(), FileFormat::Excel);
    let err = extract(&input, &ExtractOptions::default()).unwrap_err();
    assert!(err.to_string().starts_with("excel error"), "{err}");
}

#[test]
fn extract_excel_names_blank_and_duplicate_headers() {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "k").unwrap();
    ws.write_string(0, 2, "k").unwrap();
    ws.write_number(1, 0, 1).unwrap();
    ws.write_number(1, 1, 2).unwrap();
    ws.write_number(1, 2, 3).unwrap();
    let bytes = wb.save_to_buffer().unwrap();

    let ds = extract_excel_from_bytes(&bytes).unwrap();
    assert_eq!(ds.columns, vec!["k", "Unnamed: 1", "k.1"]);
    assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]);
}
