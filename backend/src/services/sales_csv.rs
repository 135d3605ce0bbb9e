//! Parser for cashier sales sheets
//!
//! The sheets are exported from spreadsheets, one sold menu per line. Cells
//! are never quoted, so commas always separate columns. Parsing is pure and
//! happens before any stock is touched; the first bad line aborts the whole
//! file.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Terminator, Trim};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use shared::models::join_notes;
use shared::validation::MAX_QUANTITY;

use crate::error::{AppError, AppResult};

const MENU_CODE_HEADERS: &[&str] = &["menu_code", "kode_menu"];
const MENU_NAME_HEADERS: &[&str] = &["menu_dipesan", "menu", "menu_name", "nama_menu"];
const QUANTITY_HEADERS: &[&str] = &["quantity", "jumlah", "qty"];
const DATE_HEADERS: &[&str] = &["transaction_date", "tanggal", "tanggal_transaksi"];
const NOTE_HEADERS: &[&str] = &["note", "catatan"];
const INVOICE_HEADERS: &[&str] = &["id_transaksi", "kode_transaksi", "invoice"];
const CUSTOMER_HEADERS: &[&str] = &["nama_pelanggan", "pelanggan"];
const PAYMENT_HEADERS: &[&str] = &["metode_pembayaran", "payment_method"];

/// Which menu column a row's reference was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchBy {
    Code,
    Name,
}

/// One sold menu line from the sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SalesCsvRow {
    /// 1-based physical line in the uploaded file
    pub line: usize,
    /// Menu code when the code cell is filled, the menu name otherwise
    pub menu_reference: String,
    pub match_by: MatchBy,
    /// Portions sold, always positive
    pub quantity: i64,
    pub transaction_date: DateTime<Utc>,
    pub note: Option<String>,
}

/// Column positions resolved from the header line
#[derive(Debug)]
struct ColumnMap {
    menu_code: Option<usize>,
    menu_name: Option<usize>,
    quantity: usize,
    date: Option<usize>,
    note: Option<usize>,
    invoice: Option<usize>,
    customer: Option<usize>,
    payment: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &StringRecord) -> AppResult<Self> {
        let names: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));

        let menu_code = find(MENU_CODE_HEADERS);
        let menu_name = find(MENU_NAME_HEADERS);
        if menu_code.is_none() && menu_name.is_none() {
            return Err(AppError::csv_header(format!(
                "missing menu column, expected one of: {}",
                MENU_CODE_HEADERS
                    .iter()
                    .chain(MENU_NAME_HEADERS)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let quantity = find(QUANTITY_HEADERS).ok_or_else(|| {
            AppError::csv_header(format!(
                "missing quantity column, expected one of: {}",
                QUANTITY_HEADERS.join(", ")
            ))
        })?;

        Ok(Self {
            menu_code,
            menu_name,
            quantity,
            date: find(DATE_HEADERS),
            note: find(NOTE_HEADERS),
            invoice: find(INVOICE_HEADERS),
            customer: find(CUSTOMER_HEADERS),
            payment: find(PAYMENT_HEADERS),
        })
    }
}

fn cell(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|v| v.trim().is_empty())
}

/// Parse a portion count, rounding half away from zero
pub fn parse_quantity(value: &str) -> Option<i64> {
    let parsed = Decimal::from_str(value.trim()).ok()?;
    parsed
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Parse a sheet date. Date-only and naive values are read as UTC.
pub fn parse_transaction_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

fn parse_row(
    record: &StringRecord,
    line: usize,
    columns: &ColumnMap,
    now: DateTime<Utc>,
) -> AppResult<SalesCsvRow> {
    let (menu_reference, match_by) = match cell(record, columns.menu_code) {
        Some(code) => (code.to_string(), MatchBy::Code),
        None => {
            let name = cell(record, columns.menu_name)
                .ok_or_else(|| AppError::csv_line(line, "menu code or menu name is required"))?;
            (name.to_string(), MatchBy::Name)
        }
    };

    let raw_quantity = cell(record, Some(columns.quantity))
        .ok_or_else(|| AppError::csv_line(line, "quantity is required"))?;
    let quantity = parse_quantity(raw_quantity).ok_or_else(|| {
        AppError::csv_line(line, format!("quantity '{}' is not a number", raw_quantity))
    })?;
    if quantity <= 0 {
        return Err(AppError::csv_line(
            line,
            format!("quantity must be greater than zero, got '{}'", raw_quantity),
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::csv_line(
            line,
            format!("quantity must be at most {}, got '{}'", MAX_QUANTITY, raw_quantity),
        ));
    }

    let transaction_date = match cell(record, columns.date) {
        Some(raw) => parse_transaction_date(raw).ok_or_else(|| {
            AppError::csv_line(
                line,
                format!(
                    "date '{}' is not recognised, use YYYY-MM-DD, YYYY-MM-DD HH:MM[:SS], \
                     RFC 3339 or DD/MM/YYYY",
                    raw
                ),
            )
        })?,
        None => now,
    };

    let invoice = cell(record, columns.invoice).map(|v| format!("ID: {}", v));
    let customer = cell(record, columns.customer).map(|v| format!("Cust: {}", v));
    let payment = cell(record, columns.payment).map(|v| format!("Pay: {}", v));
    let note = join_notes([
        invoice.as_deref(),
        customer.as_deref(),
        payment.as_deref(),
        cell(record, columns.note),
    ]);

    Ok(SalesCsvRow {
        line,
        menu_reference,
        match_by,
        quantity,
        transaction_date,
        note,
    })
}

/// Parse a whole sheet. `now` stands in for rows without a date.
///
/// Returns the rows in file order, or the first problem found. Header
/// problems carry no line number; row problems carry the physical line.
pub fn parse_sales_csv(text: &str, now: DateTime<Utc>) -> AppResult<Vec<SalesCsvRow>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    // Without quoting every record is exactly one non-empty physical line.
    // The reader drops zero-length lines, so record `k` sits on the k-th
    // non-empty line.
    let physical_lines: Vec<usize> = text
        .split('\n')
        .enumerate()
        .filter(|(_, l)| !l.is_empty())
        .map(|(i, _)| i + 1)
        .collect();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut columns: Option<ColumnMap> = None;
    let mut rows = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let line = physical_lines.get(index).copied();
        let record = result.map_err(|e| AppError::InvalidCsv {
            line,
            message: format!("unreadable line: {}", e),
        })?;
        if is_blank(&record) {
            continue;
        }

        match &columns {
            None => columns = Some(ColumnMap::from_header(&record)?),
            Some(map) => rows.push(parse_row(&record, line.unwrap_or(index + 1), map, now)?),
        }
    }

    if columns.is_none() {
        return Err(AppError::csv_header("file is empty"));
    }
    if rows.is_empty() {
        return Err(AppError::csv_header("file has a header but no sales rows"));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn line_of(err: AppError) -> Option<usize> {
        match err {
            AppError::InvalidCsv { line, .. } => line,
            other => panic!("expected InvalidCsv, got {:?}", other),
        }
    }

    #[test]
    fn test_basic_sheet() {
        let csv = "menu_code,quantity\nA1,2\nA2,3\n";
        let rows = parse_sales_csv(csv, now()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].menu_reference, "A1");
        assert_eq!(rows[0].quantity, 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].transaction_date, now());
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_aliases_are_case_insensitive_and_unordered() {
        let csv = "JUMLAH , Nama_Menu,Tanggal\n4,Es Teh,2024-05-02\n";
        let rows = parse_sales_csv(csv, now()).unwrap();
        assert_eq!(rows[0].menu_reference, "Es Teh");
        assert_eq!(rows[0].quantity, 4);
        assert_eq!(
            rows[0].transaction_date,
            Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_code_wins_over_name() {
        let csv = "kode_menu,menu_dipesan,qty\nA1,Kopi Susu,1\n,Es Teh,1\n";
        let rows = parse_sales_csv(csv, now()).unwrap();
        assert_eq!(rows[0].menu_reference, "A1");
        assert_eq!(rows[0].match_by, MatchBy::Code);
        assert_eq!(rows[1].menu_reference, "Es Teh");
        assert_eq!(rows[1].match_by, MatchBy::Name);
    }

    #[test]
    fn test_blank_lines_keep_physical_numbers() {
        let csv = "\nmenu_code,quantity\n\nA1,1\n   \nA2,x\n";
        let err = parse_sales_csv(csv, now()).unwrap_err();
        assert_eq!(line_of(err), Some(6));
    }

    #[test]
    fn test_quantity_rounding() {
        assert_eq!(parse_quantity("2.5"), Some(3));
        assert_eq!(parse_quantity("2.4"), Some(2));
        assert_eq!(parse_quantity("0.4"), Some(0));
        assert_eq!(parse_quantity("abc"), None);

        let err = parse_sales_csv("menu_code,quantity\nA1,0.4\n", now()).unwrap_err();
        assert_eq!(line_of(err), Some(2));
    }

    #[test]
    fn test_oversized_quantity_rejected() {
        let csv = "menu_code,qty\nA1,1\nA1,5000000000000000000\n";
        let err = parse_sales_csv(csv, now()).unwrap_err();
        assert_eq!(line_of(err), Some(3));
        assert_eq!(parse_quantity("99999999999999999999999"), None);
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let err = parse_sales_csv("menu_code,quantity\nA1,1\nA2,-2\n", now()).unwrap_err();
        assert_eq!(line_of(err), Some(3));
    }

    #[test]
    fn test_missing_reference_rejected() {
        let err = parse_sales_csv("menu_code,menu,quantity\n,,2\n", now()).unwrap_err();
        assert_eq!(line_of(err), Some(2));
    }

    #[test]
    fn test_header_errors_have_no_line() {
        let err = parse_sales_csv("menu_code,harga\nA1,5000\n", now()).unwrap_err();
        assert_eq!(line_of(err), None);

        let err = parse_sales_csv("quantity,note\n1,x\n", now()).unwrap_err();
        assert_eq!(line_of(err), None);

        let err = parse_sales_csv("\n\n", now()).unwrap_err();
        assert_eq!(line_of(err), None);
    }

    #[test]
    fn test_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 2, 14, 5, 0).unwrap();
        assert_eq!(parse_transaction_date("2024-05-02 14:05"), Some(expected));
        assert_eq!(parse_transaction_date("2024-05-02 14:05:00"), Some(expected));
        assert_eq!(parse_transaction_date("2024-05-02T21:05:00+07:00"), Some(expected));
        assert_eq!(
            parse_transaction_date("02/05/2024"),
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_transaction_date("kemarin"), None);
    }

    #[test]
    fn test_bad_date_reports_line() {
        let err = parse_sales_csv("menu_code,quantity,tanggal\nA1,1,2024-13-45\n", now()).unwrap_err();
        assert_eq!(line_of(err), Some(2));
    }

    #[test]
    fn test_note_assembly() {
        let csv = "menu_code,qty,invoice,pelanggan,metode_pembayaran,catatan\n\
                   A1,1,INV-9,Budi,QRIS,tanpa gula\n\
                   A1,1,,,Tunai,\n";
        let rows = parse_sales_csv(csv, now()).unwrap();
        assert_eq!(
            rows[0].note.as_deref(),
            Some("ID: INV-9 | Cust: Budi | Pay: QRIS | tanpa gula")
        );
        assert_eq!(rows[1].note.as_deref(), Some("Pay: Tunai"));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let csv = "menu_code,quantity,note\nA1,2\n";
        let rows = parse_sales_csv(csv, now()).unwrap();
        assert_eq!(rows[0].note, None);
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let csv = "\u{feff}menu_code,quantity\nA1,1\n";
        assert_eq!(parse_sales_csv(csv, now()).unwrap().len(), 1);
    }
}
