use crate::error::{Error, Result};
use crate::process::date_parser::{format_iso, parse_trade_date};
use crate::process::RawSheet;
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Column B carries every structural marker.
pub const MARKER_COLUMN: usize = 1;
/// Table header marker. Spaces are ignored when matching; the line break is not.
pub const HEADER_MARKER: &str = "Код\nИнструмента";
pub const TRADE_DATE_MARKER: &str = "Дата торгов:";
pub const TOTALS_MARKER: &str = "Итого:";
/// Name of the attached trade-date column.
pub const TRADE_DATE_COLUMN: &str = "Дата";

/// Where the scan is relative to the trade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Before the first table header.
    Seeking,
    /// On the secondary header row right under the header marker.
    InHeader,
    /// Collecting data rows.
    InTable,
    /// A table was closed by its totals row.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker<'a> {
    Header,
    TradeDate(&'a str),
    Totals,
    Plain,
}

impl<'a> Marker<'a> {
    /// Header beats date beats totals.
    fn classify(cell: &'a str) -> Self {
        if strip_spaces(cell).contains(HEADER_MARKER) {
            Marker::Header
        } else if cell.contains(TRADE_DATE_MARKER) {
            let value = match cell.split_once(": ") {
                Some((_, rest)) => rest,
                None => cell
                    .split_once(TRADE_DATE_MARKER)
                    .map(|(_, rest)| rest)
                    .unwrap_or_default(),
            };
            Marker::TradeDate(value)
        } else if cell.contains(TOTALS_MARKER) {
            Marker::Totals
        } else {
            Marker::Plain
        }
    }
}

/// Drop every whitespace character except `\n`, so `\r\n` reads as `\n`.
fn strip_spaces(s: &str) -> String {
    s.chars().filter(|&c| c == '\n' || !c.is_whitespace()).collect()
}

/// The trade table pulled out of one report sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    /// Positional sheet column indices (`"0"`, `"1"`, ...) followed by
    /// [`TRADE_DATE_COLUMN`].
    pub headers: Vec<String>,
    /// Every data row with the ISO trade date appended as its last cell.
    pub rows: Vec<Vec<String>>,
    pub trade_date: NaiveDate,
}

impl ExtractedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn trade_date_iso(&self) -> String {
        format_iso(self.trade_date)
    }
}

/// Per-call scan state.
struct Extraction {
    state: ScanState,
    trade_date: Option<String>,
    rows: Vec<Vec<String>>,
}

impl Extraction {
    fn new() -> Self {
        Self {
            state: ScanState::Seeking,
            trade_date: None,
            rows: Vec::new(),
        }
    }

    fn step(&mut self, idx: usize, row: &[String]) {
        // The row under the header marker is a second header line.
        if self.state == ScanState::InHeader {
            self.state = ScanState::InTable;
            return;
        }

        let cell = row.get(MARKER_COLUMN).map(String::as_str).unwrap_or("");
        match Marker::classify(cell) {
            Marker::Header => {
                debug!(row = idx, "table header");
                self.state = ScanState::InHeader;
            }
            Marker::TradeDate(value) => {
                if let Some(prev) = self.trade_date.as_deref() {
                    if prev != value {
                        warn!(row = idx, prev, value, "trade date marker repeated");
                    }
                }
                self.trade_date = Some(value.to_string());
            }
            Marker::Totals if self.state == ScanState::InTable => {
                debug!(row = idx, collected = self.rows.len(), "table totals");
                self.state = ScanState::Done;
            }
            _ if self.state == ScanState::InTable => self.rows.push(row.to_vec()),
            _ => {}
        }
    }
}

/// Scan `sheet` once, collecting the rows between each table header (plus
/// its secondary header row) and the following totals row, and resolve the
/// sheet's trade date.
#[tracing::instrument(level = "info", skip(sheet), fields(rows = sheet.len()))]
pub fn extract_report(sheet: &RawSheet) -> Result<ExtractedTable> {
    if sheet.width() <= MARKER_COLUMN {
        return Err(Error::TooFewColumns {
            found: sheet.width(),
        });
    }

    let mut scan = Extraction::new();
    for (idx, row) in sheet.rows().iter().enumerate() {
        scan.step(idx, row);
    }
    if scan.state == ScanState::InTable {
        warn!(collected = scan.rows.len(), "sheet ended inside the table");
    }

    let raw_date = scan.trade_date.ok_or(Error::MissingTradeDate)?;
    let trade_date = parse_trade_date(&raw_date)?;
    let iso = format_iso(trade_date);

    let mut rows = scan.rows;
    for row in &mut rows {
        row.push(iso.clone());
    }

    let mut headers: Vec<String> = (0..sheet.width()).map(|i| i.to_string()).collect();
    headers.push(TRADE_DATE_COLUMN.to_string());

    debug!(extracted = rows.len(), trade_date = %iso, "extraction finished");
    Ok(ExtractedTable {
        headers,
        rows,
        trade_date,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    /// Marker row with `text` in column B of a 15-column sheet.
    pub(crate) fn marker(text: &str) -> Vec<String> {
        let mut r = vec![String::new(); 15];
        r[1] = text.to_string();
        r
    }

    pub(crate) fn data(n: usize) -> Vec<String> {
        row(&[
            "",
            &format!("A{n:03}NVY060F"),
            &format!("Бензин (АИ-92-К5) {n}, ст. Новая"),
            "Новая Чара",
            "60",
            "3 660 000",
            "-",
            "-",
            "61000",
            "61000",
            "61000",
            "61000",
            "60500",
            "61500",
            "1",
        ])
    }

    pub(crate) fn mock_sheet() -> RawSheet {
        let mut rows = vec![
            marker("Дата торгов: 10.12.2025"),
            marker("Код\nИнструмента"),
            marker("Наименование"),
        ];
        rows.extend((1..=6).map(data));
        rows.push(marker("Итого:"));
        rows.push(vec![String::new(); 15]);
        rows.push(vec![String::new(); 15]);
        RawSheet::from_rows(rows)
    }

    #[test]
    fn twelve_row_report_yields_six_records() {
        let sheet = mock_sheet();
        assert_eq!(sheet.len(), 12);

        let table = extract_report(&sheet).unwrap();
        assert_eq!(table.len(), 6);
        assert!(table.rows.iter().all(|r| r.last().unwrap() == "2025-12-10"));
        assert_eq!(table.trade_date_iso(), "2025-12-10");
    }

    #[test]
    fn header_and_secondary_header_are_skipped() {
        let sheet = RawSheet::from_rows(vec![
            marker("Дата торгов: 10.12.2025"),
            marker("Код\nИнструмента"),
            // would be a totals row if the scan inspected it
            marker("Итого:"),
            data(1),
            data(2),
            marker("Итого:"),
        ]);
        let table = extract_report(&sheet).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], "A001NVY060F");
        assert_eq!(table.rows[1][1], "A002NVY060F");
    }

    #[test]
    fn collected_rows_stop_at_totals() {
        let sheet = RawSheet::from_rows(vec![
            marker("Код\nИнструмента"),
            marker("Наименование"),
            data(1),
            data(2),
            data(3),
            marker("Итого:"),
            data(4),
            marker("Дата торгов: 01.02.2024"),
        ]);
        let table = extract_report(&sheet).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.trade_date_iso(), "2024-02-01");
    }

    #[test]
    fn rows_keep_every_column_plus_date() {
        let table = extract_report(&mock_sheet()).unwrap();
        let mut expected = data(1);
        expected.push("2025-12-10".to_string());
        assert_eq!(table.rows[0], expected);
        assert_eq!(table.headers.len(), 16);
        assert_eq!(table.headers[0], "0");
        assert_eq!(table.headers[15], TRADE_DATE_COLUMN);
    }

    #[test]
    fn header_marker_tolerates_spacing() {
        let sheet = RawSheet::from_rows(vec![
            marker("Дата торгов: 10.12.2025"),
            marker(" Код \nИнструмента "),
            marker(""),
            data(1),
            marker("Итого:"),
        ]);
        assert_eq!(extract_report(&sheet).unwrap().len(), 1);

        let crlf = RawSheet::from_rows(vec![
            marker("Дата торгов: 10.12.2025"),
            marker("Код\r\nИнструмента"),
            marker(""),
            data(1),
            marker("Итого:"),
        ]);
        assert_eq!(extract_report(&crlf).unwrap().len(), 1);
    }

    #[test]
    fn header_marker_needs_its_line_break() {
        let sheet = RawSheet::from_rows(vec![
            marker("Дата торгов: 10.12.2025"),
            marker("Код Инструмента"),
            marker(""),
            data(1),
            marker("Итого:"),
        ]);
        assert!(extract_report(&sheet).unwrap().is_empty());
    }

    #[test]
    fn missing_date_marker_is_a_named_error() {
        let sheet = RawSheet::from_rows(vec![
            marker("Код\nИнструмента"),
            marker(""),
            data(1),
            marker("Итого:"),
        ]);
        let err = extract_report(&sheet).unwrap_err();
        assert!(matches!(err, Error::MissingTradeDate));
        assert!(err.to_string().contains("Дата торгов"));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let sheet = RawSheet::from_rows(vec![marker("Дата торгов: 2025/12/10")]);
        assert!(matches!(
            extract_report(&sheet),
            Err(Error::InvalidTradeDate { .. })
        ));
    }

    #[test]
    fn single_column_sheet_is_structural_error() {
        let sheet = RawSheet::from_rows(vec![row(&["only"]), row(&["column"])]);
        assert!(matches!(
            extract_report(&sheet),
            Err(Error::TooFewColumns { found: 1 })
        ));
        assert!(matches!(
            extract_report(&RawSheet::default()),
            Err(Error::TooFewColumns { found: 0 })
        ));
    }

    #[test]
    fn totals_before_any_header_is_ignored() {
        let sheet = RawSheet::from_rows(vec![
            marker("Итого:"),
            marker("Дата торгов: 10.12.2025"),
            data(9),
            marker("Код\nИнструмента"),
            marker(""),
            data(1),
            marker("Итого:"),
        ]);
        let table = extract_report(&sheet).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][1], "A001NVY060F");
    }

    #[test]
    fn every_section_of_a_multi_table_report_is_collected() {
        let sheet = RawSheet::from_rows(vec![
            marker("Дата торгов: 10.12.2025"),
            marker("Единица измерения: Метрическая тонна"),
            marker("Код\nИнструмента"),
            marker(""),
            data(1),
            data(2),
            marker("Итого:"),
            marker("Единица измерения: Килограмм"),
            marker("Код\nИнструмента"),
            marker(""),
            data(3),
            marker("Итого:"),
            marker("Итого по секции:"),
        ]);
        let table = extract_report(&sheet).unwrap();
        let codes: Vec<&str> = table.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(codes, vec!["A001NVY060F", "A002NVY060F", "A003NVY060F"]);
    }

    #[test]
    fn unclosed_table_keeps_its_rows() {
        let sheet = RawSheet::from_rows(vec![
            marker("Дата торгов: 10.12.2025"),
            marker("Код\nИнструмента"),
            marker(""),
            data(1),
            data(2),
        ]);
        assert_eq!(extract_report(&sheet).unwrap().len(), 2);
    }

    #[test]
    fn date_marker_inside_table_is_not_collected() {
        let sheet = RawSheet::from_rows(vec![
            marker("Код\nИнструмента"),
            marker(""),
            data(1),
            marker("Дата торгов: 10.12.2025"),
            data(2),
            marker("Итого:"),
        ]);
        let table = extract_report(&sheet).unwrap();
        assert_eq!(table.len(), 2);
    }
}
