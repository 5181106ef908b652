//! Spreadsheet import and export
//!
//! Imports read the first worksheet of an xlsx upload with a fixed header
//! row. Exports build a [`Table`] and serialize it to xlsx bytes.

use std::{collections::HashMap, io::Cursor};

use calamine::{Data, Range, Reader, Xlsx, open_workbook_from_rs};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use crate::models::{
    attendance::Participant,
    event::Event,
    group::{ImportRow, RowRejection},
};
use crate::validation;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const COLUMN_NAME: &str = "Nom";
const COLUMN_FIRST_SURNAME: &str = "Primer cognom";
const COLUMN_SECOND_SURNAME: &str = "Segon cognom";
const COLUMN_EMAIL: &str = "Correu";
const COLUMN_NATIONAL_ID: &str = "Nif";

const IMPORT_COLUMNS: [&str; 5] = [
    COLUMN_NAME,
    COLUMN_FIRST_SURNAME,
    COLUMN_SECOND_SURNAME,
    COLUMN_EMAIL,
    COLUMN_NATIONAL_ID,
];

#[derive(Error, Debug)]
pub enum RosterError {
    /// The upload is not a spreadsheet of the expected shape
    #[error("{0}")]
    InvalidFormat(String),

    #[error("Failed to write spreadsheet: {0}")]
    Write(#[from] XlsxError),
}

/// Parsed rows of an import, in sheet order
pub type ImportRows = Vec<Result<ImportRow, RowRejection>>;

/// Read a membership import from xlsx bytes
///
/// A missing column aborts the whole import. Individual rows with missing
/// or malformed fields are returned as rejections.
pub fn read_import(bytes: &[u8]) -> Result<ImportRows, RosterError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).map_err(|e| {
        RosterError::InvalidFormat(format!("Unreadable spreadsheet: {}", e))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RosterError::InvalidFormat("Spreadsheet has no worksheets".to_string()))?
        .map_err(|e| RosterError::InvalidFormat(format!("Unreadable worksheet: {}", e)))?;

    parse_import_range(&range)
}

fn parse_import_range(range: &Range<Data>) -> Result<ImportRows, RosterError> {
    let mut rows = range.rows();

    let header = rows
        .next()
        .ok_or_else(|| RosterError::InvalidFormat("Spreadsheet is empty".to_string()))?;

    let positions: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(index, cell)| (cell_text(cell), index))
        .collect();

    let missing: Vec<&str> = IMPORT_COLUMNS
        .iter()
        .copied()
        .filter(|column| !positions.contains_key(*column))
        .collect();
    if !missing.is_empty() {
        return Err(RosterError::InvalidFormat(format!(
            "Invalid spreadsheet format, missing column(s): {}",
            missing.join(", ")
        )));
    }

    let field = |cells: &[Data], column: &str| -> String {
        positions
            .get(column)
            .and_then(|index| cells.get(*index))
            .map(cell_text)
            .unwrap_or_default()
    };

    let parsed = rows
        .enumerate()
        // Header is sheet row 1
        .map(|(index, cells)| (index + 2, cells))
        .filter(|(_, cells)| cells.iter().any(|cell| !cell_text(cell).is_empty()))
        .map(|(row, cells)| {
            import_row(
                row,
                field(cells, COLUMN_NAME),
                field(cells, COLUMN_FIRST_SURNAME),
                field(cells, COLUMN_SECOND_SURNAME),
                field(cells, COLUMN_EMAIL),
                field(cells, COLUMN_NATIONAL_ID),
            )
        })
        .collect();

    Ok(parsed)
}

fn import_row(
    row: usize,
    name: String,
    first_surname: String,
    second_surname: String,
    email: String,
    national_id: String,
) -> Result<ImportRow, RowRejection> {
    let reject = |reason: String| RowRejection { row, reason };

    for (column, value) in [
        (COLUMN_NAME, &name),
        (COLUMN_FIRST_SURNAME, &first_surname),
        (COLUMN_EMAIL, &email),
        (COLUMN_NATIONAL_ID, &national_id),
    ] {
        if value.is_empty() {
            return Err(reject(format!("{} is empty", column)));
        }
    }

    validation::validate_username(&email).map_err(reject)?;

    let surname = [first_surname, second_surname]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(ImportRow {
        row,
        name,
        surname,
        username: email,
        national_id,
    })
}

/// Trimmed text of a cell; whole numbers lose their fractional part
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// A sheet of text cells with bold header rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Serialize to xlsx bytes
    pub fn to_xlsx(&self, sheet_name: &str) -> Result<Vec<u8>, RosterError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (r, cells) in self.headers.iter().chain(self.rows.iter()).enumerate() {
            let row = u32::try_from(r).map_err(|_| XlsxError::RowColumnLimitError)?;
            let is_header = r < self.headers.len();

            for (c, text) in cells.iter().enumerate() {
                let col = u16::try_from(c).map_err(|_| XlsxError::RowColumnLimitError)?;
                if is_header {
                    worksheet.write_string_with_format(row, col, text, &bold)?;
                } else if !text.is_empty() {
                    worksheet.write_string(row, col, text)?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// One "Name" column listing an event's participants
pub fn event_roster(participants: &[Participant]) -> Table {
    Table {
        headers: vec![vec!["Name".to_string()]],
        rows: participants
            .iter()
            .map(|participant| vec![participant.display_name()])
            .collect(),
    }
}

/// Participants of every occurrence of a title, one column per slot
///
/// Columns follow the order of `occurrences`. Occurrences sharing a date
/// and time range share a column. Shorter columns are padded with empty
/// cells.
pub fn cohort_roster(occurrences: &[(Event, Vec<Participant>)]) -> Table {
    let mut keys: Vec<(String, String)> = Vec::new();
    let mut columns: Vec<Vec<String>> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for (event, participants) in occurrences {
        let key = (
            event.date.format("%d-%m-%Y").to_string(),
            format!(
                "{} - {}",
                event.start_time.format("%H:%M"),
                event.end_time.format("%H:%M")
            ),
        );

        let position = *index.entry(key.clone()).or_insert_with(|| {
            keys.push(key);
            columns.push(Vec::new());
            columns.len() - 1
        });

        columns[position].extend(participants.iter().map(Participant::display_name));
    }

    let height = columns.iter().map(Vec::len).max().unwrap_or(0);
    let rows = (0..height)
        .map(|r| {
            columns
                .iter()
                .map(|column| column.get(r).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    let (dates, times) = keys.into_iter().unzip();

    Table {
        headers: vec![dates, times],
        rows,
    }
}

/// Download name safe for a Content-Disposition header
pub fn attachment_filename(stem: &str) -> String {
    let safe: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("participants_{}.xlsx", safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    fn participant(name: &str, surname: &str) -> Participant {
        Participant {
            user_id: Uuid::new_v4(),
            username: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            surname: surname.to_string(),
        }
    }

    fn occurrence(day: u32, start: (u32, u32), end: (u32, u32)) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Workshop".to_string(),
            description: None,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            capacity: None,
            group_id: None,
            group_name: None,
            color: None,
        }
    }

    fn import_workbook(header: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, title) in header.iter().enumerate() {
            sheet.write_string(0, c as u16, *title).unwrap();
        }
        for (r, cells) in rows.iter().enumerate() {
            for (c, text) in cells.iter().enumerate() {
                if let Ok(number) = text.parse::<f64>() {
                    sheet.write_number(r as u32 + 1, c as u16, number).unwrap();
                } else if !text.is_empty() {
                    sheet.write_string(r as u32 + 1, c as u16, *text).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_import_rows() {
        let bytes = import_workbook(
            &IMPORT_COLUMNS,
            &[
                vec!["Anna", "Puig", "Serra", "anna@example.com", "12345678"],
                vec!["Joan", "Vidal", "", "joan@example.com", "X1234567L"],
            ],
        );

        let rows = read_import(&bytes).unwrap();
        assert_eq!(rows.len(), 2);

        let anna = rows[0].as_ref().unwrap();
        assert_eq!(anna.row, 2);
        assert_eq!(anna.name, "Anna");
        assert_eq!(anna.surname, "Puig Serra");
        assert_eq!(anna.username, "anna@example.com");
        assert_eq!(anna.national_id, "12345678");

        let joan = rows[1].as_ref().unwrap();
        assert_eq!(joan.surname, "Vidal");
        assert_eq!(joan.national_id, "X1234567L");
    }

    #[test]
    fn test_columns_may_appear_in_any_order() {
        let bytes = import_workbook(
            &["Correu", "Nif", "Nom", "Segon cognom", "Primer cognom", "Extra"],
            &[vec!["anna@example.com", "Y7654321", "Anna", "Serra", "Puig", "ignored"]],
        );

        let rows = read_import(&bytes).unwrap();
        let anna = rows[0].as_ref().unwrap();
        assert_eq!(anna.surname, "Puig Serra");
        assert_eq!(anna.national_id, "Y7654321");
    }

    #[test]
    fn test_missing_column_rejects_import() {
        let bytes = import_workbook(
            &["Nom", "Primer cognom", "Segon cognom", "Email", "Nif"],
            &[vec!["Anna", "Puig", "Serra", "anna@example.com", "12345678"]],
        );

        match read_import(&bytes) {
            Err(RosterError::InvalidFormat(message)) => assert!(message.contains("Correu")),
            other => panic!("expected invalid format, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_rows_are_rejected_individually() {
        let bytes = import_workbook(
            &IMPORT_COLUMNS,
            &[
                vec!["Anna", "Puig", "Serra", "anna@example.com", "12345678"],
                vec!["", "Vidal", "", "joan@example.com", "X1234567L"],
                vec![],
                vec!["Marc", "Roig", "", "not an email", "Z111"],
            ],
        );

        let rows = read_import(&bytes).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert_eq!(rows[1].as_ref().unwrap_err().row, 3);
        assert!(rows[1].as_ref().unwrap_err().reason.contains("Nom"));
        assert_eq!(rows[2].as_ref().unwrap_err().row, 5);
    }

    #[test]
    fn test_garbage_upload_is_invalid_format() {
        assert!(matches!(
            read_import(b"name,surname\nanna,puig\n"),
            Err(RosterError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_event_roster() {
        let table = event_roster(&[participant("Anna", "Puig"), participant("Joan", "Vidal")]);
        assert_eq!(table.headers, vec![vec!["Name".to_string()]]);
        assert_eq!(
            table.rows,
            vec![vec!["Anna Puig".to_string()], vec!["Joan Vidal".to_string()]]
        );
    }

    #[test]
    fn test_cohort_roster_pads_and_merges_columns() {
        let first = occurrence(4, (9, 0), (10, 0));
        let same_slot = occurrence(4, (9, 0), (10, 0));
        let second = occurrence(11, (9, 0), (10, 30));

        let table = cohort_roster(&[
            (first, vec![participant("Anna", "Puig")]),
            (
                second,
                vec![participant("Joan", "Vidal"), participant("Marc", "Roig")],
            ),
            (same_slot, vec![participant("Laia", "Soler"), participant("Pau", "Mas")]),
        ]);

        assert_eq!(
            table.headers,
            vec![
                vec!["04-03-2024".to_string(), "11-03-2024".to_string()],
                vec!["09:00 - 10:00".to_string(), "09:00 - 10:30".to_string()],
            ]
        );
        assert_eq!(
            table.rows,
            vec![
                vec!["Anna Puig".to_string(), "Joan Vidal".to_string()],
                vec!["Laia Soler".to_string(), "Marc Roig".to_string()],
                vec!["Pau Mas".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_cohort_roster_without_participants() {
        let table = cohort_roster(&[(occurrence(4, (9, 0), (10, 0)), vec![])]);
        assert_eq!(table.headers.len(), 2);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_table_round_trips_through_xlsx() {
        let table = cohort_roster(&[(
            occurrence(4, (9, 0), (10, 0)),
            vec![participant("Anna", "Puig")],
        )]);
        let bytes = table.to_xlsx("Participants").unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Participants").unwrap();
        let cells: Vec<String> = range.rows().flat_map(|r| r.iter().map(cell_text)).collect();
        assert_eq!(cells, ["04-03-2024", "09:00 - 10:00", "Anna Puig"]);
    }

    #[test]
    fn test_attachment_filename() {
        assert_eq!(
            attachment_filename("Team \"A\"/2024"),
            "participants_Team__A__2024.xlsx"
        );
    }
}
