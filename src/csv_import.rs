//! CSV import and export for the contact book.
//
// The import dialect is deliberately small: one record per `\n`-separated
// line, fields split on every `,`, no quoting or escaping. Columns are
// matched by header label, so the column order of a file is free.

use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::contact::{Contact, EventKind};
use crate::store::StoreError;

/// Header labels every import file must carry, in reporting order
pub const REQUIRED_HEADERS: [&str; 4] = ["name", "email", "type", "date"];
/// Column set written by the demo template and by export
pub const TEMPLATE_HEADERS: [&str; 5] = ["name", "email", "phone", "type", "date"];

pub const DEMO_FILE_NAME: &str = "contacts_demo.csv";
pub const DEMO_MIME_TYPE: &str = "text/csv";

const DEMO_CSV: &str = "name,email,phone,type,date
John Smith,john.smith@example.com,+1234567890,birthday,1990-03-15
Sarah & Mike Johnson,sarah.mike@example.com,+1234567891,anniversary,2018-06-22";

/// Custom error type for contact import and export
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
    #[error("Invalid file type '{0}'. Please upload a CSV file.")]
    UnsupportedFileType(String),
    #[error("No valid contacts found in the CSV file")]
    EmptyResult,
    #[error("Contact '{name}' has a {field} value that cannot be written without quoting")]
    Unrepresentable { name: String, field: &'static str },
    #[error("Failed to store imported contacts: {0}")]
    Store(#[from] StoreError),
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Why a data row was left out of an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ColumnCountMismatch { expected: usize, found: usize },
    MissingRequiredFields(Vec<&'static str>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ColumnCountMismatch { expected, found } => {
                write!(f, "incorrect number of columns (expected {}, found {})", expected, found)
            }
            SkipReason::MissingRequiredFields(fields) => {
                write!(f, "missing required fields ({})", fields.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the source file
    pub line: usize,
    pub reason: SkipReason,
}

/// Result of a successful parse: accepted contacts plus per-row diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub contacts: Vec<Contact>,
    pub skipped: Vec<SkippedRow>,
}

/// Parse raw CSV text into contacts.
///
/// Fails only when a required header is absent. Rows with the wrong number
/// of columns or an empty `name`, `email` or `date` are skipped and reported
/// in [`ParseReport::skipped`]; the remaining rows are still processed.
pub fn parse_contacts(raw: &str) -> Result<ParseReport, ImportError> {
    let mut lines = raw.trim().split('\n');
    let headers: Vec<&str> = lines.next().unwrap_or_default().split(',').map(str::trim).collect();

    let missing: Vec<String> = REQUIRED_HEADERS
        .iter()
        .filter(|required| !headers.contains(*required))
        .map(|h| h.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingHeaders(missing));
    }
    debug!("CSV headers: {:?}", headers);

    let mut report = ParseReport::default();
    for (index, line) in lines.enumerate() {
        let line_number = index + 2;
        match parse_row(&headers, line) {
            Ok(contact) => report.contacts.push(contact),
            Err(reason) => {
                warn!("Skipping line {}: {}", line_number, reason);
                report.skipped.push(SkippedRow { line: line_number, reason });
            }
        }
    }

    Ok(report)
}

fn parse_row(headers: &[&str], line: &str) -> Result<Contact, SkipReason> {
    let values: Vec<&str> = line.split(',').map(str::trim).collect();
    if values.len() != headers.len() {
        return Err(SkipReason::ColumnCountMismatch {
            expected: headers.len(),
            found: values.len(),
        });
    }

    let mut contact = Contact::new("", "", "", EventKind::Birthday, "");
    for (header, value) in headers.iter().zip(values) {
        match *header {
            "name" => contact.name = value.to_string(),
            "email" => contact.email = value.to_string(),
            "phone" => contact.phone = value.to_string(),
            "type" => contact.kind = EventKind::from_csv_token(value),
            "date" => contact.date = value.to_string(),
            _ => {}
        }
    }

    let missing = contact.missing_fields();
    if missing.is_empty() {
        Ok(contact)
    } else {
        Err(SkipReason::MissingRequiredFields(missing))
    }
}

/// The downloadable template file, matching the columns the parser expects
pub fn demo_csv() -> &'static [u8] {
    DEMO_CSV.as_bytes()
}

/// Write the demo template into `dir` and return its path
pub fn write_demo_csv(dir: &Path) -> Result<PathBuf, ImportError> {
    let path = dir.join(DEMO_FILE_NAME);
    fs::write(&path, demo_csv())?;
    info!("Demo CSV written to {}", path.display());
    Ok(path)
}

/// A file handed to the importer
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, content_type: None, bytes })
    }

    /// Declared type is `text/csv` or the name ends in `.csv`
    pub fn is_csv(&self) -> bool {
        self.content_type.as_deref() == Some(DEMO_MIME_TYPE) || self.file_name.ends_with(".csv")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Imported {} contact(s) successfully.", self.imported)?;
        if self.skipped > 0 {
            write!(f, " Skipped {} row(s).", self.skipped)?;
        }
        Ok(())
    }
}

/// Filter, parse and hand the accepted contacts to `accept`.
///
/// Non-CSV uploads are rejected before parsing, and a parse that yields no
/// contacts is reported as [`ImportError::EmptyResult`]. `accept` is not
/// called in either case.
pub fn import_upload<F>(upload: &Upload, accept: F) -> Result<ImportSummary, ImportError>
where
    F: FnOnce(Vec<Contact>) -> Result<(), StoreError>,
{
    if !upload.is_csv() {
        return Err(ImportError::UnsupportedFileType(upload.file_name.clone()));
    }

    let text = String::from_utf8_lossy(&upload.bytes);
    let report = parse_contacts(&text)?;
    if report.contacts.is_empty() {
        return Err(ImportError::EmptyResult);
    }

    let summary = ImportSummary { imported: report.contacts.len(), skipped: report.skipped.len() };
    accept(report.contacts)?;
    info!("Imported {} contact(s) from {}", summary.imported, upload.file_name);
    Ok(summary)
}

/// Write contacts in the template column order.
///
/// The import dialect has no quoting, so a value containing a comma or a
/// line break is refused instead of producing a file that reads back wrong.
pub fn export_contacts<W: io::Write>(writer: W, contacts: &[Contact]) -> Result<(), ImportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    csv_writer.write_record(TEMPLATE_HEADERS)?;

    for contact in contacts {
        let fields = [
            ("name", contact.name.as_str()),
            ("email", contact.email.as_str()),
            ("phone", contact.phone.as_str()),
            ("type", contact.kind.as_str()),
            ("date", contact.date.as_str()),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, v)| v.contains(&[',', '\n', '\r'][..])) {
            return Err(ImportError::Unrepresentable { name: contact.name.clone(), field: *field });
        }
        csv_writer.write_record(fields.iter().map(|(_, v)| *v))?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const HEADER: &str = "name,email,phone,type,date";

    #[test]
    fn test_parse_demo_file() {
        let report = parse_contacts(DEMO_CSV).unwrap();
        assert_eq!(
            report.contacts,
            vec![
                Contact::new(
                    "John Smith",
                    "john.smith@example.com",
                    "+1234567890",
                    EventKind::Birthday,
                    "1990-03-15"
                ),
                Contact::new(
                    "Sarah & Mike Johnson",
                    "sarah.mike@example.com",
                    "+1234567891",
                    EventKind::Anniversary,
                    "2018-06-22"
                ),
            ]
        );
        assert!(report.skipped.is_empty());
    }

    #[test_case("name,email,date", &["type"] ; "missing type")]
    #[test_case("email,phone", &["name", "type", "date"] ; "missing several")]
    #[test_case("", &["name", "email", "type", "date"] ; "empty input")]
    #[test_case("Name,Email,Type,Date", &["name", "email", "type", "date"] ; "labels are case sensitive")]
    fn test_missing_headers(header: &str, expected: &[&str]) {
        let input = format!("{}\nJane,jane@x.com,1999-01-01", header);
        match parse_contacts(&input) {
            Err(ImportError::MissingHeaders(missing)) => assert_eq!(missing, expected),
            other => panic!("expected MissingHeaders, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_headers_message() {
        let err = parse_contacts("name,email,date\n").unwrap_err();
        assert_eq!(err.to_string(), "Missing required headers: type");

        let err = parse_contacts("phone").unwrap_err();
        assert_eq!(err.to_string(), "Missing required headers: name, email, type, date");
    }

    #[test]
    fn test_short_row_skipped_without_stopping() {
        let input = format!(
            "{}\nJane,jane@x.com,,1999-01-01\nBob,bob@x.com,,birthday,1980-05-05",
            HEADER
        );
        let report = parse_contacts(&input).unwrap();
        assert_eq!(report.contacts.len(), 1);
        assert_eq!(report.contacts[0].name, "Bob");
        assert_eq!(
            report.skipped,
            vec![SkippedRow {
                line: 2,
                reason: SkipReason::ColumnCountMismatch { expected: 5, found: 4 }
            }]
        );
    }

    #[test]
    fn test_quoted_comma_is_a_separator() {
        let input = format!("{}\n\"Smith, John\",j@x.com,,birthday,1990-01-01", HEADER);
        let report = parse_contacts(&input).unwrap();
        assert!(report.contacts.is_empty());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::ColumnCountMismatch { expected: 5, found: 6 }
        );
    }

    #[test_case(" ,a@x.com,,birthday,2000-01-01", &["name"] ; "blank name")]
    #[test_case("Ann,,,birthday,2000-01-01", &["email"] ; "blank email")]
    #[test_case("Ann,a@x.com,,birthday,", &["date"] ; "blank date")]
    #[test_case(",,,,", &["name", "email", "date"] ; "all blank")]
    fn test_missing_required_field_skipped(row: &str, fields: &[&'static str]) {
        let input = format!("{}\n{}", HEADER, row);
        let report = parse_contacts(&input).unwrap();
        assert!(report.contacts.is_empty());
        assert_eq!(
            report.skipped,
            vec![SkippedRow { line: 2, reason: SkipReason::MissingRequiredFields(fields.to_vec()) }]
        );
    }

    #[test_case("anniversary", EventKind::Anniversary)]
    #[test_case("birthday", EventKind::Birthday)]
    #[test_case("Birthday", EventKind::Birthday)]
    #[test_case("Anniversary", EventKind::Birthday)]
    #[test_case("", EventKind::Birthday)]
    #[test_case("wedding", EventKind::Birthday)]
    fn test_type_classification(token: &str, expected: EventKind) {
        let input = format!("{}\nAnn,a@x.com,,{},2000-01-01", HEADER, token);
        let report = parse_contacts(&input).unwrap();
        assert_eq!(report.contacts[0].kind, expected);
    }

    #[test]
    fn test_header_driven_assignment_and_whitespace() {
        let input = "  date , type ,  email, name , notes \n 2001-09-09 , anniversary , x@y.z , Kim Lee , ignored \n";
        let report = parse_contacts(input).unwrap();
        assert_eq!(
            report.contacts,
            vec![Contact::new("Kim Lee", "x@y.z", "", EventKind::Anniversary, "2001-09-09")]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let input = "name,email,type,date\r\nAnn,a@x.com,anniversary,2000-01-01\r\n";
        let report = parse_contacts(input).unwrap();
        assert_eq!(report.contacts[0].date, "2000-01-01");
        assert_eq!(report.contacts[0].kind, EventKind::Anniversary);
    }

    #[test]
    fn test_line_numbers_count_from_file_start() {
        let input = format!("{}\nA,a@x.com,,birthday,2000-01-01\n\nB,b@x.com,,x", HEADER);
        let report = parse_contacts(&input).unwrap();
        let lines: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[test]
    fn test_all_rows_malformed_is_empty_success() {
        let input = format!("{}\nbad\nalso,bad", HEADER);
        let report = parse_contacts(&input).unwrap();
        assert!(report.contacts.is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let input = format!("{}\nA,a@x.com,,birthday,2000-01-01\nbad", HEADER);
        assert_eq!(parse_contacts(&input).unwrap(), parse_contacts(&input).unwrap());
    }

    #[test_case("contacts.csv", None, true ; "csv extension")]
    #[test_case("contacts.txt", Some("text/csv"), true ; "declared csv type")]
    #[test_case("contacts.txt", Some("text/plain"), false ; "plain text")]
    #[test_case("contacts.CSV", None, false ; "extension is case sensitive")]
    fn test_upload_filter(name: &str, content_type: Option<&str>, expected: bool) {
        assert_eq!(Upload::new(name, content_type, Vec::new()).is_csv(), expected);
    }

    #[test]
    fn test_import_rejects_non_csv_before_parsing() {
        let upload = Upload::new("contacts.xlsx", None, b"garbage".to_vec());
        let result = import_upload(&upload, |_| panic!("must not accept"));
        assert!(matches!(
            result,
            Err(ImportError::UnsupportedFileType(name)) if name == "contacts.xlsx"
        ));
    }

    #[test]
    fn test_import_empty_result() {
        let upload = Upload::new("c.csv", None, format!("{}\nbroken", HEADER).into_bytes());
        let result = import_upload(&upload, |_| panic!("must not accept"));
        assert!(matches!(result, Err(ImportError::EmptyResult)));
    }

    #[test]
    fn test_import_hands_contacts_to_callback() {
        let upload = Upload::new("c.csv", None, format!("{}\nbroken", DEMO_CSV).into_bytes());
        let mut received = Vec::new();
        let summary = import_upload(&upload, |contacts| {
            received = contacts;
            Ok(())
        })
        .unwrap();
        assert_eq!(summary, ImportSummary { imported: 2, skipped: 1 });
        assert_eq!(received.len(), 2);
        assert_eq!(summary.to_string(), "Imported 2 contact(s) successfully. Skipped 1 row(s).");
    }

    #[test]
    fn test_export_reads_back() {
        let contacts = parse_contacts(DEMO_CSV).unwrap().contacts;
        let mut buffer = Vec::new();
        export_contacts(&mut buffer, &contacts).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.trim(), DEMO_CSV);
    }

    #[test]
    fn test_export_refuses_embedded_comma() {
        let contacts =
            vec![Contact::new("Smith, John", "j@x.com", "", EventKind::Birthday, "1990-01-01")];
        let result = export_contacts(Vec::new(), &contacts);
        assert!(matches!(result, Err(ImportError::Unrepresentable { field: "name", .. })));
    }

    #[test]
    fn test_demo_file_matches_template_headers() {
        let text = std::str::from_utf8(demo_csv()).unwrap();
        assert_eq!(text.lines().next().unwrap(), TEMPLATE_HEADERS.join(","));
        assert_eq!(text.lines().count(), 3);
    }
}
