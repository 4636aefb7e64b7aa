use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use super::profile::{RawStudentRecord, StudentProfile};

/// Loads student profiles from a dataset export whose headers use the
/// dataset column names (`StudentID`, `AvgAttendance_LatestTerm`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileImporter;

/// Row the CSV reader could not parse; the import carries on without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: Option<u64>,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedProfiles {
    pub profiles: Vec<StudentProfile>,
    pub rejected: Vec<RejectedRow>,
}

impl ProfileImporter {
    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<ImportedProfiles, ImportError> {
        let file = File::open(path)?;
        self.from_reader(file)
    }

    pub fn from_reader<R: Read>(&self, reader: R) -> Result<ImportedProfiles, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        if headers.iter().all(|header| header.is_empty()) {
            return Err(ImportError::MissingHeader);
        }

        let mut imported = ImportedProfiles::default();
        for record in csv_reader.records() {
            match record {
                Ok(row) => {
                    // Empty cells count as absent so the reference defaults apply.
                    let fields: Map<String, Value> = headers
                        .iter()
                        .zip(row.iter())
                        .filter(|(header, cell)| !header.is_empty() && !cell.is_empty())
                        .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
                        .collect();
                    imported
                        .profiles
                        .push(StudentProfile::from(RawStudentRecord(fields)));
                }
                Err(error) => imported.rejected.push(RejectedRow {
                    line: error.position().map(|position| position.line()),
                    error: error.to_string(),
                }),
            }
        }

        Ok(imported)
    }
}

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingHeader,
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read student export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid student CSV data: {}", err),
            ImportError::MissingHeader => write!(f, "student export has no header row"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::MissingHeader => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_become_profiles_with_defaults_for_blank_cells() {
        let csv = "StudentID,Gender,AvgAttendance_LatestTerm,IsRural,FamilyAnnualIncome\n\
                   STU-1, Female ,55,TRUE,\n\
                   STU-2,Male,abc,false,120000\n";

        let imported = ProfileImporter.from_reader(csv.as_bytes()).expect("imports");

        assert!(imported.rejected.is_empty());
        assert_eq!(imported.profiles.len(), 2);
        let first = &imported.profiles[0];
        assert_eq!(first.student_id, "STU-1");
        assert_eq!(first.attendance, 55.0);
        assert!(first.is_rural);
        assert_eq!(first.family_income, 50_000.0);

        let second = &imported.profiles[1];
        assert_eq!(second.attendance, 0.0);
        assert_eq!(second.family_income, 120_000.0);
    }

    #[test]
    fn short_rows_leave_trailing_fields_defaulted() {
        let csv = "StudentID,AvgMarks_LatestTerm,HasOwnLaptop\nSTU-9,48\n";

        let imported = ProfileImporter.from_reader(csv.as_bytes()).expect("imports");

        assert_eq!(imported.profiles[0].latest_marks, 48.0);
        assert!(!imported.profiles[0].has_laptop);
    }

    #[test]
    fn invalid_utf8_rows_are_rejected_without_aborting() {
        let mut bytes = b"StudentID,AvgMarks_LatestTerm\nSTU-1,50\n".to_vec();
        bytes.extend_from_slice(b"STU-2,\xff\xfe\nSTU-3,70\n");

        let imported = ProfileImporter.from_reader(bytes.as_slice()).expect("imports");

        assert_eq!(imported.profiles.len(), 2);
        assert_eq!(imported.profiles[1].student_id, "STU-3");
        assert_eq!(imported.rejected.len(), 1);
    }
}
