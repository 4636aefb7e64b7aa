use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Student identifier used when a record arrives without one.
pub const UNKNOWN_STUDENT_ID: &str = "UNKNOWN";

/// Self-reported gender as recorded in the enrolment dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Unrecognized spellings collapse into `Other`.
    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            _ => Self::Other,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccommodationType {
    Hostel,
    DayScholar,
    #[serde(rename = "PG")]
    PayingGuest,
    #[serde(rename = "Own House")]
    OwnHouse,
    Unrecognized,
}

impl AccommodationType {
    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "hostel" => Self::Hostel,
            "dayscholar" => Self::DayScholar,
            "pg" | "payingguest" => Self::PayingGuest,
            "ownhouse" => Self::OwnHouse,
            _ => Self::Unrecognized,
        }
    }
}

/// Reservation category the student was admitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionQuota {
    General,
    #[serde(rename = "OBC")]
    Obc,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "ST")]
    St,
    #[serde(rename = "EWS")]
    Ews,
    Unrecognized,
}

impl AdmissionQuota {
    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "general" => Self::General,
            "obc" => Self::Obc,
            "sc" => Self::Sc,
            "st" => Self::St,
            "ews" => Self::Ews,
            _ => Self::Unrecognized,
        }
    }
}

/// Seven ordered grades of parental education, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "No Formal Education")]
    NoFormalEducation,
    Primary,
    Secondary,
    #[serde(rename = "Higher Secondary")]
    HigherSecondary,
    Graduate,
    #[serde(rename = "Post Graduate")]
    PostGraduate,
    Doctorate,
    Unrecognized,
}

impl EducationLevel {
    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "noformaleducation" | "none" => Self::NoFormalEducation,
            "primary" => Self::Primary,
            "secondary" => Self::Secondary,
            "highersecondary" => Self::HigherSecondary,
            "graduate" => Self::Graduate,
            "postgraduate" => Self::PostGraduate,
            "doctorate" | "phd" => Self::Doctorate,
            _ => Self::Unrecognized,
        }
    }

    /// Position on the 0..=6 scale, `None` for unrecognized grades.
    pub const fn ordinal(self) -> Option<u8> {
        match self {
            EducationLevel::NoFormalEducation => Some(0),
            EducationLevel::Primary => Some(1),
            EducationLevel::Secondary => Some(2),
            EducationLevel::HigherSecondary => Some(3),
            EducationLevel::Graduate => Some(4),
            EducationLevel::PostGraduate => Some(5),
            EducationLevel::Doctorate => Some(6),
            EducationLevel::Unrecognized => None,
        }
    }
}

/// Normalized student record consumed by every assessment strategy.
///
/// Decoding never fails on field content: missing fields take the reference
/// defaults of [`StudentProfile::default`], malformed numbers become `0`,
/// flags that are not a case-insensitive `TRUE` become `false`, and unknown
/// categories map to their `Unrecognized` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStudentRecord")]
pub struct StudentProfile {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "Gender")]
    pub gender: Gender,
    #[serde(rename = "AccommodationType")]
    pub accommodation: AccommodationType,
    #[serde(rename = "IsRural")]
    pub is_rural: bool,
    #[serde(rename = "CommuteTimeMinutes")]
    pub commute_minutes: f64,
    #[serde(rename = "AdmissionQuota")]
    pub admission_quota: AdmissionQuota,
    #[serde(rename = "FamilyAnnualIncome")]
    pub family_income: f64,
    #[serde(rename = "NumberOfSiblings")]
    pub siblings: u32,
    #[serde(rename = "FatherEducation")]
    pub father_education: EducationLevel,
    #[serde(rename = "IsFatherLiterate")]
    pub father_literate: bool,
    #[serde(rename = "MotherEducation")]
    pub mother_education: EducationLevel,
    #[serde(rename = "IsMotherLiterate")]
    pub mother_literate: bool,
    #[serde(rename = "IsFirstGenerationLearner")]
    pub first_generation: bool,
    #[serde(rename = "AvgPastPerformance")]
    pub past_performance: f64,
    #[serde(rename = "MediumChanged")]
    pub medium_changed: bool,
    #[serde(rename = "AvgMarks_LatestTerm")]
    pub latest_marks: f64,
    #[serde(rename = "MarksTrend")]
    pub marks_trend: f64,
    #[serde(rename = "FailureRate_LatestTerm")]
    pub failure_rate: f64,
    #[serde(rename = "AvgAttendance_LatestTerm")]
    pub attendance: f64,
    #[serde(rename = "WorksPartTime")]
    pub works_part_time: bool,
    #[serde(rename = "IsPreparingCompetitiveExam")]
    pub preparing_competitive_exam: bool,
    #[serde(rename = "HasOwnLaptop")]
    pub has_laptop: bool,
    #[serde(rename = "HasReliableInternet")]
    pub has_reliable_internet: bool,
}

impl Default for StudentProfile {
    /// Reference profile applied to absent fields.
    fn default() -> Self {
        Self {
            student_id: UNKNOWN_STUDENT_ID.to_string(),
            gender: Gender::Male,
            accommodation: AccommodationType::DayScholar,
            is_rural: false,
            commute_minutes: 30.0,
            admission_quota: AdmissionQuota::General,
            family_income: 50_000.0,
            siblings: 2,
            father_education: EducationLevel::Secondary,
            father_literate: true,
            mother_education: EducationLevel::Primary,
            mother_literate: true,
            first_generation: false,
            past_performance: 65.0,
            medium_changed: false,
            latest_marks: 60.0,
            marks_trend: 0.0,
            failure_rate: 0.1,
            attendance: 75.0,
            works_part_time: false,
            preparing_competitive_exam: true,
            has_laptop: false,
            has_reliable_internet: true,
        }
    }
}

impl StudentProfile {
    /// Decode a profile from an arbitrary JSON value. Only a non-object
    /// payload is rejected; field-level defects are absorbed.
    pub fn from_value(value: Value) -> Result<Self, ProfileError> {
        match value {
            Value::Object(fields) => Ok(Self::from(RawStudentRecord(fields))),
            other => Err(ProfileError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }
}

/// Error raised when a payload cannot be interpreted as a student record at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("student record must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// Untyped field map as received from a transport or a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawStudentRecord(pub Map<String, Value>);

impl RawStudentRecord {
    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(value) => Some(value.clone()),
            Value::Bool(value) => Some(if *value { "TRUE" } else { "FALSE" }.to_string()),
            other => Some(other.to_string()),
        }
    }

    fn number(&self, key: &str, default: f64) -> f64 {
        let parsed = match self.0.get(key) {
            None | Some(Value::Null) => return default,
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        parsed.filter(|value| value.is_finite()).unwrap_or(0.0)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.text(key) {
            Some(value) => value.trim().eq_ignore_ascii_case("TRUE"),
            None => default,
        }
    }

    fn category<T>(&self, key: &str, default: T, parse: fn(&str) -> T) -> T {
        self.text(key).map(|value| parse(&value)).unwrap_or(default)
    }
}

impl From<RawStudentRecord> for StudentProfile {
    fn from(raw: RawStudentRecord) -> Self {
        let defaults = StudentProfile::default();

        let student_id = raw
            .text("StudentID")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.student_id);

        let siblings = raw.number("NumberOfSiblings", f64::from(defaults.siblings));

        Self {
            student_id,
            gender: raw.category("Gender", defaults.gender, Gender::parse),
            accommodation: raw.category(
                "AccommodationType",
                defaults.accommodation,
                AccommodationType::parse,
            ),
            is_rural: raw.flag("IsRural", defaults.is_rural),
            commute_minutes: raw.number("CommuteTimeMinutes", defaults.commute_minutes),
            admission_quota: raw.category(
                "AdmissionQuota",
                defaults.admission_quota,
                AdmissionQuota::parse,
            ),
            family_income: raw.number("FamilyAnnualIncome", defaults.family_income),
            // `as` saturates, so negative counts land on zero.
            siblings: siblings.trunc() as u32,
            father_education: raw.category(
                "FatherEducation",
                defaults.father_education,
                EducationLevel::parse,
            ),
            father_literate: raw.flag("IsFatherLiterate", defaults.father_literate),
            mother_education: raw.category(
                "MotherEducation",
                defaults.mother_education,
                EducationLevel::parse,
            ),
            mother_literate: raw.flag("IsMotherLiterate", defaults.mother_literate),
            first_generation: raw.flag("IsFirstGenerationLearner", defaults.first_generation),
            past_performance: raw.number("AvgPastPerformance", defaults.past_performance),
            medium_changed: raw.flag("MediumChanged", defaults.medium_changed),
            latest_marks: raw.number("AvgMarks_LatestTerm", defaults.latest_marks),
            marks_trend: raw.number("MarksTrend", defaults.marks_trend),
            failure_rate: raw.number("FailureRate_LatestTerm", defaults.failure_rate),
            attendance: raw.number("AvgAttendance_LatestTerm", defaults.attendance),
            works_part_time: raw.flag("WorksPartTime", defaults.works_part_time),
            preparing_competitive_exam: raw.flag(
                "IsPreparingCompetitiveExam",
                defaults.preparing_competitive_exam,
            ),
            has_laptop: raw.flag("HasOwnLaptop", defaults.has_laptop),
            has_reliable_internet: raw.flag("HasReliableInternet", defaults.has_reliable_internet),
        }
    }
}

fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_take_reference_defaults() {
        let profile: StudentProfile =
            serde_json::from_value(json!({ "StudentID": "STU-7" })).expect("decodes");

        assert_eq!(profile.student_id, "STU-7");
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.attendance, 75.0);
        assert_eq!(profile.latest_marks, 60.0);
        assert_eq!(profile.siblings, 2);
        assert!(profile.has_reliable_internet);
        assert!(!profile.has_laptop);
    }

    #[test]
    fn malformed_values_degrade_instead_of_failing() {
        let profile = StudentProfile::from_value(json!({
            "StudentID": 42,
            "FamilyAnnualIncome": "not a number",
            "AvgAttendance_LatestTerm": "NaN",
            "NumberOfSiblings": -3,
            "IsRural": "yes",
            "WorksPartTime": "true",
            "HasOwnLaptop": true,
            "AdmissionQuota": "Management",
            "FatherEducation": "post graduate",
        }))
        .expect("object decodes");

        assert_eq!(profile.student_id, "42");
        assert_eq!(profile.family_income, 0.0);
        assert_eq!(profile.attendance, 0.0);
        assert_eq!(profile.siblings, 0);
        assert!(!profile.is_rural);
        assert!(profile.works_part_time);
        assert!(profile.has_laptop);
        assert_eq!(profile.admission_quota, AdmissionQuota::Unrecognized);
        assert_eq!(profile.father_education, EducationLevel::PostGraduate);
    }

    #[test]
    fn non_object_payloads_are_rejected() {
        let error = StudentProfile::from_value(json!([1, 2, 3])).expect_err("array rejected");
        assert_eq!(error, ProfileError::NotAnObject { found: "array" });
    }

    #[test]
    fn serializes_with_dataset_field_names() {
        let value = serde_json::to_value(StudentProfile::default()).expect("serializes");
        assert_eq!(value["AvgAttendance_LatestTerm"], json!(75.0));
        assert_eq!(value["AccommodationType"], json!("DayScholar"));
        assert_eq!(value["MotherEducation"], json!("Primary"));
    }
}
