use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::profile::{AccommodationType, AdmissionQuota, EducationLevel, Gender, StudentProfile};

pub const FEATURE_COUNT: usize = 22;

/// Model input columns, declared in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Gender,
    AdmissionQuota,
    AccommodationType,
    IsRural,
    CommuteTimeMinutes,
    FamilyAnnualIncome,
    NumberOfSiblings,
    FatherEducation,
    IsFatherLiterate,
    MotherEducation,
    IsMotherLiterate,
    IsFirstGenerationLearner,
    AvgPastPerformance,
    MediumChanged,
    AvgMarksLatestTerm,
    MarksTrend,
    FailureRateLatestTerm,
    AvgAttendanceLatestTerm,
    WorksPartTime,
    IsPreparingCompetitiveExam,
    HasOwnLaptop,
    HasReliableInternet,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Gender,
        Feature::AdmissionQuota,
        Feature::AccommodationType,
        Feature::IsRural,
        Feature::CommuteTimeMinutes,
        Feature::FamilyAnnualIncome,
        Feature::NumberOfSiblings,
        Feature::FatherEducation,
        Feature::IsFatherLiterate,
        Feature::MotherEducation,
        Feature::IsMotherLiterate,
        Feature::IsFirstGenerationLearner,
        Feature::AvgPastPerformance,
        Feature::MediumChanged,
        Feature::AvgMarksLatestTerm,
        Feature::MarksTrend,
        Feature::FailureRateLatestTerm,
        Feature::AvgAttendanceLatestTerm,
        Feature::WorksPartTime,
        Feature::IsPreparingCompetitiveExam,
        Feature::HasOwnLaptop,
        Feature::HasReliableInternet,
    ];

    /// Column name used by the source dataset and serialized models.
    pub const fn name(self) -> &'static str {
        match self {
            Feature::Gender => "Gender",
            Feature::AdmissionQuota => "AdmissionQuota",
            Feature::AccommodationType => "AccommodationType",
            Feature::IsRural => "IsRural",
            Feature::CommuteTimeMinutes => "CommuteTimeMinutes",
            Feature::FamilyAnnualIncome => "FamilyAnnualIncome",
            Feature::NumberOfSiblings => "NumberOfSiblings",
            Feature::FatherEducation => "FatherEducation",
            Feature::IsFatherLiterate => "IsFatherLiterate",
            Feature::MotherEducation => "MotherEducation",
            Feature::IsMotherLiterate => "IsMotherLiterate",
            Feature::IsFirstGenerationLearner => "IsFirstGenerationLearner",
            Feature::AvgPastPerformance => "AvgPastPerformance",
            Feature::MediumChanged => "MediumChanged",
            Feature::AvgMarksLatestTerm => "AvgMarks_LatestTerm",
            Feature::MarksTrend => "MarksTrend",
            Feature::FailureRateLatestTerm => "FailureRate_LatestTerm",
            Feature::AvgAttendanceLatestTerm => "AvgAttendance_LatestTerm",
            Feature::WorksPartTime => "WorksPartTime",
            Feature::IsPreparingCompetitiveExam => "IsPreparingCompetitiveExam",
            Feature::HasOwnLaptop => "HasOwnLaptop",
            Feature::HasReliableInternet => "HasReliableInternet",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|feature| feature.name() == name)
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Dense numeric rendering of a profile, one value per [`Feature`] in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl EncodedFeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL
            .iter()
            .zip(self.values.iter())
            .map(|(feature, value)| (*feature, *value))
    }

    pub const fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl Serialize for EncodedFeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

/// Pure, total mapping from a [`StudentProfile`] to its feature vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn encode(&self, profile: &StudentProfile) -> EncodedFeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        for feature in Feature::ALL {
            values[feature.index()] = encode_feature(profile, feature);
        }
        EncodedFeatureVector { values }
    }
}

fn encode_feature(profile: &StudentProfile, feature: Feature) -> f64 {
    let value = match feature {
        Feature::Gender => encode_gender(profile.gender),
        Feature::AdmissionQuota => encode_quota(profile.admission_quota),
        Feature::AccommodationType => encode_accommodation(profile.accommodation),
        Feature::IsRural => encode_flag(profile.is_rural),
        Feature::CommuteTimeMinutes => profile.commute_minutes,
        Feature::FamilyAnnualIncome => profile.family_income,
        Feature::NumberOfSiblings => f64::from(profile.siblings),
        Feature::FatherEducation => encode_education(profile.father_education),
        Feature::IsFatherLiterate => encode_flag(profile.father_literate),
        Feature::MotherEducation => encode_education(profile.mother_education),
        Feature::IsMotherLiterate => encode_flag(profile.mother_literate),
        Feature::IsFirstGenerationLearner => encode_flag(profile.first_generation),
        Feature::AvgPastPerformance => profile.past_performance,
        Feature::MediumChanged => encode_flag(profile.medium_changed),
        Feature::AvgMarksLatestTerm => profile.latest_marks,
        Feature::MarksTrend => profile.marks_trend,
        Feature::FailureRateLatestTerm => profile.failure_rate,
        Feature::AvgAttendanceLatestTerm => profile.attendance,
        Feature::WorksPartTime => encode_flag(profile.works_part_time),
        Feature::IsPreparingCompetitiveExam => encode_flag(profile.preparing_competitive_exam),
        Feature::HasOwnLaptop => encode_flag(profile.has_laptop),
        Feature::HasReliableInternet => encode_flag(profile.has_reliable_internet),
    };

    // Profiles built by hand can still carry NaN or infinities.
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn encode_gender(gender: Gender) -> f64 {
    match gender {
        Gender::Male => 1.0,
        Gender::Female => 0.0,
        Gender::Other => 0.5,
    }
}

/// Inverse of [`encode_gender`] for values the encoder can produce.
pub fn decode_gender(value: f64) -> Option<Gender> {
    [Gender::Male, Gender::Female, Gender::Other]
        .into_iter()
        .find(|gender| encode_gender(*gender) == value)
}

pub fn encode_accommodation(accommodation: AccommodationType) -> f64 {
    match accommodation {
        AccommodationType::Hostel => 1.0,
        AccommodationType::DayScholar => 0.0,
        AccommodationType::PayingGuest => 0.5,
        AccommodationType::OwnHouse => 0.8,
        AccommodationType::Unrecognized => 0.0,
    }
}

pub fn encode_quota(quota: AdmissionQuota) -> f64 {
    match quota {
        AdmissionQuota::General => 0.0,
        AdmissionQuota::Obc => 0.3,
        AdmissionQuota::Sc => 0.6,
        AdmissionQuota::St => 0.8,
        AdmissionQuota::Ews => 0.4,
        AdmissionQuota::Unrecognized => 0.0,
    }
}

pub fn encode_education(level: EducationLevel) -> f64 {
    level.ordinal().map(f64::from).unwrap_or(0.0)
}

pub fn encode_flag(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_order_matches_declaration() {
        for (position, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), position);
            assert_eq!(Feature::from_name(feature.name()), Some(*feature));
        }
        assert_eq!(Feature::from_name("ShoeSize"), None);
    }

    #[test]
    fn categorical_mappings_follow_reference_table() {
        assert_eq!(encode_gender(Gender::Other), 0.5);
        assert_eq!(encode_accommodation(AccommodationType::OwnHouse), 0.8);
        assert_eq!(encode_accommodation(AccommodationType::Unrecognized), 0.0);
        assert_eq!(encode_quota(AdmissionQuota::St), 0.8);
        assert_eq!(encode_quota(AdmissionQuota::Ews), 0.4);
        assert_eq!(encode_education(EducationLevel::Doctorate), 6.0);
        assert_eq!(encode_education(EducationLevel::Unrecognized), 0.0);
    }

    #[test]
    fn gender_round_trips_through_encoding() {
        for gender in [Gender::Male, Gender::Female, Gender::Other] {
            assert_eq!(decode_gender(encode_gender(gender)), Some(gender));
        }
        assert_eq!(decode_gender(0.25), None);
    }

    #[test]
    fn non_finite_fields_encode_as_zero() {
        let profile = StudentProfile {
            family_income: f64::INFINITY,
            marks_trend: f64::NAN,
            ..StudentProfile::default()
        };

        let vector = FeatureEncoder.encode(&profile);

        assert_eq!(vector.get(Feature::FamilyAnnualIncome), 0.0);
        assert_eq!(vector.get(Feature::MarksTrend), 0.0);
        assert_eq!(vector.get(Feature::Gender), 1.0);
    }
}
