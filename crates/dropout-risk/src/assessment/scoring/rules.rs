use serde::{Deserialize, Serialize};

use super::config::ScoringConfig;
use crate::assessment::profile::StudentProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    Attendance,
    Performance,
    Socioeconomic,
    AcademicRisk,
    TechnologyAccess,
}

/// Points one category contributed after its cap, with the reasons behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointComponent {
    pub category: PointCategory,
    pub points: u32,
    pub cap: u32,
    pub notes: Vec<String>,
}

/// Audit trail of a heuristic assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointBreakdown {
    pub components: Vec<PointComponent>,
    pub total: u32,
}

impl PointBreakdown {
    pub fn points_for(&self, category: PointCategory) -> u32 {
        self.components
            .iter()
            .find(|component| component.category == category)
            .map(|component| component.points)
            .unwrap_or(0)
    }
}

#[derive(Default)]
struct Tally {
    raw: u32,
    notes: Vec<String>,
}

impl Tally {
    fn add(&mut self, condition: bool, points: u32, note: impl FnOnce() -> String) {
        if condition && points > 0 {
            self.raw = self.raw.saturating_add(points);
            self.notes.push(note());
        }
    }

    fn finish(self, category: PointCategory, cap: u32) -> PointComponent {
        PointComponent {
            category,
            points: self.raw.min(cap),
            cap,
            notes: self.notes,
        }
    }
}

pub(crate) fn score_profile(profile: &StudentProfile, config: &ScoringConfig) -> PointBreakdown {
    let mut components = Vec::with_capacity(5);

    let mut attendance = Tally::default();
    let attendance_points = config.attendance.award(profile.attendance);
    attendance.add(true, attendance_points, || {
        format!("attendance {:.1}% earns {attendance_points} points", profile.attendance)
    });
    components.push(attendance.finish(PointCategory::Attendance, config.attendance.cap));

    let mut performance = Tally::default();
    let performance_points = config.performance.award(profile.latest_marks);
    performance.add(true, performance_points, || {
        format!(
            "latest-term marks {:.1} earn {performance_points} points",
            profile.latest_marks
        )
    });
    components.push(performance.finish(PointCategory::Performance, config.performance.cap));

    let rules = &config.socioeconomic;
    let mut socioeconomic = Tally::default();
    socioeconomic.add(profile.is_rural, rules.rural, || "rural background".to_string());
    socioeconomic.add(profile.first_generation, rules.first_generation, || {
        "first-generation learner".to_string()
    });
    socioeconomic.add(
        profile.siblings > rules.siblings_above,
        rules.many_siblings,
        || format!("{} siblings", profile.siblings),
    );
    socioeconomic.add(profile.family_income < rules.income_below, rules.low_income, || {
        format!(
            "family income {:.0} below {:.0}",
            profile.family_income, rules.income_below
        )
    });
    components.push(socioeconomic.finish(PointCategory::Socioeconomic, rules.cap));

    let rules = &config.academic_risk;
    let mut academic = Tally::default();
    academic.add(profile.medium_changed, rules.medium_changed, || {
        "medium of instruction changed".to_string()
    });
    academic.add(profile.works_part_time, rules.part_time_work, || {
        "works part-time".to_string()
    });
    academic.add(
        profile.failure_rate > rules.failure_rate_above,
        rules.high_failure_rate,
        || {
            format!(
                "failure rate {:.2} above {:.2}",
                profile.failure_rate, rules.failure_rate_above
            )
        },
    );
    components.push(academic.finish(PointCategory::AcademicRisk, rules.cap));

    let rules = &config.technology;
    let mut technology = Tally::default();
    technology.add(!profile.has_laptop, rules.no_laptop, || "no personal laptop".to_string());
    technology.add(
        !profile.has_reliable_internet,
        rules.no_reliable_internet,
        || "no reliable internet".to_string(),
    );
    components.push(technology.finish(PointCategory::TechnologyAccess, rules.cap));

    let total = components
        .iter()
        .map(|component| component.points)
        .sum::<u32>()
        .min(config.total_cap);

    PointBreakdown { components, total }
}
