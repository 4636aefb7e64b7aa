use serde::Serialize;

use super::classification::RiskLevel;
use super::result::PredictionResult;

const ATTENDANCE_PROGRAMME_BELOW: f64 = 80.0;
const ACADEMIC_SUPPORT_BELOW: f64 = 70.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl RiskDistribution {
    fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }
}

/// Cohort-level summary of a batch of assessments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortInsights {
    pub total_students: usize,
    pub risk_distribution: RiskDistribution,
    pub average_attendance: f64,
    pub average_performance: f64,
    pub at_risk_students: usize,
    pub critical_students: usize,
    pub high_risk_percentage: f64,
    pub recommendations: Vec<String>,
}

impl CohortInsights {
    pub fn from_assessments(results: &[PredictionResult]) -> Self {
        let total_students = results.len();
        let mut risk_distribution = RiskDistribution::default();
        for result in results {
            risk_distribution.record(result.risk_level);
        }

        let mean = |value: fn(&PredictionResult) -> f64| {
            if results.is_empty() {
                0.0
            } else {
                results.iter().map(value).sum::<f64>() / total_students as f64
            }
        };
        let average_attendance = mean(|result| result.attendance);
        let average_performance = mean(|result| result.performance);

        let critical_students = risk_distribution.critical;
        let at_risk_students = risk_distribution.high + critical_students;
        let high_risk_percentage = if total_students == 0 {
            0.0
        } else {
            (at_risk_students as f64 / total_students as f64 * 1000.0).round() / 10.0
        };

        let mut recommendations = Vec::new();
        if critical_students > 0 {
            recommendations.push(format!(
                "Immediate intervention required for {critical_students} critical-risk student(s)"
            ));
        }
        if total_students > 0 && average_attendance < ATTENDANCE_PROGRAMME_BELOW {
            recommendations.push(format!(
                "Average attendance is {average_attendance:.1}%; launch a cohort attendance improvement programme"
            ));
        }
        if total_students > 0 && average_performance < ACADEMIC_SUPPORT_BELOW {
            recommendations.push(format!(
                "Average marks are {average_performance:.1}; expand academic support and tutoring"
            ));
        }

        Self {
            total_students,
            risk_distribution,
            average_attendance,
            average_performance,
            at_risk_students,
            critical_students,
            high_risk_percentage,
            recommendations,
        }
    }
}
