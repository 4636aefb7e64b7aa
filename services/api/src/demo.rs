use crate::cli::AssessmentArgs;
use crate::infra::assessment_service;
use chrono::Local;
use clap::Args;
use dropout_risk::assessment::{
    AccommodationType, AdmissionQuota, AssessmentError, CohortInsights, EducationLevel, Gender,
    PredictionResult, ProfileImporter, RejectedRow, RiskAssessmentService, StudentProfile,
};
use dropout_risk::config::AppConfig;
use dropout_risk::error::AppError;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Dataset export with one student per row
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print the full report as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) assessment: AssessmentArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ExplainArgs {
    /// JSON file holding one student record, bare or under `student_data`
    pub(crate) student: PathBuf,
    /// Number of ranked factors to print
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
    #[command(flatten)]
    pub(crate) assessment: AssessmentArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    #[command(flatten)]
    pub(crate) assessment: AssessmentArgs,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreReport {
    pub(crate) predictions: Vec<PredictionResult>,
    pub(crate) rejected_rows: Vec<RejectedRow>,
    pub(crate) insights: CohortInsights,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        csv,
        json,
        assessment,
    } = args;

    let service = configured_service(assessment)?;
    let report = score_csv(&service, &csv)?;

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Report unavailable: {err}"),
        }
        return Ok(());
    }

    println!("Dropout risk scoring for {}", csv.display());
    println!(
        "{:<14} {:<9} {:>6} {:>11} {:>11}  source",
        "student", "level", "score", "attendance", "performance"
    );
    for result in &report.predictions {
        println!(
            "{:<14} {:<9} {:>6} {:>10.1}% {:>11.1}  {}",
            result.student_id,
            result.risk_level.label(),
            result.risk_score,
            result.attendance,
            result.performance,
            result.model_version
        );
    }

    if !report.rejected_rows.is_empty() {
        println!("\nRejected rows");
        for row in &report.rejected_rows {
            match row.line {
                Some(line) => println!("- line {line}: {}", row.error),
                None => println!("- {}", row.error),
            }
        }
    }

    render_insights(&report.insights);
    Ok(())
}

pub(crate) fn run_explain(args: ExplainArgs) -> Result<(), AppError> {
    let ExplainArgs {
        student,
        top,
        assessment,
    } = args;

    let service = configured_service(assessment)?;
    let profile = read_student_record(&student)?;
    let result = service.predict(&profile);
    render_assessment(&result, top);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = configured_service(args.assessment)?;
    let info = service.model_info();

    println!(
        "Dropout risk demo ({})",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!(
        "Scoring with {} {} ({} features)",
        info.model_type, info.version, info.feature_count
    );

    let cohort = [struggling_student(), thriving_student()];
    let results = service.predict_batch(&cohort);
    for result in &results {
        println!();
        render_assessment(result, 3);
    }

    render_insights(&service.insights(&results));
    Ok(())
}

fn configured_service(args: AssessmentArgs) -> Result<RiskAssessmentService, AppError> {
    let mut config = AppConfig::load()?;
    args.apply(&mut config.assessment);
    assessment_service(&config.assessment)
}

pub(crate) fn score_csv(
    service: &RiskAssessmentService,
    path: &Path,
) -> Result<ScoreReport, AppError> {
    let imported = ProfileImporter.from_path(path)?;
    let predictions = service.predict_batch(&imported.profiles);
    let insights = service.insights(&predictions);

    Ok(ScoreReport {
        predictions,
        rejected_rows: imported.rejected,
        insights,
    })
}

pub(crate) fn read_student_record(path: &Path) -> Result<StudentProfile, AppError> {
    let reader = BufReader::new(File::open(path)?);
    let mut record: Value = serde_json::from_reader(reader).map_err(std::io::Error::from)?;
    if let Some(inner) = record.get_mut("student_data") {
        record = inner.take();
    }
    StudentProfile::from_value(record)
        .map_err(AssessmentError::from)
        .map_err(AppError::from)
}

fn render_assessment(result: &PredictionResult, top: usize) {
    println!(
        "Student {}: {} risk ({:.0}% dropout probability, score {})",
        result.student_id,
        result.risk_level.label(),
        result.dropout_probability * 100.0,
        result.risk_score
    );
    if let Some(points) = result.heuristic_points {
        println!("- Heuristic points: {points}/100");
    }
    println!(
        "- Scored by {} | attribution {} | model {}",
        result.data_source.scoring.label(),
        result.data_source.attribution.label(),
        result.model_version
    );
    println!(
        "- Attendance {:.1}% | Performance {:.1}",
        result.attendance, result.performance
    );

    println!("Top factors");
    for entry in result.feature_importance.top(top) {
        println!("- {}: {:.4}", entry.feature.name(), entry.weight);
    }

    if result.recommendations.is_empty() {
        println!("Recommendations: none");
    } else {
        println!("Recommendations");
        for recommendation in &result.recommendations {
            println!(
                "- [{:?}] {}: {} ({:.0}% expected effectiveness)",
                recommendation.priority,
                recommendation.factor,
                recommendation.intervention,
                recommendation.estimated_effectiveness * 100.0
            );
        }
    }
}

fn render_insights(insights: &CohortInsights) {
    println!("\nCohort summary");
    println!(
        "- {} students | {} at risk | {} critical | {:.1}% high risk",
        insights.total_students,
        insights.at_risk_students,
        insights.critical_students,
        insights.high_risk_percentage
    );
    println!(
        "- Average attendance {:.1}% | average performance {:.1}",
        insights.average_attendance, insights.average_performance
    );
    for note in &insights.recommendations {
        println!("- {note}");
    }
}

fn struggling_student() -> StudentProfile {
    StudentProfile {
        student_id: "DEMO-001".to_string(),
        gender: Gender::Female,
        accommodation: AccommodationType::Hostel,
        is_rural: true,
        commute_minutes: 70.0,
        admission_quota: AdmissionQuota::Sc,
        family_income: 38_000.0,
        siblings: 4,
        father_education: EducationLevel::Primary,
        mother_education: EducationLevel::NoFormalEducation,
        mother_literate: false,
        first_generation: true,
        past_performance: 54.0,
        medium_changed: true,
        latest_marks: 36.0,
        marks_trend: -6.0,
        failure_rate: 0.4,
        attendance: 52.0,
        works_part_time: true,
        has_laptop: false,
        has_reliable_internet: false,
        ..StudentProfile::default()
    }
}

fn thriving_student() -> StudentProfile {
    StudentProfile {
        student_id: "DEMO-002".to_string(),
        gender: Gender::Male,
        accommodation: AccommodationType::DayScholar,
        commute_minutes: 15.0,
        admission_quota: AdmissionQuota::General,
        family_income: 240_000.0,
        siblings: 1,
        father_education: EducationLevel::Graduate,
        mother_education: EducationLevel::PostGraduate,
        past_performance: 86.0,
        latest_marks: 89.0,
        marks_trend: 3.5,
        attendance: 94.0,
        preparing_competitive_exam: true,
        has_laptop: true,
        has_reliable_internet: true,
        ..StudentProfile::default()
    }
}
