use std::sync::Arc;

use super::common::*;
use crate::assessment::scoring::{
    HeuristicScorer, ModelScorer, PointCategory, RiskScorer, ScoringConfig, ScoringInput, Strategy,
};
use crate::assessment::{FeatureEncoder, RiskClassifier, RiskLevel, StudentProfile};

fn heuristic(profile: &StudentProfile) -> crate::assessment::RiskScore {
    HeuristicScorer::default().assess(profile)
}

#[test]
fn struggling_student_hits_every_category_cap() {
    let score = heuristic(&struggling_student());
    let breakdown = score.breakdown.as_ref().expect("heuristic breakdown");

    assert_eq!(breakdown.points_for(PointCategory::Attendance), 30);
    assert_eq!(breakdown.points_for(PointCategory::Performance), 25);
    assert_eq!(breakdown.points_for(PointCategory::Socioeconomic), 20);
    assert_eq!(breakdown.points_for(PointCategory::AcademicRisk), 15);
    assert_eq!(breakdown.points_for(PointCategory::TechnologyAccess), 7);
    assert_eq!(score.heuristic_points(), Some(97));

    assert_close(score.probability, 0.582);
    assert_eq!(score.risk_score, 58);
    assert_eq!(score.strategy, Strategy::Heuristic);
    assert_eq!(
        RiskClassifier::default().classify(&score),
        RiskLevel::Critical
    );
}

#[test]
fn thriving_student_earns_no_points() {
    let score = heuristic(&thriving_student());

    assert_eq!(score.heuristic_points(), Some(0));
    assert_eq!(score.probability, 0.0);
    assert_eq!(score.risk_score, 0);
    assert_eq!(RiskClassifier::default().classify(&score), RiskLevel::Low);
}

#[test]
fn reference_profile_scores_from_defaults() {
    let profile: StudentProfile =
        serde_json::from_value(serde_json::json!({ "StudentID": "ONLY-ID" })).expect("decodes");

    let score = heuristic(&profile);

    // attendance 75 -> 10, marks 60 -> 10, no laptop -> 3
    assert_eq!(score.heuristic_points(), Some(23));
    assert_close(score.probability, 0.138);
    assert_eq!(score.risk_score, 14);
}

#[test]
fn severe_deficits_add_probability_penalties_up_to_the_ceiling() {
    let profile = StudentProfile {
        attendance: 45.0,
        latest_marks: 25.0,
        ..thriving_student()
    };

    let score = heuristic(&profile);

    // 55 points * 0.6 + 15 + 10 = 58
    assert_eq!(score.heuristic_points(), Some(55));
    assert_close(score.probability, 0.58);

    let mut config = ScoringConfig::default();
    config.probability.ceiling = 0.5;
    let capped = HeuristicScorer::new(config).assess(&profile);
    assert_close(capped.probability, 0.5);
    assert_eq!(capped.risk_score, 50);
}

#[test]
fn heuristic_scoring_is_deterministic() {
    let scorer = HeuristicScorer::default();
    let profile = struggling_student();
    assert_eq!(scorer.assess(&profile), scorer.assess(&profile));
}

#[test]
fn risk_score_is_rounded_probability_for_every_profile() {
    let scorer = HeuristicScorer::default();
    for attendance in [0.0, 35.0, 49.9, 50.0, 65.0, 79.9, 100.0] {
        for marks in [0.0, 29.0, 45.0, 59.5, 70.0, 95.0] {
            let profile = StudentProfile {
                attendance,
                latest_marks: marks,
                ..struggling_student()
            };
            let score = scorer.assess(&profile);
            assert!((0.0..=1.0).contains(&score.probability));
            assert_eq!(
                f64::from(score.risk_score),
                (score.probability * 100.0).round()
            );
        }
    }
}

#[test]
fn model_scorer_reports_model_probability() {
    let forest = Arc::new(attendance_forest("rf-test-1"));
    let scorer = ModelScorer::new(forest);
    let profile = struggling_student();
    let features = FeatureEncoder.encode(&profile);

    let score = scorer
        .score(ScoringInput {
            profile: &profile,
            features: &features,
        })
        .expect("forest scores");

    assert_eq!(score.strategy, Strategy::Model);
    assert_close(score.probability, 0.8125);
    assert_eq!(score.risk_score, 81);
    assert_eq!(score.heuristic_points(), None);
    assert_close(score.severity(), 0.8125);
}

#[test]
fn model_scorer_rejects_out_of_range_probabilities() {
    let scorer = ModelScorer::new(Arc::new(OpaqueModel(1.4)));
    let profile = thriving_student();
    let features = FeatureEncoder.encode(&profile);

    let error = scorer
        .score(ScoringInput {
            profile: &profile,
            features: &features,
        })
        .expect_err("out of range");
    assert!(error.to_string().contains("1.4"));
}
