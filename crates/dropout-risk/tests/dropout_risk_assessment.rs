use std::sync::Arc;

use dropout_risk::assessment::{
    AssessmentConfig, DecisionForest, Feature, ModelHandle, ProfileImporter, RiskAssessmentService,
    RiskLevel, RiskModel, StudentProfile, Strategy,
};
use serde_json::json;

const DATASET: &str = "\
StudentID,Gender,AccommodationType,IsRural,CommuteTimeMinutes,AdmissionQuota,FamilyAnnualIncome,NumberOfSiblings,FatherEducation,IsFatherLiterate,MotherEducation,IsMotherLiterate,IsFirstGenerationLearner,AvgPastPerformance,MediumChanged,AvgMarks_LatestTerm,MarksTrend,FailureRate_LatestTerm,AvgAttendance_LatestTerm,WorksPartTime,IsPreparingCompetitiveExam,HasOwnLaptop,HasReliableInternet
S-100,Female,Hostel,TRUE,75,SC,40000,4,Primary,TRUE,No Formal Education,FALSE,TRUE,52,TRUE,35,-4.5,0.4,55,TRUE,FALSE,FALSE,FALSE
S-101,Male,Own House,FALSE,10,General,200000,1,Graduate,TRUE,Post Graduate,TRUE,FALSE,84,FALSE,88,2.0,0.0,92,FALSE,TRUE,TRUE,TRUE
S-102,Other,PG,FALSE,abc,EWS,,3,Secondary,TRUE,Secondary,TRUE,FALSE,61,FALSE,58,0.5,0.2,72,FALSE,TRUE,TRUE,TRUE
";

const FOREST: &str = r#"{
    "version": "rf-2024-07",
    "feature_names": ["AvgAttendance_LatestTerm", "FailureRate_LatestTerm"],
    "trees": [
        {"nodes": [
            {"kind": "split", "feature": 0, "threshold": 70.0, "left": 1, "right": 2, "cover": 200.0},
            {"kind": "leaf", "value": 0.75, "cover": 80.0},
            {"kind": "split", "feature": 1, "threshold": 0.25, "left": 3, "right": 4, "cover": 120.0},
            {"kind": "leaf", "value": 0.125, "cover": 90.0},
            {"kind": "leaf", "value": 0.5, "cover": 30.0}
        ]},
        {"nodes": [
            {"kind": "split", "feature": 1, "threshold": 0.3, "left": 1, "right": 2, "cover": 200.0},
            {"kind": "leaf", "value": 0.25, "cover": 150.0},
            {"kind": "leaf", "value": 0.875, "cover": 50.0}
        ]}
    ]
}"#;

fn heuristic_service() -> RiskAssessmentService {
    RiskAssessmentService::new(AssessmentConfig::default(), ModelHandle::empty())
}

#[test]
fn csv_export_scores_end_to_end_with_heuristics() {
    let imported = ProfileImporter
        .from_reader(DATASET.as_bytes())
        .expect("dataset imports");
    assert!(imported.rejected.is_empty());

    let service = heuristic_service();
    let results = service.predict_batch(&imported.profiles);

    let summary: Vec<(&str, RiskLevel, bool)> = results
        .iter()
        .map(|result| {
            (
                result.student_id.as_str(),
                result.risk_level,
                result.dropout_prediction,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("S-100", RiskLevel::Critical, true),
            ("S-101", RiskLevel::Low, false),
            ("S-102", RiskLevel::Low, false),
        ]
    );

    // Unparsable commute degrades to 0; blank income keeps the reference default.
    assert_eq!(imported.profiles[2].commute_minutes, 0.0);
    assert_eq!(imported.profiles[2].family_income, 50_000.0);

    for result in &results {
        assert_eq!(result.data_source.scoring, Strategy::Heuristic);
        assert!((0.0..=1.0).contains(&result.dropout_probability));
        assert_eq!(
            f64::from(result.risk_score),
            (result.dropout_probability * 100.0).round()
        );
    }

    let insights = service.insights(&results);
    assert_eq!(insights.total_students, 3);
    assert_eq!(insights.critical_students, 1);
}

#[test]
fn forest_on_disk_format_drives_model_strategy() {
    let forest = DecisionForest::from_json(FOREST).expect("forest parses");
    let expected_value = forest.expected_value();
    let service = RiskAssessmentService::new(
        AssessmentConfig::default(),
        ModelHandle::with_model(Arc::new(forest)),
    );

    let profile = StudentProfile::from_value(json!({
        "StudentID": "M-1",
        "AvgAttendance_LatestTerm": 64,
        "FailureRate_LatestTerm": 0.35
    }))
    .expect("decodes");

    let result = service.predict(&profile);

    // (0.75 + 0.875) / 2
    assert!((result.dropout_probability - 0.8125).abs() < 1e-12);
    assert_eq!(result.risk_level, RiskLevel::Critical);
    assert_eq!(result.model_version, "rf-2024-07+treeshap");
    assert!(result.shap_available);

    let model = service.current_model().expect("model loaded");
    let encoded = dropout_risk::assessment::FeatureEncoder.encode(&profile);
    let phi = model.contributions(encoded.as_slice()).expect("explains");
    let reconstructed: f64 = phi.iter().sum::<f64>() + expected_value;
    assert!((reconstructed - result.dropout_probability).abs() < 1e-9);

    let top: Vec<Feature> = result
        .feature_importance
        .top(2)
        .iter()
        .map(|entry| entry.feature)
        .collect();
    assert!(top.contains(&Feature::AvgAttendanceLatestTerm));
    assert!(top.contains(&Feature::FailureRateLatestTerm));
}

#[test]
fn tuned_threshold_table_changes_classification_without_code_changes() {
    let config = AssessmentConfig::from_json(
        r#"{"thresholds": {"critical": 0.99, "high": 0.9, "medium": 0.2}}"#,
    )
    .expect("rules parse");
    let service = RiskAssessmentService::new(config, ModelHandle::empty());

    let struggling = StudentProfile::from_value(json!({
        "StudentID": "T-1",
        "AvgAttendance_LatestTerm": 55,
        "AvgMarks_LatestTerm": 35,
        "IsRural": "TRUE",
        "IsFirstGenerationLearner": "TRUE",
        "FamilyAnnualIncome": 40000,
        "NumberOfSiblings": 4,
        "WorksPartTime": "TRUE",
        "FailureRate_LatestTerm": 0.4,
        "HasOwnLaptop": "FALSE",
        "HasReliableInternet": "FALSE"
    }))
    .expect("decodes");

    let result = service.predict(&struggling);
    assert_eq!(result.heuristic_points, Some(97));
    assert_eq!(result.risk_level, RiskLevel::High);
}
