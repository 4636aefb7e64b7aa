use super::config::ProbabilityMapping;
use crate::assessment::profile::StudentProfile;

/// Maps a capped point total onto a probability that never exceeds the ceiling.
pub(crate) fn points_to_probability(
    points: u32,
    profile: &StudentProfile,
    mapping: &ProbabilityMapping,
) -> f64 {
    let mut scaled = f64::from(points) * mapping.point_weight;
    if profile.attendance < mapping.attendance_below {
        scaled += mapping.attendance_penalty;
    }
    if profile.latest_marks < mapping.marks_below {
        scaled += mapping.marks_penalty;
    }

    let probability = (scaled / 100.0).min(mapping.ceiling);
    if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Integer score on the 0..=100 scale.
pub(crate) fn scaled_score(probability: f64) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}
