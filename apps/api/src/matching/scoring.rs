//! Deterministic scoring rules — pure functions computing per-dimension
//! sub-scores from a candidate profile and a job requirement record.
//!
//! The primary match score comes from the LLM pipeline; these rules produce
//! the deterministic breakdown for the direct-scoring endpoint and serve as
//! the fallback when no LLM result exists for a pair.

use chrono::{Datelike, Utc};

use crate::matching::models::{CandidateProfile, JobPosting, JobRequirements, ScoreBreakdown};

/// Weights for combining sub-scores into one match score.
const WEIGHT_SKILLS: f64 = 0.4;
const WEIGHT_EXPERIENCE: f64 = 0.3;
const WEIGHT_EDUCATION: f64 = 0.2;
const WEIGHT_LOCATION: f64 = 0.1;

/// Skills sub-score: required-skill coverage is worth up to 80 points,
/// preferred-skill coverage up to 20. A job with no required skills is a
/// vacuous match (100).
pub fn score_skills(candidate_skills: &[String], requirements: &JobRequirements) -> u32 {
    if requirements.required_skills.is_empty() {
        return 100;
    }

    let candidate: Vec<String> = candidate_skills.iter().map(|s| s.to_lowercase()).collect();
    let has = |skill: &str| candidate.iter().any(|c| c == &skill.to_lowercase());

    let matched_required = requirements
        .required_skills
        .iter()
        .filter(|s| has(s))
        .count() as f64;
    let required_part = matched_required / requirements.required_skills.len() as f64 * 80.0;

    let preferred_part = if requirements.preferred_skills.is_empty() {
        0.0
    } else {
        let matched_preferred = requirements
            .preferred_skills
            .iter()
            .filter(|s| has(s))
            .count() as f64;
        matched_preferred / requirements.preferred_skills.len() as f64 * 20.0
    };

    (required_part + preferred_part).round() as u32
}

/// Candidate's total years of experience, derived from the earliest start
/// year across all experience entries.
pub fn years_of_experience(profile: &CandidateProfile) -> u32 {
    years_of_experience_at(profile, Utc::now().year())
}

fn years_of_experience_at(profile: &CandidateProfile, current_year: i32) -> u32 {
    profile
        .experience
        .iter()
        .filter_map(|e| extract_year(&e.start_date))
        .min()
        .map(|earliest| (current_year - earliest).max(0) as u32)
        .unwrap_or(0)
}

/// Pulls the first four-digit year out of a free-text date string.
fn extract_year(date: &str) -> Option<i32> {
    let bytes = date.as_bytes();
    for start in 0..bytes.len() {
        if start + 4 <= bytes.len() && bytes[start..start + 4].iter().all(u8::is_ascii_digit) {
            // Reject longer digit runs (e.g. "20190")
            let before_ok = start == 0 || !bytes[start - 1].is_ascii_digit();
            let after_ok = start + 4 == bytes.len() || !bytes[start + 4].is_ascii_digit();
            if before_ok && after_ok {
                let year: i32 = date[start..start + 4].parse().ok()?;
                if (1900..=2100).contains(&year) {
                    return Some(year);
                }
            }
        }
    }
    None
}

/// Experience sub-score: full credit at or above the required years,
/// graduated credit at 80% / 60% of required, linear floor below that.
pub fn score_experience(candidate_years: u32, required_years: u32) -> u32 {
    if required_years == 0 || candidate_years >= required_years {
        return 100;
    }

    let actual = candidate_years as f64;
    let required = required_years as f64;

    if actual >= required * 0.8 {
        80
    } else if actual >= required * 0.6 {
        60
    } else {
        let floor = 40.0 - (required - actual) * 10.0;
        floor.max(0.0).round() as u32
    }
}

/// Maps a free-text degree or education-level string onto an ordinal scale.
/// Returns 0 when no level is recognized.
pub fn degree_ordinal(text: &str) -> u32 {
    let lower = text.to_lowercase();
    if lower.contains("phd") || lower.contains("doctorate") || lower.contains("ph.d") {
        5
    } else if lower.contains("master") || lower.contains("mba") || lower.contains("m.s") {
        4
    } else if lower.contains("bachelor") || lower.contains("b.s") || lower.contains("b.a") {
        3
    } else if lower.contains("associate") {
        2
    } else if lower.contains("high school") || lower.contains("ged") {
        1
    } else {
        0
    }
}

/// Education sub-score: full credit at or above the required level, 80 for
/// exactly one level below, then a linear penalty.
pub fn score_education(profile: &CandidateProfile, required_level: &str) -> u32 {
    let required = degree_ordinal(required_level);
    if required == 0 {
        return 100;
    }

    let candidate = profile
        .education
        .iter()
        .map(|e| degree_ordinal(&e.degree))
        .max()
        .unwrap_or(0);

    if candidate >= required {
        100
    } else if required - candidate == 1 {
        80
    } else {
        let diff = required - candidate;
        80u32.saturating_sub(diff * 20)
    }
}

/// Location sub-score: 100 for remote jobs or a direct location containment,
/// 80 for a shared locality token, otherwise 50. Never disqualifying.
pub fn score_location(candidate_location: &str, job: &JobPosting) -> u32 {
    let job_location = job.location.to_lowercase();
    let employment_type = job.requirements.employment_type.to_lowercase();

    if job_location.contains("remote") || employment_type.contains("remote") {
        return 100;
    }

    let candidate = candidate_location.trim().to_lowercase();
    if candidate.is_empty() || job_location.is_empty() {
        return 50;
    }

    if candidate.contains(&job_location) || job_location.contains(&candidate) {
        return 100;
    }

    let candidate_tokens: Vec<&str> = candidate.split(',').map(str::trim).collect();
    let shares_token = job_location
        .split(',')
        .map(str::trim)
        .any(|t| !t.is_empty() && candidate_tokens.contains(&t));

    if shares_token {
        80
    } else {
        50
    }
}

/// Computes the full deterministic breakdown and the weighted combined score
/// for one candidate/job pair.
pub fn calculate_detailed_match_score(
    profile: &CandidateProfile,
    job: &JobPosting,
) -> (u32, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        skills_score: score_skills(&profile.skills, &job.requirements),
        experience_score: score_experience(
            years_of_experience(profile),
            job.requirements.experience_years,
        ),
        education_score: score_education(profile, &job.requirements.education_level),
        location_score: score_location(&profile.location, job),
    };

    let combined = WEIGHT_SKILLS * breakdown.skills_score as f64
        + WEIGHT_EXPERIENCE * breakdown.experience_score as f64
        + WEIGHT_EDUCATION * breakdown.education_score as f64
        + WEIGHT_LOCATION * breakdown.location_score as f64;

    (combined.round() as u32, breakdown)
}
