//! Data model for the matching pipeline.
//!
//! Wire shapes are camelCase: the same key set flows from the LLM contract
//! through `MatchResult` to the HTTP response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobDescriptionRow;

/// A single professional experience entry from a parsed resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    /// Free-text date as extracted from the resume, e.g. "2019-03" or "March 2019".
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
}

/// A single education entry from a parsed resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub year: String,
}

/// Immutable candidate snapshot for one matching run, derived from a parsed
/// resume. Owned by the caller and passed by value into the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub summary: String,
    /// Contact location free text; used only for location scoring.
    #[serde(default)]
    pub location: String,
}

/// Parsed requirement sub-record of a job description. All fields are
/// defaulted so a partially-parsed JD still scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequirements {
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub education_level: String,
    #[serde(default)]
    pub employment_type: String,
    #[serde(default)]
    pub salary_range: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A job posting as seen by the matching pipeline. Read-only input.
///
/// `id` is the stable row identifier and must be preserved verbatim through
/// the whole pipeline; every output `MatchResult.job_id` traces back to one
/// of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub requirements: JobRequirements,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub posted_date: Option<DateTime<Utc>>,
}

impl From<JobDescriptionRow> for JobPosting {
    fn from(row: JobDescriptionRow) -> Self {
        let requirements = row
            .parsed_requirements
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        JobPosting {
            id: row.id,
            title: row.title,
            company: row.company,
            location: row.location.unwrap_or_default(),
            description: row.description,
            requirements,
            url: row.url,
            posted_date: row.posted_at,
        }
    }
}

/// Matching preferences, either supplied by the caller as overrides or
/// derived from the profile via criteria extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingCriteria {
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub education_level: String,
    #[serde(default)]
    pub locations: Vec<String>,
    /// "remote", "hybrid", "onsite" or "any".
    #[serde(default = "default_remote_preference")]
    pub remote_preference: String,
    #[serde(default)]
    pub salary_expectation: Option<String>,
}

fn default_remote_preference() -> String {
    "any".to_string()
}

/// Per-dimension score breakdown, each component in [0, 100].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub skills_score: u32,
    pub experience_score: u32,
    pub education_score: u32,
    pub location_score: u32,
}

/// One scored match. Created fresh per matching run, never mutated after
/// construction; `job_id` always equals an input `JobPosting.id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub job_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub match_score: u32,
    pub match_reasons: Vec<String>,
    pub missing_skills: Vec<String>,
    #[serde(flatten)]
    pub breakdown: ScoreBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_deserializes_from_parser_output() {
        let json = json!({
            "skills": ["Python", "SQL"],
            "experience": [{
                "company": "Acme",
                "title": "Data Engineer",
                "startDate": "2019-06",
                "endDate": "present",
                "description": "Built pipelines"
            }],
            "education": [{
                "degree": "B.Sc. Computer Science",
                "institution": "State University",
                "year": "2019"
            }],
            "summary": "Data engineer with 5 years of experience",
            "location": "Austin, TX"
        });

        let profile: CandidateProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.skills.len(), 2);
        assert_eq!(profile.experience[0].start_date, "2019-06");
        assert_eq!(profile.education[0].degree, "B.Sc. Computer Science");
    }

    #[test]
    fn test_profile_tolerates_missing_fields() {
        let profile: CandidateProfile = serde_json::from_value(json!({})).unwrap();
        assert!(profile.skills.is_empty());
        assert!(profile.summary.is_empty());
    }

    #[test]
    fn test_requirements_default_experience_years_is_zero() {
        let reqs: JobRequirements =
            serde_json::from_value(json!({ "requiredSkills": ["Rust"] })).unwrap();
        assert_eq!(reqs.experience_years, 0);
        assert_eq!(reqs.required_skills, vec!["Rust"]);
    }

    #[test]
    fn test_match_result_serializes_camel_case_with_flat_breakdown() {
        let result = MatchResult {
            job_id: Uuid::new_v4(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            match_score: 81,
            match_reasons: vec!["Strong skill overlap".to_string()],
            missing_skills: vec!["AWS".to_string()],
            breakdown: ScoreBreakdown {
                skills_score: 53,
                experience_score: 100,
                education_score: 100,
                location_score: 100,
            },
        };

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("jobId").is_some());
        assert_eq!(value["matchScore"], 81);
        // Breakdown flattens into the same object as the LLM contract keys
        assert_eq!(value["skillsScore"], 53);
        assert_eq!(value["locationScore"], 100);
    }

    #[test]
    fn test_criteria_default_remote_preference_is_any() {
        let criteria: MatchingCriteria = serde_json::from_value(json!({})).unwrap();
        assert_eq!(criteria.remote_preference, "any");
    }
}
