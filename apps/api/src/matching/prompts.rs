//! Prompt construction for the matching pipeline.
//!
//! The match prompt carries the scoring rubric, the serialized candidate
//! profile, optional criteria overrides and one batch of job postings. The
//! output contract demands a JSON array with an exact key set, and the
//! verbatim-jobId rule is the anti-hallucination guard for the whole
//! pipeline — results whose jobId does not echo an input id are discarded.

use serde_json::json;

use crate::errors::AppError;
use crate::matching::models::{CandidateProfile, JobPosting, MatchingCriteria};

/// System prompt for job matching — enforces JSON-only output.
pub const MATCH_SYSTEM: &str =
    "You are an expert technical recruiter scoring how well a candidate matches job postings. \
    You MUST respond with valid JSON only — a JSON array of match objects. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Match prompt template. Replace `{profile_json}`, `{criteria_json}` and
/// `{jobs_json}` before sending.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"Score how well the candidate below matches EACH of the job postings.

CANDIDATE PROFILE:
{profile_json}

MATCHING CRITERIA (overrides, may be empty):
{criteria_json}

JOB POSTINGS:
{jobs_json}

Return a JSON ARRAY with one object per job, using this EXACT key set (no extra fields):
[
  {
    "jobId": "the exact id of the job posting",
    "title": "job title",
    "company": "company name",
    "location": "job location",
    "matchScore": 85,
    "matchReasons": ["reason the candidate fits"],
    "missingSkills": ["required skill the candidate lacks"],
    "skillsScore": 80,
    "experienceScore": 90,
    "educationScore": 100,
    "locationScore": 100
  }
]

SCORING RUBRIC:
- skillsScore: coverage of requiredSkills (dominant) and preferredSkills
- experienceScore: candidate years of experience vs experienceYears required
- educationScore: candidate education level vs educationLevel required
- locationScore: location compatibility; remote roles always score 100
- matchScore: overall 0-100 weighting skills highest, then experience, education, location

HARD RULES:
1. "jobId" MUST be copied VERBATIM from the "id" field of the job posting — never invent, shorten or reformat it
2. Every score is an integer from 0 to 100
3. Only include jobs with matchScore above 60
4. matchReasons must be concrete and reference the candidate's actual background"#;

/// System prompt for criteria extraction — enforces JSON-only output.
pub const CRITERIA_SYSTEM: &str =
    "You are an expert career advisor deriving a candidate's implied job-search preferences \
    from their resume profile. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Criteria extraction prompt template. Replace `{profile_json}`.
pub const CRITERIA_PROMPT_TEMPLATE: &str = r#"Derive the matching preferences implied by this candidate profile.

CANDIDATE PROFILE:
{profile_json}

Return a JSON object with this EXACT schema:
{
  "requiredSkills": ["skills the candidate clearly has and should match on"],
  "preferredSkills": ["adjacent skills worth matching"],
  "experienceYears": 5,
  "educationLevel": "bachelor",
  "locations": ["locations the candidate appears tied to"],
  "remotePreference": "any",
  "salaryExpectation": null
}

"remotePreference" must be one of: "remote", "hybrid", "onsite", "any"."#;

/// Serializes the candidate profile for prompt embedding.
/// Skills, experience, education and summary only — contact fields stay out.
fn profile_payload(profile: &CandidateProfile) -> serde_json::Value {
    json!({
        "skills": profile.skills,
        "experience": profile.experience,
        "education": profile.education,
        "summary": profile.summary,
    })
}

/// Reduces a job posting to its matchable fields for prompt embedding.
fn job_payload(job: &JobPosting) -> serde_json::Value {
    json!({
        "id": job.id,
        "title": job.title,
        "company": job.company,
        "location": job.location,
        "description": job.description,
        "requirements": job.requirements,
        "salary": job.requirements.salary_range,
        "type": job.requirements.employment_type,
        "postedDate": job.posted_date,
        "url": job.url,
    })
}

/// Builds the full match prompt for one batch of jobs.
pub fn build_match_prompt(
    profile: &CandidateProfile,
    jobs: &[JobPosting],
    criteria: Option<&MatchingCriteria>,
) -> Result<String, AppError> {
    let profile_json = serde_json::to_string_pretty(&profile_payload(profile))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;

    let criteria_json = match criteria {
        Some(c) => serde_json::to_string_pretty(c)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize criteria: {e}")))?,
        None => "{}".to_string(),
    };

    let jobs_json = serde_json::to_string_pretty(
        &jobs.iter().map(job_payload).collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize jobs: {e}")))?;

    Ok(MATCH_PROMPT_TEMPLATE
        .replace("{profile_json}", &profile_json)
        .replace("{criteria_json}", &criteria_json)
        .replace("{jobs_json}", &jobs_json))
}

/// Builds the criteria-extraction prompt.
pub fn build_criteria_prompt(profile: &CandidateProfile) -> Result<String, AppError> {
    let profile_json = serde_json::to_string_pretty(&profile_payload(profile))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;

    Ok(CRITERIA_PROMPT_TEMPLATE.replace("{profile_json}", &profile_json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::models::{EducationEntry, JobRequirements};
    use uuid::Uuid;

    fn make_profile() -> CandidateProfile {
        CandidateProfile {
            skills: vec!["Python".to_string(), "SQL".to_string()],
            experience: vec![],
            education: vec![EducationEntry {
                degree: "B.Sc.".to_string(),
                institution: "State University".to_string(),
                year: "2019".to_string(),
            }],
            summary: "Data engineer".to_string(),
            location: "Austin, TX".to_string(),
        }
    }

    fn make_job(id: Uuid) -> JobPosting {
        JobPosting {
            id,
            title: "Data Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: "Build pipelines".to_string(),
            requirements: JobRequirements {
                required_skills: vec!["Python".to_string()],
                ..Default::default()
            },
            url: None,
            posted_date: None,
        }
    }

    #[test]
    fn test_match_prompt_contains_every_job_id() {
        let profile = make_profile();
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let jobs: Vec<JobPosting> = ids.iter().map(|id| make_job(*id)).collect();

        let prompt = build_match_prompt(&profile, &jobs, None).unwrap();
        for id in &ids {
            assert!(prompt.contains(&id.to_string()), "missing job id {id}");
        }
    }

    #[test]
    fn test_match_prompt_carries_verbatim_job_id_rule() {
        let prompt = build_match_prompt(&make_profile(), &[make_job(Uuid::new_v4())], None).unwrap();
        assert!(prompt.contains("VERBATIM"));
        assert!(prompt.contains("never invent"));
    }

    #[test]
    fn test_match_prompt_asks_model_for_above_60() {
        let prompt = build_match_prompt(&make_profile(), &[make_job(Uuid::new_v4())], None).unwrap();
        assert!(prompt.contains("matchScore above 60"));
    }

    #[test]
    fn test_profile_payload_excludes_contact_location() {
        let payload = profile_payload(&make_profile());
        assert!(payload.get("location").is_none());
        assert!(payload.get("skills").is_some());
        assert!(payload.get("summary").is_some());
    }

    #[test]
    fn test_criteria_overrides_are_embedded() {
        let criteria = MatchingCriteria {
            required_skills: vec!["Rust".to_string()],
            remote_preference: "remote".to_string(),
            ..Default::default()
        };
        let prompt =
            build_match_prompt(&make_profile(), &[make_job(Uuid::new_v4())], Some(&criteria))
                .unwrap();
        assert!(prompt.contains("Rust"));
        assert!(prompt.contains("remote"));
    }

    #[test]
    fn test_criteria_prompt_embeds_profile_skills() {
        let prompt = build_criteria_prompt(&make_profile()).unwrap();
        assert!(prompt.contains("Python"));
        assert!(prompt.contains("remotePreference"));
    }
}
