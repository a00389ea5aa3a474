//! Job matcher — orchestrates batched LLM matching over a set of postings.
//!
//! Jobs go to the model in fixed-size batches, one call in flight at a time
//! to stay under provider rate limits. A failed batch is logged and skipped;
//! partial results are acceptable and a total outage yields an empty result
//! set with the `degraded` flag raised, never an error, so callers can still
//! render "no matches".

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::llm_client::{strip_json_fences, ChatProvider};
use crate::matching::llm_match::{clamp_score, request_batch_matches, RawLlmMatch};
use crate::matching::models::{
    CandidateProfile, JobPosting, MatchResult, MatchingCriteria, ScoreBreakdown,
};
use crate::matching::prompts::{build_criteria_prompt, CRITERIA_SYSTEM};
use crate::matching::scoring::years_of_experience;

/// Jobs per LLM call. Bounds prompt size and per-call latency.
pub const BATCH_SIZE: usize = 5;

/// Post-scoring floor. Deliberately lower than the "above 60" instruction in
/// the prompt: a safety net against the model scoring more conservatively
/// than asked, not a contradiction.
pub const MATCH_FLOOR: u32 = 50;

/// Outcome of one matching run.
#[derive(Debug, Clone)]
pub struct MatchRun {
    /// Qualifying matches, sorted descending by score (stable for ties).
    pub matches: Vec<MatchResult>,
    /// True when at least one batch failed, so "no matches" may mean
    /// "provider was down" rather than "nothing qualified".
    pub degraded: bool,
}

/// Scores every job against the profile in sequential batches.
pub async fn match_jobs_to_profile(
    provider: &dyn ChatProvider,
    profile: &CandidateProfile,
    jobs: &[JobPosting],
    criteria: Option<&MatchingCriteria>,
) -> MatchRun {
    let mut raw_matches: Vec<RawLlmMatch> = Vec::new();
    let mut degraded = false;

    for (batch_index, batch) in jobs.chunks(BATCH_SIZE).enumerate() {
        match request_batch_matches(provider, profile, batch, criteria).await {
            Ok(mut batch_matches) => {
                raw_matches.append(&mut batch_matches);
            }
            Err(e) => {
                warn!(
                    "Batch {} ({} jobs) failed, continuing with remaining batches: {e}",
                    batch_index + 1,
                    batch.len()
                );
                degraded = true;
            }
        }
    }

    let postings_by_id: HashMap<Uuid, &JobPosting> = jobs.iter().map(|j| (j.id, j)).collect();

    let mut matches: Vec<MatchResult> = raw_matches
        .into_iter()
        .filter_map(|raw| normalize_match(raw, &postings_by_id))
        .filter(|m| m.match_score >= MATCH_FLOOR)
        .collect();

    // sort_by is stable: ties keep arrival order
    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));

    info!(
        "Matching run produced {} qualifying matches from {} jobs (degraded: {})",
        matches.len(),
        jobs.len(),
        degraded
    );

    MatchRun { matches, degraded }
}

/// Normalizes one raw model match into a `MatchResult` keyed by an input
/// posting. Returns None for matches whose jobId does not trace back to an
/// input posting — the model invented it, and the prompt contract alone is
/// not trusted to prevent that.
fn normalize_match(
    raw: RawLlmMatch,
    postings_by_id: &HashMap<Uuid, &JobPosting>,
) -> Option<MatchResult> {
    let id_text = match raw.job_id {
        Some(ref id) => id.trim(),
        None => {
            warn!("Match object carried no jobId or id key; dropping");
            return None;
        }
    };

    let job_id = match Uuid::parse_str(id_text) {
        Ok(id) => id,
        Err(_) => {
            warn!("Match jobId {id_text:?} is not a valid posting id; dropping");
            return None;
        }
    };

    let posting = match postings_by_id.get(&job_id) {
        Some(p) => *p,
        None => {
            warn!("Match jobId {job_id} does not correspond to any input posting; dropping");
            return None;
        }
    };

    Some(MatchResult {
        job_id,
        title: raw.title.unwrap_or_else(|| posting.title.clone()),
        company: raw.company.unwrap_or_else(|| posting.company.clone()),
        location: raw.location.unwrap_or_else(|| posting.location.clone()),
        match_score: clamp_score(raw.match_score),
        match_reasons: raw.match_reasons,
        missing_skills: raw.missing_skills,
        breakdown: ScoreBreakdown {
            skills_score: clamp_score(raw.skills_score),
            experience_score: clamp_score(raw.experience_score),
            education_score: clamp_score(raw.education_score),
            location_score: clamp_score(raw.location_score),
        },
    })
}

/// Derives matching criteria from the profile via the LLM, falling back to
/// profile-derived defaults on any failure. Always yields a valid object.
pub async fn extract_matching_criteria(
    provider: &dyn ChatProvider,
    profile: &CandidateProfile,
) -> MatchingCriteria {
    let prompt = match build_criteria_prompt(profile) {
        Ok(p) => p,
        Err(e) => {
            warn!("Criteria prompt build failed, using fallback: {e}");
            return fallback_criteria(profile);
        }
    };

    match provider.query(&prompt, CRITERIA_SYSTEM).await {
        Ok(reply) => {
            let cleaned = strip_json_fences(&reply);
            match serde_json::from_str::<MatchingCriteria>(cleaned) {
                Ok(criteria) => criteria,
                Err(e) => {
                    warn!("Criteria reply failed to parse, using fallback: {e}");
                    fallback_criteria(profile)
                }
            }
        }
        Err(e) => {
            warn!("Criteria extraction call failed, using fallback: {e}");
            fallback_criteria(profile)
        }
    }
}

/// Profile-derived criteria defaults: candidate skills as required skills,
/// computed years of experience, degree from the most recent education
/// entry, remote preference "any".
fn fallback_criteria(profile: &CandidateProfile) -> MatchingCriteria {
    MatchingCriteria {
        required_skills: profile.skills.clone(),
        preferred_skills: Vec::new(),
        experience_years: years_of_experience(profile),
        education_level: profile
            .education
            .first()
            .map(|e| e.degree.clone())
            .unwrap_or_default(),
        locations: if profile.location.trim().is_empty() {
            Vec::new()
        } else {
            vec![profile.location.clone()]
        },
        remote_preference: "any".to_string(),
        salary_expectation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::matching::models::JobRequirements;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays a fixed script of replies; `None` entries fail
    /// the call. Requests past the end of the script also fail.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Option<String>>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Option<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn model(&self) -> &str {
            "scripted-test-model"
        }

        async fn query(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            match self.replies.lock().unwrap().pop_front() {
                Some(Some(reply)) => Ok(reply),
                _ => Err(LlmError::Api {
                    status: 503,
                    message: "scripted failure".to_string(),
                }),
            }
        }
    }

    fn make_jobs(count: usize) -> Vec<JobPosting> {
        (0..count)
            .map(|i| JobPosting {
                id: Uuid::new_v4(),
                title: format!("Role {i}"),
                company: "Acme".to_string(),
                location: "Remote".to_string(),
                description: "Do things".to_string(),
                requirements: JobRequirements::default(),
                url: None,
                posted_date: None,
            })
            .collect()
    }

    fn reply_with_scores(jobs: &[JobPosting], scores: &[u32]) -> String {
        let objects: Vec<serde_json::Value> = jobs
            .iter()
            .zip(scores)
            .map(|(job, score)| {
                serde_json::json!({
                    "jobId": job.id,
                    "title": job.title,
                    "company": job.company,
                    "location": job.location,
                    "matchScore": score,
                    "matchReasons": ["fits"],
                    "missingSkills": [],
                    "skillsScore": score,
                    "experienceScore": score,
                    "educationScore": score,
                    "locationScore": score
                })
            })
            .collect();
        serde_json::to_string(&objects).unwrap()
    }

    #[tokio::test]
    async fn test_threshold_filter_and_descending_sort() {
        let jobs = make_jobs(5);
        let provider =
            ScriptedProvider::new(vec![Some(reply_with_scores(&jobs, &[30, 49, 50, 51, 100]))]);

        let run =
            match_jobs_to_profile(&provider, &CandidateProfile::default(), &jobs, None).await;

        let scores: Vec<u32> = run.matches.iter().map(|m| m.match_score).collect();
        assert_eq!(scores, vec![100, 51, 50]);
        assert!(!run.degraded);
    }

    #[tokio::test]
    async fn test_failed_middle_batch_is_isolated() {
        // 12 jobs → batches of 5, 5, 2; the second batch's call fails.
        let jobs = make_jobs(12);
        let provider = ScriptedProvider::new(vec![
            Some(reply_with_scores(&jobs[0..5], &[90, 85, 80, 75, 70])),
            None,
            Some(reply_with_scores(&jobs[10..12], &[65, 60])),
        ]);

        let run =
            match_jobs_to_profile(&provider, &CandidateProfile::default(), &jobs, None).await;

        assert_eq!(run.matches.len(), 7);
        assert!(run.degraded);
        // Nothing from the failed batch leaked through
        let failed_ids: Vec<Uuid> = jobs[5..10].iter().map(|j| j.id).collect();
        assert!(run.matches.iter().all(|m| !failed_ids.contains(&m.job_id)));
    }

    #[tokio::test]
    async fn test_total_outage_yields_empty_degraded_run() {
        let jobs = make_jobs(7);
        let provider = ScriptedProvider::new(vec![None, None]);

        let run =
            match_jobs_to_profile(&provider, &CandidateProfile::default(), &jobs, None).await;

        assert!(run.matches.is_empty());
        assert!(run.degraded);
    }

    #[tokio::test]
    async fn test_hallucinated_job_id_is_dropped() {
        let jobs = make_jobs(2);
        let reply = serde_json::json!([
            {"jobId": jobs[0].id, "matchScore": 88},
            {"jobId": Uuid::new_v4(), "matchScore": 95},
            {"jobId": "not-even-a-uuid", "matchScore": 99}
        ])
        .to_string();
        let provider = ScriptedProvider::new(vec![Some(reply)]);

        let run =
            match_jobs_to_profile(&provider, &CandidateProfile::default(), &jobs, None).await;

        assert_eq!(run.matches.len(), 1);
        assert_eq!(run.matches[0].job_id, jobs[0].id);
    }

    #[tokio::test]
    async fn test_missing_fields_fall_back_to_posting() {
        let jobs = make_jobs(1);
        // Model echoed the id under "id", used relevanceScore, omitted the rest
        let reply = serde_json::json!([
            {"id": jobs[0].id, "relevanceScore": 77}
        ])
        .to_string();
        let provider = ScriptedProvider::new(vec![Some(reply)]);

        let run =
            match_jobs_to_profile(&provider, &CandidateProfile::default(), &jobs, None).await;

        assert_eq!(run.matches.len(), 1);
        let m = &run.matches[0];
        assert_eq!(m.job_id, jobs[0].id);
        assert_eq!(m.title, jobs[0].title);
        assert_eq!(m.company, "Acme");
        assert_eq!(m.match_score, 77);
        assert_eq!(m.breakdown.skills_score, 0);
    }

    #[tokio::test]
    async fn test_unparseable_batch_contributes_nothing() {
        let jobs = make_jobs(3);
        let provider = ScriptedProvider::new(vec![Some("no json here".to_string())]);

        let run =
            match_jobs_to_profile(&provider, &CandidateProfile::default(), &jobs, None).await;

        assert!(run.matches.is_empty());
        assert!(!run.degraded); // parse failure is a soft miss, not an outage
    }

    #[tokio::test]
    async fn test_criteria_extraction_parses_model_reply() {
        let reply = serde_json::json!({
            "requiredSkills": ["Rust"],
            "preferredSkills": ["Go"],
            "experienceYears": 4,
            "educationLevel": "bachelor",
            "locations": ["Berlin"],
            "remotePreference": "remote",
            "salaryExpectation": null
        })
        .to_string();
        let provider = ScriptedProvider::new(vec![Some(reply)]);

        let criteria =
            extract_matching_criteria(&provider, &CandidateProfile::default()).await;
        assert_eq!(criteria.required_skills, vec!["Rust"]);
        assert_eq!(criteria.remote_preference, "remote");
    }

    #[tokio::test]
    async fn test_criteria_extraction_falls_back_on_outage() {
        let profile = CandidateProfile {
            skills: vec!["Python".to_string(), "SQL".to_string()],
            location: "Austin, TX".to_string(),
            ..Default::default()
        };
        let provider = ScriptedProvider::new(vec![None]);

        let criteria = extract_matching_criteria(&provider, &profile).await;
        assert_eq!(criteria.required_skills, profile.skills);
        assert_eq!(criteria.remote_preference, "any");
        assert_eq!(criteria.locations, vec!["Austin, TX"]);
    }

    #[tokio::test]
    async fn test_criteria_extraction_falls_back_on_bad_json() {
        let provider = ScriptedProvider::new(vec![Some("not json".to_string())]);
        let criteria =
            extract_matching_criteria(&provider, &CandidateProfile::default()).await;
        assert_eq!(criteria.remote_preference, "any");
    }
}
