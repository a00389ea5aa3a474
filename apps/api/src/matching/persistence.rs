//! Match persistence — reconciles computed matches with stored rows.
//!
//! Each (user, resume, job description) triple holds at most one row,
//! maintained by an atomic upsert; no history is kept. Per-row failures are
//! logged and skipped so one bad row never aborts the loop. The denormalized
//! score fields on the job row are best-effort: a failed update there leaves
//! the authoritative match row intact and is eventually repaired by the next
//! run.

use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::matching::models::MatchResult;

/// Serializes the per-dimension breakdown for the `match_breakdown` column.
fn breakdown_json(result: &MatchResult) -> serde_json::Value {
    json!({
        "skillsScore": result.breakdown.skills_score,
        "experienceScore": result.breakdown.experience_score,
        "educationScore": result.breakdown.education_score,
        "locationScore": result.breakdown.location_score,
    })
}

/// Upserts one match row per result and refreshes the denormalized score on
/// each job row. Returns how many match rows were written.
pub async fn save_matches(
    pool: &PgPool,
    user_id: Uuid,
    resume_id: Uuid,
    matches: &[MatchResult],
) -> usize {
    let mut saved = 0;

    for result in matches {
        let upsert = sqlx::query(
            r#"
            INSERT INTO job_matches
                (id, user_id, resume_id, job_description_id, match_score,
                 match_breakdown, match_reasons, missing_skills, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (user_id, resume_id, job_description_id)
            DO UPDATE SET
                match_score = EXCLUDED.match_score,
                match_breakdown = EXCLUDED.match_breakdown,
                match_reasons = EXCLUDED.match_reasons,
                missing_skills = EXCLUDED.missing_skills,
                created_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(resume_id)
        .bind(result.job_id)
        .bind(result.match_score as i32)
        .bind(breakdown_json(result))
        .bind(&result.match_reasons)
        .bind(&result.missing_skills)
        .execute(pool)
        .await;

        match upsert {
            Ok(_) => saved += 1,
            Err(e) => {
                warn!(
                    "Failed to save match for job {}, skipping: {e}",
                    result.job_id
                );
                continue;
            }
        }

        // Denormalized copy for list rendering; non-fatal on failure.
        if let Err(e) = sqlx::query(
            r#"
            UPDATE job_descriptions
            SET match_score = $1,
                matched_resume_id = $2,
                last_matched_at = now(),
                updated_at = now()
            WHERE id = $3
            "#,
        )
        .bind(result.match_score as i32)
        .bind(resume_id)
        .bind(result.job_id)
        .execute(pool)
        .await
        {
            warn!(
                "Failed to update denormalized score on job {}: {e}",
                result.job_id
            );
        }
    }

    // Diagnostic only; no effect on control flow.
    match sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM job_matches WHERE user_id = $1 AND resume_id = $2",
    )
    .bind(user_id)
    .bind(resume_id)
    .fetch_one(pool)
    .await
    {
        Ok(total) => debug!("User {user_id} now has {total} match rows for resume {resume_id}"),
        Err(e) => debug!("Match row verification count failed: {e}"),
    }

    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::models::ScoreBreakdown;

    #[test]
    fn test_breakdown_json_uses_contract_keys() {
        let result = MatchResult {
            job_id: Uuid::new_v4(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            match_score: 81,
            match_reasons: vec![],
            missing_skills: vec![],
            breakdown: ScoreBreakdown {
                skills_score: 53,
                experience_score: 100,
                education_score: 100,
                location_score: 100,
            },
        };

        let value = breakdown_json(&result);
        assert_eq!(value["skillsScore"], 53);
        assert_eq!(value["experienceScore"], 100);
        assert_eq!(value["educationScore"], 100);
        assert_eq!(value["locationScore"], 100);
    }
}
