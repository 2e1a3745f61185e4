//! Scheduler (C3): reconciles two logical job classes per user — a crawl
//! job and a draft job — against stored preferences, on a fixed
//! reconciliation period (§4.3), and runs the background loop that
//! dispatches each job when it comes due.

use crate::config::{EmailConfig, SmtpConfig};
use crate::crawl;
use crate::draft;
use crate::email::Mailer;
use crate::error::SchedulerError;
use crate::llm::gateway::LlmGateway;
use crate::storage::{schedules, users, DbPool};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Timelike, Utc, Weekday};
use std::time::Duration;

const SCHEDULED_DRAFT_TOPIC_COUNT: usize = 5;
const SCHEDULED_DRAFT_DAYS_BACK: i64 = 14;

/// The two job classes a user can have installed (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    Crawl,
    Draft,
}

/// A reconciled job: what to run, and when it next fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub user_id: String,
    pub kind: JobKind,
    pub next_fire_at: DateTime<Utc>,
}

/// Parse `draft_schedule_time` (`"HH:MM"`) into `(hour, minute)`, defaulting
/// to 08:00 on any malformed or missing value.
fn parse_schedule_time(preferences: &serde_json::Value) -> (u32, u32) {
    let raw = preferences.get("draft_schedule_time").and_then(|v| v.as_str()).unwrap_or("08:00");
    let mut parts = raw.splitn(2, ':');
    let hour = parts.next().and_then(|h| h.parse::<u32>().ok()).filter(|h| *h < 24);
    let minute = parts.next().and_then(|m| m.parse::<u32>().ok()).filter(|m| *m < 60);
    match (hour, minute) {
        (Some(h), Some(m)) => (h, m),
        _ => (8, 0),
    }
}

/// Compute the next draft-job fire time strictly after `now`, per
/// `newsletter_frequency` (`daily` fires every day; `weekly` fires every
/// Monday; anything else, including `custom`, is left to an external
/// caller and never auto-scheduled here).
fn next_draft_fire(now: DateTime<Utc>, preferences: &serde_json::Value) -> Option<DateTime<Utc>> {
    let frequency = preferences.get("newsletter_frequency").and_then(|v| v.as_str()).unwrap_or("daily");
    let (hour, minute) = parse_schedule_time(preferences);

    let today_at = |date: chrono::NaiveDate| Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0).expect("valid hms"));

    match frequency {
        "daily" => {
            let candidate = today_at(now.date_naive());
            Some(if candidate > now { candidate } else { today_at(now.date_naive() + ChronoDuration::days(1)) })
        }
        "weekly" => {
            let days_until_monday = (7 - now.weekday().num_days_from_monday()) % 7;
            let mut candidate_date = now.date_naive() + ChronoDuration::days(days_until_monday as i64);
            let mut candidate = today_at(candidate_date);
            if candidate <= now {
                candidate_date += ChronoDuration::days(7);
                candidate = today_at(candidate_date);
            }
            debug_assert_eq!(candidate.weekday(), Weekday::Mon);
            Some(candidate)
        }
        _ => None,
    }
}

/// Reconcile one user's crawl and draft jobs against their current
/// preferences and schedule row. Idempotent: unchanged inputs produce the
/// same `next_fire_at` on repeated calls (§4.3 "Reconciliation").
pub async fn reconcile_user(pool: &DbPool, user_id: &str) -> Result<Vec<ScheduledJob>, SchedulerError> {
    let now = Utc::now();
    let mut jobs = Vec::new();

    let preferences = users::get_preferences(pool, user_id)
        .await?
        .unwrap_or(serde_json::json!({}));

    if let Some(next_fire_at) = next_draft_fire(now, &preferences) {
        jobs.push(ScheduledJob { user_id: user_id.to_string(), kind: JobKind::Draft, next_fire_at });
    }

    if let Some(schedule) = schedules::get_schedule(pool, user_id).await? {
        let next_fire_at = schedule
            .next_scheduled_crawl_at
            .as_deref()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .unwrap_or(now);
        jobs.push(ScheduledJob { user_id: user_id.to_string(), kind: JobKind::Crawl, next_fire_at });
    }

    Ok(jobs)
}

/// Reconcile every user with a schedule row. A single user's failure to
/// resolve preferences does not block reconciliation for the rest.
pub async fn reconcile_all(pool: &DbPool) -> Result<Vec<ScheduledJob>, SchedulerError> {
    let mut all_jobs = Vec::new();
    let user_ids = users::all_user_ids(pool).await?;
    for user_id in user_ids {
        match reconcile_user(pool, &user_id).await {
            Ok(mut jobs) => all_jobs.append(&mut jobs),
            Err(err) => tracing::warn!(user_id = %user_id, error = %err, "reconciliation failed for user"),
        }
    }
    Ok(all_jobs)
}

/// Run a single reconciliation tick: compute every user's due jobs and
/// dispatch the ones whose `next_fire_at` has arrived. A job dispatch
/// failure is logged and never aborts the rest of the tick (§4.3).
async fn tick(
    pool: &DbPool,
    gateway: &LlmGateway,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
) -> Result<(), SchedulerError> {
    let jobs = reconcile_all(pool).await?;
    let now = Utc::now();

    for job in jobs {
        if job.next_fire_at > now {
            continue;
        }

        match job.kind {
            JobKind::Crawl => {
                if let Err(err) = crawl::crawl_user(pool, &job.user_id).await {
                    tracing::error!(user_id = %job.user_id, error = %err, "scheduled crawl failed");
                }
            }
            JobKind::Draft => {
                let result = draft::generate_draft(
                    pool,
                    gateway,
                    mailer,
                    smtp,
                    email_config,
                    &job.user_id,
                    SCHEDULED_DRAFT_TOPIC_COUNT,
                    SCHEDULED_DRAFT_DAYS_BACK,
                )
                .await;
                if let Err(err) = result {
                    tracing::error!(user_id = %job.user_id, error = %err, "scheduled draft generation failed");
                }
            }
        }
    }

    Ok(())
}

/// Runs the reconciliation loop forever: every `period_seconds`, reconcile
/// every user's jobs and dispatch whichever are due (§4.3 "runs
/// autonomously every fixed period"). Intended to be spawned as a
/// background task from the server or a dedicated CLI subcommand.
pub async fn run_reconciliation_loop(
    pool: &DbPool,
    gateway: &LlmGateway,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    period_seconds: u64,
) -> ! {
    loop {
        if let Err(err) = tick(pool, gateway, mailer, smtp, email_config).await {
            tracing::error!(error = %err, "reconciliation tick failed");
        }
        tokio::time::sleep(Duration::from_secs(period_seconds)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_draft_job_fires_tomorrow_if_time_passed_today() {
        let now = "2026-07-27T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let prefs = serde_json::json!({"newsletter_frequency": "daily", "draft_schedule_time": "08:00"});
        let next = next_draft_fire(now, &prefs).expect("next fire");
        assert_eq!(next.day(), 28);
        assert_eq!(next.hour(), 8);
    }

    #[test]
    fn daily_draft_job_fires_later_today_if_time_not_yet_passed() {
        let now = "2026-07-27T05:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let prefs = serde_json::json!({"newsletter_frequency": "daily", "draft_schedule_time": "08:00"});
        let next = next_draft_fire(now, &prefs).expect("next fire");
        assert_eq!(next.day(), 27);
        assert_eq!(next.hour(), 8);
    }

    #[test]
    fn weekly_draft_job_fires_on_monday() {
        // 2026-07-27 is a Monday.
        let now = "2026-07-27T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let prefs = serde_json::json!({"newsletter_frequency": "weekly", "draft_schedule_time": "08:00"});
        let next = next_draft_fire(now, &prefs).expect("next fire");
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next.day(), 3); // next Monday, August 3rd 2026
    }

    #[test]
    fn custom_frequency_is_not_auto_scheduled() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap();
        let prefs = serde_json::json!({"newsletter_frequency": "custom"});
        assert!(next_draft_fire(now, &prefs).is_none());
    }

    #[tokio::test]
    async fn tick_dispatches_a_due_crawl_job_and_clears_its_mutex() {
        use crate::config::LlmRateLimitConfig;
        use crate::email::Mailer as MailerTrait;
        use crate::error::{EmailError, LlmError};
        use crate::llm::{GenerationParams, LlmProvider, LlmResponse};
        use crate::storage::{init_test_db, users::create_user};
        use async_trait::async_trait;

        struct UnusedProvider;

        #[async_trait]
        impl LlmProvider for UnusedProvider {
            fn name(&self) -> &str {
                "unused"
            }
            async fn complete(&self, _: &str, _: &str, _: &GenerationParams) -> Result<LlmResponse, LlmError> {
                panic!("a crawl-only job must never call the LLM provider");
            }
            async fn health_check(&self) -> Result<(), LlmError> {
                Ok(())
            }
        }

        struct UnusedMailer;

        #[async_trait]
        impl MailerTrait for UnusedMailer {
            async fn send(&self, _: lettre::Message) -> Result<(), EmailError> {
                panic!("a crawl-only job must never send an email");
            }
        }

        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({"newsletter_frequency": "custom"}), 24)
            .await
            .expect("create user");

        let gateway = LlmGateway::new(Box::new(UnusedProvider), pool.clone(), LlmRateLimitConfig { minute: 30, day: 500 });
        let smtp = SmtpConfig::default();
        let email_config = EmailConfig {
            daily_cap_standard: 1,
            daily_cap_workspace: 1,
            tracking_base_url: "https://example.com".to_string(),
        };
        tick(&pool, &gateway, &UnusedMailer, &smtp, &email_config).await.expect("tick succeeds");

        let schedule = schedules::get_schedule(&pool, "u1").await.expect("get schedule").expect("schedule exists");
        assert!(!schedule.is_crawling, "the batch mutex must be released after the dispatched crawl completes");
        assert!(schedule.last_batch_crawl_at.is_some());
    }

    #[tokio::test]
    async fn reconcile_user_is_idempotent_for_unchanged_preferences() {
        use crate::storage::{init_test_db, users::create_user};

        let pool = init_test_db().await.expect("init db");
        create_user(
            &pool,
            "u1",
            "u1@example.com",
            &serde_json::json!({"newsletter_frequency": "daily", "draft_schedule_time": "08:00"}),
            24,
        )
        .await
        .expect("create user");

        let first = reconcile_user(&pool, "u1").await.expect("first reconcile");
        let second = reconcile_user(&pool, "u1").await.expect("second reconcile");
        assert_eq!(first, second);
    }
}
