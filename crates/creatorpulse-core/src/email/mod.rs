//! Email Delivery (C11) and Draft-Ready Notification (C12): SMTP sending
//! with per-recipient retry, daily caps, unsubscribe suppression, and
//! optional open/click tracking (§4.11).

use crate::config::{EmailConfig, SmtpConfig};
use crate::error::EmailError;
use crate::preferences;
use crate::storage::drafts::Draft;
use crate::storage::{email_delivery, email_rate_limits, recipients, unsubscribes, DbPool};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use lettre::message::{header::ContentType, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use regex::Regex;
use std::time::Duration;
use tokio::time::sleep;

/// Outcome of sending (or attempting to send) to one recipient.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecipientOutcome {
    pub recipient_id: String,
    pub status: String,
    pub error: Option<String>,
}

/// Summary of a newsletter send run (§4.11 "Return per-recipient outcomes").
#[derive(Debug, Clone, serde::Serialize)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
    pub queued: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

/// Abstraction over "deliver one message", so the retry/cap/tracking logic
/// can be tested without a real SMTP relay — the same seam `LlmProvider`
/// gives the LLM gateway.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), EmailError>;
}

/// Production mailer backed by `lettre`'s async SMTP transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| EmailError::Transport { message: e.to_string() })?
            .port(config.port);

        if let Some(password) = &config.password {
            builder = builder.credentials(Credentials::new(config.username.clone(), password.clone()));
        }

        Ok(Self { transport: builder.build() })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), EmailError> {
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| EmailError::Transport { message: e.to_string() })
    }
}

const RETRY_BACKOFF: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

/// Send a draft's newsletter to every active, non-unsubscribed recipient of
/// `user_id`, respecting the user's daily send cap (§4.11 steps 1-4).
pub async fn send_newsletter(
    pool: &DbPool,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    draft_id: &str,
    draft: &Draft,
    user_id: &str,
    daily_cap: i64,
) -> Result<SendReport, EmailError> {
    send_newsletter_with_backoff(pool, mailer, smtp, email_config, draft_id, draft, user_id, daily_cap, &RETRY_BACKOFF).await
}

async fn send_newsletter_with_backoff(
    pool: &DbPool,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    draft_id: &str,
    draft: &Draft,
    user_id: &str,
    daily_cap: i64,
    backoff: &[Duration],
) -> Result<SendReport, EmailError> {
    let preferences = preferences::resolve(pool, user_id).await?;
    let email_prefs = preferences.get("email_preferences").cloned().unwrap_or_default();
    let track_opens = email_prefs.get("track_opens").and_then(|v| v.as_bool()).unwrap_or(true);
    let track_clicks = email_prefs.get("track_clicks").and_then(|v| v.as_bool()).unwrap_or(true);
    let subject_template = email_prefs
        .get("default_subject_template")
        .and_then(|v| v.as_str())
        .unwrap_or("{title} - Newsletter")
        .to_string();
    let subject = subject_template.replace("{title}", &draft.title);

    let all_recipients = recipients::list_for_user(pool, user_id).await?;
    let mut surviving = Vec::with_capacity(all_recipients.len());
    for recipient in all_recipients {
        if !unsubscribes::is_unsubscribed(pool, user_id, &recipient.email).await? {
            surviving.push(recipient);
        }
    }

    let mut outcomes = Vec::with_capacity(surviving.len());
    let mut sent = 0usize;
    let mut failed = 0usize;
    let mut cap_reached = false;

    for recipient in surviving {
        if cap_reached {
            outcomes.push(RecipientOutcome { recipient_id: recipient.id, status: "queued".to_string(), error: None });
            continue;
        }

        if email_rate_limits::current_count(pool, user_id, daily_cap).await? >= daily_cap {
            cap_reached = true;
            outcomes.push(RecipientOutcome { recipient_id: recipient.id, status: "queued".to_string(), error: None });
            continue;
        }

        let (html, plain) = render_body(draft, email_config, draft_id, &recipient.unsubscribe_token, track_opens, track_clicks);

        let message = match Message::builder()
            .from(smtp.from_address.parse().map_err(|e: lettre::address::AddressError| EmailError::Transport { message: e.to_string() })?)
            .to(recipient.email.parse().map_err(|e: lettre::address::AddressError| EmailError::Transport { message: e.to_string() })?)
            .subject(&subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(plain))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
            ) {
            Ok(message) => message,
            Err(e) => {
                outcomes.push(RecipientOutcome { recipient_id: recipient.id, status: "failed".to_string(), error: Some(e.to_string()) });
                failed += 1;
                continue;
            }
        };

        let log_id = uuid::Uuid::new_v4().to_string();
        email_delivery::enqueue(pool, &log_id, draft_id, user_id, &recipient.id).await?;
        email_delivery::mark_sending(pool, &log_id).await?;

        let mut last_error = String::new();
        let mut delivered = false;
        for (attempt, delay) in std::iter::once(&Duration::ZERO).chain(backoff.iter()).enumerate() {
            if attempt > 0 {
                sleep(*delay).await;
            }
            match mailer.send(message.clone()).await {
                Ok(()) => {
                    delivered = true;
                    break;
                }
                Err(err) => {
                    last_error = err.to_string();
                    email_delivery::mark_failed_retry(pool, &log_id, &last_error).await?;
                }
            }
        }

        if delivered {
            email_delivery::mark_sent(pool, &log_id).await?;
            email_rate_limits::increment(pool, user_id, daily_cap).await?;
            sent += 1;
            outcomes.push(RecipientOutcome { recipient_id: recipient.id, status: "sent".to_string(), error: None });
        } else {
            failed += 1;
            outcomes.push(RecipientOutcome { recipient_id: recipient.id, status: "failed".to_string(), error: Some(last_error) });
        }
    }

    let queued = outcomes.iter().filter(|o| o.status == "queued").count();
    Ok(SendReport { sent, failed, queued, outcomes })
}

fn render_body(
    draft: &Draft,
    email_config: &EmailConfig,
    draft_id: &str,
    recipient_token: &str,
    track_opens: bool,
    track_clicks: bool,
) -> (String, String) {
    let sections = draft.sections.as_array().cloned().unwrap_or_default();

    let mut html = format!("<h1>{}</h1>\n", escape_html(&draft.title));
    let mut plain = format!("{}\n\n", draft.title);
    for section in &sections {
        let heading = section.get("heading").and_then(|v| v.as_str()).unwrap_or("");
        let content = section.get("content").and_then(|v| v.as_str()).unwrap_or("");
        html.push_str(&format!("<h2>{}</h2>\n<p>{}</p>\n", escape_html(heading), escape_html(content)));
        plain.push_str(&format!("{heading}\n{content}\n\n"));
    }

    if track_clicks {
        html = rewrite_links_for_tracking(&html, email_config, draft_id, recipient_token);
    }

    let unsubscribe_url = format!("{}/unsubscribe?token={}", email_config.tracking_base_url, recipient_token);
    html.push_str(&format!("<p><a href=\"{unsubscribe_url}\">Unsubscribe</a></p>\n"));
    plain.push_str(&format!("Unsubscribe: {unsubscribe_url}\n"));

    if track_opens {
        let pixel_url = format!("{}/track/open/{}/{}.gif", email_config.tracking_base_url, draft_id, recipient_token);
        html.push_str(&format!("<img src=\"{pixel_url}\" width=\"1\" height=\"1\" alt=\"\" />\n"));
    }

    (html, plain)
}

static LINK_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();

fn rewrite_links_for_tracking(html: &str, email_config: &EmailConfig, draft_id: &str, recipient_token: &str) -> String {
    let re = LINK_RE.get_or_init(|| Regex::new(r#"href="(https?://[^"]+)""#).expect("valid regex"));
    re.replace_all(html, |caps: &regex::Captures| {
        let target = &caps[1];
        let encoded = URL_SAFE_NO_PAD.encode(target.as_bytes());
        format!(
            r#"href="{}/track/click/{}/{}?u={}""#,
            email_config.tracking_base_url, draft_id, recipient_token, encoded
        )
    })
    .into_owned()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Draft-ready notification (C12): a fixed-template email sent to the
/// creator themselves, gated by `notification_preferences.email_on_draft_ready`.
pub async fn notify_draft_ready(
    pool: &DbPool,
    mailer: &dyn Mailer,
    smtp: &SmtpConfig,
    email_config: &EmailConfig,
    user_id: &str,
    user_email: &str,
    draft_id: &str,
) -> Result<bool, EmailError> {
    let preferences = preferences::resolve(pool, user_id).await?;
    let enabled = preferences
        .get("notification_preferences")
        .and_then(|v| v.get("email_on_draft_ready"))
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    if !enabled {
        return Ok(false);
    }

    let review_url = format!("{}/drafts/{}", email_config.tracking_base_url, draft_id);
    let body = format!("Your newsletter draft is ready to review:\n\n{review_url}");

    let message = Message::builder()
        .from(smtp.from_address.parse().map_err(|e: lettre::address::AddressError| EmailError::Transport { message: e.to_string() })?)
        .to(user_email.parse().map_err(|e: lettre::address::AddressError| EmailError::Transport { message: e.to_string() })?)
        .subject("Your newsletter draft is ready")
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| EmailError::Transport { message: e.to_string() })?;

    mailer.send(message).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{drafts::create_placeholder, init_test_db, recipients::create as create_recipient, users::create_user};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct StubMailer {
        calls: Arc<AtomicUsize>,
        fail_times: usize,
        failures_seen: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Mailer for StubMailer {
        async fn send(&self, _message: Message) -> Result<(), EmailError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut seen = self.failures_seen.lock().unwrap();
            if *seen < self.fail_times {
                *seen += 1;
                return Err(EmailError::Transport { message: "simulated failure".to_string() });
            }
            Ok(())
        }
    }

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "user".to_string(),
            password: None,
            from_address: "digest@example.com".to_string(),
        }
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            tracking_base_url: "https://track.example.com".to_string(),
            ..EmailConfig::default()
        }
    }

    async fn seeded_pool(recipient_count: usize) -> (DbPool, Draft) {
        let pool = init_test_db().await.expect("init db");
        create_user(&pool, "u1", "u1@example.com", &serde_json::json!({}), 24)
            .await
            .expect("create user");
        create_placeholder(&pool, "d1", "u1", "Weekly digest").await.expect("draft");
        crate::storage::drafts::mark_ready(
            &pool,
            "d1",
            "Weekly digest",
            &serde_json::json!([
                {"type": "intro", "heading": "Hi", "content": "Welcome back, here's a link: http://example.com/article"},
                {"type": "conclusion", "heading": "Bye", "content": "See you next week"}
            ]),
            &serde_json::json!({}),
            "2026-07-27T00:00:00Z",
        )
        .await
        .expect("mark ready");

        for i in 0..recipient_count {
            create_recipient(&pool, &format!("r{i}"), "u1", &format!("reader{i}@example.com"), None, &format!("tok{i}"))
                .await
                .expect("create recipient");
        }

        let draft = crate::storage::drafts::get_draft(&pool, "d1").await.expect("get").expect("exists");
        (pool, draft)
    }

    #[tokio::test]
    async fn sends_to_all_recipients_and_records_delivery_log() {
        let (pool, draft) = seeded_pool(3).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let mailer = StubMailer { calls: calls.clone(), fail_times: 0, failures_seen: Arc::new(Mutex::new(0)) };

        let report = send_newsletter_with_backoff(
            &pool, &mailer, &smtp_config(), &email_config(), "d1", &draft, "u1", 450, &[],
        )
        .await
        .expect("send");

        assert_eq!(report.sent, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.queued, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unsubscribed_recipient_is_never_sent_to() {
        let (pool, draft) = seeded_pool(2).await;
        unsubscribes::unsubscribe(&pool, "u1", "reader0@example.com").await.expect("unsubscribe");
        let calls = Arc::new(AtomicUsize::new(0));
        let mailer = StubMailer { calls: calls.clone(), fail_times: 0, failures_seen: Arc::new(Mutex::new(0)) };

        let report = send_newsletter_with_backoff(
            &pool, &mailer, &smtp_config(), &email_config(), "d1", &draft, "u1", 450, &[],
        )
        .await
        .expect("send");

        assert_eq!(report.sent, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn daily_cap_queues_the_remainder() {
        let (pool, draft) = seeded_pool(5).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let mailer = StubMailer { calls: calls.clone(), fail_times: 0, failures_seen: Arc::new(Mutex::new(0)) };

        let report = send_newsletter_with_backoff(
            &pool, &mailer, &smtp_config(), &email_config(), "d1", &draft, "u1", 3, &[],
        )
        .await
        .expect("send");

        assert_eq!(report.sent, 3);
        assert_eq!(report.queued, 2);

        let count = email_rate_limits::current_count(&pool, "u1", 3).await.expect("count");
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn send_retries_then_succeeds_within_backoff_budget() {
        let (pool, draft) = seeded_pool(1).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let mailer = StubMailer { calls: calls.clone(), fail_times: 2, failures_seen: Arc::new(Mutex::new(0)) };

        let report = send_newsletter_with_backoff(
            &pool, &mailer, &smtp_config(), &email_config(), "d1", &draft, "u1", 450, &[Duration::ZERO, Duration::ZERO, Duration::ZERO],
        )
        .await
        .expect("send");

        assert_eq!(report.sent, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_retries_marks_the_recipient_failed() {
        let (pool, draft) = seeded_pool(1).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let mailer = StubMailer { calls: calls.clone(), fail_times: 10, failures_seen: Arc::new(Mutex::new(0)) };

        let report = send_newsletter_with_backoff(
            &pool, &mailer, &smtp_config(), &email_config(), "d1", &draft, "u1", 450, &[Duration::ZERO, Duration::ZERO, Duration::ZERO],
        )
        .await
        .expect("send");

        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);
    }

    #[test]
    fn tracking_pixel_absent_when_opens_disabled() {
        let draft = Draft {
            id: "d1".to_string(),
            user_id: "u1".to_string(),
            title: "Weekly".to_string(),
            sections: serde_json::json!([{"type": "intro", "heading": "Hi", "content": "body"}]),
            status: "ready".to_string(),
            metadata: serde_json::json!({}),
            generated_at: None,
            published_at: None,
            email_sent: false,
            email_sent_at: None,
            created_at: "2026-07-27T00:00:00Z".to_string(),
        };
        let (html, _) = render_body(&draft, &email_config(), "d1", "tok", false, true);
        assert!(!html.contains("/track/open/"));
    }

    #[test]
    fn click_links_are_rewritten_when_tracking_enabled() {
        let draft = Draft {
            id: "d1".to_string(),
            user_id: "u1".to_string(),
            title: "Weekly".to_string(),
            sections: serde_json::json!([{"type": "intro", "heading": "Hi", "content": "Read more at http://example.com/a"}]),
            status: "ready".to_string(),
            metadata: serde_json::json!({}),
            generated_at: None,
            published_at: None,
            email_sent: false,
            email_sent_at: None,
            created_at: "2026-07-27T00:00:00Z".to_string(),
        };
        let (html, _) = render_body(&draft, &email_config(), "d1", "tok", true, true);
        assert!(html.contains("/track/click/d1/tok"));
    }
}
