//! The enrichment pipeline.

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use courier_broker::{BrokerGateway, EnrichedNotification};
use courier_cache::{CacheGateway, StatusSnapshot};
use courier_clients::{Template, TemplateClient, UserPreferences, UserPreferencesClient};
use courier_core::{Channel, ErrorCode, EventType, NotificationStatus, Priority};
use courier_db::models::notification::{NewNotification, Notification};
use courier_db::repositories::{NotificationEventRepo, NotificationRepo};
use courier_db::DbPool;

/// Default end-to-end deadline for one enrichment attempt.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Default retry budget for new notifications.
const DEFAULT_MAX_RETRIES: i32 = 3;

/// An accepted request, as handed off by the HTTP boundary.
#[derive(Debug, Clone)]
pub struct EnrichmentRequest {
    pub user_id: String,
    pub template_code: String,
    pub channel: Channel,
    pub priority: Priority,
    pub variables: serde_json::Value,
    pub metadata: serde_json::Value,
    pub correlation_id: String,
    pub idempotency_key: String,
}

/// Everything the pipeline needs about one notification, borrowed from
/// either a fresh request or a reloaded row.
struct PipelineInput<'a> {
    id: Uuid,
    correlation_id: &'a str,
    idempotency_key: &'a str,
    user_id: &'a str,
    template_code: &'a str,
    channel: Channel,
    priority: Priority,
    variables: &'a serde_json::Value,
    metadata: &'a serde_json::Value,
}

/// Coordinates enrichment and publishing for accepted notifications.
///
/// All methods swallow their own failures: a pipeline error ends in a
/// `failed` row, a `failed` event, and a cache snapshot -- never in a panic
/// or an error escaping the detached task.
pub struct Orchestrator {
    pool: DbPool,
    cache: CacheGateway,
    broker: BrokerGateway,
    user_client: UserPreferencesClient,
    template_client: TemplateClient,
    deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        pool: DbPool,
        cache: CacheGateway,
        broker: BrokerGateway,
        user_client: UserPreferencesClient,
        template_client: TemplateClient,
    ) -> Self {
        Self {
            pool,
            cache,
            broker,
            user_client,
            template_client,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Override the end-to-end deadline (used by tests and config).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Entry point for a newly accepted request. Runs on a detached task.
    ///
    /// Persists the row, appends the `created` event, moves to `enriching`,
    /// and runs the fetch/publish pipeline under the deadline.
    pub async fn enrich_and_publish(&self, request: EnrichmentRequest) {
        tracing::info!(
            correlation_id = %request.correlation_id,
            channel = %request.channel,
            "Starting enrichment"
        );

        let id = Uuid::new_v4();
        let row = NewNotification {
            id,
            user_id: request.user_id.clone(),
            template_code: request.template_code.clone(),
            correlation_id: request.correlation_id.clone(),
            idempotency_key: request.idempotency_key.clone(),
            channel: request.channel,
            priority: request.priority,
            variables: request.variables.clone(),
            metadata: request.metadata.clone(),
            max_retries: DEFAULT_MAX_RETRIES,
        };

        if let Err(e) = NotificationRepo::create(&self.pool, &row).await {
            if courier_db::is_unique_violation(&e) {
                // Lost the idempotency race: another task owns this key and
                // will (or already did) publish. Nothing more to do here.
                let existing =
                    NotificationRepo::get_by_idempotency_key(&self.pool, &request.idempotency_key)
                        .await;
                match existing {
                    Ok(Some(winner)) => tracing::info!(
                        idempotency_key = %request.idempotency_key,
                        winner_id = %winner.id,
                        "Duplicate notification suppressed"
                    ),
                    _ => tracing::warn!(
                        idempotency_key = %request.idempotency_key,
                        "Duplicate insert but winner row not found"
                    ),
                }
                return;
            }

            tracing::error!(error = %e, correlation_id = %request.correlation_id,
                "Failed to create notification row");
            self.snapshot(&request.correlation_id, "failed", Some(e.to_string()))
                .await;
            return;
        }

        self.record_event(
            id,
            &request.correlation_id,
            EventType::Created,
            Some(request.channel),
            serde_json::json!({
                "channel": request.channel.as_str(),
                "priority": request.priority.as_str(),
            }),
        )
        .await;

        if let Err(e) =
            NotificationRepo::update_status(&self.pool, id, NotificationStatus::Enriching).await
        {
            tracing::error!(error = %e, notification_id = %id, "Failed to move row to enriching");
            return;
        }

        let input = PipelineInput {
            id,
            correlation_id: &request.correlation_id,
            idempotency_key: &request.idempotency_key,
            user_id: &request.user_id,
            template_code: &request.template_code,
            channel: request.channel,
            priority: request.priority,
            variables: &request.variables,
            metadata: &request.metadata,
        };
        self.run_with_deadline(input).await;
    }

    /// Re-run enrichment for an existing row (recovery and retry sweepers).
    ///
    /// The `-> enriching` transition doubles as the claim: if another task
    /// already moved the row, the guarded update matches zero rows and the
    /// attempt is skipped.
    pub async fn reenrich(&self, notif: &Notification) {
        let (channel, priority) = match (notif.parsed_channel(), notif.parsed_priority()) {
            (Ok(channel), Ok(priority)) => (channel, priority),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(notification_id = %notif.id, error = %e,
                    "Row has an unparseable channel or priority, skipping");
                return;
            }
        };

        match NotificationRepo::update_status(&self.pool, notif.id, NotificationStatus::Enriching)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(notification_id = %notif.id,
                    "Row no longer eligible for re-enrichment");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, notification_id = %notif.id,
                    "Failed to claim row for re-enrichment");
                return;
            }
        }

        let input = PipelineInput {
            id: notif.id,
            correlation_id: &notif.correlation_id,
            idempotency_key: &notif.idempotency_key,
            user_id: &notif.user_id,
            template_code: &notif.template_code,
            channel,
            priority,
            variables: &notif.variables,
            metadata: &notif.metadata,
        };
        self.run_with_deadline(input).await;
    }

    /// Run the pipeline under the end-to-end deadline. Expiry aborts both
    /// outstanding remote calls and records a `TIMEOUT` failure.
    async fn run_with_deadline(&self, input: PipelineInput<'_>) {
        let id = input.id;
        let correlation_id = input.correlation_id.to_string();
        let channel = input.channel;

        if tokio::time::timeout(self.deadline, self.run_pipeline(input))
            .await
            .is_err()
        {
            self.fail(
                id,
                &correlation_id,
                channel,
                ErrorCode::Timeout,
                "orchestration deadline exceeded",
                "deadline",
            )
            .await;
        }
    }

    /// Fetch, validate, persist, publish.
    async fn run_pipeline(&self, input: PipelineInput<'_>) {
        // Both fetches run concurrently; the join waits for both so a fast
        // failure never strands the other request.
        let (user_result, template_result) = tokio::join!(
            self.user_client.fetch_preferences(input.user_id),
            self.template_client.fetch_by_id(input.template_code),
        );

        let preferences = match user_result {
            Err(e) => {
                let code = if e.is_decode() {
                    ErrorCode::Parse
                } else {
                    ErrorCode::UserFetch
                };
                self.fail(input.id, input.correlation_id, input.channel, code, &e.to_string(), "user_fetch")
                    .await;
                return;
            }
            Ok(envelope) if !envelope.success => {
                let message = envelope.error_text();
                self.fail(
                    input.id,
                    input.correlation_id,
                    input.channel,
                    ErrorCode::UserFetch,
                    &message,
                    "user_fetch",
                )
                .await;
                return;
            }
            Ok(envelope) => match envelope.data {
                Some(data) => data,
                None => {
                    self.fail(
                        input.id,
                        input.correlation_id,
                        input.channel,
                        ErrorCode::Parse,
                        "user service envelope carried no data",
                        "user_parse",
                    )
                    .await;
                    return;
                }
            },
        };

        let template = match template_result {
            Err(e) => {
                let code = if e.is_decode() {
                    ErrorCode::Parse
                } else {
                    ErrorCode::TemplateFetch
                };
                self.fail(
                    input.id,
                    input.correlation_id,
                    input.channel,
                    code,
                    &e.to_string(),
                    "template_fetch",
                )
                .await;
                return;
            }
            Ok(envelope) if !envelope.success => {
                let message = envelope.error_text();
                self.fail(
                    input.id,
                    input.correlation_id,
                    input.channel,
                    ErrorCode::TemplateFetch,
                    &message,
                    "template_fetch",
                )
                .await;
                return;
            }
            Ok(envelope) => match envelope.data {
                Some(data) => data,
                None => {
                    self.fail(
                        input.id,
                        input.correlation_id,
                        input.channel,
                        ErrorCode::Parse,
                        "template service envelope carried no data",
                        "template_parse",
                    )
                    .await;
                    return;
                }
            },
        };

        if let Err((code, message)) = validate_enrichment(input.channel, &preferences, &template) {
            self.fail(
                input.id,
                input.correlation_id,
                input.channel,
                code,
                &message,
                "enrichment_check",
            )
            .await;
            return;
        }

        let payload = serde_json::json!({
            "user_preferences": &preferences,
            "template": &template,
            "variables": input.variables,
        });
        match NotificationRepo::update_enriched_payload(&self.pool, input.id, &payload).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(notification_id = %input.id,
                    "Row vanished before the enriched payload could be written");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, notification_id = %input.id,
                    "Failed to persist enriched payload");
                return;
            }
        }

        self.record_event(
            input.id,
            input.correlation_id,
            EventType::Enriched,
            Some(input.channel),
            serde_json::json!({}),
        )
        .await;

        let message = EnrichedNotification {
            notification_id: input.id,
            correlation_id: input.correlation_id.to_string(),
            idempotency_key: input.idempotency_key.to_string(),
            user_id: input.user_id.to_string(),
            template_code: input.template_code.to_string(),
            channel: input.channel,
            priority: input.priority,
            user_preferences: preferences,
            template,
            variables: input.variables.clone(),
            metadata: input.metadata.clone(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.broker.publish(&message).await {
            self.fail(
                input.id,
                input.correlation_id,
                input.channel,
                ErrorCode::Queue,
                &e.to_string(),
                "queue_publish",
            )
            .await;
            return;
        }

        match NotificationRepo::update_status(&self.pool, input.id, NotificationStatus::Queued)
            .await
        {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                tracing::error!(notification_id = %input.id,
                    "Published but failed to record queued status");
                return;
            }
        }

        self.record_event(
            input.id,
            input.correlation_id,
            EventType::Queued,
            Some(input.channel),
            serde_json::json!({}),
        )
        .await;

        self.snapshot(input.correlation_id, "queued", None).await;

        tracing::info!(
            notification_id = %input.id,
            correlation_id = %input.correlation_id,
            "Notification enriched and published"
        );
    }

    /// Record a terminal failure for this attempt: row, event, snapshot.
    async fn fail(
        &self,
        id: Uuid,
        correlation_id: &str,
        channel: Channel,
        code: ErrorCode,
        message: &str,
        stage: &str,
    ) {
        tracing::error!(
            notification_id = %id,
            correlation_id = %correlation_id,
            code = %code,
            stage,
            error = %message,
            "Enrichment failed"
        );

        if let Err(e) = NotificationRepo::update_failure(&self.pool, id, code, message).await {
            tracing::error!(error = %e, notification_id = %id, "Failed to record failure");
        }

        self.record_event(
            id,
            correlation_id,
            EventType::Failed,
            Some(channel),
            serde_json::json!({"error": message, "stage": stage}),
        )
        .await;

        self.snapshot(correlation_id, "failed", Some(message.to_string()))
            .await;
    }

    /// Append an audit event; event failures are logged, never fatal.
    async fn record_event(
        &self,
        id: Uuid,
        correlation_id: &str,
        event_type: EventType,
        channel: Option<Channel>,
        data: serde_json::Value,
    ) {
        if let Err(e) = NotificationEventRepo::create_simple(
            &self.pool,
            id,
            correlation_id,
            event_type,
            channel,
            data,
        )
        .await
        {
            tracing::error!(error = %e, notification_id = %id, event_type = %event_type,
                "Failed to append event");
        }
    }

    /// Overwrite the cached status snapshot; cache failures are logged but
    /// never change the notification's recorded state.
    async fn snapshot(&self, correlation_id: &str, status: &str, error: Option<String>) {
        let snapshot = StatusSnapshot {
            status: status.to_string(),
            error,
            updated_at: Utc::now().timestamp(),
        };
        if let Err(e) = self.cache.put_status_snapshot(correlation_id, &snapshot).await {
            tracing::warn!(error = %e, correlation_id = %correlation_id,
                "Failed to store status snapshot");
        }
    }
}

/// Gate the enrichment result: the user must allow the channel, and the
/// template must be active, advertise the channel, and carry a version.
fn validate_enrichment(
    channel: Channel,
    preferences: &UserPreferences,
    template: &Template,
) -> Result<(), (ErrorCode, String)> {
    if !preferences.allows(channel) {
        return Err((
            ErrorCode::UserFetch,
            format!("user has opted out of {channel} notifications"),
        ));
    }
    if !template.is_active {
        return Err((
            ErrorCode::TemplateFetch,
            format!("template {} is inactive", template.id),
        ));
    }
    if !template.supports_channel(channel) {
        return Err((
            ErrorCode::TemplateFetch,
            format!("template {} has no {channel} rendering", template.id),
        ));
    }
    if template.latest_version().is_none() {
        return Err((
            ErrorCode::TemplateFetch,
            format!("template {} has no versions", template.id),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_clients::TemplateVersion;

    fn preferences(email: bool, push: bool) -> UserPreferences {
        UserPreferences {
            email_opt_in: email,
            push_opt_in: push,
            daily_limit: 100,
            language: "en".to_string(),
        }
    }

    fn template(channels: &[&str], active: bool, versions: usize) -> Template {
        Template {
            id: "t-1".to_string(),
            name: "welcome".to_string(),
            event: "user.signup".to_string(),
            channel: channels.iter().map(|c| c.to_string()).collect(),
            language: "en".to_string(),
            is_active: active,
            versions: (1..=versions as i32)
                .map(|version| TemplateVersion {
                    version,
                    subject: "Hi".to_string(),
                    title: "Hi".to_string(),
                    body: "Hello {{name}}".to_string(),
                    variables: serde_json::json!({}),
                })
                .collect(),
        }
    }

    #[test]
    fn valid_enrichment_passes() {
        let result = validate_enrichment(
            Channel::Email,
            &preferences(true, false),
            &template(&["email", "push"], true, 2),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn opted_out_user_is_a_user_fetch_error() {
        let (code, message) = validate_enrichment(
            Channel::Email,
            &preferences(false, true),
            &template(&["email"], true, 1),
        )
        .unwrap_err();
        assert_eq!(code, ErrorCode::UserFetch);
        assert!(message.contains("opted out"));
    }

    #[test]
    fn inactive_template_is_a_template_fetch_error() {
        let (code, _) = validate_enrichment(
            Channel::Email,
            &preferences(true, true),
            &template(&["email"], false, 1),
        )
        .unwrap_err();
        assert_eq!(code, ErrorCode::TemplateFetch);
    }

    #[test]
    fn missing_channel_rendering_is_rejected() {
        let (code, message) = validate_enrichment(
            Channel::Push,
            &preferences(true, true),
            &template(&["email"], true, 1),
        )
        .unwrap_err();
        assert_eq!(code, ErrorCode::TemplateFetch);
        assert!(message.contains("push"));
    }

    #[test]
    fn versionless_template_is_rejected() {
        let (code, _) = validate_enrichment(
            Channel::Email,
            &preferences(true, true),
            &template(&["email"], true, 0),
        )
        .unwrap_err();
        assert_eq!(code, ErrorCode::TemplateFetch);
    }
}
