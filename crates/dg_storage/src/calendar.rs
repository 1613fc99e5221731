use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use dg_core::{CalendarNotifier, Error, Result};
use crate::oauth::GoogleAuth;

pub const CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const EVENT_MINUTES: i64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedEvent {
    id: String,
    html_link: Option<String>,
}

pub fn drive_view_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", file_id)
}

/// The `events.insert` body: a 30 minute slot starting when the report was generated.
pub fn event_body(report_name: &str, generated_at: DateTime<Local>, drive_file_id: Option<&str>) -> Value {
    let mut description = format!(
        "Research digest report '{}' has been generated and is ready for review.",
        report_name
    );
    if let Some(id) = drive_file_id {
        description.push_str(&format!("\n\nOpen in Drive: {}", drive_view_link(id)));
    }
    let end = generated_at + Duration::minutes(EVENT_MINUTES);

    json!({
        "summary": format!("📄 Report Completed: {}", report_name),
        "description": description,
        "start": { "dateTime": generated_at.to_rfc3339() },
        "end": { "dateTime": end.to_rfc3339() },
    })
}

#[derive(Debug)]
pub struct GoogleCalendar {
    auth: Arc<GoogleAuth>,
    calendar_id: String,
    base_url: String,
}

impl GoogleCalendar {
    pub fn new(auth: Arc<GoogleAuth>, calendar_id: Option<String>) -> Self {
        Self {
            auth,
            calendar_id: calendar_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| "primary".to_string()),
            base_url: CALENDAR_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn events_url(&self) -> String {
        let calendar: String = url::form_urlencoded::byte_serialize(self.calendar_id.as_bytes()).collect();
        format!("{}/calendars/{}/events", self.base_url.trim_end_matches('/'), calendar)
    }
}

#[async_trait]
impl CalendarNotifier for GoogleCalendar {
    fn name(&self) -> &str {
        "Google Calendar"
    }

    async fn create_report_event(
        &self,
        report_name: &str,
        generated_at: DateTime<Local>,
        drive_file_id: Option<&str>,
    ) -> Result<String> {
        let token = self.auth.access_token().await?;
        let response = self
            .auth
            .client()
            .post(self.events_url())
            .bearer_auth(token)
            .json(&event_body(report_name, generated_at, drive_file_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Calendar(format!("events.insert returned {}: {:.200}", status, detail)));
        }

        let event = response.json::<CreatedEvent>().await?;
        info!("✅ Calendar event created. Event ID: {}", event.id);
        if let Some(link) = &event.html_link {
            info!("   📅 View event: {}", link);
        }
        Ok(event.id)
    }
}
