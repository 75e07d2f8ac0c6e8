//! Assignment notice delivery over HTTP.
//!
//! The primary path is a transactional mail API; when that fails and a
//! form endpoint is configured, the notice is submitted there instead.

use async_trait::async_trait;
use huddle_core::config::EmailSettings;
use huddle_core::error::{HuddleError, Result};
use huddle_core::notification::AssignmentMailer;
use huddle_core::task::TaskAssignment;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
}

pub struct HttpAssignmentMailer {
    http: Client,
    settings: EmailSettings,
}

impl HttpAssignmentMailer {
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled && !self.settings.api_url.is_empty()
    }

    async fn send_primary(&self, assignment: &TaskAssignment) -> Result<()> {
        let request = MailRequest {
            from: &self.settings.from,
            to: vec![assignment.assignee_email.as_str()],
            subject: subject(assignment),
            text: body(assignment),
        };
        let response = self
            .http
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| HuddleError::data_access(format!("Mail API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(HuddleError::Http {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn send_fallback(&self, url: &str, assignment: &TaskAssignment) -> Result<()> {
        let subject = subject(assignment);
        let message = body(assignment);
        let fields = [
            ("email", assignment.assignee_email.as_str()),
            ("name", assignment.assignee_name.as_str()),
            ("_subject", subject.as_str()),
            ("message", message.as_str()),
        ];
        let response = self
            .http
            .post(url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| HuddleError::data_access(format!("Form submission failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(HuddleError::Http {
                status: response.status().as_u16(),
                message: "Form submission rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AssignmentMailer for HttpAssignmentMailer {
    async fn send_assignment(&self, assignment: &TaskAssignment) -> Result<()> {
        if !self.is_enabled() {
            tracing::debug!("[HttpAssignmentMailer] Email disabled, skipping notice");
            return Ok(());
        }

        let primary = match self.send_primary(assignment).await {
            Ok(()) => {
                tracing::info!(
                    "[HttpAssignmentMailer] Sent assignment notice for task {}",
                    assignment.task_id
                );
                return Ok(());
            }
            Err(e) => e,
        };

        let Some(url) = self.settings.fallback_form_url.as_deref() else {
            return Err(primary);
        };

        tracing::warn!(
            "[HttpAssignmentMailer] Primary delivery failed ({}), using form fallback",
            primary
        );
        self.send_fallback(url, assignment)
            .await
            .map_err(|fallback| HuddleError::Multiple(vec![primary, fallback]))
    }
}

fn subject(assignment: &TaskAssignment) -> String {
    format!("You have been assigned: {}", assignment.task_title)
}

fn body(assignment: &TaskAssignment) -> String {
    let mut text = format!(
        "Hi {},\n\n{} assigned you the task \"{}\".",
        assignment.assignee_name, assignment.assigned_by, assignment.task_title
    );
    if let Some(due) = assignment.due_date {
        text.push_str(&format!("\nDue date: {}", due.format("%Y-%m-%d")));
    }
    text
}
