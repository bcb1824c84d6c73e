//! Channel-specific message rendering.

use vigil_core::{Alert, format_rfc3339};

/// Rendered notification content.
#[derive(Debug, Clone)]
pub struct RenderedContent {
    pub subject: Option<String>,
    pub body: String,
    pub html_body: Option<String>,
}

/// Short messages are capped at the classic single-segment length.
const SMS_MAX_LEN: usize = 160;

pub fn render_email(alert: &Alert) -> RenderedContent {
    let severity = alert.severity.as_str().to_uppercase();
    let location = alert.location_name.as_deref().unwrap_or("Hawaii");

    let mut body = format!(
        "{severity} ALERT\n\n{}\n\n{}\n\nLocation: {location}\nEffective: {}\n",
        alert.title,
        alert.description,
        format_rfc3339(alert.effective_time),
    );
    if let Some(expires) = alert.expires_time {
        body.push_str(&format!("Expires: {}\n", format_rfc3339(expires)));
    }

    let html_body = format!(
        "<html><body>\
         <h1>{severity} ALERT</h1>\
         <h2>{}</h2>\
         <p>{}</p>\
         <p><strong>Location:</strong> {location}</p>\
         </body></html>",
        alert.title, alert.description
    );

    RenderedContent {
        subject: Some(format!("[{severity}] {}", alert.title)),
        body,
        html_body: Some(html_body),
    }
}

pub fn render_sms(alert: &Alert) -> RenderedContent {
    let severity = alert.severity.as_str().to_uppercase();
    let location = alert.location_name.as_deref().unwrap_or("Hawaii");

    let mut body = format!(
        "{severity}: {}\nLocation: {location}\nReply STOP to unsubscribe",
        alert.title
    );
    if body.len() > SMS_MAX_LEN {
        let mut cut = SMS_MAX_LEN - 3;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }

    RenderedContent {
        subject: None,
        body,
        html_body: None,
    }
}

pub fn render_voice(alert: &Alert) -> RenderedContent {
    let location = alert.location_name.as_deref().unwrap_or("Hawaii");
    let body = format!(
        "This is an emergency alert. {} alert: {}. Location: {location}. \
         Please check your email or app for more details.",
        alert.severity.as_str(),
        alert.title
    );

    RenderedContent {
        subject: None,
        body,
        html_body: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use vigil_core::{Category, Severity};

    fn alert() -> Alert {
        let mut alert = Alert::new(
            "t_1",
            "Flash Flood Warning",
            "Heavy rain over the valley",
            Severity::Severe,
            Category::Flood,
            datetime!(2025-06-01 00:00:00 UTC),
            "test",
        );
        alert.location_name = Some("Oahu".into());
        alert
    }

    #[test]
    fn email_subject_carries_severity() {
        let content = render_email(&alert());
        assert_eq!(
            content.subject.as_deref(),
            Some("[SEVERE] Flash Flood Warning")
        );
        assert!(content.body.contains("Location: Oahu"));
        assert!(content.html_body.is_some());
    }

    #[test]
    fn sms_is_truncated_to_segment_length() {
        let mut long = alert();
        long.title = "X".repeat(300);
        let content = render_sms(&long);
        assert_eq!(content.body.len(), SMS_MAX_LEN);
        assert!(content.body.ends_with("..."));

        let short = render_sms(&alert());
        assert!(short.body.starts_with("SEVERE: Flash Flood Warning"));
        assert!(short.body.len() <= SMS_MAX_LEN);
    }

    #[test]
    fn voice_script_reads_naturally() {
        let content = render_voice(&alert());
        assert!(content.body.contains("severe alert: Flash Flood Warning"));
        assert!(content.subject.is_none());
    }
}
