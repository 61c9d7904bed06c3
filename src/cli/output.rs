//! Output formatting for CLI commands

use crate::notification::{Recipients, SendResult};
use crate::notifier::NotifyOutcome;
use serde_json::{json, Value};

fn send_result_value(result: &SendResult) -> Value {
    match result {
        SendResult::Sent => json!({ "status": "sent" }),
        SendResult::Skipped(reason) => json!({ "status": "skipped", "reason": reason }),
        SendResult::Failed(reason) => json!({ "status": "failed", "reason": reason }),
    }
}

fn recipients_value(recipients: &Recipients) -> Value {
    match recipients {
        Recipients::Inert => Value::Null,
        Recipients::Targets(targets) => json!(targets),
    }
}

/// 事件处理结果的 JSON 表示
pub fn outcome_value(outcome: &NotifyOutcome) -> Value {
    match outcome {
        NotifyOutcome::NotConfigured => json!({ "outcome": "not_configured" }),
        NotifyOutcome::Suppressed => json!({ "outcome": "suppressed" }),
        NotifyOutcome::ChannelUnavailable(reason) => {
            json!({ "outcome": "channel_unavailable", "reason": reason })
        }
        NotifyOutcome::Delivered(deliveries) => json!({
            "outcome": "delivered",
            "deliveries": deliveries
                .iter()
                .map(|d| json!({
                    "text": d.message.text,
                    "color": d.message.color,
                    "recipients": recipients_value(&d.recipients),
                    "result": send_result_value(&d.result),
                }))
                .collect::<Vec<_>>(),
        }),
    }
}

/// Format outcome as JSON or plain text based on --json flag
pub fn format_outcome(outcome: &NotifyOutcome, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(&outcome_value(outcome))
            .unwrap_or_else(|_| "{}".to_string());
    }

    match outcome {
        NotifyOutcome::NotConfigured => "No notification config for this job".to_string(),
        NotifyOutcome::Suppressed => "No notification needed".to_string(),
        NotifyOutcome::ChannelUnavailable(reason) => format!("Channel unavailable: {}", reason),
        NotifyOutcome::Delivered(deliveries) => deliveries
            .iter()
            .map(|d| {
                let status = match &d.result {
                    SendResult::Sent => "sent".to_string(),
                    SendResult::Skipped(reason) => format!("skipped ({})", reason),
                    SendResult::Failed(reason) => format!("failed ({})", reason),
                };
                format!("[{}] {}: {}", d.message.color, status, d.message.text)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
