//! JSON and text renderings of ledger data, shared by the CLI and the
//! HTTP API.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracker_core::{ProduceRecord, ProduceView, Update};

/// RFC 3339 rendering of a Unix timestamp, or the raw number if it is out
/// of range.
pub(crate) fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok())
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| secs.to_string())
}

pub(crate) fn produce_json(record: &ProduceRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "name": record.name,
        "origin": record.origin,
        "price": record.price,
        "status": record.status.code(),
        "status_label": record.status.label(),
        "location": record.location,
        "registered_by": record.registered_by.as_str(),
        "registered_at": record.registered_at,
    })
}

pub(crate) fn update_json(update: &Update) -> serde_json::Value {
    serde_json::json!({
        "status": update.status.code(),
        "status_label": update.status.label(),
        "action": update.action,
        "location": update.location,
        "actor": update.actor.as_str(),
        "timestamp": update.timestamp,
    })
}

pub(crate) fn history_json(id: u64, history: &[Update]) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "history": history.iter().map(update_json).collect::<Vec<_>>(),
    })
}

pub(crate) fn view_json(view: &ProduceView) -> serde_json::Value {
    let mut value = produce_json(&view.record);
    value["history_len"] = serde_json::json!(view.history_len);
    value["latest"] = view
        .latest
        .as_ref()
        .map(update_json)
        .unwrap_or(serde_json::Value::Null);
    value
}

pub(crate) fn produce_text(record: &ProduceRecord) -> String {
    format!(
        "Produce #{}\n  name:     {}\n  origin:   {}\n  price:    {}\n  status:   {}\n  location: {}\n  registered by {} at {}",
        record.id,
        record.name,
        record.origin,
        record.price,
        record.status,
        record.location,
        record.registered_by,
        format_timestamp(record.registered_at),
    )
}

pub(crate) fn update_text(index: usize, update: &Update) -> String {
    format!(
        "{:>3}. [{}] {} @ {} by {} at {}",
        index,
        update.status,
        update.action,
        update.location,
        update.actor,
        format_timestamp(update.timestamp),
    )
}

pub(crate) fn view_text(view: &ProduceView) -> String {
    let latest = view
        .latest
        .as_ref()
        .map(|u| format!("{} @ {}", u.action, u.location))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>5}  {:<20} {:<16} {:<12} {:>3} updates  latest: {}",
        view.record.id,
        view.record.name,
        view.record.origin,
        view.record.status,
        view.history_len,
        latest,
    )
}

#[cfg(test)]
mod tests {
    use tracker_core::{Actor, StageStatus};

    use super::*;

    fn record() -> ProduceRecord {
        ProduceRecord {
            id: 1,
            name: "Mango".to_string(),
            origin: "India".to_string(),
            price: 100,
            status: StageStatus::Distributor,
            location: "12.9,77.6".to_string(),
            registered_by: Actor::new("farm:a").unwrap(),
            registered_at: 0,
        }
    }

    #[test]
    fn timestamps_render_as_rfc3339() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14T22:13:20Z");
        assert_eq!(format_timestamp(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn produce_json_carries_code_and_label() {
        let json = produce_json(&record());
        assert_eq!(json["status"], 1);
        assert_eq!(json["status_label"], "Distributor");
        assert_eq!(json["registered_by"], "farm:a");
    }

    #[test]
    fn view_json_includes_history_summary() {
        let view = ProduceView {
            record: record(),
            history_len: 0,
            latest: None,
        };
        let json = view_json(&view);
        assert_eq!(json["history_len"], 0);
        assert!(json["latest"].is_null());
    }

    #[test]
    fn produce_text_lists_fields() {
        let text = produce_text(&record());
        assert!(text.starts_with("Produce #1"));
        assert!(text.contains("status:   Distributor"));
    }
}
