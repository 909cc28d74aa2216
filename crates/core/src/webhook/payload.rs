//! Typed views over provider webhook bodies.
//!
//! Providers send loosely shaped JSON. Every field here is optional and the
//! accessors spell out the fallback order instead of silently defaulting.

use serde_json::Value;

use crate::types::WebhookCategory;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookEnvelope {
    pub id: Option<Value>,
    pub event_id: Option<Value>,
    pub event_type: Option<String>,
    /// The `type` field.
    pub kind: Option<String>,
    pub account_id: Option<String>,
    /// The `accountId` field.
    pub account_id_camel: Option<String>,
    pub data: Option<Value>,
}

impl WebhookEnvelope {
    /// Parse the identifying fields out of a JSON object.
    ///
    /// Fields with unexpected types are treated as absent.
    pub fn from_value(payload: &Value) -> Self {
        let Some(object) = payload.as_object() else {
            return Self::default();
        };
        Self {
            id: object.get("id").cloned(),
            event_id: object.get("event_id").cloned(),
            event_type: string_field(payload, "event_type"),
            kind: string_field(payload, "type"),
            account_id: string_field(payload, "account_id"),
            account_id_camel: string_field(payload, "accountId"),
            data: object.get("data").cloned(),
        }
    }

    /// Provider event id: `id`, then `event_id`.
    pub fn event_id(&self) -> Option<String> {
        [&self.id, &self.event_id]
            .into_iter()
            .flatten()
            .find_map(id_string)
    }

    /// `event_type`, then `type`, else empty.
    pub fn event_type(&self) -> String {
        non_empty(&self.event_type)
            .or_else(|| non_empty(&self.kind))
            .unwrap_or_default()
    }

    /// `account_id`, then `accountId`, then `data.account_id`, else empty.
    pub fn account_id(&self) -> String {
        non_empty(&self.account_id)
            .or_else(|| non_empty(&self.account_id_camel))
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|data| string_field(data, "account_id"))
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or_default()
    }
}

/// Per-category payload with the fields each handler looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryPayload {
    AccountStatus {
        event_type: String,
        account_id: String,
    },
    Messaging {
        event_type: String,
        content: Option<String>,
    },
    Mailing {
        event_type: String,
        email_id: Option<String>,
    },
    MailTracking {
        event_type: String,
        email_id: Option<String>,
        link_url: Option<String>,
    },
    UsersRelations {
        event_type: String,
        connection_name: Option<String>,
    },
}

impl CategoryPayload {
    pub fn parse(category: WebhookCategory, payload: &Value) -> Self {
        let envelope = WebhookEnvelope::from_value(payload);
        let event_type = envelope.event_type();
        let data = envelope.data.clone().unwrap_or(Value::Null);

        match category {
            WebhookCategory::AccountStatus => CategoryPayload::AccountStatus {
                event_type,
                account_id: envelope.account_id(),
            },
            WebhookCategory::Messaging => CategoryPayload::Messaging {
                event_type,
                content: string_field(&data, "content"),
            },
            WebhookCategory::Mailing => CategoryPayload::Mailing {
                event_type,
                email_id: id_field(&data, "email_id"),
            },
            WebhookCategory::MailTracking => CategoryPayload::MailTracking {
                event_type,
                email_id: id_field(&data, "email_id"),
                link_url: string_field(&data, "link_url"),
            },
            WebhookCategory::UsersRelations => CategoryPayload::UsersRelations {
                event_type,
                connection_name: data
                    .get("connection")
                    .and_then(|connection| string_field(connection, "name")),
            },
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            CategoryPayload::AccountStatus { event_type, .. }
            | CategoryPayload::Messaging { event_type, .. }
            | CategoryPayload::Mailing { event_type, .. }
            | CategoryPayload::MailTracking { event_type, .. }
            | CategoryPayload::UsersRelations { event_type, .. } => event_type,
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn id_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(id_string)
}

/// Ids arrive as strings or numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_id_prefers_id() {
        let env = WebhookEnvelope::from_value(&json!({"id": "evt_1", "event_id": "evt_2"}));
        assert_eq!(env.event_id().as_deref(), Some("evt_1"));

        let env = WebhookEnvelope::from_value(&json!({"event_id": "evt_2"}));
        assert_eq!(env.event_id().as_deref(), Some("evt_2"));

        let env = WebhookEnvelope::from_value(&json!({"id": 42}));
        assert_eq!(env.event_id().as_deref(), Some("42"));

        let env = WebhookEnvelope::from_value(&json!({"id": "", "event_id": null}));
        assert_eq!(env.event_id(), None);
    }

    #[test]
    fn test_event_type_fallbacks() {
        let env = WebhookEnvelope::from_value(&json!({"event_type": "a", "type": "b"}));
        assert_eq!(env.event_type(), "a");

        let env = WebhookEnvelope::from_value(&json!({"type": "b"}));
        assert_eq!(env.event_type(), "b");

        let env = WebhookEnvelope::from_value(&json!({"event_type": 7}));
        assert_eq!(env.event_type(), "");
    }

    #[test]
    fn test_account_id_fallbacks() {
        let env = WebhookEnvelope::from_value(&json!({"account_id": "acct_1", "accountId": "acct_2"}));
        assert_eq!(env.account_id(), "acct_1");

        let env = WebhookEnvelope::from_value(&json!({"accountId": "acct_2"}));
        assert_eq!(env.account_id(), "acct_2");

        let env = WebhookEnvelope::from_value(&json!({"data": {"account_id": "acct_3"}}));
        assert_eq!(env.account_id(), "acct_3");

        let env = WebhookEnvelope::from_value(&json!({"data": "not an object"}));
        assert_eq!(env.account_id(), "");
    }

    #[test]
    fn test_non_object_payload_is_empty_envelope() {
        assert_eq!(WebhookEnvelope::from_value(&json!([1, 2])), WebhookEnvelope::default());
    }

    #[test]
    fn test_category_payloads() {
        let parsed = CategoryPayload::parse(
            WebhookCategory::AccountStatus,
            &json!({"event_type": "account.disconnected", "account_id": "acct_9"}),
        );
        assert_eq!(
            parsed,
            CategoryPayload::AccountStatus {
                event_type: "account.disconnected".to_string(),
                account_id: "acct_9".to_string(),
            }
        );

        let parsed = CategoryPayload::parse(
            WebhookCategory::MailTracking,
            &json!({"type": "email.clicked", "data": {"email_id": 77, "link_url": "https://x.test"}}),
        );
        assert_eq!(
            parsed,
            CategoryPayload::MailTracking {
                event_type: "email.clicked".to_string(),
                email_id: Some("77".to_string()),
                link_url: Some("https://x.test".to_string()),
            }
        );

        let parsed = CategoryPayload::parse(
            WebhookCategory::UsersRelations,
            &json!({"event_type": "connection.added", "data": {"connection": {"name": "Ada"}}}),
        );
        assert_eq!(parsed.event_type(), "connection.added");
        assert_eq!(
            parsed,
            CategoryPayload::UsersRelations {
                event_type: "connection.added".to_string(),
                connection_name: Some("Ada".to_string()),
            }
        );

        let parsed = CategoryPayload::parse(WebhookCategory::Messaging, &json!({}));
        assert_eq!(
            parsed,
            CategoryPayload::Messaging {
                event_type: String::new(),
                content: None,
            }
        );
    }
}
