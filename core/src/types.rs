//! Request payloads for the Exotel API.
//!
//! # Design
//! Responses are passed through as opaque `serde_json::Value`; only the
//! inputs are typed. Call payloads are form-encoded by `ExotelApi`, user
//! payloads are serialized as JSON with serde.

use serde::Serialize;
use serde_json::{Map, Value};

/// Longest call Exotel allows, in seconds (four hours).
pub const MAX_TIME_LIMIT: u32 = 14_400;

/// Role assigned to new users when none is given.
pub const DEFAULT_ROLE: &str = "user";

/// Connects `from` (usually an agent) to `to` (usually a customer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: String,
    pub to: String,
    /// ExoPhone shown to the recipient.
    pub caller_id: String,
    pub record: bool,
    /// Seconds before the call is cut. Values above `MAX_TIME_LIMIT` are capped.
    pub time_limit: u32,
    /// Websocket URL to stream call audio to. Empty means no stream.
    pub stream_url: String,
}

impl CallRequest {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        caller_id: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            caller_id: caller_id.into(),
            record: true,
            time_limit: MAX_TIME_LIMIT,
            stream_url: String::new(),
        }
    }

    pub fn record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    pub fn time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }
}

/// Connects `from` to a call flow (applet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRequest {
    pub from: String,
    pub caller_id: String,
    pub flow_id: String,
    pub time_limit: u32,
}

impl FlowRequest {
    pub fn new(
        from: impl Into<String>,
        caller_id: impl Into<String>,
        flow_id: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            caller_id: caller_id.into(),
            flow_id: flow_id.into(),
            time_limit: MAX_TIME_LIMIT,
        }
    }

    pub fn time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = seconds;
        self
    }
}

/// Payload for creating a user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    /// Without an email the user cannot log in to the dashboard.
    pub email: String,
    /// E.164 phone number of the user's device.
    pub device_contact_uri: String,
    /// One of `admin`, `supervisor`, `user`.
    pub role: String,
}

impl NewUser {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        device_contact_uri: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            device_contact_uri: device_contact_uri.into(),
            role: DEFAULT_ROLE.to_string(),
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// Partial update of a user. Only the fields present are sent; anything in
/// `extra` is forwarded verbatim.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Accepted only if the user was created without an email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.extra.is_empty()
    }
}

impl From<Map<String, Value>> for UserUpdate {
    fn from(extra: Map<String, Value>) -> Self {
        Self {
            extra,
            ..Self::default()
        }
    }
}

/// Availability of one of a user's devices.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeviceStatus {
    pub available: bool,
    /// New contact URI for the device. Empty leaves it unchanged.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub contact_uri: String,
}

impl DeviceStatus {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            contact_uri: String::new(),
        }
    }

    pub fn contact_uri(mut self, uri: impl Into<String>) -> Self {
        self.contact_uri = uri.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_request_defaults() {
        let call = CallRequest::new("+1000", "+2000", "+3000");
        assert!(call.record);
        assert_eq!(call.time_limit, 14_400);
        assert!(call.stream_url.is_empty());
    }

    #[test]
    fn new_user_defaults_to_user_role() {
        let user = NewUser::new("Ada", "Lovelace", "ada@example.com", "+911234567890");
        let body = serde_json::to_value(&user).unwrap();
        assert_eq!(body["role"], "user");
        assert_eq!(body["device_contact_uri"], "+911234567890");
    }

    #[test]
    fn user_update_skips_absent_fields_and_flattens_extra() {
        let mut update = UserUpdate {
            last_name: Some("Byron".to_string()),
            ..UserUpdate::default()
        };
        update.extra.insert("department".to_string(), json!("support"));
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, json!({"last_name": "Byron", "department": "support"}));
    }

    #[test]
    fn user_update_from_map() {
        let map = json!({"first_name": "Grace"}).as_object().cloned().unwrap();
        let update = UserUpdate::from(map);
        assert!(!update.is_empty());
        assert!(UserUpdate::default().is_empty());
    }

    #[test]
    fn device_status_omits_empty_contact_uri() {
        let body = serde_json::to_value(DeviceStatus::new(false)).unwrap();
        assert_eq!(body, json!({"available": false}));

        let body = serde_json::to_value(DeviceStatus::new(true).contact_uri("+15550001")).unwrap();
        assert_eq!(body, json!({"available": true, "contact_uri": "+15550001"}));
    }
}
