//! Stateless request builder and response parser for the Exotel REST API.
//!
//! # Design
//! `ExotelApi` holds only the parsed base URL, the account SID and the
//! precomputed `Authorization` value; it carries no mutable state between
//! calls. Each operation has a `build_*` method producing an `HttpRequest`,
//! and every response goes through `parse_response`. `ExotelClient` wires the
//! two together around a transport.
//!
//! The v1 call endpoints take form-encoded bodies. The v2 user endpoints take
//! JSON.

use serde::Serialize;
use serde_json::Value;
use url::{form_urlencoded, Url};

use crate::credentials::Credentials;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CallRequest, DeviceStatus, FlowRequest, NewUser, UserUpdate, MAX_TIME_LIMIT};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// URL Exotel fetches to run a flow for the given account.
pub fn flow_url(sid: &str, flow_id: &str) -> String {
    format!("http://my.exotel.com/{sid}/exoml/start_voice/{flow_id}")
}

#[derive(Debug, Clone)]
pub struct ExotelApi {
    base: Url,
    sid: String,
    authorization: String,
}

impl ExotelApi {
    /// Targets `https://{domain}` from the credentials.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Self::with_base_url(credentials, &credentials.default_base_url())
    }

    /// Targets an explicit base URL instead of the credentials' domain.
    pub fn with_base_url(credentials: &Credentials, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base,
            sid: credentials.sid().to_string(),
            authorization: credentials.basic_auth(),
        })
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn calls_endpoint(&self) -> String {
        self.endpoint(&["v1", "Accounts", &self.sid, "Calls"])
    }

    pub fn numbers_endpoint(&self) -> String {
        self.endpoint(&["v1", "Accounts", &self.sid, "Numbers"])
    }

    pub fn users_endpoint(&self) -> String {
        self.endpoint(&["v2", "accounts", &self.sid, "users"])
    }

    pub fn campaigns_endpoint(&self) -> String {
        self.endpoint(&["v2", "accounts", &self.sid, "campaigns"])
    }

    pub fn build_place_call(&self, call: &CallRequest) -> HttpRequest {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("From", &call.from)
            .append_pair("To", &call.to)
            .append_pair("CallerId", &call.caller_id)
            .append_pair("TimeLimit", &capped(call.time_limit).to_string())
            .append_pair("Record", if call.record { "true" } else { "false" });
        if !call.stream_url.is_empty() {
            form.append_pair("StreamUrl", &call.stream_url);
        }
        self.form_request(
            HttpMethod::Post,
            self.endpoint(&["v1", "Accounts", &self.sid, "Calls", "connect.json"]),
            form.finish(),
        )
    }

    pub fn build_connect_flow(&self, flow: &FlowRequest) -> HttpRequest {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("From", &flow.from)
            .append_pair("Url", &flow_url(&self.sid, &flow.flow_id))
            .append_pair("CallerId", &flow.caller_id)
            .append_pair("TimeLimit", &capped(flow.time_limit).to_string())
            .finish();
        self.form_request(
            HttpMethod::Post,
            self.endpoint(&["v1", "Accounts", &self.sid, "Calls", "connect.json"]),
            body,
        )
    }

    pub fn build_get_call_info(&self, call_sid: &str) -> Result<HttpRequest> {
        let file = format!("{}.json", path_segment(call_sid)?);
        Ok(self.bare_request(
            HttpMethod::Get,
            self.endpoint(&["v1", "Accounts", &self.sid, "Calls", &file]),
        ))
    }

    pub fn build_get_phone_info(&self, phone_number: &str) -> Result<HttpRequest> {
        let file = format!("{}.json", path_segment(phone_number)?);
        Ok(self.bare_request(
            HttpMethod::Get,
            self.endpoint(&["v1", "Accounts", &self.sid, "Numbers", &file]),
        ))
    }

    pub fn build_create_user(&self, user: &NewUser) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, self.users_endpoint(), user)
    }

    pub fn build_update_user(&self, user_id: &str, update: &UserUpdate) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Put, self.user_endpoint(user_id, &[])?, update)
    }

    pub fn build_get_user_details(&self, user_id: &str) -> Result<HttpRequest> {
        Ok(self.bare_request(HttpMethod::Get, self.user_endpoint(user_id, &[])?))
    }

    pub fn build_delete_user(&self, user_id: &str) -> Result<HttpRequest> {
        Ok(self.bare_request(HttpMethod::Delete, self.user_endpoint(user_id, &[])?))
    }

    pub fn build_set_user_device_status(
        &self,
        user_id: &str,
        device_id: &str,
        status: &DeviceStatus,
    ) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Put,
            self.user_endpoint(user_id, &["devices", path_segment(device_id)?])?,
            status,
        )
    }

    /// Accepts any 2xx and decodes the body as opaque JSON. An empty body
    /// decodes to `Value::Null`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(ApiError::Decode)
    }

    fn user_endpoint(&self, user_id: &str, rest: &[&str]) -> Result<String> {
        let mut segments = vec!["v2", "accounts", self.sid.as_str(), "users", path_segment(user_id)?];
        segments.extend_from_slice(rest);
        Ok(self.endpoint(&segments))
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        // `with_base_url` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    fn common_headers(&self) -> Vec<(String, String)> {
        vec![
            ("authorization".to_string(), self.authorization.clone()),
            ("accept".to_string(), JSON_CONTENT_TYPE.to_string()),
        ]
    }

    fn bare_request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: self.common_headers(),
            body: None,
        }
    }

    fn form_request(&self, method: HttpMethod, url: String, body: String) -> HttpRequest {
        let mut headers = self.common_headers();
        headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
        HttpRequest {
            method,
            url,
            headers,
            body: Some(body),
        }
    }

    fn json_request<T: Serialize>(&self, method: HttpMethod, url: String, payload: &T) -> Result<HttpRequest> {
        let body = serde_json::to_string(payload).map_err(ApiError::Encode)?;
        let mut headers = self.common_headers();
        headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
        Ok(HttpRequest {
            method,
            url,
            headers,
            body: Some(body),
        })
    }
}

/// Rejects ids that would not survive as a single path segment: an empty id
/// collapses into the parent path, and `url` drops `.` and `..` segments.
fn path_segment(id: &str) -> Result<&str> {
    match id {
        "" | "." | ".." => Err(ApiError::InvalidPathSegment(id.to_string())),
        _ => Ok(id),
    }
}

fn capped(time_limit: u32) -> u32 {
    time_limit.min(MAX_TIME_LIMIT)
}

/// Map non-2xx status codes to `ApiError::HttpStatus`.
fn check_status(response: &HttpResponse) -> Result<()> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn api() -> ExotelApi {
        let creds = Credentials::new("key", "secret", "acme1", "api.exotel.com");
        ExotelApi::new(&creds).unwrap()
    }

    fn form(req: &HttpRequest) -> Vec<(String, String)> {
        form_urlencoded::parse(req.body.as_deref().unwrap().as_bytes())
            .into_owned()
            .collect()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn endpoints_hang_off_account_sid() {
        let api = api();
        assert_eq!(api.calls_endpoint(), "https://api.exotel.com/v1/Accounts/acme1/Calls");
        assert_eq!(api.numbers_endpoint(), "https://api.exotel.com/v1/Accounts/acme1/Numbers");
        assert_eq!(api.users_endpoint(), "https://api.exotel.com/v2/accounts/acme1/users");
        assert_eq!(api.campaigns_endpoint(), "https://api.exotel.com/v2/accounts/acme1/campaigns");
    }

    #[test]
    fn build_place_call_uses_defaults() {
        let req = api().build_place_call(&CallRequest::new("+1000", "+2000", "+3000"));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.exotel.com/v1/Accounts/acme1/Calls/connect.json");
        assert_eq!(req.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(req.header("authorization"), Some("Basic a2V5OnNlY3JldA=="));
        assert_eq!(
            form(&req),
            vec![
                pair("From", "+1000"),
                pair("To", "+2000"),
                pair("CallerId", "+3000"),
                pair("TimeLimit", "14400"),
                pair("Record", "true"),
            ]
        );
    }

    #[test]
    fn build_place_call_includes_stream_url_verbatim() {
        let call = CallRequest::new("+1000", "+2000", "+3000")
            .record(false)
            .stream_url("wss://stream.example.com/audio?x=1");
        let fields = form(&api().build_place_call(&call));
        assert!(fields.contains(&pair("Record", "false")));
        assert!(fields.contains(&pair("StreamUrl", "wss://stream.example.com/audio?x=1")));
    }

    #[test]
    fn time_limit_is_capped() {
        let call = CallRequest::new("+1000", "+2000", "+3000").time_limit(90_000);
        assert!(form(&api().build_place_call(&call)).contains(&pair("TimeLimit", "14400")));

        let flow = FlowRequest::new("+1000", "+3000", "42").time_limit(60);
        assert!(form(&api().build_connect_flow(&flow)).contains(&pair("TimeLimit", "60")));
    }

    #[test]
    fn build_connect_flow_builds_flow_url() {
        let req = api().build_connect_flow(&FlowRequest::new("+1000", "+3000", "271828"));
        assert_eq!(req.url, "https://api.exotel.com/v1/Accounts/acme1/Calls/connect.json");
        assert_eq!(
            form(&req),
            vec![
                pair("From", "+1000"),
                pair("Url", "http://my.exotel.com/acme1/exoml/start_voice/271828"),
                pair("CallerId", "+3000"),
                pair("TimeLimit", "14400"),
            ]
        );
    }

    #[test]
    fn build_get_requests_have_no_body() {
        let api = api();
        let req = api.build_get_call_info("b6cfaf5").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://api.exotel.com/v1/Accounts/acme1/Calls/b6cfaf5.json");
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());

        let req = api.build_get_phone_info("+919876543210").unwrap();
        assert_eq!(req.url, "https://api.exotel.com/v1/Accounts/acme1/Numbers/+919876543210.json");
    }

    #[test]
    fn path_segments_are_escaped() {
        let req = api().build_get_user_details("a/b c").unwrap();
        assert_eq!(req.url, "https://api.exotel.com/v2/accounts/acme1/users/a%2Fb%20c");
    }

    #[test]
    fn empty_and_dot_segments_are_rejected() {
        let api = api();
        for id in ["", ".", ".."] {
            let err = api.build_delete_user(id).unwrap_err();
            assert!(matches!(err, ApiError::InvalidPathSegment(_)), "delete {id:?}");
            assert_eq!(err.kind(), ErrorKind::Request);

            assert!(api.build_get_user_details(id).is_err(), "details {id:?}");
            assert!(api.build_update_user(id, &UserUpdate::default()).is_err(), "update {id:?}");
            assert!(api.build_get_call_info(id).is_err(), "call {id:?}");
            assert!(api.build_get_phone_info(id).is_err(), "number {id:?}");
            assert!(
                api.build_set_user_device_status("u1", id, &DeviceStatus::new(true)).is_err(),
                "device {id:?}"
            );
        }
        // dots inside an id are fine
        let req = api.build_get_user_details("a..b").unwrap();
        assert_eq!(req.url, "https://api.exotel.com/v2/accounts/acme1/users/a..b");
    }

    #[test]
    fn build_create_user_posts_json() {
        let user = NewUser::new("Ada", "Lovelace", "ada@example.com", "+911234567890");
        let req = api().build_create_user(&user).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.exotel.com/v2/accounts/acme1/users");
        assert_eq!(req.header("content-type"), Some(JSON_CONTENT_TYPE));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.com",
                "device_contact_uri": "+911234567890",
                "role": "user"
            })
        );
    }

    #[test]
    fn build_user_management_requests() {
        let api = api();
        let update = UserUpdate {
            first_name: Some("Augusta".to_string()),
            ..UserUpdate::default()
        };
        let req = api.build_update_user("u1", &update).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "https://api.exotel.com/v2/accounts/acme1/users/u1");

        let req = api.build_delete_user("u1").unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert!(req.body.is_none());

        let req = api
            .build_set_user_device_status("u1", "d9", &DeviceStatus::new(true))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "https://api.exotel.com/v2/accounts/acme1/users/u1/devices/d9");
        assert_eq!(req.body.as_deref(), Some(r#"{"available":true}"#));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let creds = Credentials::new("key", "secret", "acme1", "ignored");
        let api = ExotelApi::with_base_url(&creds, "http://127.0.0.1:3000/").unwrap();
        assert_eq!(api.calls_endpoint(), "http://127.0.0.1:3000/v1/Accounts/acme1/Calls");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let creds = Credentials::new("key", "secret", "acme1", "ignored");
        let err = ExotelApi::with_base_url(&creds, "not a url").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
        let err = ExotelApi::with_base_url(&creds, "mailto:ops@example.com").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn parse_response_success() {
        let value = api()
            .parse_response(response(200, r#"{"Call":{"Sid":"abc"}}"#))
            .unwrap();
        assert_eq!(value["Call"]["Sid"], "abc");
    }

    #[test]
    fn parse_response_accepts_any_2xx_and_empty_body() {
        assert_eq!(api().parse_response(response(204, "")).unwrap(), Value::Null);
        assert!(api().parse_response(response(201, "[]")).unwrap().is_array());
    }

    #[test]
    fn parse_response_wrong_status() {
        let err = api().parse_response(response(500, "internal error")).unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 500, .. }));
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
    }

    #[test]
    fn parse_response_bad_json() {
        let err = api().parse_response(response(200, "not json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
