//! In-memory imitation of the Exotel REST API.
//!
//! Covers the call, number-lookup and user endpoints with the same paths,
//! methods and body encodings as the real service. Every request is checked
//! against one set of basic-auth credentials and recorded so tests can assert
//! on what actually reached the wire.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Form, FromRequest, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MAX_TIME_LIMIT: u32 = 14_400;

const ROLES: [&str; 3] = ["admin", "supervisor", "user"];

/// What the server saw for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub contact_uri: String,
    pub available: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: String,
    pub devices: Vec<Device>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub device_contact_uri: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Deserialize)]
pub struct SetDeviceStatus {
    pub available: bool,
    #[serde(default)]
    pub contact_uri: Option<String>,
}

pub struct AppState {
    authorization: String,
    sid: String,
    calls: RwLock<HashMap<String, Value>>,
    users: RwLock<HashMap<String, User>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl AppState {
    pub fn new(api_key: &str, api_secret: &str, sid: &str) -> Arc<Self> {
        Arc::new(Self {
            authorization: format!("Basic {}", STANDARD.encode(format!("{api_key}:{api_secret}"))),
            sid: sid.to_string(),
            calls: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Snapshot of every request received so far, oldest first.
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
    }

    fn authorize(&self, headers: &HeaderMap, sid: &str) -> Result<(), MockError> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if presented != Some(self.authorization.as_str()) || sid != self.sid {
            return Err(MockError::new(StatusCode::UNAUTHORIZED, "Authentication is required"));
        }
        Ok(())
    }
}

/// Error response in the `RestException` shape the v1 API uses.
#[derive(Debug)]
pub struct MockError {
    status: StatusCode,
    message: String,
}

impl MockError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let body = json!({
            "RestException": {
                "Status": self.status.as_u16(),
                "Message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

type Reply = Result<(StatusCode, Json<Value>), MockError>;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/Accounts/{sid}/Calls/connect.json", post(connect_call))
        .route("/v1/Accounts/{sid}/Calls/{call_file}", get(get_call))
        .route("/v1/Accounts/{sid}/Numbers/{number_file}", get(get_number))
        .route("/v2/accounts/{sid}/users", post(create_user))
        .route(
            "/v2/accounts/{sid}/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/v2/accounts/{sid}/users/{user_id}/devices/{device_id}",
            put(set_device_status),
        )
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: Arc<AppState>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn record_request(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.record(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        content_type,
    });
    tracing::debug!(method = %request.method(), path = %request.uri().path(), "mock exotel request");
    next.run(request).await
}

/// Strips the `.json` suffix the v1 API puts on resource paths.
fn json_resource(file: &str) -> Result<&str, MockError> {
    file.strip_suffix(".json")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, "Not Found"))
}

fn is_phone_number(number: &str) -> bool {
    let digits = number.strip_prefix('+').unwrap_or(number);
    (6..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn envelope(status: StatusCode, data: Value) -> (StatusCode, Json<Value>) {
    let body = json!({
        "request_id": Uuid::new_v4().simple().to_string(),
        "http_code": status.as_u16(),
        "response": {
            "code": status.as_u16(),
            "error_data": null,
            "status": "success",
            "data": data,
        }
    });
    (status, Json(body))
}

/// Body extraction runs after `authorize`, so bad credentials always get a
/// 401 regardless of the payload.
async fn read_form(request: Request) -> Result<HashMap<String, String>, MockError> {
    let Form(form) = Form::<HashMap<String, String>>::from_request(request, &())
        .await
        .map_err(|rejection| MockError::new(rejection.status(), rejection.body_text()))?;
    Ok(form)
}

async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, MockError> {
    let Json(value) = Json::<T>::from_request(request, &())
        .await
        .map_err(|rejection| MockError::new(rejection.status(), rejection.body_text()))?;
    Ok(value)
}

fn required<'a>(form: &'a HashMap<String, String>, field: &str) -> Result<&'a str, MockError> {
    form.get(field)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MockError::new(StatusCode::BAD_REQUEST, format!("Missing parameter {field}")))
}

async fn connect_call(
    State(state): State<Arc<AppState>>,
    Path(sid): Path<String>,
    request: Request,
) -> Reply {
    state.authorize(request.headers(), &sid)?;
    let form = read_form(request).await?;

    let from = required(&form, "From")?;
    let caller_id = required(&form, "CallerId")?;
    let destination = match (form.get("To"), form.get("Url")) {
        (Some(to), _) if !to.is_empty() => json!({ "To": to }),
        (_, Some(url)) if !url.is_empty() => json!({ "Url": url }),
        _ => return Err(MockError::new(StatusCode::BAD_REQUEST, "Either To or Url is required")),
    };
    let time_limit = match form.get("TimeLimit") {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|t| *t <= MAX_TIME_LIMIT)
            .ok_or_else(|| MockError::new(StatusCode::BAD_REQUEST, "Invalid TimeLimit"))?,
        None => MAX_TIME_LIMIT,
    };
    let record = form.get("Record").map(String::as_str) == Some("true");

    let call_sid = Uuid::new_v4().simple().to_string();
    let mut call = json!({
        "Sid": call_sid,
        "AccountSid": state.sid,
        "From": from,
        "PhoneNumberSid": caller_id,
        "Status": "in-progress",
        "Direction": "outbound-api",
        "TimeLimit": time_limit,
        "Record": record,
    });
    if let (Some(call), Some(destination)) = (call.as_object_mut(), destination.as_object()) {
        call.extend(destination.clone());
        if let Some(stream) = form.get("StreamUrl") {
            call.insert("StreamUrl".to_string(), json!(stream));
        }
    }

    state.calls.write().await.insert(call_sid, call.clone());
    Ok((StatusCode::OK, Json(json!({ "Call": call }))))
}

async fn get_call(
    State(state): State<Arc<AppState>>,
    Path((sid, call_file)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    state.authorize(&headers, &sid)?;
    let call_sid = json_resource(&call_file)?;
    let calls = state.calls.read().await;
    let call = calls
        .get(call_sid)
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, format!("Call {call_sid} not found")))?;
    Ok((StatusCode::OK, Json(json!({ "Call": call }))))
}

async fn get_number(
    State(state): State<Arc<AppState>>,
    Path((sid, number_file)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    state.authorize(&headers, &sid)?;
    let number = json_resource(&number_file)?;
    if !is_phone_number(number) {
        return Err(MockError::new(StatusCode::BAD_REQUEST, format!("{number} is not a valid phone number")));
    }
    let body = json!({
        "Numbers": {
            "PhoneNumber": number,
            "Circle": "KA",
            "CircleName": "Karnataka Telecom Circle",
            "Type": "Mobile",
            "Operator": "A",
            "OperatorName": "Airtel",
            "DND": "No",
        }
    });
    Ok((StatusCode::OK, Json(body)))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Path(sid): Path<String>,
    request: Request,
) -> Reply {
    state.authorize(request.headers(), &sid)?;
    let input: CreateUser = read_json(request).await?;
    if !ROLES.contains(&input.role.as_str()) {
        return Err(MockError::new(StatusCode::BAD_REQUEST, format!("Unknown role {}", input.role)));
    }
    let devices = if input.device_contact_uri.is_empty() {
        Vec::new()
    } else {
        vec![Device {
            id: Uuid::new_v4().simple().to_string(),
            contact_uri: input.device_contact_uri,
            available: false,
        }]
    };
    let user = User {
        id: Uuid::new_v4().simple().to_string(),
        first_name: input.first_name,
        last_name: input.last_name,
        email: Some(input.email).filter(|e| !e.is_empty()),
        role: input.role,
        devices,
    };
    state.users.write().await.insert(user.id.clone(), user.clone());
    Ok(envelope(StatusCode::CREATED, json!(user)))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path((sid, user_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    state.authorize(&headers, &sid)?;
    let users = state.users.read().await;
    let user = users.get(&user_id).ok_or_else(|| user_not_found(&user_id))?;
    Ok(envelope(StatusCode::OK, json!(user)))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path((sid, user_id)): Path<(String, String)>,
    request: Request,
) -> Reply {
    state.authorize(request.headers(), &sid)?;
    let fields: Map<String, Value> = read_json(request).await?;
    let mut users = state.users.write().await;
    let user = users.get_mut(&user_id).ok_or_else(|| user_not_found(&user_id))?;

    if let Some(email) = fields.get("email").and_then(Value::as_str) {
        if user.email.is_some() {
            return Err(MockError::new(StatusCode::BAD_REQUEST, "Email is already configured"));
        }
        user.email = Some(email.to_string());
    }
    if let Some(role) = fields.get("role").and_then(Value::as_str) {
        if !ROLES.contains(&role) {
            return Err(MockError::new(StatusCode::BAD_REQUEST, format!("Unknown role {role}")));
        }
        user.role = role.to_string();
    }
    if let Some(first_name) = fields.get("first_name").and_then(Value::as_str) {
        user.first_name = first_name.to_string();
    }
    if let Some(last_name) = fields.get("last_name").and_then(Value::as_str) {
        user.last_name = last_name.to_string();
    }
    Ok(envelope(StatusCode::OK, json!(user)))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path((sid, user_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Reply {
    state.authorize(&headers, &sid)?;
    state
        .users
        .write()
        .await
        .remove(&user_id)
        .ok_or_else(|| user_not_found(&user_id))?;
    Ok(envelope(StatusCode::OK, Value::Null))
}

async fn set_device_status(
    State(state): State<Arc<AppState>>,
    Path((sid, user_id, device_id)): Path<(String, String, String)>,
    request: Request,
) -> Reply {
    state.authorize(request.headers(), &sid)?;
    let input: SetDeviceStatus = read_json(request).await?;
    let mut users = state.users.write().await;
    let user = users.get_mut(&user_id).ok_or_else(|| user_not_found(&user_id))?;
    let device = user
        .devices
        .iter_mut()
        .find(|d| d.id == device_id)
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, format!("Device {device_id} not found")))?;
    device.available = input.available;
    if let Some(uri) = input.contact_uri.filter(|u| !u.is_empty()) {
        device.contact_uri = uri;
    }
    Ok(envelope(StatusCode::OK, json!(device)))
}

fn user_not_found(user_id: &str) -> MockError {
    MockError::new(StatusCode::NOT_FOUND, format!("User {user_id} not found"))
}
