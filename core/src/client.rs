//! Blocking Exotel client: one method per remote operation.
//!
//! Every operation builds its request with `ExotelApi`, hands it to the
//! transport exactly once and parses the response. Failures are returned to
//! the caller and reported with a single `warn!` event.

use serde_json::Value;

use crate::api::ExotelApi;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::http::{HttpRequest, HttpTransport, UreqTransport};
use crate::types::{CallRequest, DeviceStatus, FlowRequest, NewUser, UserUpdate};

#[derive(Debug, Clone)]
pub struct ExotelClient<T = UreqTransport> {
    api: ExotelApi,
    transport: T,
}

impl ExotelClient<UreqTransport> {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            api: ExotelApi::new(credentials)?,
            transport: UreqTransport::new(),
        })
    }

    /// Sends requests to `base_url` instead of `https://{domain}`.
    pub fn with_base_url(credentials: &Credentials, base_url: &str) -> Result<Self> {
        Ok(Self {
            api: ExotelApi::with_base_url(credentials, base_url)?,
            transport: UreqTransport::new(),
        })
    }
}

impl<T: HttpTransport> ExotelClient<T> {
    /// Assembles a client from a prepared `ExotelApi` and any transport.
    pub fn from_parts(api: ExotelApi, transport: T) -> Self {
        Self { api, transport }
    }

    /// Swaps the transport, keeping the endpoints.
    pub fn with_transport<U: HttpTransport>(self, transport: U) -> ExotelClient<U> {
        ExotelClient {
            api: self.api,
            transport,
        }
    }

    pub fn api(&self) -> &ExotelApi {
        &self.api
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connects `call.from` to `call.to`, showing `call.caller_id`.
    pub fn place_call(&self, call: &CallRequest) -> Result<Value> {
        self.send("place_call", self.api.build_place_call(call))
    }

    /// Connects `flow.from` to the flow `flow.flow_id`.
    pub fn connect_flow(&self, flow: &FlowRequest) -> Result<Value> {
        self.send("connect_flow", self.api.build_connect_flow(flow))
    }

    pub fn get_call_info(&self, call_sid: &str) -> Result<Value> {
        self.send_built("get_call_info", self.api.build_get_call_info(call_sid))
    }

    /// Circle, operator, number type and DND status of a phone number.
    pub fn get_phone_info(&self, phone_number: &str) -> Result<Value> {
        self.send_built("get_phone_info", self.api.build_get_phone_info(phone_number))
    }

    pub fn create_user(&self, user: &NewUser) -> Result<Value> {
        let request = self.api.build_create_user(user);
        self.send_built("create_user", request)
    }

    pub fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<Value> {
        let request = self.api.build_update_user(user_id, update);
        self.send_built("update_user", request)
    }

    /// A single user along with their devices.
    pub fn get_user_details(&self, user_id: &str) -> Result<Value> {
        self.send_built("get_user_details", self.api.build_get_user_details(user_id))
    }

    pub fn delete_user(&self, user_id: &str) -> Result<Value> {
        self.send_built("delete_user", self.api.build_delete_user(user_id))
    }

    pub fn set_user_device_status(
        &self,
        user_id: &str,
        device_id: &str,
        status: &DeviceStatus,
    ) -> Result<Value> {
        let request = self
            .api
            .build_set_user_device_status(user_id, device_id, status);
        self.send_built("set_user_device_status", request)
    }

    fn send_built(&self, operation: &str, request: Result<HttpRequest>) -> Result<Value> {
        match request {
            Ok(request) => self.send(operation, request),
            Err(e) => {
                tracing::warn!(operation, error = %e, "exotel request failed");
                Err(e)
            }
        }
    }

    fn send(&self, operation: &str, request: HttpRequest) -> Result<Value> {
        tracing::debug!(
            operation,
            method = request.method.as_str(),
            url = %request.url,
            "sending exotel request"
        );
        let result = self
            .transport
            .execute(&request)
            .and_then(|response| self.api.parse_response(response));
        if let Err(e) = &result {
            tracing::warn!(
                operation,
                method = request.method.as_str(),
                url = %request.url,
                error = %e,
                "exotel request failed"
            );
        }
        result
    }
}
