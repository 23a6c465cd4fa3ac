//! Domain services used by the feature stores.
//!
//! Features only see the traits; tests swap in fakes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{ApiClient, ApiError, ApiRequest, HttpMethod};

/// Operator role. Decides which dashboard a user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Listero,
    Colector,
    Banker,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Listero => "listero",
            Role::Colector => "colector",
            Role::Banker => "banker",
            Role::Admin => "admin",
        }
    }

    /// Route of the role's home screen.
    pub fn dashboard(&self) -> &'static str {
        match self {
            Role::Listero => "/listero/dashboard",
            Role::Colector => "/colector/dashboard",
            Role::Banker | Role::Admin => "/banker/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: Role,
    pub token: String,
    /// Node of the betting structure the user operates in.
    #[serde(default)]
    pub structure_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub listero_count: u32,
}

#[async_trait]
pub trait LoginService: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<User, ApiError>;
}

#[async_trait]
pub trait StructureService: Send + Sync {
    /// Agencies below `structure_id`, fetched on behalf of `token`.
    async fn agencies(&self, structure_id: &str, token: &str) -> Result<Vec<Agency>, ApiError>;
}

/// [`LoginService`] over the shared API client.
pub struct ApiLoginService {
    api: Arc<dyn ApiClient>,
}

impl ApiLoginService {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LoginService for ApiLoginService {
    async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let request = ApiRequest::new(HttpMethod::Post, "auth/login")
            .with_body(json!({ "username": username, "password": password }));
        decode(self.api.request(request).await?)
    }
}

/// [`StructureService`] over the shared API client.
pub struct ApiStructureService {
    api: Arc<dyn ApiClient>,
}

impl ApiStructureService {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl StructureService for ApiStructureService {
    async fn agencies(&self, structure_id: &str, token: &str) -> Result<Vec<Agency>, ApiError> {
        let request = ApiRequest::new(
            HttpMethod::Get,
            format!("structures/{}/agencies", structure_id),
        )
        .with_header("Authorization", format!("Bearer {}", token));
        decode(self.api.request(request).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Answers every request with a fixed body and remembers what it saw.
    struct Canned {
        body: Value,
        seen: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl ApiClient for Canned {
        async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
            self.seen.lock().push(request);
            Ok(self.body.clone())
        }
    }

    fn canned(body: Value) -> Arc<Canned> {
        Arc::new(Canned {
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn login_posts_credentials_and_decodes_user() {
        let api = canned(json!({"username": "ana", "role": "colector", "token": "t"}));
        let service = ApiLoginService::new(api.clone());

        let user = service.login("ana", "secret").await.unwrap();
        assert_eq!(user.role, Role::Colector);
        assert_eq!(user.structure_id, None);

        let seen = api.seen.lock();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].url, "auth/login");
        assert_eq!(
            seen[0].body,
            Some(json!({"username": "ana", "password": "secret"}))
        );
    }

    #[tokio::test]
    async fn agencies_send_bearer_token() {
        let api = canned(json!([{"id": "a1", "name": "Centro", "listero_count": 4}]));
        let service = ApiStructureService::new(api.clone());

        let agencies = service.agencies("5", "tok").await.unwrap();
        assert_eq!(agencies.len(), 1);
        assert_eq!(agencies[0].listero_count, 4);

        let seen = api.seen.lock();
        assert_eq!(seen[0].url, "structures/5/agencies");
        assert_eq!(
            seen[0].headers,
            vec![("Authorization".to_string(), "Bearer tok".to_string())]
        );
    }

    #[tokio::test]
    async fn unexpected_shape_is_a_decode_error() {
        let service = ApiLoginService::new(canned(json!({"user": "ana"})));
        let err = service.login("ana", "x").await.unwrap_err();
        assert_eq!(err.error_type(), "decode");
    }

    #[test]
    fn roles_use_lowercase_names() {
        let role: Role = serde_json::from_value(json!("banker")).unwrap();
        assert_eq!(role, Role::Banker);
        assert_eq!(Role::Listero.to_string(), "listero");
        assert_eq!(Role::Admin.dashboard(), "/banker/dashboard");
    }
}
