//! Keystone v3 password, token and application credential authentication

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::catalog::{Catalog, CatalogEntry};
use super::error::ApiError;
use crate::config::{AuthMethod, Config};

/// Issued token plus the catalog it was issued with
#[derive(Clone)]
pub struct Token {
    pub id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub project_id: Option<String>,
    pub catalog: Catalog,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|e| e <= Utc::now()).unwrap_or(false)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("expires_at", &self.expires_at)
            .field("project_id", &self.project_id)
            .field("catalog_entries", &self.catalog.entries.len())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
    project: Option<ProjectRef>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
}

/// `{auth_url}/auth/tokens`, inserting `/v3` when the URL lacks a version
pub fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

fn domain(id: &Option<String>, name: &Option<String>) -> Option<Value> {
    match (id, name) {
        (Some(id), _) => Some(json!({ "id": id })),
        (None, Some(name)) => Some(json!({ "name": name })),
        (None, None) => None,
    }
}

fn user(config: &Config) -> Value {
    let mut user = serde_json::Map::new();
    if let Some(id) = &config.user_id {
        user.insert("id".into(), json!(id));
    } else {
        if let Some(name) = &config.user_name {
            user.insert("name".into(), json!(name));
        }
        if let Some(d) = domain(&config.user_domain_id, &config.user_domain_name) {
            user.insert("domain".into(), d);
        }
    }
    Value::Object(user)
}

fn scope(config: &Config) -> Option<Value> {
    if config.system_scope {
        return Some(json!({ "system": { "all": true } }));
    }
    if let Some(id) = &config.tenant_id {
        return Some(json!({ "project": { "id": id } }));
    }
    if let Some(name) = &config.tenant_name {
        let mut project = json!({ "name": name });
        if let Some(d) = domain(&config.project_domain_id, &config.project_domain_name) {
            project["domain"] = d;
        }
        return Some(json!({ "project": project }));
    }
    None
}

/// Request body for `POST /v3/auth/tokens`
pub fn auth_request_body(config: &Config) -> Value {
    let identity = match &config.auth {
        AuthMethod::Password { password } => {
            let mut user = user(config);
            user["password"] = json!(password);
            json!({ "methods": ["password"], "password": { "user": user } })
        }
        AuthMethod::Token { token } => {
            json!({ "methods": ["token"], "token": { "id": token } })
        }
        AuthMethod::ApplicationCredential { id, name, secret } => {
            let credential = match id {
                Some(id) => json!({ "id": id, "secret": secret }),
                None => json!({ "name": name, "secret": secret, "user": user(config) }),
            };
            json!({
                "methods": ["application_credential"],
                "application_credential": credential
            })
        }
    };

    let mut auth = json!({ "identity": identity });
    // Application credentials carry their own scope.
    if !matches!(config.auth, AuthMethod::ApplicationCredential { .. }) {
        if let Some(scope) = scope(config) {
            auth["scope"] = scope;
        }
    }
    json!({ "auth": auth })
}

/// Issue a token. The caller decides when this is needed.
pub async fn authenticate(http: &reqwest::Client, config: &Config) -> Result<Token, ApiError> {
    let url = tokens_url(&config.auth_url);
    tracing::debug!("Authenticating against {}", url);

    let response = http
        .post(&url)
        .json(&auth_request_body(config))
        .send()
        .await
        .map_err(|e| ApiError::Auth(format!("Unable to reach identity endpoint {}: {}", url, e)))?;

    let status = response.status();
    let subject_token = response
        .headers()
        .get("X-Subject-Token")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let text = response.text().await?;

    if !status.is_success() {
        return Err(match ApiError::from_status(status, text) {
            ApiError::Auth(msg) | ApiError::Validation(msg) | ApiError::NotFound(msg) => {
                ApiError::Auth(msg)
            }
            other => ApiError::Auth(other.to_string()),
        });
    }

    let id = subject_token
        .ok_or_else(|| ApiError::Auth("Identity response carried no X-Subject-Token".to_string()))?;
    let body: TokenResponse = serde_json::from_str(&text).map_err(|e| {
        tracing::error!("Failed to deserialize token response: {}", e);
        ApiError::Parse(format!("Failed to parse token response: {}", e))
    })?;

    Ok(Token {
        id,
        expires_at: body.token.expires_at,
        project_id: body.token.project.map(|p| p.id),
        catalog: Catalog::new(body.token.catalog),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, ProviderConfig};

    fn config(pairs: &[(&str, &str)]) -> Config {
        Config::resolve(&ProviderConfig::default(), &Environment::from_pairs(pairs), None).unwrap()
    }

    #[test]
    fn tokens_url_appends_version() {
        assert_eq!(
            tokens_url("http://keystone:5000"),
            "http://keystone:5000/v3/auth/tokens"
        );
        assert_eq!(
            tokens_url("http://keystone:5000/v3/"),
            "http://keystone:5000/v3/auth/tokens"
        );
    }

    #[test]
    fn password_body_is_project_scoped() {
        let c = config(&[
            ("OS_AUTH_URL", "http://keystone:5000"),
            ("OS_USERNAME", "admin"),
            ("OS_PASSWORD", "pw"),
            ("OS_PROJECT_NAME", "demo"),
        ]);
        let body = auth_request_body(&c);
        let identity = &body["auth"]["identity"];
        assert_eq!(identity["methods"][0], "password");
        assert_eq!(identity["password"]["user"]["name"], "admin");
        assert_eq!(identity["password"]["user"]["password"], "pw");
        assert_eq!(identity["password"]["user"]["domain"]["id"], "default");
        assert_eq!(body["auth"]["scope"]["project"]["name"], "demo");
        assert_eq!(body["auth"]["scope"]["project"]["domain"]["id"], "default");
    }

    #[test]
    fn token_body_uses_token_method() {
        let c = config(&[
            ("OS_AUTH_URL", "http://keystone:5000"),
            ("OS_TOKEN", "abc"),
            ("OS_PROJECT_ID", "p1"),
        ]);
        let body = auth_request_body(&c);
        assert_eq!(body["auth"]["identity"]["methods"][0], "token");
        assert_eq!(body["auth"]["identity"]["token"]["id"], "abc");
        assert_eq!(body["auth"]["scope"]["project"]["id"], "p1");
    }

    #[test]
    fn application_credential_body_has_no_scope() {
        let c = config(&[
            ("OS_AUTH_URL", "http://keystone:5000"),
            ("OS_APPLICATION_CREDENTIAL_ID", "ac"),
            ("OS_APPLICATION_CREDENTIAL_SECRET", "s"),
            ("OS_PROJECT_ID", "p1"),
        ]);
        let body = auth_request_body(&c);
        assert_eq!(
            body["auth"]["identity"]["application_credential"]["id"],
            "ac"
        );
        assert!(body["auth"].get("scope").is_none());
    }

    #[test]
    fn system_scope_wins_over_project() {
        let c = config(&[
            ("OS_AUTH_URL", "http://keystone:5000"),
            ("OS_USERNAME", "admin"),
            ("OS_PASSWORD", "pw"),
            ("OS_PROJECT_ID", "p1"),
            ("OS_SYSTEM_SCOPE", "true"),
        ]);
        let body = auth_request_body(&c);
        assert_eq!(body["auth"]["scope"]["system"]["all"], true);
    }
}
