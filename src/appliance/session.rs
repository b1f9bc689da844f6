//! Session lifecycle against the appliance: route discovery, login, logout

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::appliance::client::{ApiClient, ApiRequest};
use crate::error::{MeterError, Result};

pub const AUTH_API: &str = "SYNO.API.Auth";
pub const DIRSIZE_API: &str = "SYNO.FileStation.DirSize";

const INFO_CGI: &str = "query.cgi";
const INFO_API: &str = "SYNO.API.Info";

/// Session label the appliance uses to scope the token
const SESSION_NAME: &str = "FileStation";

/// An authenticated appliance session.
///
/// Scoped to exactly one measurement run; never reused or persisted.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session token, sent as `_sid` on subsequent calls
    pub sid: String,
    /// CGI path the auth API was discovered at
    pub auth_path: String,
    /// CGI path the dir-size API was discovered at
    pub entry_path: String,
    pub created_at: DateTime<Utc>,
}

/// Route table entry from the discovery call
#[derive(Debug, Clone, Deserialize)]
struct ApiRoute {
    path: String,
    #[serde(rename = "maxVersion", default)]
    max_version: u32,
}

/// Payload of a successful login
#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    sid: Option<String>,
}

/// Owns the authenticate/deauthenticate lifecycle for measurement runs
#[derive(Debug, Clone)]
pub struct SessionManager {
    client: ApiClient,
    account: String,
    password: String,
}

impl SessionManager {
    pub fn new(client: ApiClient, account: &str, password: &str) -> Self {
        SessionManager {
            client,
            account: account.to_string(),
            password: password.to_string(),
        }
    }

    /// Discover the API route table, then authenticate.
    pub async fn open(&self) -> Result<Session> {
        let (auth_path, entry_path) = self.discover().await?;

        tracing::debug!(auth_path = %auth_path, entry_path = %entry_path, "Routes discovered");

        let login = ApiRequest::new(&auth_path, AUTH_API, 3, "login")
            .param("account", self.account.clone())
            .param("passwd", self.password.clone())
            .param("session", SESSION_NAME)
            .param("format", "sid");

        let envelope = self.client.call(&login).await?;
        if !envelope.success {
            return Err(MeterError::Authentication(format!(
                "appliance rejected account '{}' (code {})",
                self.account,
                envelope.error_code()
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| MeterError::Protocol("login response has no data".to_string()))?;
        let login_data: LoginData = serde_json::from_value(data)
            .map_err(|e| MeterError::Protocol(format!("login payload: {}", e)))?;
        let sid = login_data
            .sid
            .ok_or_else(|| MeterError::Protocol("login payload missing sid".to_string()))?;

        tracing::info!("Appliance session opened");

        Ok(Session {
            sid,
            auth_path,
            entry_path,
            created_at: Utc::now(),
        })
    }

    /// Invalidate the session on the appliance. Best-effort: a dangling
    /// remote session must never change the outcome of a run, so failures
    /// are logged and swallowed.
    pub async fn close(&self, session: &Session) {
        let logout = ApiRequest::new(&session.auth_path, AUTH_API, 3, "logout")
            .param("session", SESSION_NAME)
            .param("_sid", session.sid.clone());

        match self.client.call(&logout).await {
            Ok(envelope) if envelope.success => {
                tracing::debug!("Appliance session closed");
            }
            Ok(envelope) => {
                tracing::warn!(
                    code = envelope.error_code(),
                    "Appliance refused logout; session left to expire"
                );
            }
            Err(e) => {
                tracing::warn!("Logout failed: {}; session left to expire", e);
            }
        }
    }

    /// Query the appliance for the CGI paths of the APIs this exporter uses.
    async fn discover(&self) -> Result<(String, String)> {
        let query = ApiRequest::new(INFO_CGI, INFO_API, 1, "query")
            .param("query", format!("{},{}", AUTH_API, DIRSIZE_API));

        let envelope = self.client.call(&query).await?;
        if !envelope.success {
            return Err(MeterError::Discovery(format!(
                "route query rejected (code {})",
                envelope.error_code()
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| MeterError::Discovery("route table response has no data".to_string()))?;
        let routes: std::collections::HashMap<String, ApiRoute> = serde_json::from_value(data)
            .map_err(|e| MeterError::Discovery(format!("route table payload: {}", e)))?;

        let auth = routes
            .get(AUTH_API)
            .ok_or_else(|| MeterError::Discovery(format!("route table missing {}", AUTH_API)))?;
        let dirsize = routes
            .get(DIRSIZE_API)
            .ok_or_else(|| MeterError::Discovery(format!("route table missing {}", DIRSIZE_API)))?;

        tracing::debug!(
            auth_max = auth.max_version,
            dirsize_max = dirsize.max_version,
            "Route versions"
        );

        Ok((auth.path.clone(), dirsize.path.clone()))
    }
}
