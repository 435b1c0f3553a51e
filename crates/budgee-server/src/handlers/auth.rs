//! Request identity and liveness

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::{Extension, Json};
use serde::Serialize;

use crate::{
    get_client_ip, get_user_email, validate_api_key, ServerConfig, AUTHORIZATION_HEADER,
    CF_ACCESS_USER_HEADER,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    TrustedNetwork,
    CloudflareHeader,
    ApiKey,
    /// Auth disabled (`--no-auth`)
    None,
}

/// Who a request was admitted as; attached to the request by the auth middleware
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user: String,
    pub auth_method: AuthMethod,
}

/// Resolve the caller, in order: trusted network, Cloudflare Access header, API key.
///
/// The Cloudflare header is only safe behind Cloudflare Tunnel, which rewrites it.
/// Exposed directly to the internet it can be spoofed.
pub(crate) fn identify(
    config: &ServerConfig,
    request: &Request,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<Identity> {
    if !config.require_auth {
        return Some(Identity {
            user: get_user_email(request.headers()),
            auth_method: AuthMethod::None,
        });
    }

    if !config.trusted_networks.is_empty() {
        let trusted = get_client_ip(request, connect_info, &config.trusted_proxies)
            .filter(|ip| config.trusted_networks.iter().any(|net| net.contains(ip)));
        if let Some(ip) = trusted {
            return Some(Identity {
                user: ip.to_string(),
                auth_method: AuthMethod::TrustedNetwork,
            });
        }
    }

    let headers = request.headers();
    if let Some(email) = headers
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(Identity {
            user: email.to_string(),
            auth_method: AuthMethod::CloudflareHeader,
        });
    }

    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .filter(|key| validate_api_key(key, &config.api_keys))
        .map(|_| Identity {
            user: "api-key".to_string(),
            auth_method: AuthMethod::ApiKey,
        })
}

/// GET /api/me - Who the auth middleware let through, and how
pub async fn get_me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health - Liveness check, reachable without auth
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
