//! Server command implementation

use std::path::Path;

use anyhow::{anyhow, Result};

use super::{open_db, utc_offset_from_env};

/// Comma-separated list from an environment variable
fn env_list(name: &str) -> Vec<String> {
    std::env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn join_networks<T: std::fmt::Display>(networks: &[T]) -> String {
    networks
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    mcp_port: Option<u16>,
) -> Result<()> {
    println!("🚀 Starting Budgee web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    if let Some(mcp) = mcp_port {
        println!("   MCP server: http://{}:{}/mcp", host, mcp);
    }

    let api_keys = env_list("BUDGEE_API_KEYS");
    let allowed_origins = env_list("BUDGEE_ALLOWED_ORIGINS");

    // Trusted networks skip authentication
    let trusted_networks_str = std::env::var("BUDGEE_TRUSTED_NETWORKS").unwrap_or_default();
    let trusted_networks = budgee_server::parse_trusted_networks(&trusted_networks_str);

    // Trusted proxies may set X-Forwarded-For
    let trusted_proxies_str = std::env::var("BUDGEE_TRUSTED_PROXIES").unwrap_or_default();
    let trusted_proxies = budgee_server::parse_trusted_networks(&trusted_proxies_str);

    let utc_offset = utc_offset_from_env()?;

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: Cloudflare Access header, API key or trusted network");
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (BUDGEE_API_KEYS)",
                api_keys.len()
            );
        }
        if !trusted_networks.is_empty() {
            println!(
                "   🏠 Trusted networks: {} (BUDGEE_TRUSTED_NETWORKS)",
                join_networks(&trusted_networks)
            );
        }
        if !trusted_proxies.is_empty() {
            println!(
                "   🔀 Trusted proxies: {} (BUDGEE_TRUSTED_PROXIES)",
                join_networks(&trusted_proxies)
            );
        }
    }
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = budgee_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        api_keys,
        trusted_networks,
        trusted_proxies,
        utc_offset,
    };

    // Start MCP server if port specified
    if let Some(mcp) = mcp_port {
        let mcp_db = db.clone();
        let mcp_host = host.to_string();
        tokio::spawn(async move {
            if let Err(e) = budgee_server::mcp::start_mcp_server(mcp_db, &mcp_host, mcp).await {
                tracing::error!(error = %e, "MCP server stopped");
            }
        });
    }

    let static_dir_str = static_dir
        .map(|p| {
            p.to_str()
                .ok_or_else(|| anyhow!("--static-dir path must be valid UTF-8"))
        })
        .transpose()?;
    budgee_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
