//! MCP (Model Context Protocol) Server for Budgee
//!
//! Exposes budget and mood data to LLM clients. All tools are read-only.
//!
//! # Architecture
//!
//! The MCP server runs on a separate port from the main REST API, using the
//! Streamable HTTP transport.
//!
//! ```bash
//! budgee serve --port 3000 --mcp-port 3001
//! ```
//!
//! # Available Tools
//!
//! - `get_budget` - Total, remaining and savings balances
//! - `search_transactions` - Expenses by text, mood and period
//! - `get_mood_chart` - Daily spending with weighted mood scores
//! - `get_mood_patterns` - Spending totals per mood
//! - `list_notifications` - Recent notifications

mod tools;

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use budgee_core::db::Database;

pub use tools::*;

/// Budgee MCP Server state
#[derive(Clone)]
pub struct BudgeeMcpServer {
    db: Arc<Mutex<Database>>,
    tool_router: ToolRouter<Self>,
}

impl BudgeeMcpServer {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            tool_router: Self::tool_router(),
        }
    }

    pub(crate) async fn db(&self) -> tokio::sync::MutexGuard<'_, Database> {
        self.db.lock().await
    }
}

/// Render a tool result as pretty JSON text
fn tool_result<T: Serialize>(result: budgee_core::Result<T>) -> Result<CallToolResult, McpError> {
    let value = result.map_err(|e| match e {
        budgee_core::Error::InvalidData(msg) => McpError::invalid_params(msg, None),
        other => McpError::internal_error(other.to_string(), None),
    })?;
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_handler]
impl ServerHandler for BudgeeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "budgee".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Budgee Mindful Budgeting".to_string()),
                website_url: Some("https://github.com/budgee-app/budgee".to_string()),
                icons: None,
            },
            instructions: Some(
                "Budgee tracks a monthly budget, savings, and how the user felt about each \
                 expense. Use the tools to read balances, search expenses, and look at how \
                 spending relates to mood. Amounts are in PHP."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl BudgeeMcpServer {
    #[tool(description = "Get the current budget: total, remaining, savings and the share already spent.")]
    async fn get_budget(&self) -> Result<CallToolResult, McpError> {
        let db = self.db().await;
        tool_result(tools::get_budget(&db))
    }

    #[tool(
        description = "Search expenses by text, mood and period. Returns matching expenses with date, amount, title and mood, plus count and total."
    )]
    async fn search_transactions(
        &self,
        Parameters(params): Parameters<SearchTransactionsParams>,
    ) -> Result<CallToolResult, McpError> {
        let db = self.db().await;
        tool_result(tools::search_transactions(&db, params))
    }

    #[tool(
        description = "Get daily spending for a period with a mood score from 1 (regret) to 5 (excited) for each day."
    )]
    async fn get_mood_chart(
        &self,
        Parameters(params): Parameters<MoodChartParams>,
    ) -> Result<CallToolResult, McpError> {
        let db = self.db().await;
        tool_result(tools::get_mood_chart(&db, params))
    }

    #[tool(
        description = "Get spending totals per mood for a period, with counts, averages and each mood's share of spending."
    )]
    async fn get_mood_patterns(
        &self,
        Parameters(params): Parameters<MoodPatternsParams>,
    ) -> Result<CallToolResult, McpError> {
        let db = self.db().await;
        tool_result(tools::get_mood_patterns(&db, params))
    }

    #[tool(description = "List recent notifications such as monthly budget resets, newest first.")]
    async fn list_notifications(
        &self,
        Parameters(params): Parameters<NotificationsParams>,
    ) -> Result<CallToolResult, McpError> {
        let db = self.db().await;
        tool_result(tools::list_notifications(&db, params))
    }
}

/// Start the MCP server on the given port
pub async fn start_mcp_server(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
    use rmcp::transport::streamable_http_server::StreamableHttpService;

    let service = StreamableHttpService::new(
        move || Ok(BudgeeMcpServer::new(db.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("MCP server ready at http://{}/mcp", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
