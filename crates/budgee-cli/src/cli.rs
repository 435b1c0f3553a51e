//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Budgee - Mindful budgeting that tracks how spending feels
#[derive(Parser)]
#[command(name = "budgee")]
#[command(about = "Mood-aware budgeting with an AI advisor", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "budgee.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set BUDGEE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status (encryption, size, balances)
    Status,

    /// Record an expense
    Add {
        /// What the money went to
        title: String,

        /// Amount spent
        amount: f64,

        /// How you felt: excited, happy, neutral, unhappy, regret
        #[arg(short, long)]
        mood: String,

        /// Optional longer note
        #[arg(short, long, default_value = "")]
        description: String,

        /// Date of the expense (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Manage expenses (list, show, update, delete)
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Show or change the monthly budget
    Budget {
        #[command(subcommand)]
        action: Option<BudgetAction>,
    },

    /// Move money between the budget and savings
    Savings {
        #[command(subcommand)]
        action: SavingsAction,
    },

    /// Show daily spending with mood scores
    Chart {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Ask the advisor to review spending against moods
    Analyze,

    /// Talk to the advisor
    Chat {
        #[command(subcommand)]
        action: Option<ChatAction>,
    },

    /// Manage notifications (list, dismiss, clear)
    Notifications {
        #[command(subcommand)]
        action: Option<NotificationsAction>,
    },

    /// Export expenses to CSV or JSON lines
    Export {
        /// Output file
        file: PathBuf,

        /// Output format: csv or json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Only expenses with these moods (comma-separated)
        #[arg(long)]
        mood: Option<String>,

        /// Period: this-month, last-month, last-30-days, last-90-days, this-year, all
        #[arg(long, default_value = "all")]
        period: String,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires Cloudflare Access headers, an API key
        /// or a trusted network.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Port for MCP (Model Context Protocol) server
        ///
        /// When set, starts an MCP server for LLM tool access on the specified port.
        /// Example: --mcp-port 3001
        #[arg(long)]
        mcp_port: Option<u16>,
    },

    /// Manage AI prompts (list, show, path)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent expenses
    List {
        /// Maximum number of expenses to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Search title and description
        #[arg(short, long)]
        search: Option<String>,

        /// Only these moods (comma-separated)
        #[arg(short, long)]
        mood: Option<String>,
    },

    /// Show one expense
    Show {
        /// Transaction ID
        id: i64,
    },

    /// Change an expense (the budget moves by the difference)
    Update {
        /// Transaction ID
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        amount: Option<f64>,

        #[arg(long)]
        mood: Option<String>,

        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete an expense and refund it to the budget
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Show budget and savings
    Show,

    /// Set the monthly budget (resets the remaining amount)
    Set {
        /// New total budget
        amount: f64,
    },

    /// Add funds to the budget
    Add {
        /// Amount to add
        amount: f64,
    },

    /// Run the monthly reset now (moves what is left to savings)
    Reset,
}

#[derive(Subcommand)]
pub enum SavingsAction {
    /// Move money from the remaining budget into savings
    Deposit {
        /// Amount to move
        amount: f64,
    },

    /// Move money from savings back into the budget
    Withdraw {
        /// Amount to move
        amount: f64,
    },
}

#[derive(Subcommand)]
pub enum ChatAction {
    /// List conversations, most recent first
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Start a new conversation
    New {
        /// Conversation name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Send a message (starts a conversation when no ID is given)
    Send {
        /// Message text
        text: String,

        /// Conversation ID
        #[arg(short, long)]
        conversation: Option<i64>,
    },

    /// Show a conversation's messages
    Show {
        /// Conversation ID
        id: i64,
    },

    /// Rename a conversation
    Rename {
        /// Conversation ID
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a conversation and its messages
    Delete {
        /// Conversation ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List notifications, newest first
    List {
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Dismiss one notification
    Dismiss {
        /// Notification ID
        id: i64,
    },

    /// Dismiss all notifications
    Clear,
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Prompt ID (spending_analysis, advisor_chat, chat_title)
        prompt_id: String,
    },

    /// Show the directory where prompt overrides are read from
    Path,
}
