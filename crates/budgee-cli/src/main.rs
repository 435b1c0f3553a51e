//! Budgee CLI - Mindful budgeting
//!
//! Usage:
//!   budgee init                            Initialize database
//!   budgee budget set 3000                 Set the monthly budget
//!   budgee add "Coffee" 120 --mood happy   Record an expense
//!   budgee chart                           Daily spending with mood scores
//!   budgee chat send "How am I doing?"     Talk to the advisor
//!   budgee serve --port 3000               Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Add {
            title,
            amount,
            mood,
            description,
            date,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_add(&db, &title, amount, &mood, &description, date.as_deref())
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_transactions_list(&db, 20, None, None),
                Some(TransactionsAction::List {
                    limit,
                    search,
                    mood,
                }) => commands::cmd_transactions_list(
                    &db,
                    limit,
                    search.as_deref(),
                    mood.as_deref(),
                ),
                Some(TransactionsAction::Show { id }) => commands::cmd_transactions_show(&db, id),
                Some(TransactionsAction::Update {
                    id,
                    title,
                    description,
                    amount,
                    mood,
                    date,
                }) => commands::cmd_transactions_update(
                    &db,
                    id,
                    title,
                    description,
                    amount,
                    mood.as_deref(),
                    date.as_deref(),
                ),
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, id)
                }
            }
        }
        Commands::Budget { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(BudgetAction::Show) => commands::cmd_budget_show(&db),
                Some(BudgetAction::Set { amount }) => commands::cmd_budget_set(&db, amount),
                Some(BudgetAction::Add { amount }) => commands::cmd_budget_add(&db, amount),
                Some(BudgetAction::Reset) => commands::cmd_budget_reset(&db),
            }
        }
        Commands::Savings { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                SavingsAction::Deposit { amount } => commands::cmd_savings_deposit(&db, amount),
                SavingsAction::Withdraw { amount } => commands::cmd_savings_withdraw(&db, amount),
            }
        }
        Commands::Chart { from, to } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let offset = commands::utc_offset_from_env()?;
            commands::cmd_chart(&db, from.as_deref(), to.as_deref(), offset)
        }
        Commands::Analyze => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let advisor = commands::advisor_from_env()?;
            let offset = commands::utc_offset_from_env()?;
            commands::cmd_analyze(&db, &advisor, offset).await
        }
        Commands::Chat { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_chat_list(&db, None),
                Some(ChatAction::List { search }) => commands::cmd_chat_list(&db, search.as_deref()),
                Some(ChatAction::New { name }) => commands::cmd_chat_new(&db, name.as_deref()),
                Some(ChatAction::Send { text, conversation }) => {
                    let advisor = commands::advisor_from_env()?;
                    let offset = commands::utc_offset_from_env()?;
                    commands::cmd_chat_send(&db, &advisor, conversation, &text, offset).await
                }
                Some(ChatAction::Show { id }) => commands::cmd_chat_show(&db, id),
                Some(ChatAction::Rename { id, name }) => commands::cmd_chat_rename(&db, id, &name),
                Some(ChatAction::Delete { id }) => commands::cmd_chat_delete(&db, id),
            }
        }
        Commands::Notifications { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_notifications_list(&db, 20),
                Some(NotificationsAction::List { limit }) => {
                    commands::cmd_notifications_list(&db, limit)
                }
                Some(NotificationsAction::Dismiss { id }) => {
                    commands::cmd_notifications_dismiss(&db, id)
                }
                Some(NotificationsAction::Clear) => commands::cmd_notifications_clear(&db),
            }
        }
        Commands::Export {
            file,
            format,
            mood,
            period,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_export(&db, &file, &format, mood.as_deref(), &period)
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            mcp_port,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
                mcp_port,
            )
            .await
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
