//! Domain models for Budgee

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Expenses above this amount are flagged in listings
pub const LARGE_EXPENSE_THRESHOLD: f64 = 100.0;

/// Name given to a conversation until a title is generated
pub const DEFAULT_CONVERSATION_NAME: &str = "New Chat";

/// How the user felt about an expense
///
/// Ordered from most positive to most negative. The legacy vocabulary
/// (`rad`, `good`, `meh`, `bad`, `awful`) is accepted on input and maps
/// position-for-position onto this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[serde(alias = "rad")]
    Excited,
    #[serde(alias = "good")]
    Happy,
    #[serde(alias = "meh")]
    Neutral,
    #[serde(alias = "bad")]
    Unhappy,
    #[serde(alias = "awful")]
    Regret,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excited => "excited",
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Unhappy => "unhappy",
            Self::Regret => "regret",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excited => "Excited",
            Self::Happy => "Happy",
            Self::Neutral => "Neutral",
            Self::Unhappy => "Unhappy",
            Self::Regret => "Regret",
        }
    }

    /// All moods, most positive first
    pub fn all() -> &'static [Mood] {
        &[
            Self::Excited,
            Self::Happy,
            Self::Neutral,
            Self::Unhappy,
            Self::Regret,
        ]
    }

    /// Position on the 1..=5 mood scale
    pub fn base_score(&self) -> f64 {
        match self {
            Self::Excited => 5.0,
            Self::Happy => 4.0,
            Self::Neutral => 3.0,
            Self::Unhappy => 2.0,
            Self::Regret => 1.0,
        }
    }

    /// Multiplier applied on top of the base score when averaging a day
    pub fn weight(&self) -> f64 {
        match self {
            Self::Excited => 1.2,
            Self::Happy => 1.1,
            Self::Neutral => 1.0,
            Self::Unhappy => 0.9,
            Self::Regret => 0.8,
        }
    }

    /// Tag from the older vocabulary that maps onto this mood
    pub fn legacy_tag(&self) -> &'static str {
        match self {
            Self::Excited => "rad",
            Self::Happy => "good",
            Self::Neutral => "meh",
            Self::Unhappy => "bad",
            Self::Regret => "awful",
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "excited" | "rad" => Ok(Self::Excited),
            "happy" | "good" => Ok(Self::Happy),
            "neutral" | "meh" => Ok(Self::Neutral),
            "unhappy" | "bad" => Ok(Self::Unhappy),
            "regret" | "awful" => Ok(Self::Regret),
            _ => Err(format!("Unknown mood: {}", s)),
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a ledger entry represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money spent out of the budget
    #[default]
    Expense,
    /// Funds added to the budget
    BudgetDeposit,
    /// Remaining budget moved into savings
    SavingsDeposit,
    /// Savings moved back into the budget
    SavingsWithdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::BudgetDeposit => "budget_deposit",
            Self::SavingsDeposit => "savings_deposit",
            Self::SavingsWithdrawal => "savings_withdrawal",
        }
    }

    /// Title and description recorded for bookkeeping entries
    pub fn bookkeeping_labels(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Expense => None,
            Self::BudgetDeposit => Some(("Add to Budget", "Funds added to budget")),
            Self::SavingsDeposit => Some(("Transfer to Savings", "Budget transferred to savings")),
            Self::SavingsWithdrawal => Some((
                "Transfer from Savings",
                "Funds transferred from savings to budget",
            )),
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "budget_deposit" => Ok(Self::BudgetDeposit),
            "savings_deposit" => Ok(Self::SavingsDeposit),
            "savings_withdrawal" => Ok(Self::SavingsWithdrawal),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub amount: f64,
    /// When the expense happened
    pub date: DateTime<Utc>,
    /// Optional precise ordering key (milliseconds since epoch)
    pub timestamp: Option<i64>,
    pub mood: Mood,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Key used to order transactions within a day, most recent first
    pub fn recency_key(&self) -> i64 {
        self.timestamp
            .unwrap_or_else(|| self.date.timestamp_millis())
    }

    pub fn is_large(&self) -> bool {
        self.amount > LARGE_EXPENSE_THRESHOLD
    }
}

/// A new expense to record
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub timestamp: Option<i64>,
    pub mood: Mood,
}

impl NewTransaction {
    /// Create an expense dated now
    pub fn now(title: &str, description: &str, amount: f64, mood: Mood) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            amount,
            date: Utc::now(),
            timestamp: None,
            mood,
        }
    }

    /// Reject values the ledger cannot store
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        if self.title.trim().is_empty() {
            return Err(Error::InvalidData("Title is required".into()));
        }
        Ok(())
    }
}

/// Partial update of an expense
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<DateTime<Utc>>,
    pub mood: Option<Mood>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.mood.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidData("Title cannot be empty".into()));
            }
        }
        Ok(())
    }
}

/// Amounts must be finite and strictly positive
pub fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidData(format!(
            "Amount must be a positive number, got {}",
            amount
        )));
    }
    Ok(())
}

/// Parse a transaction date from RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`
///
/// Date-only and naive values are read as UTC.
pub fn parse_transaction_date(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(Error::InvalidData(format!("Unparseable date: {}", s)))
}

/// Budget and savings balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetState {
    pub total_budget: f64,
    pub remaining_budget: f64,
    pub savings: f64,
    pub last_budget_reset: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl BudgetState {
    /// Share of the budget already spent, 0.0 when no budget is set
    pub fn spent_ratio(&self) -> f64 {
        if self.total_budget <= 0.0 {
            return 0.0;
        }
        ((self.total_budget - self.remaining_budget) / self.total_budget).clamp(0.0, 1.0)
    }
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown notification type: {}", s)),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry in the notification feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Advisor,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Advisor => "advisor",
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "advisor" => Ok(Self::Advisor),
            _ => Err(format!("Unknown sender: {}", s)),
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chat thread with the advisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub name: String,
    /// Short preview of the latest message
    pub last_message: String,
    /// Advisor replies not yet seen
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_default_name(&self) -> bool {
        self.name == DEFAULT_CONVERSATION_NAME
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// Sort direction for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "oldest" => Ok(Self::Asc),
            "desc" | "newest" => Ok(Self::Desc),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

/// Count and sum for a filtered listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionTotals {
    pub count: i64,
    pub total_amount: f64,
    /// Entries above `LARGE_EXPENSE_THRESHOLD`
    pub large_count: i64,
}
