pub mod accounts;
pub mod auth;
pub mod categories;
pub mod doctor;
pub mod export;
pub mod import;
pub mod init;
pub mod loans;
pub mod patterns;
pub mod report;
pub mod tx;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db;
use crate::error::Result;
use crate::settings;

/// Open (and, on first use, initialize) the database in the configured data
/// directory.
pub(crate) fn open_db() -> Result<Connection> {
    let data_dir = settings::get_data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let conn = db::get_connection(&settings::db_path())?;
    db::init_db(&conn)?;
    Ok(conn)
}

/// Open the database and check the saved session token. Every data command
/// goes through here; `setup`/`login` are the only writes allowed without a
/// session.
pub(crate) fn open_authed() -> Result<Connection> {
    let conn = open_db()?;
    let token = settings::load_session_token();
    crate::auth::require_session(&conn, token.as_deref())?;
    Ok(conn)
}

#[derive(Parser)]
#[command(name = "khata", about = "Personal finance tracker: accounts, loans, statements, reports.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for khata data (default: ~/Documents/khata)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// First-run password setup.
    Setup,
    /// Log in and store a session token.
    Login,
    /// Log out and discard the session token.
    Logout,
    /// Change the password (asks for the current one).
    Passwd,
    /// Manage ledger accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage income/expense categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Record and browse transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Parse and commit bank statements.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Track person-to-person loans.
    Loans {
        #[command(subcommand)]
        command: LoansCommands,
    },
    /// Financial reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export data to spreadsheets.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Saved auto-tag patterns.
    Patterns {
        #[command(subcommand)]
        command: PatternsCommands,
    },
    /// Verify and repair account balances.
    Doctor,
    /// Delete all data (keeps the password) and reseed defaults.
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add an account.
    Add {
        /// Account name, e.g. 'HDFC Savings'
        name: String,
        /// bank, cash, credit_card, investment, loan_receivable, loan_payable, other
        #[arg(long)]
        category: String,
        /// asset or liability (defaults to the category's usual side)
        #[arg(long)]
        kind: Option<String>,
        /// Opening balance
        #[arg(long, default_value = "0")]
        opening: f64,
        /// Person name, for loan accounts
        #[arg(long)]
        person: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List accounts.
    List {
        /// Filter: asset or liability
        #[arg(long)]
        kind: Option<String>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
    /// Show one account.
    Show { name: String },
    /// Update an account.
    Update {
        name: String,
        #[arg(long = "name")]
        new_name: Option<String>,
        /// New opening balance (shifts the current balance by the same delta)
        #[arg(long)]
        opening: Option<f64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete an account (blocked while transactions reference it).
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category or sub-category.
    Add {
        name: String,
        /// income or expense
        #[arg(long)]
        kind: String,
        /// Parent category name (one level only)
        #[arg(long)]
        parent: Option<String>,
    },
    /// List categories.
    List {
        #[arg(long)]
        kind: Option<String>,
    },
    /// Delete a category and its children (blocked while referenced).
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record an expense or income.
    Add {
        /// Date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: f64,
        /// Account name
        #[arg(long)]
        account: String,
        /// expense (default) or income
        #[arg(long, default_value = "expense")]
        kind: String,
        /// Category name (auto-tagged from past descriptions when omitted)
        #[arg(long)]
        category: Option<String>,
        /// Linked loan ID
        #[arg(long)]
        loan: Option<i64>,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List transactions.
    List {
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// expense, income or transfer
        #[arg(long)]
        kind: Option<String>,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Only rows without a category
        #[arg(long)]
        untagged: bool,
        /// Substring match on the description
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Edit a transaction (balances are re-applied).
    Edit {
        /// Transaction ID (shown in `khata tx list`)
        id: i64,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        /// expense or income
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a transaction (its balance effect is reversed).
    Delete { id: i64 },
    /// Move money between two accounts.
    Transfer {
        #[arg(long)]
        date: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: f64,
        /// Source account name
        #[arg(long)]
        from: String,
        /// Destination account name
        #[arg(long)]
        to: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Apply one category to several transactions.
    BulkTag {
        /// Category name
        #[arg(long)]
        category: String,
        /// Transaction IDs
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Parse a bank statement into a review file; persists nothing.
    Parse {
        /// Path to the XLSX statement
        file: String,
        /// Review file to write (default: <file>.review.json)
        #[arg(long)]
        out: Option<String>,
    },
    /// Save the reviewed candidates into an account.
    Commit {
        /// Review file from `khata import parse`
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
    },
}

#[derive(Subcommand)]
pub enum LoansCommands {
    /// Record a loan given to or taken from a person.
    Add {
        /// Person name
        person: String,
        /// given or taken
        #[arg(long = "type")]
        loan_type: String,
        #[arg(long)]
        principal: f64,
        /// Annual interest rate, percent
        #[arg(long, default_value = "0")]
        rate: f64,
        /// Start date: YYYY-MM-DD
        #[arg(long)]
        start: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List loans.
    List {
        /// Filter: given or taken
        #[arg(long = "type")]
        loan_type: Option<String>,
    },
    /// Record a repayment.
    Repay {
        /// Loan ID (shown in `khata loans list`)
        id: i64,
        #[arg(long)]
        amount: f64,
        /// Date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Count this payment against interest, not principal
        #[arg(long)]
        interest: bool,
    },
    /// Accrued interest and amount due.
    Interest {
        id: i64,
        /// As-of date (default: today)
        #[arg(long = "as-of")]
        as_of: Option<String>,
        /// simple (default) or compound
        #[arg(long, default_value = "simple")]
        mode: String,
    },
    /// Update a loan.
    Update {
        id: i64,
        #[arg(long)]
        person: Option<String>,
        #[arg(long)]
        principal: Option<f64>,
        #[arg(long)]
        rate: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a loan and its linked account.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Net worth, category subtotals, this month's flows, recent activity.
    Dashboard {
        /// How many recent transactions to show
        #[arg(long, default_value = "10")]
        recent: usize,
    },
    /// Assets and liabilities grouped by category.
    BalanceSheet,
    /// Income and expense grouped by tag.
    IncomeExpense {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// All transactions for a category and its children.
    Category {
        /// Category name
        name: String,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export transactions to a spreadsheet.
    Transactions {
        /// Output file
        #[arg(long)]
        out: String,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Export the balance sheet to a spreadsheet.
    BalanceSheet {
        #[arg(long)]
        out: String,
    },
}

#[derive(Subcommand)]
pub enum PatternsCommands {
    /// List saved description → category patterns.
    List,
    /// Forget a pattern by ID.
    Delete { id: i64 },
}
