use serde::{Deserialize, Serialize};

use crate::error::{KhataError, Result};

/// Asset/liability side an account sits on. Income and expense kinds exist
/// for completeness of the chart but the tracker only ever creates
/// balance-bearing asset/liability ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Asset,
    Liability,
    Income,
    Expense,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(KhataError::Validation(format!(
                "Unknown account kind '{s}' (use asset, liability, income, expense)"
            ))),
        }
    }

    /// Debit-normal accounts: a debit increases the natural balance.
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCategory {
    Bank,
    Cash,
    LoanReceivable,
    LoanPayable,
    CreditCard,
    Investment,
    Other,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::LoanReceivable => "loan_receivable",
            Self::LoanPayable => "loan_payable",
            Self::CreditCard => "credit_card",
            Self::Investment => "investment",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bank" => Ok(Self::Bank),
            "cash" => Ok(Self::Cash),
            "loan_receivable" => Ok(Self::LoanReceivable),
            "loan_payable" => Ok(Self::LoanPayable),
            "credit_card" => Ok(Self::CreditCard),
            "investment" => Ok(Self::Investment),
            "other" => Ok(Self::Other),
            _ => Err(KhataError::Validation(format!(
                "Unknown account category '{s}'"
            ))),
        }
    }

    /// Default side of the balance sheet for this category.
    pub fn default_kind(&self) -> AccountKind {
        match self {
            Self::Bank | Self::Cash | Self::LoanReceivable | Self::Investment | Self::Other => {
                AccountKind::Asset
            }
            Self::LoanPayable | Self::CreditCard => AccountKind::Liability,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub kind: AccountKind,
    pub category: AccountCategory,
    pub opening_balance: f64,
    pub current_balance: f64,
    pub person_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(KhataError::Validation(format!(
                "Unknown category kind '{s}' (use income or expense)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: CategoryKind,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    Expense,
    Income,
    Transfer,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            _ => Err(KhataError::Validation(format!(
                "Unknown transaction type '{s}' (use expense, income, transfer)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub kind: TxnKind,
    pub account_id: i64,
    pub payee_account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub loan_id: Option<i64>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanKind {
    Given,
    Taken,
}

impl LoanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Given => "given",
            Self::Taken => "taken",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "given" => Ok(Self::Given),
            "taken" => Ok(Self::Taken),
            _ => Err(KhataError::Validation(format!(
                "Unknown loan type '{s}' (use given or taken)"
            ))),
        }
    }

    /// Ledger category for the linked account.
    pub fn account_category(&self) -> AccountCategory {
        match self {
            Self::Given => AccountCategory::LoanReceivable,
            Self::Taken => AccountCategory::LoanPayable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestMode {
    Simple,
    Compound,
}

impl InterestMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "compound" => Ok(Self::Compound),
            _ => Err(KhataError::Validation(format!(
                "Unknown interest mode '{s}' (use simple or compound)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Loan {
    pub id: i64,
    pub person_name: String,
    pub kind: LoanKind,
    pub principal: f64,
    pub interest_rate: f64,
    pub start_date: String,
    pub total_repaid: f64,
    pub interest_paid: f64,
    pub account_id: Option<i64>,
    pub notes: Option<String>,
}

impl Loan {
    pub fn outstanding(&self) -> f64 {
        self.principal - self.total_repaid
    }
}

/// One unsaved statement row awaiting review. Serialized to the review file
/// between `import parse` and `import commit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub kind: TxnKind,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Statement running balance, kept for display only.
    #[serde(default)]
    pub statement_balance: Option<f64>,
}
