use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Role of the user who recorded an expense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[default]
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "staff" => Some(Self::Staff),
            _ => None,
        }
    }

    /// Staff never see expenses recorded by an admin.
    pub fn can_view(&self, created_by_role: Role) -> bool {
        match self {
            Self::Admin => true,
            Self::Staff => created_by_role != Role::Admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub expense_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub created_by: String,
    pub created_by_role: Role,
    pub created_at: DateTime<Utc>,
}

/// For creating new expenses (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub expense_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub created_by: String,
    pub created_by_role: Role,
}
