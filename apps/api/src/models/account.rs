use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Standard,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Role::Standard),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A user record as the governance layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub promoted_by: Option<Uuid>,
    pub promoted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    /// A fresh, active, standard account.
    #[cfg(test)]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Account {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            role: Role::Standard,
            active: true,
            promoted_by: None,
            promoted_at: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_active_admin(&self) -> bool {
        self.is_admin() && self.active
    }

    #[cfg(test)]
    pub(crate) fn apply_promotion(&mut self, actor: Option<Uuid>, at: DateTime<Utc>) {
        self.role = Role::Admin;
        self.promoted_by = actor;
        self.promoted_at = Some(at);
    }

    #[cfg(test)]
    pub(crate) fn apply_demotion(&mut self) {
        self.role = Role::Standard;
        self.promoted_by = None;
        self.promoted_at = None;
    }
}

/// Raw `accounts` row. `role` is stored as TEXT.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub promoted_by: Option<Uuid>,
    pub promoted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = String;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role.parse()?,
            active: row.active,
            promoted_by: row.promoted_by,
            promoted_at: row.promoted_at,
            created_at: row.created_at,
            last_login: row.last_login,
        })
    }
}
