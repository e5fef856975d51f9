use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::validation::ValidationError;

/// Subscription plan (`cabinets_plan_check`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Free, Plan::Pro, Plan::Enterprise];

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

/// Tenant lifecycle (`cabinets_status_check`). Cabinets are archived, never hard-deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CabinetStatus {
    #[default]
    Active,
    Trial,
    Suspended,
    Archived,
}

impl CabinetStatus {
    pub const ALL: [CabinetStatus; 4] = [
        CabinetStatus::Active,
        CabinetStatus::Trial,
        CabinetStatus::Suspended,
        CabinetStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CabinetStatus::Active => "active",
            CabinetStatus::Trial => "trial",
            CabinetStatus::Suspended => "suspended",
            CabinetStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CabinetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::new("plan", format!("unknown plan `{s}`")))
    }
}

impl FromStr for CabinetStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CabinetStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ValidationError::new("status", format!("unknown cabinet status `{s}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_known_values() {
        assert_eq!("enterprise".parse::<Plan>().unwrap(), Plan::Enterprise);
        assert_eq!("trial".parse::<CabinetStatus>().unwrap(), CabinetStatus::Trial);

        let err = "gold".parse::<Plan>().unwrap_err();
        assert_eq!(err.field, "plan");
        assert!("deleted".parse::<CabinetStatus>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_wire_values() {
        assert_eq!(serde_json::to_string(&Plan::Pro).unwrap(), r#""pro""#);
        assert!(serde_json::from_str::<Plan>(r#""gold""#).is_err());
        assert_eq!(
            serde_json::from_str::<CabinetStatus>(r#""archived""#).unwrap(),
            CabinetStatus::Archived
        );
    }
}
