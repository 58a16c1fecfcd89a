//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a shopping cart.
///
/// ```text
/// (absent) -> Active -> CheckingOut -> CheckedOut
///                ^          |
///                +----------+ payment failed
/// ```
///
/// `CheckingOut` holds the cart while its payment is in flight; nothing else
/// may change it. `CheckedOut` is terminal: a checked-out cart is kept as the
/// order record and never accepts further changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.cart_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Accepting additions and removals.
    #[default]
    Active,
    /// Reserved by a checkout whose payment has not settled.
    CheckingOut,
    /// Finalized by checkout.
    CheckedOut,
}

impl CartStatus {
    /// Whether the cart can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::CheckedOut)
    }

    /// Whether products may be added or removed.
    #[must_use]
    pub const fn accepts_changes(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::CheckingOut => write!(f, "checking_out"),
            Self::CheckedOut => write!(f, "checked_out"),
        }
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "checking_out" => Ok(Self::CheckingOut),
            "checked_out" => Ok(Self::CheckedOut),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_active() {
        assert_eq!(CartStatus::default(), CartStatus::Active);
        assert!(!CartStatus::Active.is_terminal());
        assert!(CartStatus::CheckedOut.is_terminal());
        assert!(!CartStatus::CheckingOut.is_terminal());
    }

    #[test]
    fn test_only_active_accepts_changes() {
        assert!(CartStatus::Active.accepts_changes());
        assert!(!CartStatus::CheckingOut.accepts_changes());
        assert!(!CartStatus::CheckedOut.accepts_changes());
    }

    #[test]
    fn test_display_matches_serde() {
        for status in [
            CartStatus::Active,
            CartStatus::CheckingOut,
            CartStatus::CheckedOut,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
            assert_eq!(status.to_string().parse::<CartStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("ordered".parse::<CartStatus>().is_err());
    }
}
