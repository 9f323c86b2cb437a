//! Order status flags.
//!
//! DESIGN
//! ======
//! An order's status is an ordered list of flags rather than a single enum.
//! Primary lifecycle flags (`PENDING` → `IN_PROGRESS` → `READY` → `COMPLETE`)
//! are mutually exclusive by convention: staff actions move between them with
//! `with_primary`, which swaps the primary entry and keeps every secondary
//! flag. Secondary flags (`HAS_PROBLEM`, `CANCELLED`, `RETURN`, `DELAYED`) are
//! independent toggles that may coexist with any primary flag.
//!
//! The list is persisted as a Postgres `TEXT[]` column, so the helpers here
//! convert to and from plain strings.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// FLAGS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusFlag {
    Pending,
    InProgress,
    Ready,
    Complete,
    HasProblem,
    Cancelled,
    Return,
    Delayed,
}

impl StatusFlag {
    pub const PRIMARY: [StatusFlag; 4] = [Self::Pending, Self::InProgress, Self::Ready, Self::Complete];
    pub const SECONDARY: [StatusFlag; 4] = [Self::HasProblem, Self::Cancelled, Self::Return, Self::Delayed];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::Complete => "COMPLETE",
            Self::HasProblem => "HAS_PROBLEM",
            Self::Cancelled => "CANCELLED",
            Self::Return => "RETURN",
            Self::Delayed => "DELAYED",
        }
    }

    /// Parse a flag name. Case-insensitive; accepts `-` in place of `_`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "READY" => Some(Self::Ready),
            "COMPLETE" => Some(Self::Complete),
            "HAS_PROBLEM" => Some(Self::HasProblem),
            "CANCELLED" => Some(Self::Cancelled),
            "RETURN" => Some(Self::Return),
            "DELAYED" => Some(Self::Delayed),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_primary(self) -> bool {
        Self::PRIMARY.contains(&self)
    }
}

impl fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("status list must contain at least one flag")]
    Empty,
    #[error("unknown status flag: {0}")]
    UnknownFlag(String),
    #[error("{0} is a primary status and cannot be toggled")]
    NotToggleable(StatusFlag),
}

// =============================================================================
// STATUS LIST
// =============================================================================

/// Ordered, duplicate-free list of status flags attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StatusFlag>", into = "Vec<StatusFlag>")]
pub struct OrderStatus(Vec<StatusFlag>);

impl OrderStatus {
    /// Status of a freshly placed order.
    #[must_use]
    pub fn pending() -> Self {
        Self(vec![StatusFlag::Pending])
    }

    /// Build from an arbitrary non-empty flag list. Duplicates are dropped,
    /// first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::Empty` for an empty list.
    pub fn from_flags(flags: Vec<StatusFlag>) -> Result<Self, StatusError> {
        if flags.is_empty() {
            return Err(StatusError::Empty);
        }
        let mut out: Vec<StatusFlag> = Vec::with_capacity(flags.len());
        for flag in flags {
            if !out.contains(&flag) {
                out.push(flag);
            }
        }
        Ok(Self(out))
    }

    /// Parse the `TEXT[]` representation stored in Postgres.
    ///
    /// # Errors
    ///
    /// Returns `UnknownFlag` for unrecognised entries and `Empty` for an empty list.
    pub fn from_strings<S: AsRef<str>>(raw: &[S]) -> Result<Self, StatusError> {
        let flags = raw
            .iter()
            .map(|s| StatusFlag::parse(s.as_ref()).ok_or_else(|| StatusError::UnknownFlag(s.as_ref().to_owned())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_flags(flags)
    }

    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|f| f.as_str().to_owned()).collect()
    }

    #[must_use]
    pub fn flags(&self) -> &[StatusFlag] {
        &self.0
    }

    #[must_use]
    pub fn has(&self, flag: StatusFlag) -> bool {
        self.0.contains(&flag)
    }

    /// First primary flag in the list, if any.
    #[must_use]
    pub fn primary(&self) -> Option<StatusFlag> {
        self.0.iter().copied().find(|f| f.is_primary())
    }

    /// Secondary flags in their current order.
    pub fn secondary(&self) -> impl Iterator<Item = StatusFlag> + '_ {
        self.0.iter().copied().filter(|f| !f.is_primary())
    }

    /// Replace the primary entry, keeping secondary flags: `[primary, ...secondary]`.
    #[must_use]
    pub fn with_primary(&self, primary: StatusFlag) -> Self {
        let mut flags = vec![primary];
        flags.extend(self.secondary().filter(|f| *f != primary));
        Self(flags)
    }

    /// Add the secondary flag if absent, remove it if present.
    ///
    /// Removing the last remaining flag is refused by leaving the list
    /// untouched, so a status list never becomes empty.
    ///
    /// # Errors
    ///
    /// Returns `NotToggleable` for primary flags.
    pub fn toggle(&self, flag: StatusFlag) -> Result<Self, StatusError> {
        if flag.is_primary() {
            return Err(StatusError::NotToggleable(flag));
        }
        if self.has(flag) {
            let remaining: Vec<StatusFlag> = self.0.iter().copied().filter(|f| *f != flag).collect();
            if remaining.is_empty() {
                return Ok(self.clone());
            }
            Ok(Self(remaining))
        } else {
            let mut flags = self.0.clone();
            flags.push(flag);
            Ok(Self(flags))
        }
    }

    /// Completing an order clears every other flag.
    #[must_use]
    pub fn completed() -> Self {
        Self(vec![StatusFlag::Complete])
    }

    /// Orders still on the queue: neither complete nor cancelled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.has(StatusFlag::Complete) && !self.has(StatusFlag::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::pending()
    }
}

impl TryFrom<Vec<StatusFlag>> for OrderStatus {
    type Error = StatusError;

    fn try_from(flags: Vec<StatusFlag>) -> Result<Self, Self::Error> {
        Self::from_flags(flags)
    }
}

impl From<OrderStatus> for Vec<StatusFlag> {
    fn from(status: OrderStatus) -> Self {
        status.0
    }
}

// =============================================================================
// LIST FILTER / SORT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderFilter {
    #[default]
    All,
    Active,
    Pending,
    InProgress,
    Ready,
    Complete,
    Problems,
}

impl OrderFilter {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "in-progress" | "in_progress" => Some(Self::InProgress),
            "ready" => Some(Self::Ready),
            "complete" => Some(Self::Complete),
            "problems" => Some(Self::Problems),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    #[default]
    Newest,
    Oldest,
    QueueAsc,
    QueueDesc,
    TotalHigh,
    TotalLow,
}

impl OrderSort {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "newest" => Some(Self::Newest),
            "oldest" => Some(Self::Oldest),
            "queue-asc" => Some(Self::QueueAsc),
            "queue-desc" => Some(Self::QueueDesc),
            "total-high" => Some(Self::TotalHigh),
            "total-low" => Some(Self::TotalLow),
            _ => None,
        }
    }

    /// SQL `ORDER BY` clause. Values are fixed strings, never user input.
    #[must_use]
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "placed_at DESC",
            Self::Oldest => "placed_at ASC",
            Self::QueueAsc => "queue_number ASC, placed_at ASC",
            Self::QueueDesc => "queue_number DESC, placed_at DESC",
            Self::TotalHigh => "total_cents DESC, placed_at DESC",
            Self::TotalLow => "total_cents ASC, placed_at DESC",
        }
    }
}

#[cfg(test)]
#[path = "order_status_test.rs"]
mod tests;
