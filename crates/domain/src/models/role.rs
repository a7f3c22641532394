//! Platform role directory entry.

use serde::{Deserialize, Serialize};

/// A platform role as reported by the group membership API. `position` is
/// the hierarchy slot used for the authority ceiling check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoleInfo {
    pub id: i64,
    pub name: String,
    pub position: i32,
}
