//! Group membership models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
}

/// Group listing entry for administrators
#[derive(Debug, Clone, Serialize)]
pub struct GroupWithMembers {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<UserSummary>,
}

/// Create a group by name, or extend it when the name exists
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMembersRequest {
    pub user_ids: Vec<Uuid>,
}

/// Result of adding one user to a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipOutcome {
    Added,
    AlreadyMember,
    UnknownUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberResult {
    pub user_id: Uuid,
    pub outcome: MembershipOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMembershipResponse {
    pub group: Group,
    pub created: bool,
    pub results: Vec<MemberResult>,
}

/// One spreadsheet row ready to be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub row: usize,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub national_id: String,
}

/// A spreadsheet row skipped before touching storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub row: usize,
    pub reason: String,
}

/// A spreadsheet row whose user already belonged to the group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingMember {
    pub row: usize,
    pub username: String,
}

/// Summary of a bulk membership import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub users_created: usize,
    pub memberships_added: usize,
    pub already_members: Vec<ExistingMember>,
    pub rejected: Vec<RowRejection>,
}
