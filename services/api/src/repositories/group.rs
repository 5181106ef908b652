//! Group membership registry

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use common::{Role, password};
use sqlx::{PgConnection, PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use super::{USER_SUMMARY_COLUMNS, user_summary_from_row};
use crate::models::{
    RemovalOutcome,
    group::{
        ExistingMember, Group, GroupWithMembers, ImportReport, ImportRow, MemberResult,
        MembershipOutcome,
    },
    user::UserSummary,
};

/// Insert a membership unless it already exists
async fn insert_membership(
    conn: &mut PgConnection,
    user_id: Uuid,
    group_id: Uuid,
) -> Result<MembershipOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO user_groups (user_id, group_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, group_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(group_id)
    .execute(conn)
    .await?;

    Ok(if result.rows_affected() > 0 {
        MembershipOutcome::Added
    } else {
        MembershipOutcome::AlreadyMember
    })
}

/// Group repository for database operations
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new group repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All groups by name, each with its members
    pub async fn list_with_members(&self) -> Result<Vec<GroupWithMembers>> {
        let groups = sqlx::query("SELECT id, name FROM groups ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let member_rows = sqlx::query(&format!(
            r#"
            SELECT ug.group_id, {}
            FROM user_groups ug
            JOIN users u ON u.id = ug.user_id
            JOIN roles r ON r.id = u.role_id
            ORDER BY u.surname, u.name, u.id
            "#,
            USER_SUMMARY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<Uuid, Vec<UserSummary>> = HashMap::new();
        for row in &member_rows {
            let group_id: Uuid = row.try_get("group_id")?;
            members
                .entry(group_id)
                .or_default()
                .push(user_summary_from_row(row)?);
        }

        groups
            .iter()
            .map(|row| -> Result<GroupWithMembers> {
                let id: Uuid = row.try_get("id")?;
                Ok(GroupWithMembers {
                    id,
                    name: row.try_get("name")?,
                    members: members.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, name FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<Group> {
            Ok(Group {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })
        })
        .transpose()
    }

    /// Fetch the group with this name, creating it if needed
    ///
    /// The flag is true when this call created the group.
    pub async fn create_or_get(&self, name: &str) -> Result<(Group, bool)> {
        let created: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO groups (name)
            VALUES ($1)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = created {
            info!("Created group '{}'", name);
            return Ok((
                Group {
                    id,
                    name: name.to_string(),
                },
                true,
            ));
        }

        let id: Uuid = sqlx::query_scalar("SELECT id FROM groups WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok((
            Group {
                id,
                name: name.to_string(),
            },
            false,
        ))
    }

    /// Add users to a group; existing memberships are left untouched
    pub async fn add_members(&self, group_id: Uuid, user_ids: &[Uuid]) -> Result<Vec<MemberResult>> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(user_ids.len());

        for &user_id in user_ids {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;

            let outcome = if exists {
                insert_membership(&mut tx, user_id, group_id).await?
            } else {
                MembershipOutcome::UnknownUser
            };

            results.push(MemberResult { user_id, outcome });
        }

        tx.commit().await?;

        Ok(results)
    }

    /// Remove a membership; absent memberships are not an error
    pub async fn remove(&self, user_id: Uuid, group_id: Uuid) -> Result<RemovalOutcome> {
        let result = sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(RemovalOutcome::from_rows_affected(result.rows_affected()))
    }

    pub async fn members_of(&self, group_id: Uuid) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM user_groups ug
            JOIN users u ON u.id = ug.user_id
            JOIN roles r ON r.id = u.role_id
            WHERE ug.group_id = $1
            ORDER BY u.surname, u.name, u.id
            "#,
            USER_SUMMARY_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_summary_from_row).collect()
    }

    pub async fn groups_of(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT group_id FROM user_groups WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }

    /// Delete a group
    ///
    /// Memberships are removed and the group's events become ungrouped.
    pub async fn delete(&self, group_id: Uuid) -> Result<RemovalOutcome> {
        info!("Deleting group {}", group_id);

        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(RemovalOutcome::from_rows_affected(result.rows_affected()))
    }

    /// Apply a spreadsheet import to a group in a single transaction
    ///
    /// Unknown usernames become new members whose initial password is their
    /// national id. Known users only gain the membership.
    pub async fn import_members(&self, group_id: Uuid, rows: &[ImportRow]) -> Result<ImportReport> {
        info!("Importing {} row(s) into group {}", rows.len(), group_id);

        let mut tx = self.pool.begin().await?;
        let mut report = ImportReport::default();

        for row in rows {
            let existing: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
                    .bind(&row.username)
                    .fetch_optional(&mut *tx)
                    .await?;

            let user_id = match existing {
                Some(id) => id,
                None => {
                    let password_hash = password::hash_password(&row.national_id)?;
                    let id: Uuid = sqlx::query_scalar(
                        r#"
                        INSERT INTO users (username, name, surname, password_hash, role_id)
                        SELECT $1, $2, $3, $4, id FROM roles WHERE name = $5
                        RETURNING id
                        "#,
                    )
                    .bind(&row.username)
                    .bind(&row.name)
                    .bind(&row.surname)
                    .bind(&password_hash)
                    .bind(Role::Member.as_str())
                    .fetch_one(&mut *tx)
                    .await?;

                    report.users_created += 1;
                    id
                }
            };

            match insert_membership(&mut tx, user_id, group_id).await? {
                MembershipOutcome::Added => report.memberships_added += 1,
                _ => {
                    warn!("Row {}: {} is already a member", row.row, row.username);
                    report.already_members.push(ExistingMember {
                        row: row.row,
                        username: row.username.clone(),
                    });
                }
            }
        }

        tx.commit().await?;

        info!(
            "Import into group {} done: {} created, {} added, {} already members",
            group_id,
            report.users_created,
            report.memberships_added,
            report.already_members.len()
        );

        Ok(report)
    }
}
