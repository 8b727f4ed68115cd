//! Team member operations for the repository.
//!
//! Permission grids are stored as a JSON document per member.

use crate::domain::{ModulePermissions, TeamMember, TeamMemberDraft, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::{parse_label, Repository, ID_ATTEMPTS};

impl Repository {
    pub async fn list_team_members(&self) -> Result<Vec<TeamMember>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, role, status, permissions, created_at, last_login
            FROM team_members
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(team_member_from_row).collect()
    }

    pub async fn get_team_member(&self, id: &str) -> Result<Option<TeamMember>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, role, status, permissions, created_at, last_login
            FROM team_members
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(team_member_from_row).transpose()
    }

    /// Insert a member under a fresh `D###` id with the given permission grid.
    ///
    /// # Errors
    /// Returns an error if the insert fails or every drawn id is taken.
    pub async fn insert_team_member(
        &self,
        draft: &TeamMemberDraft,
        permissions: ModulePermissions,
    ) -> Result<TeamMember, sqlx::Error> {
        let member = TeamMember {
            id: self.unused_team_member_id().await?,
            name: draft.name.trim().to_string(),
            email: draft.email.trim().to_string(),
            role: draft.role,
            status: draft.status,
            permissions,
            created_at: TimeMs::now(),
            last_login: None,
        };

        sqlx::query(
            r#"
            INSERT INTO team_members (id, name, email, role, status, permissions, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&member.id)
        .bind(&member.name)
        .bind(&member.email)
        .bind(member.role.as_str())
        .bind(member.status.as_str())
        .bind(encode_permissions(&member.permissions)?)
        .bind(member.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        debug!(member_id = %member.id, role = member.role.as_str(), "Team member created");
        Ok(member)
    }

    async fn unused_team_member_id(&self) -> Result<String, sqlx::Error> {
        for _ in 0..ID_ATTEMPTS {
            let candidate = TeamMember::generate_id();
            if self.get_team_member(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(sqlx::Error::Protocol(
            "could not allocate an unused team member id".to_string(),
        ))
    }

    /// Overwrite name, email, role and status. Returns None if the id is unknown.
    pub async fn update_team_member(
        &self,
        id: &str,
        draft: &TeamMemberDraft,
    ) -> Result<Option<TeamMember>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE team_members SET name = ?, email = ?, role = ?, status = ? WHERE id = ?",
        )
        .bind(draft.name.trim())
        .bind(draft.email.trim())
        .bind(draft.role.as_str())
        .bind(draft.status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_team_member(id).await
    }

    /// Replace a member's permission grid. Returns false if the id is unknown.
    pub async fn set_team_permissions(
        &self,
        id: &str,
        permissions: &ModulePermissions,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE team_members SET permissions = ? WHERE id = ?")
            .bind(encode_permissions(permissions)?)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_team_member(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn encode_permissions(permissions: &ModulePermissions) -> Result<String, sqlx::Error> {
    serde_json::to_string(permissions)
        .map_err(|e| sqlx::Error::Protocol(format!("could not encode permissions: {}", e)))
}

fn team_member_from_row(row: &SqliteRow) -> Result<TeamMember, sqlx::Error> {
    let role: String = row.get("role");
    let status: String = row.get("status");
    let permissions: String = row.get("permissions");
    Ok(TeamMember {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: parse_label(&role)?,
        status: parse_label(&status)?,
        permissions: serde_json::from_str(&permissions)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        created_at: TimeMs::new(row.get("created_at")),
        last_login: row.get::<Option<i64>, _>("last_login").map(TimeMs::new),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::*;
    use crate::domain::{PermissionAction, PermissionModule, Status, TeamRole};

    fn draft(name: &str, role: TeamRole) -> TeamMemberDraft {
        TeamMemberDraft {
            name: name.to_string(),
            email: format!("{}@desk.example.com", name),
            role,
            status: Status::Active,
        }
    }

    #[test]
    fn test_permission_column_encodes_as_json() {
        let grid = ModulePermissions::default().with(
            PermissionModule::Users,
            PermissionAction::Delete,
            true,
        );
        let text = encode_permissions(&grid).unwrap();
        let back: ModulePermissions = serde_json::from_str(&text).unwrap();
        assert_eq!(back, grid);
    }

    #[tokio::test]
    async fn test_insert_roundtrips_role_and_permissions() {
        let (repo, _temp) = setup_test_db().await;
        let member = repo
            .insert_team_member(&draft("dana", TeamRole::Cto), ModulePermissions::default())
            .await
            .unwrap();
        assert!(member.id.starts_with('D'));
        assert_eq!(member.id.len(), 4);

        let fetched = repo.get_team_member(&member.id).await.unwrap().unwrap();
        assert_eq!(fetched, member);
        assert_eq!(fetched.role, TeamRole::Cto);
    }

    #[tokio::test]
    async fn test_update_permissions_and_delete() {
        let (repo, _temp) = setup_test_db().await;
        let member = repo
            .insert_team_member(&draft("sam", TeamRole::Support), ModulePermissions::default())
            .await
            .unwrap();

        let grid = member.permissions.with(
            PermissionModule::Wallets,
            PermissionAction::Edit,
            true,
        );
        assert!(repo.set_team_permissions(&member.id, &grid).await.unwrap());
        let fetched = repo.get_team_member(&member.id).await.unwrap().unwrap();
        assert!(fetched
            .permissions
            .allows(PermissionModule::Wallets, PermissionAction::Edit));

        let updated = repo
            .update_team_member(&member.id, &draft("samuel", TeamRole::Manager))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "samuel");
        assert_eq!(updated.role, TeamRole::Manager);
        assert_eq!(updated.permissions, grid);

        assert!(repo.delete_team_member(&member.id).await.unwrap());
        assert!(repo.list_team_members().await.unwrap().is_empty());
        assert!(!repo
            .set_team_permissions(&member.id, &grid)
            .await
            .unwrap());
    }
}
