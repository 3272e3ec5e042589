use crate::{PostgresStore, database, rows};
use async_trait::async_trait;
use std::collections::HashMap;
use ticketbooth_core::store::{StoreError, StoreResult, UserRepository};
use ticketbooth_core::types::{Role, User, UserId, UserSummary};
use uuid::Uuid;

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(*user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return StoreError::Duplicate {
                        entity: "user",
                        key: user.email.clone(),
                    };
                }
            }
            database(e)
        })?;
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", rows::USER_COLUMNS);
        sqlx::query(&query)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?
            .as_ref()
            .map(rows::user)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", rows::USER_COLUMNS);
        sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?
            .as_ref()
            .map(rows::user)
            .transpose()
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query("UPDATE users SET name = $2, role = $3, password_hash = $4 WHERE id = $1")
            .bind(*user.id.as_uuid())
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(database)?;
        Ok(())
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE role = $1 ORDER BY created_at",
            rows::USER_COLUMNS
        );
        sqlx::query(&query)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(database)?
            .iter()
            .map(rows::user)
            .collect()
    }
}

impl PostgresStore {
    /// Summaries of the given users, keyed by id
    pub(crate) async fn user_summaries(&self, ids: Vec<Uuid>) -> StoreResult<HashMap<UserId, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!("SELECT {} FROM users WHERE id = ANY($1)", rows::USER_COLUMNS);
        sqlx::query(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(database)?
            .iter()
            .map(|row| rows::user(row).map(|user| (user.id, user.summary())))
            .collect()
    }
}
