use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::accounts;

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert the configured default account set for a freshly registered
    /// user. All accounts start with a zero balance.
    pub async fn create_defaults(&self, user_id: i32, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().to_rfc3339();

        let rows = names.iter().map(|name| accounts::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.clone()),
            balance_ore: Set(0),
            created_at: Set(now.clone()),
            ..Default::default()
        });

        accounts::Entity::insert_many(rows)
            .exec(&self.conn)
            .await
            .context("Failed to insert default accounts")?;

        Ok(())
    }

    /// All accounts owned by a user, oldest first.
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<accounts::Model>> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query accounts for user")
    }
}
