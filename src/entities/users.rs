use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Nullable: the profile-edit path inserts rows without a username.
    /// The unique index still holds for rows that carry one.
    #[sea_orm(unique)]
    pub username: Option<String>,

    pub email: String,

    /// Argon2id PHC string, never plaintext.
    pub password_hash: Option<String>,

    /// National-format phone number for the configured region.
    pub phone: String,

    pub address: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounts::Entity")]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
