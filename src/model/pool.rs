use crate::schema::{pool, pool_post};
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub creator_id: i64,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub description: String,
    pub is_active: bool,
    pub category: String,
    /// Member posts in display order.
    pub post_ids: Vec<i64>,
    pub post_count: i32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(AsChangeset, Insertable)]
#[diesel(table_name = pool)]
#[diesel(check_for_backend(Pg))]
pub struct NewPool<'a> {
    pub id: i64,
    pub name: &'a str,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub creator_id: i64,
    pub creator_name: &'a str,
    pub description: &'a str,
    pub is_active: bool,
    pub category: &'a str,
    pub post_count: i32,
}

impl<'a> From<&'a Pool> for NewPool<'a> {
    fn from(pool: &'a Pool) -> Self {
        Self {
            id: pool.id,
            name: &pool.name,
            created_at: pool.created_at,
            updated_at: pool.updated_at,
            creator_id: pool.creator_id,
            creator_name: &pool.creator_name,
            description: &pool.description,
            is_active: pool.is_active,
            category: &pool.category,
            post_count: pool.post_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable, Queryable, Selectable)]
#[diesel(table_name = pool_post)]
#[diesel(check_for_backend(Pg))]
pub struct PoolPost {
    pub pool_id: i64,
    pub position: i32,
    pub post_id: i64,
}
