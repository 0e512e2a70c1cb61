use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::UserEntity;

const USER_COLUMNS: &str = "id, email, username, password_hash, name, bio, created_at";

/// 用户存储库实现
pub struct UserRepository;

impl UserRepository {
    /// 创建用户，`password_hash` 由调用方预先计算
    pub async fn create(
        pool: &PgPool,
        email: &str,
        username: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> Result<UserEntity, sqlx::Error> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (id, email, username, password_hash, name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(name)
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    /// 根据ID查找用户
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// 根据邮箱查找用户
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// 根据用户名查找用户
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// 更新资料，未提供的字段保持不变
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name), bio = COALESCE($3, bio)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(bio)
        .fetch_optional(pool)
        .await
    }
}
