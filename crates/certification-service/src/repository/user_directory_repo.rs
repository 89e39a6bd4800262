//! 用户通讯录
//!
//! 读取用户邮箱与提醒偏好；未配置偏好的用户默认接收邮件

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::UserDirectoryTrait;
use crate::error::Result;
use crate::models::UserContact;

pub struct UserDirectoryRepository {
    pool: PgPool,
}

impl UserDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectoryTrait for UserDirectoryRepository {
    async fn get_contact(&self, user_id: &str) -> Result<Option<UserContact>> {
        let contact = sqlx::query_as::<_, UserContact>(
            r#"
            SELECT user_id, email, display_name, COALESCE(email_enabled, TRUE) AS email_enabled
            FROM user_alert_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }
}
