//! 本地用户档案（按邮箱区分）

use crate::{Database, PersistenceError, Result};
use chrono::Utc;
use log::info;
use rusqlite::{params, OptionalExtension};
use typemaster_core::UserIdentity;

impl Database {
    /// 用邮箱登录，首次使用时创建档案
    pub fn sign_in(&self, email: &str) -> Result<UserIdentity> {
        let email = normalize_email(email)?;

        if let Some(user) = self.find_user_by_email(&email)? {
            return Ok(user);
        }

        self.conn.execute(
            "INSERT INTO users (email, created_at) VALUES (?1, ?2)",
            params![email, Utc::now().timestamp_millis()],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("👤 新建用户档案 #{}: {}", id, email);

        Ok(UserIdentity { id, email })
    }

    pub fn find_user(&self, id: i64) -> Result<UserIdentity> {
        self.conn
            .query_row(
                "SELECT id, email FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(UserIdentity {
                        id: row.get(0)?,
                        email: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(PersistenceError::NotFound)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email FROM users WHERE email = ?1",
                [email],
                |row| {
                    Ok(UserIdentity {
                        id: row.get(0)?,
                        email: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };

    if valid && !email.contains(char::is_whitespace) {
        Ok(email)
    } else {
        Err(PersistenceError::InvalidEmail(email))
    }
}
