//! 部分更新语句构建
//!
//! 只为提供了值的字段生成 `col = ?`，参数按 name、email、age 的顺序绑定。
//! 空的变更集直接拒绝，不会生成只刷新 `updated_at` 的语句。

use sqlx::{MySql, QueryBuilder};

use super::model::{UpdateUserRequest, User};
use crate::core::error::{CoreError, CoreResult};

pub const NO_FIELDS_MESSAGE: &str = "No fields to update";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i32),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            age: req.age,
        }
    }
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }

    /// 列名与新值
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = Vec::with_capacity(3);
        if let Some(name) = &self.name {
            fields.push(("name", FieldValue::Text(name.clone())));
        }
        if let Some(email) = &self.email {
            fields.push(("email", FieldValue::Text(email.clone())));
        }
        if let Some(age) = self.age {
            fields.push(("age", FieldValue::Int(age)));
        }
        fields
    }

    /// 内存后端使用：把变更写入已有记录
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(age) = self.age {
            user.age = Some(age);
        }
    }

    pub fn ensure_not_empty(&self) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::validation(NO_FIELDS_MESSAGE));
        }
        Ok(())
    }
}

/// 生成 `UPDATE users SET ... , updated_at = CURRENT_TIMESTAMP(6) WHERE id = ?`
pub fn build_update(id: i64, changes: &UserChanges) -> CoreResult<QueryBuilder<'static, MySql>> {
    changes.ensure_not_empty()?;

    let mut builder = QueryBuilder::<MySql>::new("UPDATE users SET ");
    let mut assignments = builder.separated(", ");
    for (column, value) in changes.fields() {
        assignments.push(format!("{} = ", column));
        match value {
            FieldValue::Text(text) => assignments.push_bind_unseparated(text),
            FieldValue::Int(number) => assignments.push_bind_unseparated(number),
        };
    }
    // 微秒精度，同一秒内的多次更新也会推进 updated_at
    assignments.push("updated_at = CURRENT_TIMESTAMP(6)");

    builder.push(" WHERE id = ").push_bind(id);
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_changes_are_rejected() {
        let err = build_update(1, &UserChanges::default()).err().unwrap();
        assert!(matches!(err, CoreError::Validation(ref msg) if msg == NO_FIELDS_MESSAGE));
    }

    #[test]
    fn single_field_update() {
        let changes = UserChanges {
            name: Some("Alice".to_string()),
            ..Default::default()
        };
        let builder = build_update(7, &changes).unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE users SET name = ?, updated_at = CURRENT_TIMESTAMP(6) WHERE id = ?"
        );
    }

    #[test]
    fn all_fields_keep_declaration_order() {
        let changes = UserChanges {
            age: Some(30),
            email: Some("a@example.com".to_string()),
            name: Some("A".to_string()),
        };
        let builder = build_update(7, &changes).unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE users SET name = ?, email = ?, age = ?, updated_at = CURRENT_TIMESTAMP(6) WHERE id = ?"
        );
        assert_eq!(
            changes.fields(),
            vec![
                ("name", FieldValue::Text("A".to_string())),
                ("email", FieldValue::Text("a@example.com".to_string())),
                ("age", FieldValue::Int(30)),
            ]
        );
    }

    #[test]
    fn apply_touches_only_supplied_fields() {
        let mut user = User {
            id: 1,
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            age: Some(35),
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        UserChanges {
            name: Some("Robert".to_string()),
            ..Default::default()
        }
        .apply_to(&mut user);

        assert_eq!(user.name, "Robert");
        assert_eq!(user.email, "bob@example.com");
        assert_eq!(user.age, Some(35));
    }
}
