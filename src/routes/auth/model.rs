use serde::{Deserialize, Serialize};

use crate::{database::UserEntity, error::AppError};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: Option<String>,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        if self.password.chars().count() < 6 {
            return Err(AppError::Validation("密码至少6个字符".into()));
        }
        let username_len = self.username.chars().count();
        if !(3..=20).contains(&username_len) {
            return Err(AppError::Validation("用户名长度需在3到20个字符之间".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::Validation("密码不能为空".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: UserEntity,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("邮箱格式无效".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str, username: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            name: None,
        }
    }

    #[test]
    fn signup_validation() {
        assert!(signup("a@b.co", "alice", "secret1").validate().is_ok());
        assert!(signup("not-an-email", "alice", "secret1").validate().is_err());
        assert!(signup("a@b.co", "al", "secret1").validate().is_err());
        assert!(signup("a@b.co", "alice", "12345").validate().is_err());
        assert!(signup("a@b.co", &"x".repeat(21), "secret1").validate().is_err());
    }
}
