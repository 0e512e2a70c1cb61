use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bio.as_ref().is_some_and(|bio| bio.chars().count() > 160) {
            return Err(AppError::Validation("简介不能超过160个字符".into()));
        }
        Ok(())
    }
}
