//! Caller identity.
//!
//! Authentication happens upstream; this service trusts the `X-Fleet-User`
//! and `X-Fleet-Role` headers it is given. Handlers take a [`Caller`]
//! argument to require them.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const USER_HEADER: &str = "x-fleet-user";
pub const ROLE_HEADER: &str = "x-fleet-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Driver,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "driver" => Some(Role::Driver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = header_value(parts, USER_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
        let role = header_value(parts, ROLE_HEADER)
            .and_then(Role::parse)
            .ok_or_else(|| AppError::Unauthorized("Invalid or missing role".to_string()))?;

        Ok(Caller {
            name: name.to_string(),
            role,
        })
    }
}
