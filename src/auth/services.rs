use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult},
};

const BAD_CREDENTIALS: &str = "Wrong email or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    users: &dyn UserRepo,
    name: &str,
    email: &str,
    password: &str,
) -> AppResult<User> {
    let name = name.trim();
    let email = normalize_email(email);

    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }

    if users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(password)?;
    let user = users
        .insert(NewUser {
            name: name.to_string(),
            email: email.clone(),
            password_hash,
        })
        .await?
        .ok_or_else(|| {
            warn!(%email, "email registered concurrently");
            AppError::Conflict("Email already registered".into())
        })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Unknown email and wrong password fail identically.
pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> AppResult<String> {
    let email = normalize_email(email);

    let user = match users.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            warn!(%email, "login unknown email");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
        }
    };

    if !verify_password(password, &user.password_hash) {
        warn!(%email, user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let token = keys.sign(&user.email, user.id).map_err(anyhow::Error::from)?;
    info!(user_id = user.id, "user logged in");
    Ok(token)
}

pub async fn resolve_current_user(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    token: &str,
) -> AppResult<User> {
    let data = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("Invalid token".into())
    })?;

    users.get_by_id(data.user_id).await?.ok_or_else(|| {
        warn!(user_id = data.user_id, "token for missing user");
        AppError::Unauthorized("User not found".into())
    })
}
