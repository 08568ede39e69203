use serde::{Deserialize, Serialize};

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // user email
    pub user_id: i64, // user ID
    pub exp: i64,     // expires at (unix timestamp)
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    pub email: String,
    pub user_id: i64,
}

impl From<Claims> for TokenData {
    fn from(c: Claims) -> Self {
        Self {
            email: c.sub,
            user_id: c.user_id,
        }
    }
}
