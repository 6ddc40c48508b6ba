//! Session tokens.
//!
//! Tokens are issued by the external auth provider and written into the user store;
//! this crate only looks them up and trusts the identity they carry.

use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: usize,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
    pub value: AuthTokenValue,
}

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

impl AuthToken {
    pub fn new(user_id: usize, value: AuthTokenValue) -> Self {
        AuthToken {
            user_id,
            created: SystemTime::now(),
            last_used: None,
            value,
        }
    }
}
