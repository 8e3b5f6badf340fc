//! Default back-office accounts, created on first start.

use rusqlite::Connection;

use crate::crypto::hash_password;
use crate::db;
use crate::error::ServiceResult;
use crate::models::{Role, UserInput};

const DEFAULT_PASSWORD: &str = "admin123";

struct SeedUser {
    username: &'static str,
    real_name: &'static str,
    email: &'static str,
    role: Role,
}

const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        username: "admin",
        real_name: "System Administrator",
        email: "admin@hospital.local",
        role: Role::Admin,
    },
    SeedUser {
        username: "staff1",
        real_name: "Front Desk",
        email: "staff1@hospital.local",
        role: Role::Staff,
    },
];

/// Insert each default account whose username is not taken yet.
/// Returns the number of accounts created.
pub fn seed_default_users(conn: &Connection, iterations: u32) -> ServiceResult<usize> {
    let mut created = 0;
    for seed in SEED_USERS {
        if db::exists_user_by_username(conn, seed.username, None)? {
            continue;
        }
        let input = UserInput {
            username: seed.username.to_string(),
            password: None,
            real_name: seed.real_name.to_string(),
            email: Some(seed.email.to_string()),
            phone: None,
            role: seed.role,
            enabled: true,
        };
        let hash = hash_password(DEFAULT_PASSWORD, iterations);
        let id = db::insert_user(conn, &input, &hash, db::local_now())?;
        tracing::warn!(
            user_id = id,
            username = seed.username,
            "Seeded default account with the default password; change it"
        );
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_password;
    use crate::db::{find_user_by_username, open_memory_database};

    #[test]
    fn seeds_once() {
        let conn = open_memory_database().unwrap();
        assert_eq!(seed_default_users(&conn, 1_000).unwrap(), 2);
        assert_eq!(seed_default_users(&conn, 1_000).unwrap(), 0);

        let admin = find_user_by_username(&conn, "admin").unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password(DEFAULT_PASSWORD, &admin.password_hash).unwrap());
        let staff = find_user_by_username(&conn, "staff1").unwrap().unwrap();
        assert_eq!(staff.role, Role::Staff);
    }
}
