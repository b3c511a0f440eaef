//! Customer account records

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AmountError, Balance};

/// Column widths of the `customers` table, in characters
pub const USERNAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MAX_LEN: usize = 255;
pub const NAME_MAX_LEN: usize = 100;
pub const PHONE_NUMBER_MAX_LEN: usize = 20;

/// Registration field the store cannot hold
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must be at most {max} characters")]
pub struct FieldTooLong {
    pub field: &'static str,
    pub max: usize,
}

/// A registered customer with a running balance.
///
/// `version` is the optimistic-concurrency counter maintained by the store;
/// it never leaves the process. The password is compared verbatim on login
/// and is never written into a response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub balance: Decimal,
    #[serde(skip)]
    pub version: i64,
}

impl Account {
    /// First and last name joined by a single space
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn current_balance(&self) -> Result<Balance, AmountError> {
        Balance::new(self.balance)
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

/// Registration candidate, not yet stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub balance: Balance,
}

impl NewAccount {
    /// Check every field against its column width
    pub fn check_lengths(&self) -> Result<(), FieldTooLong> {
        let fields = [
            ("username", Some(&self.username), USERNAME_MAX_LEN),
            ("email", Some(&self.email), EMAIL_MAX_LEN),
            ("password", Some(&self.password), PASSWORD_MAX_LEN),
            ("firstName", Some(&self.first_name), NAME_MAX_LEN),
            ("lastName", Some(&self.last_name), NAME_MAX_LEN),
            ("phoneNumber", self.phone_number.as_ref(), PHONE_NUMBER_MAX_LEN),
        ];

        for (field, value, max) in fields {
            if value.is_some_and(|v| v.chars().count() > max) {
                return Err(FieldTooLong { field, max });
            }
        }
        Ok(())
    }

    /// Attach the store-assigned identity
    pub fn into_account(self, id: i64) -> Account {
        Account {
            id,
            username: self.username,
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            balance: self.balance.value(),
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candidate() -> NewAccount {
        NewAccount {
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            password: "hunter2".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone_number: Some("555-0100".to_string()),
            balance: Balance::zero(),
        }
    }

    #[test]
    fn test_full_name() {
        let account = candidate().into_account(1);
        assert_eq!(account.full_name(), "Jane Doe");
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_password_is_never_serialized() {
        let account = candidate().into_account(1);
        let json = serde_json::to_value(&account).unwrap();

        assert!(json.get("password").is_none());
        assert!(json.get("version").is_none());
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["phoneNumber"], "555-0100");
        assert_eq!(json["balance"], "0.00");
    }

    #[test]
    fn test_password_matches_exactly() {
        let account = candidate().into_account(1);
        assert!(account.password_matches("hunter2"));
        assert!(!account.password_matches("Hunter2"));
        assert!(!account.password_matches("hunter2 "));
    }

    #[test]
    fn test_lengths_at_column_width_are_accepted() {
        let mut account = candidate();
        account.username = "u".repeat(USERNAME_MAX_LEN);
        account.phone_number = Some("5".repeat(PHONE_NUMBER_MAX_LEN));
        // Characters, not bytes
        account.first_name = "é".repeat(NAME_MAX_LEN);

        assert_eq!(account.check_lengths(), Ok(()));
    }

    #[test]
    fn test_overlong_fields_are_rejected() {
        let mut account = candidate();
        account.username = "u".repeat(61);
        let err = account.check_lengths().unwrap_err();
        assert_eq!(err.to_string(), "username must be at most 50 characters");

        let mut account = candidate();
        account.phone_number = Some("5".repeat(25));
        assert_eq!(
            account.check_lengths(),
            Err(FieldTooLong {
                field: "phoneNumber",
                max: PHONE_NUMBER_MAX_LEN
            })
        );

        let mut account = candidate();
        account.email = format!("{}@example.com", "e".repeat(250));
        assert_eq!(account.check_lengths().unwrap_err().field, "email");
    }

    #[test]
    fn test_current_balance() {
        let mut account = candidate().into_account(1);
        account.balance = dec!(12.30);
        assert_eq!(account.current_balance().unwrap().value(), dec!(12.3));
    }
}
