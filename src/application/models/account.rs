use std::fmt;

use serde::{Deserialize, Serialize};

/// Account identifier, used only to address the statuses endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The acting account, as resolved by the credential-verification endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub acct: String,
}

#[cfg(test)]
mod tests_account {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_account() {
        let json = r#"{"id": "42", "username": "bob", "acct": "bob@example.social"}"#;

        let account: Account = serde_json::from_str(json).unwrap();

        assert_eq!(account.id, AccountId("42".to_string()));
        assert_eq!(account.username, "bob");
        assert_eq!(account.acct, "bob@example.social");
    }
}
