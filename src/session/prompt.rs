use dialoguer::{Input, Password};

use crate::error::AuthError;

/// Source of interactive login credentials. Injected into the login flow so
/// it stays testable without a terminal.
pub trait CredentialPrompt {
    fn username(&self) -> Result<String, AuthError>;

    fn password(&self) -> Result<String, AuthError>;
}

/// Prompts on the controlling terminal; the password is masked.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn username(&self) -> Result<String, AuthError> {
        Ok(Input::<String>::new()
            .with_prompt("E-mail address")
            .interact_text()?)
    }

    fn password(&self) -> Result<String, AuthError> {
        Ok(Password::new().with_prompt("Password").interact()?)
    }
}
