//! Validation utilities.

use crate::types::ChatError;

const MAX_IDENTIFIER_LEN: usize = 128;
const MAX_GROUP_NAME_LEN: usize = 100;
const MAX_TEXT_LEN: usize = 10_000;

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Validate a user or chat identifier
    pub fn identifier(label: &str, value: &str) -> Result<(), ChatError> {
        if value.trim().is_empty() {
            return Err(ChatError::validation(format!("{label} cannot be empty")));
        }

        if value.len() > MAX_IDENTIFIER_LEN {
            return Err(ChatError::validation(format!(
                "{label} too long (max {MAX_IDENTIFIER_LEN} characters)"
            )));
        }

        Ok(())
    }

    /// Validate group name
    pub fn group_name(name: &str) -> Result<(), ChatError> {
        if name.trim().is_empty() {
            return Err(ChatError::validation("Group name cannot be empty"));
        }

        if name.chars().count() > MAX_GROUP_NAME_LEN {
            return Err(ChatError::validation(format!(
                "Group name too long (max {MAX_GROUP_NAME_LEN} characters)"
            )));
        }

        Ok(())
    }

    /// Validate message text
    pub fn message_text(text: &str) -> Result<(), ChatError> {
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(ChatError::validation(format!(
                "Message too long (max {MAX_TEXT_LEN} characters)"
            )));
        }

        Ok(())
    }
}
