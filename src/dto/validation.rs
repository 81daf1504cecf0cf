//! Validation helpers for DTOs.

use validator::ValidationError;

const ROOM_ID_MIN: usize = 4;
const ROOM_ID_MAX: usize = 16;
const NAME_MAX: usize = 32;

/// Validates that a room id is a short lowercase-alphanumeric token.
pub fn validate_room_id(id: &str) -> Result<(), ValidationError> {
    if id.len() < ROOM_ID_MIN || id.len() > ROOM_ID_MAX {
        let mut err = ValidationError::new("room_id_length");
        err.message = Some(
            format!(
                "Room id must be between {ROOM_ID_MIN} and {ROOM_ID_MAX} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("room_id_format");
        err.message = Some("Room id must contain only lowercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a participant display name: non-blank and reasonably short.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > NAME_MAX {
        let mut err = ValidationError::new("name_length");
        err.message = Some(format!("Display name must be at most {NAME_MAX} characters").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_id_valid() {
        assert!(validate_room_id("abc123").is_ok());
        assert!(validate_room_id("roomy").is_ok());
        assert!(validate_room_id("0000").is_ok());
    }

    #[test]
    fn test_validate_room_id_invalid() {
        assert!(validate_room_id("abc").is_err()); // too short
        assert!(validate_room_id("abcdefghijklmnopq").is_err()); // too long
        assert!(validate_room_id("ABC123").is_err()); // uppercase
        assert!(validate_room_id("abc 12").is_err()); // space
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Ada").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(33)).is_err());
    }
}
