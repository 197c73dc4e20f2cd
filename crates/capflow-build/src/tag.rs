//! Image tag validation

use crate::error::{BuildError, Result};

const MAX_TAG_LEN: usize = 128;

/// Checks a tag against the registry's rules:
/// at most 128 characters of `[A-Za-z0-9._-]`, not starting with `.` or `-`.
pub fn validate_tag(tag: &str) -> Result<()> {
    match tag_problem(tag) {
        Some(reason) => Err(BuildError::InvalidTag {
            tag: tag.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn tag_problem(tag: &str) -> Option<String> {
    let Some(first) = tag.chars().next() else {
        return Some("empty".to_string());
    };
    if tag.len() > MAX_TAG_LEN {
        return Some(format!("{} characters, max {}", tag.len(), MAX_TAG_LEN));
    }
    if matches!(first, '.' | '-') {
        return Some(format!("must not start with '{}'", first));
    }
    tag.chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_'))
        .map(|c| format!("invalid character '{}'", c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(tag: &str) -> String {
        match validate_tag(tag) {
            Err(BuildError::InvalidTag { reason, .. }) => reason,
            other => panic!("{tag}: expected InvalidTag, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_tags() {
        for tag in ["v1.2.3", "latest", "20240101_abc-def", "A"] {
            assert!(validate_tag(tag).is_ok(), "{tag}");
        }
        assert!(validate_tag(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_invalid_tags() {
        for tag in ["", ".hidden", "-dash", "has space", "slash/tag", "colon:tag"] {
            assert!(
                matches!(validate_tag(tag), Err(BuildError::InvalidTag { .. })),
                "{tag}"
            );
        }
        assert!(validate_tag(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_error_keeps_tag_and_reason_apart() {
        assert_eq!(reason(&"a".repeat(129)), "129 characters, max 128");
        assert_eq!(reason("-dash"), "must not start with '-'");
        assert_eq!(reason("colon:tag"), "invalid character ':'");

        let err = validate_tag("colon:tag").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid image tag 'colon:tag': invalid character ':'"
        );
    }
}
