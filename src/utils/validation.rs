//! Input validation utilities

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// Regex for validating organization slugs: lowercase alphanumerics and
/// hyphens, no leading or trailing hyphen
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap());

pub const SLUG_MIN_LEN: usize = 3;
pub const SLUG_MAX_LEN: usize = 50;

/// Validate an organization slug
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() >= SLUG_MIN_LEN && slug.len() <= SLUG_MAX_LEN && SLUG_REGEX.is_match(slug)
}

/// Validator-crate hook for `CreateOrganizationRequest`
pub fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        let mut error = validator::ValidationError::new("slug");
        error.message = Some(
            "slug must be 3-50 lowercase alphanumeric characters or hyphens, \
             with no leading or trailing hyphen"
                .into(),
        );
        Err(error)
    }
}

/// Suggest an alternative slug after a collision: the original plus a random
/// 4-character lowercase alphanumeric suffix. Trimmed so the result still
/// fits the length limit.
pub fn suggest_slug(taken: &str) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let base = if taken.len() + 5 > SLUG_MAX_LEN {
        taken[..SLUG_MAX_LEN - 5].trim_end_matches('-')
    } else {
        taken
    };
    format!("{}-{}", base, suffix)
}
