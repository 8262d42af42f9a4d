use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};

pub const SHARE_SLUG_LEN: usize = 10;

/// Opaque, URL-safe identifier used for public menu links.
pub fn generate_share_slug() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_SLUG_LEN)
        .map(char::from)
        .collect()
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn slugs_are_url_safe() {
        let slug = generate_share_slug();
        assert_eq!(slug.len(), SHARE_SLUG_LEN);
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn slugs_do_not_repeat() {
        let slugs: HashSet<String> = (0..1000).map(|_| generate_share_slug()).collect();
        assert_eq!(slugs.len(), 1000);
    }
}
