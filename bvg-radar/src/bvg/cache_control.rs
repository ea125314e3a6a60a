//! `Cache-Control` header parsing.
//!
//! The BVG API announces freshness as `max-age: 30` (colon separated,
//! optionally padded) instead of the standard `max-age=30`. Only that
//! spelling is recognised.

use tracing::warn;

const MAX_AGE_PREFIX: &str = "max-age:";

/// Extract the `max-age:` freshness window, in seconds, from a
/// `Cache-Control` header value.
///
/// Returns `None` when no directive matches. A matching directive whose
/// value is not an integer is logged and also yields `None`.
pub fn parse_max_age(cache_control: &str) -> Option<i64> {
    let directive = cache_control
        .split(',')
        .map(str::trim)
        .find(|d| d.starts_with(MAX_AGE_PREFIX))?;

    let parsed = directive
        .split(':')
        .nth(1)
        .map(str::trim)
        .and_then(|v| v.parse::<i64>().ok());

    if parsed.is_none() {
        warn!("failed to parse cache control directive: {cache_control}");
    }
    parsed
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn other_directive() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("public".to_string()),
            Just("private".to_string()),
            Just("no-cache".to_string()),
            Just("must-revalidate".to_string()),
            "[a-z]{1,10}",
        ]
    }

    proptest! {
        #[test]
        fn finds_max_age_amid_noise(
            n in 0i64..10_000_000,
            before in prop::collection::vec(other_directive(), 0..4),
            after in prop::collection::vec(other_directive(), 0..4),
            pad_left in " {0,3}",
            pad_right in " {0,3}",
        ) {
            let mut directives = before;
            directives.push(format!("{pad_left}max-age:{pad_left}{n}{pad_right}"));
            directives.extend(after);
            let header = directives.join(",");

            prop_assert_eq!(parse_max_age(&header), Some(n));
        }

        #[test]
        fn never_panics(header in ".*") {
            let _ = parse_max_age(&header);
        }

        #[test]
        fn absent_without_token(header in "[a-z =,0-9-]*") {
            prop_assume!(!header.contains(':'));
            prop_assert_eq!(parse_max_age(&header), None);
        }
    }
}
