// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Production Domain Naming
//!
//! Deterministic mapping from an application's brand name and identifier to
//! the hostname it is served from in production:
//!
//! ```text
//! "My Cool App" + 2028362b-a14a-43ac-87d8-0e26c7401623
//!     -> my-cool-app-401623.rapidbuild.app
//! ```
//!
//! The hostname is computed once with the placeholder name at creation time
//! and again once the AI-assigned brand name is known. Both computations go
//! through [`production_domain`], so the result always has the same shape.

use regex::Regex;
use std::sync::LazyLock;

/// Platform domain used when the configuration does not override it.
pub const DEFAULT_PLATFORM_DOMAIN: &str = "rapidbuild.app";

/// Slug used when a name contains nothing usable.
const FALLBACK_SLUG: &str = "app";

/// Number of trailing identifier characters appended to the slug.
const SUFFIX_LEN: usize = 6;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("static regex"));
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("static regex"));

/// Convert arbitrary text into a URL-friendly slug.
///
/// May return an empty string; [`production_domain`] substitutes a fallback.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let hyphenated = WHITESPACE.replace_all(&lowered, "-");
    let stripped = DISALLOWED.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Build the production hostname for an application.
///
/// Never fails and never returns an empty label.
pub fn production_domain(app_name: &str, app_id: &str, platform_domain: &str) -> String {
    let mut slug = slugify(app_name);
    if slug.is_empty() {
        slug = FALLBACK_SLUG.to_string();
    }

    let clean_id: String = app_id.chars().filter(|c| *c != '-').collect();
    let suffix: String = if clean_id.chars().count() > SUFFIX_LEN {
        let skip = clean_id.chars().count() - SUFFIX_LEN;
        clean_id.chars().skip(skip).collect()
    } else {
        clean_id
    };

    format!("{}-{}.{}", slug, suffix, platform_domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_ID: &str = "2028362b-a14a-43ac-87d8-0e26c7401623";

    fn is_valid_hostname(host: &str) -> bool {
        host.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
    }

    #[test]
    fn test_reference_hostname() {
        assert_eq!(
            production_domain("My Cool App!!", APP_ID, DEFAULT_PLATFORM_DOMAIN),
            "my-cool-app-401623.rapidbuild.app"
        );
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("  Hello   World  "), "hello-world");
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("--Taskly--"), "taskly");
        assert_eq!(slugify("Café Übersicht"), "caf-bersicht");
        assert_eq!(slugify("tab\tand\nnewline"), "tab-and-newline");
    }

    #[test]
    fn test_empty_slug_falls_back() {
        assert_eq!(production_domain("!!!", APP_ID, "example.dev"), "app-401623.example.dev");
        assert_eq!(production_domain("", APP_ID, "example.dev"), "app-401623.example.dev");
    }

    #[test]
    fn test_short_identifier_used_whole() {
        assert_eq!(production_domain("Flow", "ab-c", "x.io"), "flow-abc.x.io");
    }

    #[test]
    fn test_recomputation_is_deterministic() {
        let first = production_domain("Nexora", APP_ID, DEFAULT_PLATFORM_DOMAIN);
        let second = production_domain("Nexora", APP_ID, DEFAULT_PLATFORM_DOMAIN);
        assert_eq!(first, second);
    }

    #[test]
    fn test_hostnames_always_valid() {
        let names = [
            "MyApp",
            "  ",
            "Émoji 🚀 Launcher",
            "under_score & ampersand",
            "-leading and trailing-",
            "UPPER lower 123",
            "日本語",
        ];
        for name in names {
            let host = production_domain(name, APP_ID, DEFAULT_PLATFORM_DOMAIN);
            assert!(is_valid_hostname(&host), "invalid hostname {host:?} for {name:?}");
        }
    }
}
