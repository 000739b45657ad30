//! Input sanitization utilities
//!
//! Canonical instance identifiers and package-name validation. Package
//! names end up as subprocess arguments and path components, so they are
//! checked before any package manager is spawned.

use crate::constants::reserved;
use crate::error::{HubError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Safe characters for package names, including `@scope/name` forms
static SAFE_PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(@[a-z0-9][a-z0-9._~-]*/)?[a-z0-9][a-z0-9._~-]*$").expect("Invalid regex pattern"));

/// Version tags / ranges the package manager accepts after `name@`
static SAFE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.^~<>=*+_-]+$").expect("Invalid regex pattern"));

/// Characters that could be dangerous in shell contexts
static SHELL_DANGEROUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[;`$(){}|&<>\\'"\n\r\t ]"#).expect("Invalid regex pattern"));

/// Default tag used when an identifier carries none
pub const DEFAULT_TAG: &str = "latest";

/// Normalize a free-form instance name into a canonical identifier.
///
/// Lowercases, maps every run of characters outside `[a-z0-9]` to a single
/// dash and trims dashes from both ends. Returns `None` when nothing usable
/// is left.
pub fn sanitize_name(name: &str) -> Option<String> {
    let mut id = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !id.is_empty() {
                id.push('-');
            }
            pending_dash = false;
            id.push(ch);
        } else {
            pending_dash = true;
        }
    }

    if id.is_empty() { None } else { Some(id) }
}

/// True when `id` collides with a reserved identifier.
pub fn is_reserved(id: &str) -> bool {
    reserved::is_reserved(id)
}

/// Validate a package name is safe to hand to the package manager
pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(HubError::Validation("Package name cannot be empty".to_string()));
    }

    if name.len() > 214 {
        return Err(HubError::Validation(format!(
            "Package name too long (max 214 chars): {}...",
            name.chars().take(50).collect::<String>()
        )));
    }

    if SHELL_DANGEROUS.is_match(name) {
        return Err(HubError::Validation(format!(
            "Package name contains unsafe characters: {}",
            name
        )));
    }

    if name.contains("..") {
        return Err(HubError::Validation(format!(
            "Package name cannot contain path traversal: {}",
            name
        )));
    }

    if !SAFE_PACKAGE_NAME.is_match(name) {
        return Err(HubError::Validation(format!(
            "Package name contains invalid characters: {}",
            name
        )));
    }

    Ok(())
}

/// Split `name[@tag]` (scoped or not) into name and tag, validating both.
pub fn parse_plugin_identifier(identifier: &str) -> Result<(String, String)> {
    let identifier = identifier.trim();
    let split_at = identifier
        .char_indices()
        .skip(1)
        .filter(|(_, c)| *c == '@')
        .map(|(i, _)| i)
        .last();

    let (name, tag) = match split_at {
        Some(i) => (&identifier[..i], &identifier[i + 1..]),
        None => (identifier, DEFAULT_TAG),
    };

    validate_package_name(name)?;

    let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
    if !SAFE_TAG.is_match(tag) {
        return Err(HubError::Validation(format!(
            "Invalid version tag '{}' for {}",
            tag, name
        )));
    }

    Ok((name.to_string(), tag.to_string()))
}

/// Split a scoped package name into `(scope, bare name)`.
pub fn split_scope(name: &str) -> (Option<&str>, &str) {
    if name.starts_with('@')
        && let Some((scope, bare)) = name.split_once('/')
    {
        return (Some(scope), bare);
    }
    (None, name)
}

/// Sanitize a command for display (log purposes only)
/// This does NOT make a command safe to execute
pub fn sanitize_for_display(input: &str) -> String {
    if input.chars().count() > 200 {
        format!("{}...", input.chars().take(200).collect::<String>())
    } else {
        input.to_string()
    }
}
