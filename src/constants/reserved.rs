/// Identifiers a user-supplied instance name may never sanitize to.
///
/// Covers the primary instance, entries that live next to instance data in
/// the storage root, and the runtime's own route names.
pub const ALL: &[&str] = &[
    // Primary instance
    "hub",
    // Storage root entries
    "backups",
    "instances",
    "node_modules",
    "cache",
    // Runtime routes
    "api",
    "static",
    "interface",
    "default",
    "dev",
];

pub fn is_reserved(id: &str) -> bool {
    ALL.contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_are_lowercase() {
        for id in ALL {
            assert_eq!(*id, id.to_lowercase());
        }
    }

    #[test]
    fn hub_is_reserved() {
        assert!(is_reserved("hub"));
        assert!(!is_reserved("kitchen"));
    }
}
