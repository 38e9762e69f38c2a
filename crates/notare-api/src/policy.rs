//! Ownership and role checks, kept as pure predicates so the rules are
//! testable apart from the HTTP layer. Handlers resolve the entity first;
//! a missing entity is always reported before any of these run.

pub const ADMIN_ROLE: &str = "admin";

pub fn is_admin(role: &str) -> bool {
    role == ADMIN_ROLE
}

/// Reading, editing, deleting, archiving a note and changing its tag set
/// are all author-only operations.
pub fn owns_note(user_id: &str, note_author_id: &str) -> bool {
    user_id == note_author_id
}

/// Tag creation, rename, and deletion are admin-only. Reads are public.
pub fn can_mutate_tag(role: &str) -> bool {
    is_admin(role)
}

/// User records are edited by admins only.
pub fn can_update_user(actor_role: &str) -> bool {
    is_admin(actor_role)
}

/// A user may delete themselves; admins may delete anyone.
pub fn can_delete_user(actor_id: &str, actor_role: &str, target_id: &str) -> bool {
    actor_id == target_id || is_admin(actor_role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_is_exact_match() {
        assert!(is_admin("admin"));
        assert!(!is_admin("Admin"));
        assert!(!is_admin("user"));
        assert!(!is_admin(""));
    }

    #[test]
    fn note_ownership() {
        assert!(owns_note("a", "a"));
        assert!(!owns_note("a", "b"));
    }

    #[test]
    fn tag_mutation_requires_admin() {
        assert!(can_mutate_tag("admin"));
        assert!(!can_mutate_tag("user"));
    }

    #[test]
    fn user_update_requires_admin() {
        assert!(can_update_user("admin"));
        assert!(!can_update_user("user"));
    }

    #[test]
    fn user_delete_allows_self_or_admin() {
        assert!(can_delete_user("a", "user", "a"));
        assert!(can_delete_user("a", "admin", "b"));
        assert!(!can_delete_user("a", "user", "b"));
    }
}
