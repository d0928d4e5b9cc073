use std::collections::BTreeSet;

use crate::config::RoleTable;
use crate::normalize::NormalizedRow;

/// What a caller may see. `Classes` holds lowercase class keys; an empty set
/// is a valid scope that admits no rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleScope {
    Unrestricted,
    Classes(BTreeSet<String>),
}

impl RoleScope {
    pub fn admits(&self, row: &NormalizedRow) -> bool {
        match self {
            RoleScope::Unrestricted => true,
            RoleScope::Classes(allowed) => {
                row.keys.class.as_ref().is_some_and(|c| allowed.contains(c))
            }
        }
    }
}

/// Scope for a caller holding `roles`. Any admin role bypasses restriction;
/// otherwise the scope is the union of every held role's classes. Unmapped
/// roles contribute nothing.
pub fn scope<S: AsRef<str>>(roles: &[S], table: &RoleTable) -> RoleScope {
    if roles.iter().any(|r| table.is_admin(r.as_ref())) {
        return RoleScope::Unrestricted;
    }
    let allowed = roles
        .iter()
        .filter_map(|r| table.allowed_classes(r.as_ref()))
        .flatten()
        .cloned()
        .collect();
    RoleScope::Classes(allowed)
}

/// Drop every row the scope does not admit. Must run before indexing.
pub fn apply_scope(rows: &[NormalizedRow], scope: &RoleScope) -> Vec<NormalizedRow> {
    match scope {
        RoleScope::Unrestricted => rows.to_vec(),
        RoleScope::Classes(_) => rows.iter().filter(|r| scope.admits(r)).cloned().collect(),
    }
}
