//! Platform-license eligibility.

use std::collections::HashSet;

use crate::records::{ObjectPermission, PermissionSetAssignment, SalesforceUser};

/// Objects a platform license cannot access.
pub const CRM_OBJECTS: [&str; 3] = ["Opportunity", "Lead", "Case"];

/// Ids of users with no read access to any CRM object.
///
/// `assignments` must include profile-owned permission sets so that profile
/// grants are seen.
pub fn platform_eligible_user_ids(
    users: &[SalesforceUser],
    assignments: &[PermissionSetAssignment],
    object_permissions: &[ObjectPermission],
) -> HashSet<String> {
    let crm_permission_sets: HashSet<&str> = object_permissions
        .iter()
        .filter(|p| p.permissions_read && CRM_OBJECTS.contains(&p.sobject_type.as_str()))
        .map(|p| p.parent_id.as_str())
        .collect();

    let crm_users: HashSet<&str> = assignments
        .iter()
        .filter(|a| crm_permission_sets.contains(a.permission_set_id.as_str()))
        .map(|a| a.assignee_id.as_str())
        .collect();

    users
        .iter()
        .filter(|u| !crm_users.contains(u.id.as_str()))
        .map(|u| u.id.clone())
        .collect()
}

/// Set `is_platform_eligible` on every user in `eligible`.
pub fn mark_platform_eligible(users: &mut [SalesforceUser], eligible: &HashSet<String>) {
    for user in users.iter_mut() {
        user.is_platform_eligible = eligible.contains(&user.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> SalesforceUser {
        SalesforceUser {
            id: id.to_string(),
            username: id.to_string(),
            last_login_date: None,
            user_type: "Standard".to_string(),
            is_active: true,
            profile: None,
            is_platform_eligible: false,
        }
    }

    fn assign(user: &str, permission_set: &str) -> PermissionSetAssignment {
        PermissionSetAssignment {
            assignee_id: user.to_string(),
            permission_set_id: permission_set.to_string(),
        }
    }

    fn grant(permission_set: &str, object: &str, read: bool) -> ObjectPermission {
        ObjectPermission {
            parent_id: permission_set.to_string(),
            sobject_type: object.to_string(),
            permissions_read: read,
        }
    }

    #[test]
    fn test_users_with_crm_access_are_excluded() {
        let users = vec![user("sales"), user("ops"), user("support")];
        let assignments = vec![
            assign("sales", "ps_sales"),
            assign("ops", "ps_ops"),
            assign("support", "ps_support"),
        ];
        let permissions = vec![
            grant("ps_sales", "Opportunity", true),
            grant("ps_ops", "Account", true),
            grant("ps_support", "Case", true),
        ];

        let eligible = platform_eligible_user_ids(&users, &assignments, &permissions);
        assert_eq!(eligible, HashSet::from(["ops".to_string()]));
    }

    #[test]
    fn test_grant_without_read_does_not_count() {
        let users = vec![user("viewer")];
        let assignments = vec![assign("viewer", "ps")];
        let permissions = vec![grant("ps", "Lead", false)];

        let eligible = platform_eligible_user_ids(&users, &assignments, &permissions);
        assert!(eligible.contains("viewer"));
    }

    #[test]
    fn test_mark_platform_eligible() {
        let mut users = vec![user("a"), user("b")];
        let eligible = HashSet::from(["b".to_string()]);
        mark_platform_eligible(&mut users, &eligible);
        assert!(!users[0].is_platform_eligible);
        assert!(users[1].is_platform_eligible);
    }
}
