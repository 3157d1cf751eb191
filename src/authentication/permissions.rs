use crate::{jwt::Identity, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLedgers,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLedgers,
            ActionType::ManageAllRecipes,
            ActionType::ManageTags,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,
    ManageOwnRecipes,
    ManageOwnLedgers,

    ManageAllRecipes,
    ManageTags,
}

impl ActionType {
    pub fn authenticate(self, identity: &Identity) -> bool {
        if !identity.authenticated {
            return false;
        }

        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if identity.role != *role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_manage_tags_and_foreign_recipes() {
        let user = Identity::user(1, UserRole::User);
        let admin = Identity::user(2, UserRole::Admin);

        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(!ActionType::ManageTags.authenticate(&user));
        assert!(!ActionType::ManageAllRecipes.authenticate(&user));
        assert!(ActionType::ManageTags.authenticate(&admin));
        assert!(ActionType::ManageAllRecipes.authenticate(&admin));
    }

    #[test]
    fn anonymous_can_do_nothing() {
        assert!(!ActionType::CreateRecipes.authenticate(&Identity::anonymous()));
    }
}
