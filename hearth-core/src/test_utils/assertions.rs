//! Membership invariant assertions
//!
//! Checks every test can run against a view after a transition, with
//! messages that show the offending roster.

use crate::core_community::{CommunityView, Role, Roster, UserId};
use std::fmt::Debug;

/// Assert that a Result is Err and return the error
pub fn assert_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
        Err(e) => e,
    }
}

/// Assert ranks never decrease along the roster order
pub fn assert_roster_sorted(roster: &Roster) {
    let ranks: Vec<u8> = roster.sorted_view().map(|entry| entry.role.rank()).collect();
    if ranks.windows(2).any(|pair| pair[0] > pair[1]) {
        panic!("Roster is not sorted by rank: {:?}", ranks);
    }
}

/// Assert no user is both a member and a pending requester
pub fn assert_disjoint(view: &CommunityView) {
    let overlap: Vec<&UserId> = view
        .requests
        .iter()
        .map(|entry| &entry.user_id)
        .filter(|user_id| view.roster.contains(user_id))
        .collect();
    if !overlap.is_empty() {
        panic!("Users both members and requesters: {:?}", overlap);
    }
}

/// Assert each listed user holds the listed role
pub fn assert_roles(view: &CommunityView, expected: &[(&str, Role)]) {
    for (id, role) in expected {
        let actual = view.role_of(&UserId::from(*id));
        if actual != Some(*role) {
            panic!(
                "Expected {} to be {:?}, found {:?}. Roster: {:?}",
                id,
                role,
                actual,
                view.roster.sorted_view().collect::<Vec<_>>()
            );
        }
    }
}

/// Roster and request queue invariants together
pub fn assert_view_consistent(view: &CommunityView) {
    assert_roster_sorted(&view.roster);
    assert_disjoint(view);
}

/// Usernames of each display row
pub fn row_names<T, F>(rows: &[Vec<T>], name: F) -> Vec<Vec<String>>
where
    F: Fn(&T) -> &str,
{
    rows.iter()
        .map(|row| row.iter().map(|item| name(item).to_string()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::roster_of;

    #[test]
    fn test_sorted_roster_passes() {
        assert_roster_sorted(&roster_of(&[("m", Role::Member), ("a", Role::Admin)]));
    }

    #[test]
    #[should_panic(expected = "Expected Err")]
    fn test_assert_err_panics_on_ok() {
        assert_err::<u8, ()>(Ok(1));
    }
}
