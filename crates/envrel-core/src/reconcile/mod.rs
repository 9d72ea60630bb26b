//! Membership reconcilers.
//!
//! Each one compares a desired membership set with the stored one and writes
//! only the records whose membership actually changes. Identical sets cost no
//! store calls beyond what is needed to learn the stored side.

pub mod edge_groups;
pub mod tags;

pub use edge_groups::{
    environment_edge_groups, member_edge_groups, update_environment_edge_groups,
};
pub use tags::update_environment_tags;

use crate::set::{self, Set, SetKey};

/// `(to_remove, to_add)` turning `current` into `desired`, or `None` when the
/// two sets already hold the same keys.
pub(crate) fn membership_delta<K: SetKey>(
    desired: &Set<K>,
    current: &Set<K>,
) -> Option<(Set<K>, Set<K>)> {
    let union = set::union(&[desired, current]);
    let intersection = set::intersection(&[desired, current]);
    if union.len() <= intersection.len() {
        return None;
    }

    let to_remove = set::difference(&[current, desired]);
    let to_add = set::difference(&[desired, current]);
    Some((to_remove, to_add))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::to_set;

    #[test]
    fn same_keys_in_any_order_is_no_delta() {
        assert!(membership_delta(&to_set(&[2u32, 1, 1]), &to_set(&[1, 2])).is_none());
        assert!(membership_delta::<u32>(&Set::new(), &Set::new()).is_none());
    }

    #[test]
    fn delta_splits_removals_and_additions() {
        let (remove, add) = membership_delta(&to_set(&[2u32, 4]), &to_set(&[1, 2, 3])).unwrap();
        assert_eq!(remove.sorted_keys(), vec![1, 3]);
        assert_eq!(add.sorted_keys(), vec![4]);
    }
}
