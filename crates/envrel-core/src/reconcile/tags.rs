use tracing::debug;

use crate::error::Result;
use crate::set;
use crate::store::RelationStore;
use crate::types::{EnvironmentId, TagId};

use super::membership_delta;

/// Bring every tag's reverse index in line with an environment's new tag list.
///
/// `old_tags` is the list currently stored on the environment. Returns
/// `Ok(false)` without touching the store when both lists hold the same tags.
/// Removals are written before additions; the first failed read or write
/// aborts and earlier writes stay wherever the store put them.
pub fn update_environment_tags<S: RelationStore>(
    store: &mut S,
    new_tags: &[TagId],
    old_tags: &[TagId],
    environment_id: EnvironmentId,
) -> Result<bool> {
    let desired = set::to_set(new_tags);
    let current = set::to_set(old_tags);

    let Some((to_remove, to_add)) = membership_delta(&desired, &current) else {
        debug!(environment = %environment_id, "tags unchanged");
        return Ok(false);
    };

    debug!(
        environment = %environment_id,
        remove = to_remove.len(),
        add = to_add.len(),
        "reconciling tags"
    );

    for tag_id in to_remove {
        store.mutate_tag(tag_id, |tag| tag.endpoints.remove(&environment_id))?;
    }

    for tag_id in to_add {
        store.mutate_tag(tag_id, |tag| tag.endpoints.add(environment_id))?;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EntityKind, RelationsError};
    use crate::memory::MemoryStore;
    use crate::types::Tag;

    const ENV: EnvironmentId = EnvironmentId(10);

    /// Store with tags 1..=count, the environment wearing `worn`.
    fn store_with_tags(count: u32, worn: &[u32]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in 1..=count {
            let mut tag = Tag::new(TagId(id), format!("tag{id}"));
            if worn.contains(&id) {
                tag.endpoints.add(ENV);
            }
            store.insert_tag(tag);
        }
        store
    }

    fn ids(raw: &[u32]) -> Vec<TagId> {
        raw.iter().copied().map(TagId).collect()
    }

    fn wears(store: &MemoryStore, tag: u32) -> bool {
        store.tag(TagId(tag)).unwrap().endpoints.contains(&ENV)
    }

    struct Case {
        title: &'static str,
        tags: u32,
        worn: &'static [u32],
        apply: &'static [u32],
        changed: bool,
    }

    #[test]
    fn apply_tag_lists() {
        let cases = [
            Case {
                title: "tags on an untagged environment",
                tags: 3,
                worn: &[],
                apply: &[1, 2, 3],
                changed: true,
            },
            Case {
                title: "replace every tag",
                tags: 6,
                worn: &[1, 2, 3],
                apply: &[4, 5, 6],
                changed: true,
            },
            Case {
                title: "same tags again",
                tags: 3,
                worn: &[1, 2, 3],
                apply: &[1, 2, 3],
                changed: false,
            },
            Case {
                title: "add on top of existing tags",
                tags: 6,
                worn: &[1, 2, 3],
                apply: &[1, 2, 3, 4, 5, 6],
                changed: true,
            },
            Case {
                title: "mix of kept and new tags",
                tags: 6,
                worn: &[1, 2, 3],
                apply: &[2, 4, 5],
                changed: true,
            },
        ];

        for case in cases {
            let mut store = store_with_tags(case.tags, case.worn);
            let changed =
                update_environment_tags(&mut store, &ids(case.apply), &ids(case.worn), ENV)
                    .unwrap();
            assert_eq!(changed, case.changed, "{}", case.title);
            for tag in 1..=case.tags {
                assert_eq!(
                    wears(&store, tag),
                    case.apply.contains(&tag),
                    "{}: tag {tag}",
                    case.title
                );
            }
        }
    }

    #[test]
    fn identical_sets_make_no_store_calls() {
        let mut store = store_with_tags(2, &[1, 2]);
        let changed =
            update_environment_tags(&mut store, &ids(&[2, 1, 2]), &ids(&[1, 2]), ENV).unwrap();
        assert!(!changed);
        assert_eq!(store.stats().reads, 0);
        assert_eq!(store.stats().writes, 0);
    }

    #[test]
    fn untouched_tags_are_not_written() {
        let mut store = store_with_tags(4, &[1, 2, 3]);
        update_environment_tags(&mut store, &ids(&[2, 4]), &ids(&[1, 2, 3]), ENV).unwrap();
        // 1 and 3 lose the environment, 4 gains it, 2 is left alone
        assert_eq!(store.stats().writes, 3);
        assert!(!wears(&store, 1));
        assert!(wears(&store, 2));
        assert!(!wears(&store, 3));
        assert!(wears(&store, 4));
    }

    #[test]
    fn second_run_with_new_as_old_is_noop() {
        let mut store = store_with_tags(3, &[1]);
        assert!(update_environment_tags(&mut store, &ids(&[2, 3]), &ids(&[1]), ENV).unwrap());
        store.reset_stats();
        assert!(!update_environment_tags(&mut store, &ids(&[2, 3]), &ids(&[2, 3]), ENV).unwrap());
        assert_eq!(store.stats().writes, 0);
    }

    #[test]
    fn clearing_tags_removes_environment_everywhere() {
        let mut store = store_with_tags(2, &[1, 2]);
        assert!(update_environment_tags(&mut store, &[], &ids(&[1, 2]), ENV).unwrap());
        assert!(!wears(&store, 1));
        assert!(!wears(&store, 2));
    }

    #[test]
    fn adding_is_idempotent_on_the_tag() {
        let mut store = store_with_tags(1, &[1]);
        // stored list is stale and omits tag 1 though the tag already has the environment
        assert!(update_environment_tags(&mut store, &ids(&[1]), &[], ENV).unwrap());
        assert_eq!(store.tag(TagId(1)).unwrap().endpoints.len(), 1);
    }

    #[test]
    fn missing_tag_aborts_with_not_found() {
        let mut store = store_with_tags(1, &[]);
        let err = update_environment_tags(&mut store, &ids(&[1, 7]), &[], ENV).unwrap_err();
        assert!(matches!(
            err,
            RelationsError::NotFound {
                kind: EntityKind::Tag,
                id: 7
            }
        ));
    }

    #[test]
    fn failed_addition_keeps_earlier_removal() {
        let mut store = store_with_tags(2, &[1]);
        store.fail_writes_to(EntityKind::Tag, TagId(2));
        let err = update_environment_tags(&mut store, &ids(&[2]), &ids(&[1]), ENV).unwrap_err();
        assert!(matches!(err, RelationsError::Persistence(_)));
        assert!(!wears(&store, 1));
        assert!(!wears(&store, 2));
    }
}
