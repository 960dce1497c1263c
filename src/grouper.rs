use indexmap::IndexMap;
use std::hash::Hash;

/// Groups `items` by `key_fn`.
///
/// Keys keep their first-seen order and every group keeps the input order of
/// its members, so the first member of a group is stable across runs.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, key_fn: F) -> IndexMap<K, Vec<T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut groups: IndexMap<K, Vec<T>> = IndexMap::new();
    for item in items {
        groups.entry(key_fn(&item)).or_default().push(item);
    }
    groups
}
