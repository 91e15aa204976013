use rand::{distributions::Alphanumeric, Rng};

pub fn remove_trailling_slash(string: &str) -> String {
    if let Some(end) = string.strip_suffix('/') {
        end.to_string()
    } else {
        string.to_string()
    }
}

/// Strips a trailing `-{app_id}` from a bucket name.
pub fn remove_app_id(bucket: &str, app_id: &str) -> String {
    bucket
        .strip_suffix(app_id)
        .and_then(|rest| rest.strip_suffix('-'))
        .unwrap_or(bucket)
        .to_string()
}

pub fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Folds `new_entries` into `existing` by key.
///
/// An existing entry whose key appears in `new_entries` is replaced in place,
/// existing entries without a match keep their position, and new entries with
/// no existing counterpart are appended in their original order.
pub fn merge_by_key<T, K, F>(new_entries: Vec<T>, existing: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> K,
    K: PartialEq,
{
    let mut pending: Vec<Option<T>> = new_entries.into_iter().map(Some).collect();

    let mut merged: Vec<T> = existing
        .into_iter()
        .map(|entry| {
            let entry_key = key(&entry);
            pending
                .iter_mut()
                .find(|candidate| matches!(candidate, Some(new) if key(new) == entry_key))
                .and_then(Option::take)
                .unwrap_or(entry)
        })
        .collect();

    merged.extend(pending.into_iter().flatten());
    merged
}
