use std::collections::HashSet;

use crate::parser::links::strip_tracking;
use crate::records::{Extracted, PostRecord, UserCandidate, UserPost};

/// Records that carry an identity key (a URL).
pub trait Identity {
    fn identity_mut(&mut self) -> &mut Option<String>;
}

impl Identity for PostRecord {
    fn identity_mut(&mut self) -> &mut Option<String> {
        &mut self.url
    }
}

impl Identity for UserCandidate {
    fn identity_mut(&mut self) -> &mut Option<String> {
        &mut self.profile_url
    }
}

impl Identity for UserPost {
    fn identity_mut(&mut self) -> &mut Option<String> {
        &mut self.post_url
    }
}

impl<T: Identity> Identity for Extracted<T> {
    fn identity_mut(&mut self) -> &mut Option<String> {
        self.value.identity_mut()
    }
}

/// Keep the first record per identity key, in input order.
///
/// Keys are rewritten in place to their part before `?`. Records without a
/// key are always kept.
pub fn dedup_keep_order<T: Identity>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for mut item in items {
        let key = item.identity_mut();
        *key = key
            .take()
            .map(|k| strip_tracking(&k).to_string())
            .filter(|k| !k.is_empty());

        if let Some(k) = key.as_ref() {
            if !seen.insert(k.clone()) {
                continue;
            }
        }
        out.push(item);
    }

    out
}
