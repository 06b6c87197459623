//! Member-list helpers shared by the merge, region and policy passes.

use std::collections::HashSet;

/// Set-union with stable order: existing members keep their positions,
/// candidates are appended in their own order, duplicates collapse.
///
/// Returns how many members were added.
pub fn merge_unique<'a, I>(members: &mut Vec<String>, candidates: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let before = members.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(members.len());
    members.retain(|m| seen.insert(m.clone()));
    for candidate in candidates {
        if seen.insert(candidate.to_string()) {
            members.push(candidate.to_string());
        }
    }
    members.len().saturating_sub(before)
}
