use super::{group_from, DuplicateGroup, FileInfo, MatchReason};
use crate::inspect::ContentInspector;
use std::collections::HashMap;

/// Groups files with byte-identical content
///
/// Each group keeps the file with the shortest filename; the earliest in
/// scan order wins ties. Files that cannot be hashed are left out.
pub fn group_identical(files: &[FileInfo], inspector: &dyn ContentInspector) -> Vec<DuplicateGroup> {
    let mut order: Vec<Vec<FileInfo>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for file in files {
        let hash = match inspector.content_hash(&file.path) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!("Cannot hash {}: {}", file.path.display(), e);
                continue;
            }
        };

        let mut hashed = file.clone();
        hashed.content_hash = Some(hash.clone());

        match index.get(&hash) {
            Some(&slot) => order[slot].push(hashed),
            None => {
                index.insert(hash, order.len());
                order.push(vec![hashed]);
            }
        }
    }

    order
        .into_iter()
        .filter(|members| members.len() > 1)
        .map(|members| {
            let keep = shortest_name(&members);
            group_from(members, keep, MatchReason::Identical)
        })
        .collect()
}

fn shortest_name(members: &[FileInfo]) -> usize {
    let mut best = 0;
    for (i, file) in members.iter().enumerate().skip(1) {
        if file.filename.chars().count() < members[best].filename.chars().count() {
            best = i;
        }
    }
    best
}
