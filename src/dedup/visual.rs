use super::{best_quality, group_from, DuplicateGroup, FileInfo, MatchReason};
use crate::inspect::{ContentInspector, VisualHash};
use crate::url::MediaKind;

/// Clusters images whose perceptual hashes are within `threshold` bits
///
/// Clustering is greedy in scan order: each unassigned image seeds a cluster
/// and absorbs every later unassigned image within the threshold of the seed.
/// Videos and images that cannot be hashed are never grouped. Each cluster
/// keeps the file with the most pixels, then the most bytes.
pub fn group_similar(
    files: &[FileInfo],
    inspector: &dyn ContentInspector,
    threshold: u32,
) -> Vec<DuplicateGroup> {
    let hashed: Vec<(FileInfo, VisualHash)> = files
        .iter()
        .filter(|f| f.kind == MediaKind::Image)
        .filter_map(|f| {
            let hash = inspector.visual_hash(&f.path)?;
            let mut file = f.clone();
            file.visual_hash = Some(hash);
            Some((file, hash))
        })
        .collect();

    let mut assigned = vec![false; hashed.len()];
    let mut groups = Vec::new();

    for i in 0..hashed.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let (seed, seed_hash) = &hashed[i];
        let mut members = vec![seed.clone()];

        for j in (i + 1)..hashed.len() {
            if !assigned[j] && seed_hash.distance(&hashed[j].1) <= threshold {
                assigned[j] = true;
                members.push(hashed[j].0.clone());
            }
        }

        if members.len() > 1 {
            tracing::debug!(
                "Visual cluster of {} around {} ({})",
                members.len(),
                seed.path.display(),
                seed_hash
            );
            let keep = best_quality(&members);
            groups.push(group_from(members, keep, MatchReason::Visual));
        }
    }

    groups
}
