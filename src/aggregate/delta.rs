//! Honor-delta calculation between two snapshots.
//!
//! A member contributes a change record only when present with positive
//! honor on both sides; anyone absent from either snapshot is silently
//! excluded. Blank usernames never make it through (malformed-data
//! tolerance inherited from the scraper).

use std::collections::HashMap;

use crate::models::{HonorChangeRecord, Snapshot};

fn tracked(username: &str, honor: i64) -> bool {
    !username.trim().is_empty() && honor > 0
}

/// Per-member honor change from `before` to `after`, sorted descending by
/// change. Zero and negative changes are included; the hall-of-fame honor
/// board needs the full membership.
pub fn honor_changes_all(before: &Snapshot, after: &Snapshot) -> Vec<HonorChangeRecord> {
    let previous: HashMap<&str, i64> = before
        .members
        .iter()
        .filter(|m| tracked(&m.username, m.honor))
        .map(|m| (m.username.as_str(), m.honor))
        .collect();

    let mut changes: Vec<HonorChangeRecord> = after
        .members
        .iter()
        .filter(|m| tracked(&m.username, m.honor))
        .filter_map(|m| {
            previous.get(m.username.as_str()).map(|&prev| HonorChangeRecord {
                username: m.username.clone(),
                honor: m.honor,
                honor_change: m.honor - prev,
            })
        })
        .collect();

    // Stable sort: equal changes keep the after-snapshot's member order.
    changes.sort_by(|a, b| b.honor_change.cmp(&a.honor_change));
    changes
}

/// The calendar variant: same computation with zero-change entries removed.
///
/// Kept as a distinct operation from [`honor_changes_all`]; the two views
/// intentionally disagree about zero-change members.
pub fn honor_changes_only(before: &Snapshot, after: &Snapshot) -> Vec<HonorChangeRecord> {
    honor_changes_all(before, after)
        .into_iter()
        .filter(|c| c.honor_change != 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberRecord;

    fn member(username: &str, honor: i64) -> MemberRecord {
        MemberRecord {
            username: username.to_string(),
            honor,
            clan: "test clan".to_string(),
        }
    }

    fn snapshot(timestamp: i64, members: Vec<MemberRecord>) -> Snapshot {
        Snapshot { timestamp, members }
    }

    #[test]
    fn changes_sorted_descending() {
        let before = snapshot(0, vec![member("alice", 100), member("bob", 200)]);
        let after = snapshot(1, vec![member("alice", 150), member("bob", 190)]);

        let changes = honor_changes_all(&before, &after);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].username, "alice");
        assert_eq!(changes[0].honor, 150);
        assert_eq!(changes[0].honor_change, 50);
        assert_eq!(changes[1].username, "bob");
        assert_eq!(changes[1].honor_change, -10);
    }

    #[test]
    fn members_absent_from_either_side_are_excluded() {
        let before = snapshot(0, vec![member("alice", 100), member("gone", 50)]);
        let after = snapshot(1, vec![member("alice", 120), member("new", 30)]);

        let changes = honor_changes_all(&before, &after);
        let names: Vec<&str> = changes.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[test]
    fn zero_honor_members_are_excluded() {
        let before = snapshot(0, vec![member("alice", 0), member("bob", 10)]);
        let after = snapshot(1, vec![member("alice", 40), member("bob", 0)]);

        assert!(honor_changes_all(&before, &after).is_empty());
    }

    #[test]
    fn blank_usernames_never_appear() {
        let before = snapshot(0, vec![member("", 100), member("alice", 100)]);
        let after = snapshot(1, vec![member("", 150), member("alice", 150)]);

        let changes = honor_changes_all(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].username, "alice");
    }

    #[test]
    fn changed_only_variant_drops_zero_changes() {
        let before = snapshot(0, vec![member("idle", 100), member("busy", 100)]);
        let after = snapshot(1, vec![member("idle", 100), member("busy", 130)]);

        let all = honor_changes_all(&before, &after);
        assert_eq!(all.len(), 2);

        let changed = honor_changes_only(&before, &after);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].username, "busy");
    }
}
