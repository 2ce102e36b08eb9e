//! Ranking and rendering of room listings.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::store::RoomRecord;

pub const NO_ROOMS: &str = "No rooms found, go make some";
pub const ELLIPSIS: &str = "…";

/// `(files + 1) * log10(max(2, users))`.
pub fn score(files: i64, users: i64) -> f64 {
    (files.max(0) + 1) as f64 * (users.max(2) as f64).log10()
}

/// Rooms that always sort first or last regardless of score.
#[derive(Debug, Clone, Default)]
pub struct RankOverrides {
    pub first: HashSet<String>,
    pub last: HashSet<String>,
}

impl RankOverrides {
    fn tier(&self, room: &str) -> u8 {
        if self.first.contains(room) {
            2
        } else if self.last.contains(room) {
            0
        } else {
            1
        }
    }
}

/// Best first. Equal scores fall back to the room id, descending.
pub fn rank(mut rooms: Vec<RoomRecord>, overrides: &RankOverrides) -> Vec<RoomRecord> {
    rooms.sort_by(|a, b| {
        overrides
            .tier(&b.room)
            .cmp(&overrides.tier(&a.room))
            .then_with(|| {
                score(b.files, b.users)
                    .partial_cmp(&score(a.files, a.users))
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.room.cmp(&a.room))
    });
    rooms
}

/// Greedy one-line listing that stays within `budget` characters.
pub fn format_listing(rooms: &[RoomRecord], budget: usize) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut used = 0usize;
    let mut truncated = false;

    for room in rooms {
        let token = format!("#{} ({}/{})", room.room, room.users, room.files);
        let cost = token.chars().count() + usize::from(!tokens.is_empty());
        if used + cost > budget {
            truncated = true;
            break;
        }
        used += cost;
        tokens.push(token);
    }

    if truncated {
        // Room for " …".
        let marker = ELLIPSIS.chars().count() + 1;
        while !tokens.is_empty() && used + marker > budget {
            if let Some(last) = tokens.pop() {
                used -= last.chars().count() + usize::from(!tokens.is_empty());
            }
        }
        if tokens.is_empty() {
            return ELLIPSIS.to_string();
        }
        return format!("{} {ELLIPSIS}", tokens.join(" "));
    }

    if tokens.is_empty() {
        return NO_ROOMS.to_string();
    }
    tokens.join(" ")
}

/// Plain-text table for the full listing upload.
///
/// Rooms with neither users nor files are skipped unless `include_empty`;
/// numbering still counts them so positions match the full ranking.
pub fn format_table(rooms: &[RoomRecord], include_empty: bool) -> String {
    let mut out = format!("{:>4}  {:<12} {:>6} {:>6}  {}\n", "#", "Room", "Users", "Files", "Title");
    for (i, room) in rooms.iter().enumerate() {
        if !include_empty && room.users <= 0 && room.files <= 0 {
            continue;
        }
        out.push_str(&format!(
            "{:>4}. {:<12} {:>6} {:>6}  {}\n",
            i + 1,
            room.room,
            room.users,
            room.files,
            room.title
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AliveState;

    fn room(id: &str, files: i64, users: i64) -> RoomRecord {
        RoomRecord {
            room: id.into(),
            title: format!("{id} title"),
            users,
            files,
            alive: AliveState::Alive,
            first_added: 0,
        }
    }

    fn ids(rooms: &[RoomRecord]) -> Vec<&str> {
        rooms.iter().map(|r| r.room.as_str()).collect()
    }

    #[test]
    fn test_score_example() {
        assert!((score(10, 2) - 3.311).abs() < 0.01);
        assert!((score(1, 50) - 3.398).abs() < 0.01);
        // Users below two count as two.
        assert_eq!(score(0, 0), score(0, 2));
    }

    #[test]
    fn test_rank_by_score() {
        let ranked = rank(vec![room("a", 10, 2), room("b", 1, 50)], &RankOverrides::default());
        assert_eq!(ids(&ranked), vec!["b", "a"]);
    }

    #[test]
    fn test_rank_ties_fall_back_to_room_id() {
        let ranked = rank(
            vec![room("aaa", 3, 9), room("ccc", 3, 9), room("bbb", 3, 9)],
            &RankOverrides::default(),
        );
        assert_eq!(ids(&ranked), vec!["ccc", "bbb", "aaa"]);
    }

    #[test]
    fn test_rank_overrides() {
        let overrides = RankOverrides {
            first: ["tiny".to_string()].into(),
            last: ["huge".to_string()].into(),
        };
        let ranked = rank(
            vec![room("huge", 1000, 1000), room("mid", 5, 5), room("tiny", 0, 0)],
            &overrides,
        );
        assert_eq!(ids(&ranked), vec!["tiny", "mid", "huge"]);
    }

    #[test]
    fn test_listing_fits() {
        let rooms = vec![room("abc", 2, 3), room("def", 0, 1)];
        assert_eq!(format_listing(&rooms, 100), "#abc (3/2) #def (1/0)");
    }

    #[test]
    fn test_listing_truncates_with_marker() {
        let rooms: Vec<RoomRecord> = (0..50).map(|i| room(&format!("room{i:02}"), 1, 1)).collect();
        let out = format_listing(&rooms, 60);
        assert!(out.ends_with(" …"));
        assert!(out.chars().count() <= 60);
        assert!(out.starts_with("#room00 (1/1) "));
    }

    #[test]
    fn test_listing_empty() {
        assert_eq!(format_listing(&[], 295), NO_ROOMS);
    }

    #[test]
    fn test_table_skips_empty_rooms_unless_asked() {
        let rooms = vec![room("busy", 4, 2), room("empty", 0, 0)];
        let short = format_table(&rooms, false);
        assert!(short.contains("busy"));
        assert!(!short.contains("empty"));
        assert!(format_table(&rooms, true).contains("   2. empty"));
    }
}
