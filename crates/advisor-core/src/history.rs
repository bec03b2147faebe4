//! History Grouping
//!
//! Presents a user's recent turns as calendar days, the way a chat history
//! view lists them.

use chrono::NaiveDate;
use serde::Serialize;

use crate::turn::Turn;

/// All turns from one UTC calendar day, oldest first
#[derive(Clone, Debug, Serialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub turns: Vec<Turn>,
}

/// Group turns by UTC day, newest day first.
pub fn group_by_day(mut turns: Vec<Turn>) -> Vec<HistoryDay> {
    turns.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut days: Vec<HistoryDay> = Vec::new();
    for turn in turns {
        let date = turn.created_at.date_naive();
        match days.last_mut() {
            Some(day) if day.date == date => day.turns.push(turn),
            _ => days.push(HistoryDay { date, turns: vec![turn] }),
        }
    }

    days.reverse();
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_groups_by_day_newest_first() {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();

        let turns = vec![
            Turn::assistant("u1", "a2").at(day2 + chrono::Duration::minutes(1)),
            Turn::user("u1", "q1").at(day1),
            Turn::user("u1", "q2").at(day2),
        ];

        let days = group_by_day(turns);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, day2.date_naive());
        let contents: Vec<_> = days[0].turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "a2"]);
        assert_eq!(days[1].turns[0].content, "q1");
    }

    #[test]
    fn test_empty_history() {
        assert!(group_by_day(Vec::new()).is_empty());
    }
}
