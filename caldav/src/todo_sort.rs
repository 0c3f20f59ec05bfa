// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Client-side ordering of VTODO components.
//!
//! Each sort key maps a todo to a string; dates are rendered as
//! `%Y-%m-%d%H%M%S` so that values of mixed precision compare sensibly.
//! A todo without the keyed property takes the key's default:
//!
//! | key             | default                                 |
//! |-----------------|-----------------------------------------|
//! | `due`           | `2050-01-01`                            |
//! | `dtstart`       | `1970-01-01`                            |
//! | `priority`      | `0`                                     |
//! | `isnt_overdue`  | `1` unless the todo is due before now   |
//! | `hasnt_started` | `1` if the todo starts after now        |
//! | anything else   | `0`                                     |

use jiff::Zoned;

use crate::calendar_object::CalendarObjectResource;
use crate::datetime::{parse_wall_clock, sort_stamp};
use crate::ical::Component;

/// Sort keys used when the caller gives none.
pub const DEFAULT_SORT_KEYS: &[&str] = &["due", "priority"];

/// Properties whose values are compared as dates.
const DATE_PROPERTIES: &[&str] = &[
    "DUE",
    "DTSTART",
    "DTEND",
    "COMPLETED",
    "CREATED",
    "DTSTAMP",
    "LAST-MODIFIED",
    "RECURRENCE-ID",
];

/// Sorts todos in place by `keys`; the sort is stable.
pub fn sort_todos(todos: &mut [CalendarObjectResource], keys: &[&str]) {
    if keys.is_empty() {
        return;
    }
    let now = sort_stamp(Zoned::now().datetime());
    todos.sort_by_cached_key(|todo| {
        todo.parsed()
            .and_then(|cal| cal.primary())
            .map_or_else(Vec::new, |vtodo| sort_key(vtodo, keys, &now))
    });
}

/// Computes the sort key of one VTODO relative to `now`.
pub(crate) fn sort_key(vtodo: &Component, keys: &[&str], now: &str) -> Vec<String> {
    keys.iter()
        .map(|key| match vtodo.value(key) {
            Some(value) => normalize(key, value),
            None => default_for(vtodo, key, now),
        })
        .collect()
}

fn normalize(key: &str, value: &str) -> String {
    let is_date = DATE_PROPERTIES.iter().any(|p| p.eq_ignore_ascii_case(key));
    match is_date.then(|| parse_wall_clock(value)).flatten() {
        Some(dt) => sort_stamp(dt),
        None => value.to_string(),
    }
}

fn default_for(vtodo: &Component, key: &str, now: &str) -> String {
    let date = |name: &str| vtodo.value(name).map(|v| normalize(name, v));
    match key {
        "due" => "2050-01-01".to_string(),
        "dtstart" => "1970-01-01".to_string(),
        "isnt_overdue" => {
            let overdue = date("DUE").is_some_and(|due| due.as_str() < now);
            flag(!overdue)
        }
        "hasnt_started" => flag(date("DTSTART").is_some_and(|start| start.as_str() > now)),
        _ => "0".to_string(),
    }
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(props: &[(&str, &str)]) -> Component {
        let mut c = Component::new("VTODO");
        for (name, value) in props {
            c.set_value(name, *value);
        }
        c
    }

    const NOW: &str = "2024-06-01120000";

    #[test]
    fn missing_due_sorts_after_dated() {
        let dated = sort_key(&todo(&[("DUE", "20230101")]), &["due", "priority"], NOW);
        let undated = sort_key(&todo(&[("PRIORITY", "1")]), &["due", "priority"], NOW);
        assert_eq!(dated, vec!["2023-01-01000000", "0"]);
        assert_eq!(undated, vec!["2050-01-01", "1"]);
        assert!(dated < undated);
    }

    #[test]
    fn dates_of_mixed_precision_compare_as_stamps() {
        let date = sort_key(&todo(&[("DUE", "20230101")]), &["due"], NOW);
        let datetime = sort_key(&todo(&[("DUE", "20230101T090000Z")]), &["due"], NOW);
        assert!(date < datetime);
    }

    #[test]
    fn derived_flags() {
        let overdue = todo(&[("DUE", "20240101"), ("DTSTART", "20250101")]);
        assert_eq!(
            sort_key(&overdue, &["isnt_overdue", "hasnt_started"], NOW),
            vec!["0", "1"]
        );

        let fresh = todo(&[]);
        assert_eq!(
            sort_key(&fresh, &["isnt_overdue", "hasnt_started"], NOW),
            vec!["1", "0"]
        );
    }

    #[test]
    fn other_properties_use_their_value_or_zero() {
        let t = todo(&[("SUMMARY", "Buy milk")]);
        assert_eq!(sort_key(&t, &["summary", "location"], NOW), vec!["Buy milk", "0"]);
    }
}
