//! E2E tests for message search and jump-to-time over export files.

mod helpers;

use chrono::DateTime;
use jv_journal::{Direction, EntryBuilder, JournalTap, MemoryJournal};
use jv_view::{Edge, JournalView};

use helpers::{ExportFixture, assert_window_consistent, config, memory_view, mixed_entries};

/// Repeated forward search from the last hit visits every match in order,
/// growing the window as it goes.
#[test]
fn e2e_forward_search_is_monotonic() {
    let fx = ExportFixture::write(&mixed_entries());
    let mut view = fx.view(10);
    view.seek_head();
    view.fetch_more(Edge::Tail);

    let mut hits = Vec::new();
    let mut row = 0;
    while let Some(found) = view.search("cron job", row, Direction::Forward) {
        assert!(found > row);
        hits.push(view.row_at(found).unwrap().seqnum);
        row = found;
    }
    assert_eq!(hits.len(), 60);
    assert!(hits.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(hits.first(), Some(&5));
    assert_eq!(hits.last(), Some(&197));
    assert_window_consistent(&view);
}

/// Backward search from the end walks toward the head.
#[test]
fn e2e_backward_search_from_tail() {
    let fx = ExportFixture::write(&mixed_entries());
    let mut view = fx.view(10);
    view.seek_tail();
    view.fetch_more(Edge::Head);
    assert_eq!(view.row_at(view.row_count() - 1).unwrap().seqnum, 199);

    // Head growth shifts row indices, so compare journal positions.
    let mut hits = Vec::new();
    let mut row = view.row_count();
    while let Some(found) = view.search("sshd session 11", row, Direction::Backward) {
        hits.push(view.row_at(found).unwrap().seqnum);
        row = found;
    }
    assert_eq!(hits, vec![114, 113, 112, 111, 11]);
    assert!(!view.can_fetch_more(Edge::Head));
    assert_window_consistent(&view);
}

/// A failed search leaves the rows it materialized along the way.
#[test]
fn e2e_search_miss_keeps_growth() {
    let fx = ExportFixture::write(&mixed_entries());
    let mut view = fx.view(20);
    view.seek_head();
    view.fetch_more(Edge::Tail);
    assert_eq!(view.row_count(), 20);

    assert_eq!(view.search("no such text", 0, Direction::Forward), None);
    assert_eq!(view.row_count(), 180);
    assert!(!view.can_fetch_more(Edge::Tail));
    assert_window_consistent(&view);
}

/// Search is case-sensitive.
#[test]
fn e2e_search_is_case_sensitive() {
    let fx = ExportFixture::write(&mixed_entries());
    let mut view = fx.view(50);
    view.seek_head();
    view.fetch_more(Edge::Tail);
    assert_eq!(view.search("CRON JOB", 0, Direction::Forward), None);
    assert!(view.search("cron job", 0, Direction::Forward).is_some());
}

/// Jumping to a time lands on the entry nearest that time.
#[test]
fn e2e_jump_to_time_over_export() {
    let fx = ExportFixture::write(&mixed_entries());
    let mut view = fx.view(16);
    view.seek_head();
    view.fetch_more(Edge::Tail);

    // 1_700_000_150 is entry 150, a kernel message hidden by the default
    // filter. Entries 149 and 151 are equally near; the earlier one wins.
    let at = DateTime::from_timestamp(1_700_000_150, 0).unwrap();
    let row = view.closest_index_for_data(at).unwrap();
    assert_eq!(view.row_at(row).unwrap().seqnum, 149);
    assert_eq!(view.datetime(row), DateTime::from_timestamp(1_700_000_149, 0));
    assert!(view.can_fetch_more(Edge::Head));
    assert!(view.can_fetch_more(Edge::Tail));
    assert_window_consistent(&view);

    // Far past both ends.
    let early = DateTime::from_timestamp(1_000_000_000, 0).unwrap();
    let row = view.closest_index_for_data(early).unwrap();
    assert_eq!(view.row_at(row).unwrap().seqnum, 1);
    let late = DateTime::from_timestamp(1_900_000_000, 0).unwrap();
    let row = view.closest_index_for_data(late).unwrap();
    assert_eq!(view.row_at(row).unwrap().seqnum, 199);
}

/// Jump on an empty or single-entry journal.
#[test]
fn e2e_jump_on_tiny_journals() {
    let at = DateTime::from_timestamp(50, 0).unwrap();

    let mut empty = memory_view(Vec::new(), 10);
    assert_eq!(empty.closest_index_for_data(at), None);
    assert_eq!(empty.row_count(), 0);

    let mut single = memory_view(vec![EntryBuilder::new(3, 7).build()], 10);
    assert_eq!(single.closest_index_for_data(at), Some(0));
    assert_eq!(single.row_at(0).unwrap().seqnum, 3);
}

/// A read failure during a search is treated as the end of the journal.
#[test]
fn e2e_search_failure_ends_scan() {
    let source = MemoryJournal::sequential(300);
    let tap: JournalTap = source.tap();
    let mut view = JournalView::new(Box::new(source), &config(25));
    view.seek_head();
    view.fetch_more(Edge::Tail);

    tap.fail_after(60);
    assert_eq!(view.search("message 250", 0, Direction::Forward), None);
    assert!(!view.can_fetch_more(Edge::Tail));
    assert!(view.row_count() < 100);
    assert_window_consistent(&view);
}
