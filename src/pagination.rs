//! Relay-style cursor pagination
//!
//! Windows an ordered sequence with `after`, `before`, `first` and `last`,
//! applied in exactly that order, so `first` + `last` narrow a slice within a
//! slice. Cursors are opaque offsets into the sequence the caller supplied.

use tracing::debug;

use crate::codec::{cursor_to_offset, offset_to_cursor};
use crate::RelayError;

/// Page information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Edge in a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

/// Connection (paginated result)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Create new connection from a page that starts the sequence
    ///
    /// Cursors are offsets from 0. For a page taken further along, use
    /// [`Connection::new_at`] so cursors stay valid as `after`/`before`.
    pub fn new(items: Vec<T>, has_next: bool, has_previous: bool) -> Self {
        Self::new_at(items, 0, has_next, has_previous)
    }

    /// Create new connection from a page whose first item sits at
    /// `start_offset` in the whole sequence
    pub fn new_at(items: Vec<T>, start_offset: usize, has_next: bool, has_previous: bool) -> Self {
        let edges: Vec<Edge<T>> = items
            .into_iter()
            .enumerate()
            .map(|(idx, node)| Edge {
                cursor: offset_to_cursor(start_offset + idx),
                node,
            })
            .collect();

        Self::from_edges(edges, has_next, has_previous)
    }

    /// Create empty connection
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    fn from_edges(edges: Vec<Edge<T>>, has_next: bool, has_previous: bool) -> Self {
        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());

        Self {
            edges,
            page_info: PageInfo {
                has_next_page: has_next,
                has_previous_page: has_previous,
                start_cursor,
                end_cursor,
            },
        }
    }

    /// Nodes of the page, in order
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// Pagination arguments
///
/// Follows the Relay Cursor Connections Specification:
/// https://relay.dev/graphql/connections.htm
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationInput {
    /// Keep at most this many items from the front of the window
    pub first: Option<i32>,

    /// Keep only items strictly after this cursor
    pub after: Option<String>,

    /// Keep at most this many items from the back of the window
    pub last: Option<i32>,

    /// Keep only items strictly before this cursor
    pub before: Option<String>,
}

impl PaginationInput {
    /// Validate pagination input
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(first) = self.first {
            if first < 0 {
                return Err(RelayError::Pagination(
                    "'first' must be non-negative".to_string(),
                ));
            }
        }

        if let Some(last) = self.last {
            if last < 0 {
                return Err(RelayError::Pagination(
                    "'last' must be non-negative".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Position of a materialized slice within the full sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceInfo {
    /// Offset of the first materialized item
    pub slice_start: usize,
    /// Length of the full sequence
    pub array_length: usize,
}

/// Build a connection over a fully materialized sequence
pub fn connection_from_array<T>(
    items: Vec<T>,
    input: &PaginationInput,
) -> crate::Result<Connection<T>> {
    let array_length = items.len();
    connection_from_array_slice(
        items,
        input,
        SliceInfo {
            slice_start: 0,
            array_length,
        },
    )
}

/// Build a connection when only part of the sequence was loaded
///
/// `slice` holds the items at offsets `slice_start..slice_start + slice.len()`.
/// Edges carry absolute offsets, so cursors stay comparable across pages.
pub fn connection_from_array_slice<T>(
    slice: Vec<T>,
    input: &PaginationInput,
    info: SliceInfo,
) -> crate::Result<Connection<T>> {
    input.validate()?;

    let slice_start = info.slice_start;
    let slice_end = slice_start.saturating_add(slice.len());
    let array_length = info.array_length.max(slice_end);

    let after = bound_offset(input.after.as_deref(), "after");
    let before = bound_offset(input.before.as_deref(), "before");

    let mut start = slice_start.max(after.map_or(0, |o| o.saturating_add(1)));
    let mut end = slice_end.min(before.unwrap_or(array_length)).max(start);

    if let Some(first) = input.first {
        end = end.min(start.saturating_add(first as usize));
    }
    if let Some(last) = input.last {
        start = start.max(end.saturating_sub(last as usize));
    }

    let edges: Vec<Edge<T>> = slice
        .into_iter()
        .enumerate()
        .skip(start - slice_start)
        .take(end - start)
        .map(|(idx, node)| Edge {
            cursor: offset_to_cursor(slice_start + idx),
            node,
        })
        .collect();

    let has_previous = start.min(array_length) > 0;
    let has_next = end < array_length;

    Ok(Connection::from_edges(edges, has_next, has_previous))
}

/// Cursor an item gets in a connection over `items`
pub fn cursor_for_item<T: PartialEq>(items: &[T], item: &T) -> Option<String> {
    items.iter().position(|i| i == item).map(offset_to_cursor)
}

fn bound_offset(cursor: Option<&str>, arg: &'static str) -> Option<usize> {
    let cursor = cursor?;
    let offset = cursor_to_offset(cursor);
    if offset.is_none() {
        debug!(arg, cursor, "Ignoring unreadable pagination cursor");
    }
    offset
}
