// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::debounce::{DEFAULT_DEBOUNCE, Debouncer};
use crate::page::{DEFAULT_PAGE_LIMIT, Page};
use crate::selection::{IdSet, SelectionState};
use crate::{Entity, EntityId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: usize,
    pub limit: usize,
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(format!("{error:#}"))
    }
}

/// Fetch capability backing a selector. Implementations block; the driver
/// runs them off the owning thread.
pub trait PageSource<T>: Send + Sync {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page<T>, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub request_id: u64,
    pub query: PageQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub request_id: u64,
    pub result: Result<Page<T>, FetchError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub raw_text: String,
    pub committed_text: String,
    pub page: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            raw_text: String::new(),
            committed_text: String::new(),
            page: 1,
        }
    }
}

/// Paginated, debounced-search, multi-select controller for one collection.
///
/// The controller performs no I/O. Operations that need data return a
/// [`FetchRequest`]; the owner runs it and feeds the result back through
/// [`SelectionController::apply`]. Only the outcome of the most recently
/// issued request is ever applied, so a slow response for a superseded query
/// or page can never overwrite newer results.
#[derive(Debug, Clone)]
pub struct SelectionController<T> {
    limit: usize,
    open: bool,
    query: QueryState,
    search: Debouncer<String>,
    selection: SelectionState,
    items: Vec<T>,
    shown_page: usize,
    pages: usize,
    total: usize,
    error: Option<String>,
    next_request_id: u64,
    awaiting: Option<u64>,
}

impl<T> SelectionController<T> {
    pub fn new(limit: usize) -> Self {
        Self::with_debounce(limit, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(limit: usize, delay: Duration) -> Self {
        Self {
            limit: limit.max(1),
            open: false,
            query: QueryState::default(),
            search: Debouncer::new(delay),
            selection: SelectionState::default(),
            items: Vec::new(),
            shown_page: 1,
            pages: 1,
            total: 0,
            error: None,
            next_request_id: 1,
            awaiting: None,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// Page the current rows belong to. The requested page, which may still
    /// be loading or may have failed, is `query().page`.
    pub fn page(&self) -> usize {
        self.shown_page
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.awaiting.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn committed(&self) -> &IdSet {
        self.selection.committed()
    }

    pub fn pending(&self) -> &IdSet {
        self.selection.pending()
    }

    pub fn pending_count(&self) -> usize {
        self.selection.pending().len()
    }

    pub fn search_pending(&self) -> bool {
        self.search.is_pending()
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    pub fn has_prev_page(&self) -> bool {
        self.shown_page > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.shown_page < self.pages
    }

    /// Seeds the pending selection and fetches the first unfiltered page.
    /// Ignored while already open: the seed happens once per open transition.
    pub fn open(&mut self, initial: IdSet) -> Option<FetchRequest> {
        if self.open {
            return None;
        }
        self.open = true;
        self.selection.seed(initial);
        self.search.cancel();
        self.query = QueryState::default();
        self.items.clear();
        self.shown_page = 1;
        self.pages = 1;
        self.total = 0;
        self.error = None;
        Some(self.issue())
    }

    /// Echoes `text` immediately and schedules it to become the committed
    /// query once the debounce window passes without further input.
    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        if !self.open {
            return;
        }
        let text = text.into();
        self.query.raw_text = text.clone();
        self.search.schedule(text, now);
    }

    /// Advances the debounce clock. Returns a request when the committed
    /// query changed.
    pub fn poll(&mut self, now: Instant) -> Option<FetchRequest> {
        let text = self.search.poll(now)?;
        if !self.open || text == self.query.committed_text {
            return None;
        }
        debug!(query = %text, "search query committed");
        self.query.committed_text = text;
        self.query.page = 1;
        Some(self.issue())
    }

    /// Moves to page `page`. Out-of-range requests are ignored.
    pub fn change_page(&mut self, page: usize) -> Option<FetchRequest> {
        if !self.open || page == 0 || page > self.pages {
            return None;
        }
        self.query.page = page;
        Some(self.issue())
    }

    /// Re-issues the current query, e.g. after a failed fetch.
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        if !self.open {
            return None;
        }
        Some(self.issue())
    }

    /// Applies a fetch outcome. Returns false when the outcome was dropped
    /// because a newer request superseded it or the selector was closed.
    pub fn apply(&mut self, outcome: FetchOutcome<T>) -> bool {
        if !self.open || self.awaiting != Some(outcome.request_id) {
            trace!(
                request_id = outcome.request_id,
                awaiting = ?self.awaiting,
                "dropping superseded fetch outcome"
            );
            return false;
        }
        self.awaiting = None;

        match outcome.result {
            Ok(page) => {
                let page = page.normalized();
                self.query.page = page.page;
                self.shown_page = page.page;
                self.pages = page.pages;
                self.total = page.total;
                self.items = page.items;
                self.error = None;
            }
            Err(error) => {
                warn!(request_id = outcome.request_id, error = %error, "page fetch failed");
                self.error = Some(error.message().to_owned());
            }
        }
        true
    }

    pub fn toggle(&mut self, id: EntityId) {
        self.selection.toggle(id);
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    /// Commits the pending selection and closes.
    pub fn confirm(&mut self) -> IdSet {
        self.close();
        self.selection.commit()
    }

    /// Discards the pending selection and closes. In-flight fetches are left
    /// to finish; their outcomes are dropped.
    pub fn cancel(&mut self) -> IdSet {
        self.close();
        self.selection.revert()
    }

    fn close(&mut self) {
        self.open = false;
        self.search.cancel();
        self.awaiting = None;
    }

    fn issue(&mut self) -> FetchRequest {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.awaiting = Some(request_id);
        let query = PageQuery {
            page: self.query.page,
            limit: self.limit,
            search: self.query.committed_text.clone(),
        };
        debug!(request_id, page = query.page, search = %query.search, "page fetch issued");
        FetchRequest { request_id, query }
    }
}

impl<T: Entity> SelectionController<T> {
    pub fn is_selected(&self, item: &T) -> bool {
        self.selection.is_pending(&item.entity_id())
    }

    /// Current page rows paired with their pending selection flag.
    pub fn visible_state(&self) -> Vec<(&T, bool)> {
        self.items
            .iter()
            .map(|item| (item, self.is_selected(item)))
            .collect()
    }

    pub fn visible_ids(&self) -> Vec<EntityId> {
        self.items.iter().map(Entity::entity_id).collect()
    }

    pub fn select_all_visible(&mut self) {
        let ids = self.visible_ids();
        self.selection.insert_all(&ids);
    }

    pub fn deselect_all_visible(&mut self) {
        let ids = self.visible_ids();
        self.selection.remove_all(&ids);
    }

    /// True when the current page is non-empty and every row is selected.
    pub fn all_visible_selected(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| self.is_selected(item))
    }
}

impl<T> Default for SelectionController<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchError, FetchOutcome, FetchRequest, PageQuery, SelectionController};
    use crate::page::Page;
    use crate::selection::IdSet;
    use crate::{Entity, EntityId};
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, PartialEq)]
    struct Row(&'static str);

    impl Entity for Row {
        fn entity_id(&self) -> EntityId {
            EntityId::new(self.0)
        }

        fn label(&self) -> String {
            self.0.to_owned()
        }
    }

    const DELAY: Duration = Duration::from_millis(300);

    fn ids(values: &[&str]) -> IdSet {
        values.iter().map(|value| EntityId::new(*value)).collect()
    }

    fn page_of(rows: &[&'static str], page: usize, pages: usize, total: usize) -> Page<Row> {
        Page {
            items: rows.iter().map(|id| Row(id)).collect(),
            page,
            pages,
            total,
            limit: 10,
        }
    }

    fn ok(request: &FetchRequest, page: Page<Row>) -> FetchOutcome<Row> {
        FetchOutcome {
            request_id: request.request_id,
            result: Ok(page),
        }
    }

    fn opened(rows: &[&'static str], pages: usize) -> SelectionController<Row> {
        let mut controller = SelectionController::with_debounce(10, DELAY);
        let request = controller
            .open(IdSet::new())
            .expect("open should fetch the first page");
        assert!(controller.apply(ok(&request, page_of(rows, 1, pages, rows.len() * pages))));
        controller
    }

    #[test]
    fn open_fetches_first_page_with_empty_query() {
        let mut controller = SelectionController::<Row>::with_debounce(10, DELAY);
        let request = controller
            .open(ids(&["a"]))
            .expect("open should fetch");
        assert_eq!(
            request.query,
            PageQuery {
                page: 1,
                limit: 10,
                search: String::new(),
            }
        );
        assert!(controller.is_loading());
        assert_eq!(controller.pending(), &ids(&["a"]));
    }

    #[test]
    fn open_while_open_does_not_reseed() {
        let mut controller = opened(&["a", "b"], 1);
        controller.toggle(EntityId::new("a"));
        assert!(controller.open(ids(&["z"])).is_none());
        assert_eq!(controller.pending(), &ids(&["a"]));
    }

    #[test]
    fn rapid_typing_commits_only_the_last_value_once() {
        let mut controller = opened(&["a"], 1);
        let start = Instant::now();

        controller.set_search_text("b", start);
        assert_eq!(controller.query().raw_text, "b");
        controller.set_search_text("br", start + Duration::from_millis(100));
        controller.set_search_text("bra", start + Duration::from_millis(200));

        assert!(controller.poll(start + Duration::from_millis(350)).is_none());
        let request = controller
            .poll(start + Duration::from_millis(500))
            .expect("debounce should fire once");
        assert_eq!(request.query.search, "bra");
        assert_eq!(controller.query().committed_text, "bra");
        assert!(controller.poll(start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn committed_search_resets_page_to_one() {
        let mut controller = opened(&["a"], 3);
        let request = controller.change_page(3).expect("page 3 is in range");
        controller.apply(ok(&request, page_of(&["c"], 3, 3, 25)));
        assert_eq!(controller.page(), 3);

        let start = Instant::now();
        controller.set_search_text("pad", start);
        let request = controller
            .poll(start + DELAY)
            .expect("search should fetch");
        assert_eq!(request.query.page, 1);
        assert_eq!(controller.query().page, 1);
        assert_eq!(controller.page(), 3);
    }

    #[test]
    fn unchanged_search_text_does_not_refetch() {
        let mut controller = opened(&["a"], 1);
        let start = Instant::now();
        controller.set_search_text("x", start);
        controller.set_search_text("", start + Duration::from_millis(10));
        assert!(controller.poll(start + Duration::from_secs(1)).is_none());
        assert!(!controller.is_loading());
    }

    #[test]
    fn change_page_issues_fetch_and_applies_result() {
        let rows = ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9", "p10"];
        let mut controller = SelectionController::with_debounce(10, DELAY);
        let first = controller.open(IdSet::new()).expect("open should fetch");
        controller.apply(ok(&first, page_of(&rows, 1, 3, 25)));

        let request = controller.change_page(2).expect("page 2 is in range");
        assert_eq!(
            request.query,
            PageQuery {
                page: 2,
                limit: 10,
                search: String::new(),
            }
        );
        assert!(controller.apply(ok(&request, page_of(&["p11", "p12"], 2, 3, 25))));
        assert_eq!(controller.page(), 2);
        assert_eq!(controller.items(), &[Row("p11"), Row("p12")]);
        assert_eq!(controller.total(), 25);
    }

    #[test]
    fn page_navigation_flags_follow_the_shown_page() {
        let mut controller = opened(&["a"], 3);
        assert!(!controller.has_prev_page());
        assert!(controller.has_next_page());

        let request = controller.change_page(2).expect("page 2 is in range");
        assert!(!controller.has_prev_page());
        controller.apply(ok(&request, page_of(&["b"], 2, 3, 21)));
        assert!(controller.has_prev_page());
        assert!(controller.has_next_page());

        let request = controller.change_page(3).expect("page 3 is in range");
        controller.apply(ok(&request, page_of(&["c"], 3, 3, 21)));
        assert!(controller.has_prev_page());
        assert!(!controller.has_next_page());
    }

    #[test]
    fn single_page_has_no_neighbours() {
        let controller = opened(&["a"], 1);
        assert!(!controller.has_prev_page());
        assert!(!controller.has_next_page());
    }

    #[test]
    fn pending_count_tracks_toggles() {
        let mut controller = SelectionController::<Row>::with_debounce(10, DELAY);
        controller.open(ids(&["a", "b"]));
        assert_eq!(controller.pending_count(), 2);
        controller.toggle(EntityId::new("a"));
        assert_eq!(controller.pending_count(), 1);
        controller.clear();
        assert_eq!(controller.pending_count(), 0);
    }

    #[test]
    fn out_of_range_pages_are_ignored() {
        let mut controller = opened(&["a"], 3);
        assert!(controller.change_page(0).is_none());
        assert!(controller.change_page(4).is_none());
        assert!(!controller.is_loading());
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn stale_response_never_overwrites_newer_results() {
        let mut controller = opened(&["a"], 1);
        let start = Instant::now();

        controller.set_search_text("x", start);
        let request_x = controller.poll(start + DELAY).expect("x should fetch");
        controller.set_search_text("y", start + DELAY);
        let request_y = controller
            .poll(start + DELAY * 2)
            .expect("y should fetch");

        assert!(controller.apply(ok(&request_y, page_of(&["y1"], 1, 1, 1))));
        assert!(!controller.apply(ok(&request_x, page_of(&["x1"], 1, 1, 1))));
        assert_eq!(controller.items(), &[Row("y1")]);
        assert!(!controller.is_loading());
    }

    #[test]
    fn superseded_response_arriving_first_is_dropped() {
        let mut controller = opened(&["a"], 2);
        let older = controller.change_page(2).expect("page 2");
        let newer = controller.change_page(1).expect("page 1");

        assert!(!controller.apply(ok(&older, page_of(&["old"], 2, 2, 11))));
        assert!(controller.is_loading());
        assert!(controller.apply(ok(&newer, page_of(&["new"], 1, 2, 11))));
        assert_eq!(controller.items(), &[Row("new")]);
    }

    #[test]
    fn failed_fetch_keeps_previous_items_and_reports_message() {
        let mut controller = opened(&["a", "b"], 2);
        let request = controller.change_page(2).expect("page 2");
        controller.apply(FetchOutcome {
            request_id: request.request_id,
            result: Err(FetchError::new("network down")),
        });
        assert_eq!(controller.error(), Some("network down"));
        assert_eq!(controller.items(), &[Row("a"), Row("b")]);
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.query().page, 2);

        let retry = controller.refresh().expect("refresh should refetch");
        assert_eq!(retry.query.page, 2);
        controller.apply(ok(&retry, page_of(&["c"], 2, 2, 3)));
        assert_eq!(controller.error(), None);
        assert_eq!(controller.items(), &[Row("c")]);
        assert_eq!(controller.page(), 2);
    }

    #[test]
    fn cancel_restores_the_committed_selection() {
        let mut controller = SelectionController::<Row>::with_debounce(10, DELAY);
        let request = controller
            .open(ids(&["id1", "id2"]))
            .expect("open should fetch");
        controller.apply(ok(&request, page_of(&["id3", "id4"], 1, 1, 2)));

        controller.toggle(EntityId::new("id3"));
        controller.select_all_visible();
        controller.clear();
        controller.toggle(EntityId::new("id1"));

        assert_eq!(controller.cancel(), ids(&["id1", "id2"]));
        assert_eq!(controller.committed(), &ids(&["id1", "id2"]));
        assert!(!controller.is_open());
    }

    #[test]
    fn open_toggle_cancel_returns_original_set() {
        let mut controller = SelectionController::<Row>::with_debounce(10, DELAY);
        controller.open(ids(&["id1", "id2"]));
        controller.toggle(EntityId::new("id3"));
        assert_eq!(controller.cancel(), ids(&["id1", "id2"]));
    }

    #[test]
    fn confirm_is_idempotent() {
        let mut controller = opened(&["a", "b"], 1);
        controller.toggle(EntityId::new("a"));
        let first = controller.confirm();
        let second = controller.confirm();
        assert_eq!(first, ids(&["a"]));
        assert_eq!(first, second);
    }

    #[test]
    fn select_and_deselect_all_visible_only_touch_current_page() {
        let mut controller = SelectionController::<Row>::with_debounce(10, DELAY);
        let request = controller
            .open(ids(&["elsewhere"]))
            .expect("open should fetch");
        controller.apply(ok(&request, page_of(&["a", "b"], 1, 1, 2)));

        controller.toggle(EntityId::new("b"));
        let flags: Vec<bool> = controller
            .visible_state()
            .into_iter()
            .map(|(_, selected)| selected)
            .collect();
        assert_eq!(flags, vec![false, true]);

        controller.select_all_visible();
        assert!(controller.all_visible_selected());
        assert_eq!(controller.pending(), &ids(&["a", "b", "elsewhere"]));

        controller.deselect_all_visible();
        assert!(!controller.all_visible_selected());
        assert_eq!(controller.pending(), &ids(&["elsewhere"]));
    }

    #[test]
    fn outcomes_after_close_are_ignored() {
        let mut controller = opened(&["a"], 2);
        let request = controller.change_page(2).expect("page 2");
        controller.cancel();
        assert!(!controller.apply(ok(&request, page_of(&["late"], 2, 2, 3))));
        assert_eq!(controller.items(), &[Row("a")]);
    }

    #[test]
    fn reopen_reseeds_from_new_committed_value() {
        let mut controller = opened(&["a"], 1);
        controller.toggle(EntityId::new("a"));
        controller.confirm();

        controller.open(ids(&["q"]));
        assert_eq!(controller.pending(), &ids(&["q"]));
        assert_eq!(controller.query().raw_text, "");
        assert_eq!(controller.page(), 1);
    }
}
