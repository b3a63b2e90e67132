// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::selection::IdSet;
use crate::selector::{FetchOutcome, FetchRequest, PageSource, SelectionController};
use crate::{Entity, EntityId};

/// Runs a [`SelectionController`] against a blocking [`PageSource`].
///
/// Fetches execute on worker threads and report back over a channel. Every
/// state change happens on the thread that owns the driver, inside `pump` or
/// `wait_idle`.
pub struct SelectorDriver<T> {
    controller: SelectionController<T>,
    source: Arc<dyn PageSource<T>>,
    tx: Sender<FetchOutcome<T>>,
    rx: Receiver<FetchOutcome<T>>,
}

impl<T> SelectorDriver<T>
where
    T: Entity + Send + 'static,
{
    pub fn new(controller: SelectionController<T>, source: Arc<dyn PageSource<T>>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            controller,
            source,
            tx,
            rx,
        }
    }

    pub fn controller(&self) -> &SelectionController<T> {
        &self.controller
    }

    pub fn open(&mut self, initial: IdSet) {
        let request = self.controller.open(initial);
        self.dispatch(request);
    }

    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        self.controller.set_search_text(text, now);
    }

    pub fn change_page(&mut self, page: usize) {
        let request = self.controller.change_page(page);
        self.dispatch(request);
    }

    pub fn refresh(&mut self) {
        let request = self.controller.refresh();
        self.dispatch(request);
    }

    pub fn toggle(&mut self, id: EntityId) {
        self.controller.toggle(id);
    }

    pub fn select_all_visible(&mut self) {
        self.controller.select_all_visible();
    }

    pub fn deselect_all_visible(&mut self) {
        self.controller.deselect_all_visible();
    }

    pub fn clear(&mut self) {
        self.controller.clear();
    }

    pub fn confirm(&mut self) -> IdSet {
        self.controller.confirm()
    }

    pub fn cancel(&mut self) -> IdSet {
        self.controller.cancel()
    }

    /// Applies finished fetches and fires a due debounce. Returns true when
    /// any fetch outcome was applied.
    pub fn pump(&mut self, now: Instant) -> bool {
        let mut applied = false;
        while let Ok(outcome) = self.rx.try_recv() {
            applied |= self.controller.apply(outcome);
        }
        let request = self.controller.poll(now);
        self.dispatch(request);
        applied
    }

    /// Blocks until no search is pending and the latest fetch has settled.
    /// Returns false if `timeout` elapsed first.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let give_up = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            self.pump(now);
            if !self.controller.search_pending() && !self.controller.is_loading() {
                return true;
            }
            if now >= give_up {
                return false;
            }

            let mut wait = give_up - now;
            if let Some(deadline) = self.controller.search_deadline() {
                wait = wait.min(deadline.saturating_duration_since(now));
            }
            match self.rx.recv_timeout(wait) {
                Ok(outcome) => {
                    self.controller.apply(outcome);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn dispatch(&self, request: Option<FetchRequest>) {
        let Some(FetchRequest { request_id, query }) = request else {
            return;
        };
        let source = Arc::clone(&self.source);
        let sender = self.tx.clone();
        thread::spawn(move || {
            let result = source.fetch_page(&query);
            if sender.send(FetchOutcome { request_id, result }).is_err() {
                debug!(request_id, "selector dropped before fetch finished");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::SelectorDriver;
    use crate::page::{Page, page_count};
    use crate::selection::IdSet;
    use crate::selector::{FetchError, PageQuery, PageSource, SelectionController};
    use crate::{Entity, EntityId};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, PartialEq)]
    struct Row(String);

    impl Entity for Row {
        fn entity_id(&self) -> EntityId {
            EntityId::new(self.0.clone())
        }

        fn label(&self) -> String {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct SlowFirstSource {
        calls: Mutex<Vec<PageQuery>>,
    }

    impl PageSource<Row> for SlowFirstSource {
        fn fetch_page(&self, query: &PageQuery) -> Result<Page<Row>, FetchError> {
            self.calls.lock().expect("calls lock").push(query.clone());
            if query.search == "slow" {
                std::thread::sleep(Duration::from_millis(150));
            }
            if query.search == "broken" {
                return Err(FetchError::new("backend unavailable"));
            }
            let rows = (0..25)
                .map(|n| Row(format!("{}-{n}", query.search)))
                .collect::<Vec<_>>();
            let start = (query.page - 1) * query.limit;
            let items = rows.iter().skip(start).take(query.limit).cloned().collect();
            Ok(Page {
                items,
                page: query.page,
                pages: page_count(rows.len(), query.limit),
                total: rows.len(),
                limit: query.limit,
            })
        }
    }

    fn driver(source: Arc<SlowFirstSource>) -> SelectorDriver<Row> {
        SelectorDriver::new(
            SelectionController::with_debounce(10, Duration::from_millis(20)),
            source,
        )
    }

    #[test]
    fn open_and_page_through_results() {
        let source = Arc::new(SlowFirstSource::default());
        let mut driver = driver(Arc::clone(&source));

        driver.open(IdSet::new());
        assert!(driver.wait_idle(Duration::from_secs(2)));
        assert_eq!(driver.controller().items().len(), 10);
        assert_eq!(driver.controller().pages(), 3);

        driver.change_page(3);
        assert!(driver.wait_idle(Duration::from_secs(2)));
        assert_eq!(driver.controller().page(), 3);
        assert_eq!(driver.controller().items().len(), 5);
    }

    #[test]
    fn late_response_for_old_query_is_dropped() {
        let source = Arc::new(SlowFirstSource::default());
        let mut driver = driver(Arc::clone(&source));
        driver.open(IdSet::new());
        assert!(driver.wait_idle(Duration::from_secs(2)));

        let start = Instant::now();
        driver.set_search_text("slow", start);
        driver.pump(start + Duration::from_millis(20));
        driver.set_search_text("fast", start + Duration::from_millis(20));
        driver.pump(start + Duration::from_millis(40));

        assert!(driver.wait_idle(Duration::from_secs(2)));
        std::thread::sleep(Duration::from_millis(200));
        driver.pump(Instant::now());

        let first = &driver.controller().items()[0];
        assert_eq!(first.0, "fast-0");
        let mut searches = source
            .calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|query| query.search.clone())
            .collect::<Vec<_>>();
        searches.sort();
        assert_eq!(searches, vec!["", "fast", "slow"]);
    }

    #[test]
    fn fetch_failure_surfaces_message_and_keeps_rows() {
        let source = Arc::new(SlowFirstSource::default());
        let mut driver = driver(source);
        driver.open(IdSet::new());
        assert!(driver.wait_idle(Duration::from_secs(2)));

        driver.set_search_text("broken", Instant::now());
        assert!(driver.wait_idle(Duration::from_secs(2)));
        assert_eq!(driver.controller().error(), Some("backend unavailable"));
        assert_eq!(driver.controller().items().len(), 10);
    }

    #[test]
    fn selection_round_trip_through_driver() {
        let source = Arc::new(SlowFirstSource::default());
        let mut driver = driver(source);
        let initial: IdSet = [EntityId::new("keep")].into_iter().collect();
        driver.open(initial);
        assert!(driver.wait_idle(Duration::from_secs(2)));

        driver.select_all_visible();
        driver.toggle(EntityId::new("keep"));
        driver.deselect_all_visible();
        driver.toggle(EntityId::new("-3"));
        driver.clear();
        driver.toggle(EntityId::new("-1"));
        let committed = driver.confirm();
        assert_eq!(
            committed,
            [EntityId::new("-1")].into_iter().collect::<IdSet>()
        );
        driver.refresh();
        assert!(!driver.controller().is_loading());
    }
}
