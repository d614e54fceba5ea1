//! Client-side cache of fetched task pages, keyed by the exact query that
//! produced each page.
//!
//! Fetches are guarded by tickets: a response only lands in the cache if its
//! ticket is still the latest issued for that query, so a slow response can
//! never clobber a newer one. Invalidation voids every outstanding ticket.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Pagination, ReorderItem, Task, TaskQuery};

/// One cached page: the tasks plus the pagination metadata they arrived with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

/// Handle for an in-flight fetch. Only the holder of the newest ticket for a
/// query may store its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// A point-in-time copy of the cached pages, used to roll back optimistic
/// mutations.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pages: HashMap<TaskQuery, TaskPage>,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    pages: HashMap<TaskQuery, TaskPage>,
    in_flight: HashMap<TaskQuery, u64>,
    next_ticket: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the cached page for a query.
    pub fn get(&self, query: &TaskQuery) -> Option<&TaskPage> {
        self.pages.get(query)
    }

    /// Register a fetch about to start. Supersedes any earlier ticket for
    /// the same query.
    pub fn issue(&mut self, query: &TaskQuery) -> FetchTicket {
        self.next_ticket += 1;
        self.in_flight.insert(query.clone(), self.next_ticket);
        FetchTicket(self.next_ticket)
    }

    /// Store a fetched page. Returns false (and drops the page) when the
    /// ticket has been superseded or voided since it was issued.
    pub fn complete(&mut self, query: &TaskQuery, ticket: FetchTicket, page: TaskPage) -> bool {
        if self.in_flight.get(query) != Some(&ticket.0) {
            return false;
        }
        self.in_flight.remove(query);
        self.pages.insert(query.clone(), page);
        true
    }

    /// Throw away every cached page and void all outstanding tickets. Called
    /// after any mutation settles; the next read refetches.
    pub fn invalidate_tasks(&mut self) {
        self.pages.clear();
        self.in_flight.clear();
    }

    /// Capture the current pages for a later [`QueryCache::restore`].
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            pages: self.pages.clone(),
        }
    }

    /// Roll the cached pages back to a snapshot, e.g. after a failed
    /// optimistic mutation.
    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        self.pages = snapshot.pages;
    }

    /// Optimistically apply a new manual ordering to every cached page.
    /// Pages re-sort by order index so the UI reflects the move immediately.
    pub fn apply_order(&mut self, items: &[ReorderItem]) {
        let positions: HashMap<&str, i64> = items
            .iter()
            .map(|item| (item.id.as_str(), item.order_index))
            .collect();

        for page in self.pages.values_mut() {
            for task in page.tasks.iter_mut() {
                if let Some(&order_index) = positions.get(task.id.as_str()) {
                    task.order_index = order_index;
                }
            }
            page.tasks.sort_by_key(|task| task.order_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, order_index: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            description: None,
            completed: false,
            priority: 2,
            due_date: None,
            order_index,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            tags: Vec::new(),
        }
    }

    fn page(tasks: Vec<Task>) -> TaskPage {
        let total = tasks.len() as u64;
        TaskPage {
            tasks,
            pagination: Pagination::compute(1, 20, total),
        }
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut cache = QueryCache::new();
        let query = TaskQuery::default();

        let stale = cache.issue(&query);
        let fresh = cache.issue(&query);

        assert!(cache.complete(&query, fresh, page(vec![task("b", 1)])));
        assert!(!cache.complete(&query, stale, page(vec![task("a", 0)])));

        assert_eq!(cache.get(&query).unwrap().tasks[0].id, "b");
    }

    #[test]
    fn invalidation_voids_outstanding_tickets() {
        let mut cache = QueryCache::new();
        let query = TaskQuery::default();

        let ticket = cache.issue(&query);
        cache.invalidate_tasks();

        assert!(!cache.complete(&query, ticket, page(vec![task("a", 0)])));
        assert!(cache.get(&query).is_none());
    }

    #[test]
    fn pages_are_keyed_by_full_query() {
        let mut cache = QueryCache::new();
        let page_one = TaskQuery::default();
        let page_two = TaskQuery {
            page: 2,
            ..TaskQuery::default()
        };

        let ticket = cache.issue(&page_one);
        cache.complete(&page_one, ticket, page(vec![task("a", 0)]));

        assert!(cache.get(&page_one).is_some());
        assert!(cache.get(&page_two).is_none());
    }

    #[test]
    fn apply_order_resorts_cached_pages() {
        let mut cache = QueryCache::new();
        let query = TaskQuery::default();

        let ticket = cache.issue(&query);
        cache.complete(
            &query,
            ticket,
            page(vec![task("a", 0), task("b", 1), task("c", 2)]),
        );

        cache.apply_order(&[
            ReorderItem {
                id: "b".to_string(),
                order_index: 0,
            },
            ReorderItem {
                id: "c".to_string(),
                order_index: 1,
            },
            ReorderItem {
                id: "a".to_string(),
                order_index: 2,
            },
        ]);

        let ids: Vec<&str> = cache
            .get(&query)
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn restore_rolls_back_applied_order() {
        let mut cache = QueryCache::new();
        let query = TaskQuery::default();

        let ticket = cache.issue(&query);
        cache.complete(&query, ticket, page(vec![task("a", 0), task("b", 1)]));

        let snapshot = cache.snapshot();
        cache.apply_order(&[
            ReorderItem {
                id: "b".to_string(),
                order_index: 0,
            },
            ReorderItem {
                id: "a".to_string(),
                order_index: 1,
            },
        ]);
        assert_eq!(cache.get(&query).unwrap().tasks[0].id, "b");

        cache.restore(snapshot);
        assert_eq!(cache.get(&query).unwrap().tasks[0].id, "a");
    }
}
