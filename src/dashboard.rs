//! Freshness detection for dashboard viewers.
//!
//! A viewer keeps a cursor: the highest record id it has rendered. Each poll
//! checks the store's `max_id` against the cursor *before* rendering, then
//! advances the cursor over whatever was rendered.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::db::{Database, NewsRecord};

/// Highest record id a viewer has rendered. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerCursor(i64);

impl ViewerCursor {
    pub fn new() -> Self {
        Self(0)
    }

    /// Cursor handed back by a viewer from an earlier poll. Negative values clamp to 0.
    pub fn resume(last_displayed_id: i64) -> Self {
        Self(last_displayed_id.max(0))
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    pub fn advance(&mut self, rendered_id: i64) {
        self.0 = self.0.max(rendered_id);
    }
}

/// True when the store holds records the viewer has not rendered yet.
pub fn is_fresh(max_id: i64, cursor: ViewerCursor) -> bool {
    max_id > cursor.get()
}

/// Outcome of one poll.
#[derive(Debug, Clone)]
pub struct Tick {
    pub new_content: bool,
    /// Newest first.
    pub records: Vec<NewsRecord>,
}

#[derive(Debug, Default)]
pub struct Viewer {
    cursor: ViewerCursor,
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(cursor: ViewerCursor) -> Self {
        Self { cursor }
    }

    pub fn cursor(&self) -> ViewerCursor {
        self.cursor
    }

    pub async fn poll(&mut self, db: &Database) -> anyhow::Result<Tick> {
        let max_id = db.max_id().await?;
        let new_content = is_fresh(max_id, self.cursor);

        let records = db.list_all().await?;
        for record in &records {
            self.cursor.advance(record.id);
        }

        Ok(Tick {
            new_content,
            records,
        })
    }
}

/// Poll the store every `interval` and hand each tick to `render`. Never returns.
pub async fn watch<F>(db: Arc<Database>, interval: Duration, mut render: F)
where
    F: FnMut(&Tick, ViewerCursor),
{
    let mut viewer = Viewer::new();
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        match viewer.poll(&db).await {
            Ok(tick) => render(&tick, viewer.cursor()),
            Err(e) => error!("Dashboard poll failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewsSubmission;

    async fn create_test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    async fn insert(db: &Database, title: &str) -> i64 {
        db.append(&NewsSubmission {
            title: title.to_string(),
            published: "2024-06-20".to_string(),
            trading_decision: "Sell: guidance cut".to_string(),
        })
        .await
        .unwrap()
    }

    fn record(id: i64) -> NewsRecord {
        NewsRecord {
            id,
            title: format!("Story {}", id),
            published: "2024-06-20".to_string(),
            trading_decision: "Hold".to_string(),
        }
    }

    mod cursor_tests {
        use super::*;

        #[test]
        fn test_new_cursor_is_zero() {
            assert_eq!(ViewerCursor::new().get(), 0);
            assert_eq!(ViewerCursor::default(), ViewerCursor::new());
        }

        #[test]
        fn test_resume_clamps_negative() {
            assert_eq!(ViewerCursor::resume(-4).get(), 0);
            assert_eq!(ViewerCursor::resume(9).get(), 9);
        }

        #[test]
        fn test_advance_never_moves_backward() {
            let mut cursor = ViewerCursor::resume(5);
            cursor.advance(3);
            assert_eq!(cursor.get(), 5);
            cursor.advance(8);
            assert_eq!(cursor.get(), 8);
            cursor.advance(8);
            assert_eq!(cursor.get(), 8);
        }

        #[test]
        fn test_advance_over_scrambled_render_order() {
            let k = 4;
            let rendered: Vec<NewsRecord> = [2, 7, 1, 6, 3, 5].into_iter().map(record).collect();

            let mut cursor = ViewerCursor::resume(k);
            for r in &rendered {
                cursor.advance(r.id);
            }

            assert_eq!(cursor.get(), 7);
        }

        #[test]
        fn test_advance_over_older_records_keeps_cursor() {
            let mut cursor = ViewerCursor::resume(10);
            for r in [3, 1, 2].into_iter().map(record) {
                cursor.advance(r.id);
            }
            assert_eq!(cursor.get(), 10);
        }
    }

    mod is_fresh_tests {
        use super::*;

        #[test]
        fn test_fresh_iff_max_exceeds_cursor() {
            for k in 0..5 {
                for m in 0..5 {
                    assert_eq!(is_fresh(m, ViewerCursor::resume(k)), m > k, "m={} k={}", m, k);
                }
            }
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test]
        async fn test_empty_store() {
            let db = create_test_db().await;
            let mut viewer = Viewer::new();

            let tick = viewer.poll(&db).await.unwrap();

            assert!(!tick.new_content);
            assert!(tick.records.is_empty());
            assert_eq!(viewer.cursor().get(), 0);
        }

        #[tokio::test]
        async fn test_single_new_record_fires_once() {
            let db = create_test_db().await;
            let mut viewer = Viewer::new();
            viewer.poll(&db).await.unwrap();

            let id = insert(&db, "Oil jumps").await;

            let first = viewer.poll(&db).await.unwrap();
            assert!(first.new_content);
            assert_eq!(viewer.cursor().get(), id);

            let second = viewer.poll(&db).await.unwrap();
            assert!(!second.new_content);
            assert_eq!(second.records.len(), 1);
            assert_eq!(viewer.cursor().get(), id);
        }

        #[tokio::test]
        async fn test_renders_newest_first_and_advances_to_max() {
            let db = create_test_db().await;
            for title in ["a", "b", "c"] {
                insert(&db, title).await;
            }

            let mut viewer = Viewer::new();
            let tick = viewer.poll(&db).await.unwrap();

            let ids: Vec<i64> = tick.records.iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![3, 2, 1]);
            assert!(tick.new_content);
            assert_eq!(viewer.cursor().get(), 3);
        }

        #[tokio::test]
        async fn test_resumed_viewer_ahead_of_store_stays_put() {
            let db = create_test_db().await;
            insert(&db, "only").await;

            let mut viewer = Viewer::resume(ViewerCursor::resume(40));
            let tick = viewer.poll(&db).await.unwrap();

            assert!(!tick.new_content);
            assert_eq!(tick.records.len(), 1);
            assert_eq!(viewer.cursor().get(), 40);
        }

        #[tokio::test]
        async fn test_resumed_viewer_sees_only_later_arrivals_as_new() {
            let db = create_test_db().await;
            insert(&db, "one").await;
            insert(&db, "two").await;

            let mut viewer = Viewer::resume(ViewerCursor::resume(2));
            assert!(!viewer.poll(&db).await.unwrap().new_content);

            insert(&db, "three").await;
            assert!(viewer.poll(&db).await.unwrap().new_content);
            assert_eq!(viewer.cursor().get(), 3);
        }
    }
}
