//! Drag-and-drop reorder planning and submission.

use super::{ApiClient, ClientError, QueryCache};
use crate::models::{ReorderItem, Task};

/// Compute the reorder batch for moving one task to a new position within
/// the given list. Positions are renumbered 0..N-1 so the whole list ends up
/// canonical. Returns None when the moved id is not in the list or the drop
/// position equals the current one (a no-op drag).
pub fn plan_reorder(tasks: &[Task], moved_id: &str, target_index: usize) -> Option<Vec<ReorderItem>> {
    let from = tasks.iter().position(|task| task.id == moved_id)?;
    let to = target_index.min(tasks.len().saturating_sub(1));
    if to == from {
        return None;
    }

    let mut ids: Vec<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
    let id = ids.remove(from);
    ids.insert(to, id);

    Some(
        ids.into_iter()
            .enumerate()
            .map(|(index, id)| ReorderItem {
                id: id.to_string(),
                order_index: index as i64,
            })
            .collect(),
    )
}

/// Submit a reorder optimistically: apply the new order to the cache first,
/// roll back if the server rejects it, and invalidate on success so the next
/// read refetches the authoritative order.
pub async fn submit_reorder(
    client: &ApiClient,
    cache: &mut QueryCache,
    items: &[ReorderItem],
) -> Result<(), ClientError> {
    let snapshot = cache.snapshot();
    cache.apply_order(items);

    if let Err(err) = client.reorder_tasks(items).await {
        cache.restore(snapshot);
        return Err(err);
    }

    cache.invalidate_tasks();
    Ok(())
}
