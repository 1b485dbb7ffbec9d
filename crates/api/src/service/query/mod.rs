pub mod activities;
pub mod groups;
pub mod presentations;
pub mod projects;
pub mod resources;
pub mod users;

/// Number of pages needed to show `total_count` items, `limit` per page.
pub(crate) fn calculate_total_pages(total_count: i64, limit: i64) -> i64 {
  if limit <= 0 {
    return 0;
  }

  (total_count as f64 / limit as f64).ceil() as i64
}
