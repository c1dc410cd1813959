pub mod download;
pub mod item;

pub use download::{DownloadQueue, EnqueueOutcome, QueueError, QueueStats, Result};
pub use item::{QueueItem, QueueStatus, item_id_for_url, queue_order};
