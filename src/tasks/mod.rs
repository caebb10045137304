mod cleanup;

pub use cleanup::HistoryCleanupTask;
