pub mod fence;
pub mod semaphore;
pub mod synchronization_set;
