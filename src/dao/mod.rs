/// Persistence abstraction and its backends.
pub mod arena_store;
/// Storage entity definitions.
pub mod models;
/// Storage error and write outcome types.
pub mod storage;
