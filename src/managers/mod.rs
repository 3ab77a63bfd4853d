// SmartMark state managers
// Managers hold state: the bookmark store contract and its local store, the session
// contract and its fixed session, and the synchronization controller.

pub mod bookmark_store;
pub mod session_accessor;
pub mod sync_controller;
