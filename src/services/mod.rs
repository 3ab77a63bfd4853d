// SmartMark services
// Services are stateless helpers and external-facing clients: input normalization, search,
// the hosted backend (REST, auth, realtime), configuration and logging.

pub mod backend_client;
pub mod bookmark_input;
pub mod config_engine;
pub mod logging;
pub mod realtime;
pub mod remote_store;
pub mod search;
pub mod supabase_auth;
