mod api;
mod error;
mod server;

pub use api::EntriesResponse;
pub use server::start_web_server;
