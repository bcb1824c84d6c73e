pub mod fanout;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod state;
pub mod ws;

pub use server::{ServerBuilder, VigilServer, build_app};
pub use state::AppState;
