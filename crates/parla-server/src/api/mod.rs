pub mod chat;
pub mod models;
pub mod response;
pub mod state;
pub mod welcome;

pub use response::ApiResponse;
