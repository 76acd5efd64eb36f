mod ai_service;
mod auth_service;
mod feed_service;
mod learning_service;
mod quiz_service;
mod watchlist_service;

pub use ai_service::*;
pub use auth_service::*;
pub use feed_service::*;
pub use learning_service::*;
pub use quiz_service::*;
pub use watchlist_service::*;
