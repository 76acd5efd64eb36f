mod learning;
mod quiz;
mod social;
mod user;

pub use learning::*;
pub use quiz::*;
pub use social::*;
pub use user::*;
