#[macro_use]
mod text_enum;

pub mod asset;
pub mod company;
pub mod contract;
pub mod dashboard;
pub mod email_queue;
pub mod inspection;
pub mod measurement;
pub mod relevant_item;
pub mod report;
pub mod schedule;
pub mod session;
pub mod user;

// Re-export models for easier access
pub use asset::*;
pub use company::*;
pub use contract::*;
pub use dashboard::*;
pub use email_queue::*;
pub use inspection::*;
pub use measurement::*;
pub use relevant_item::*;
pub use report::*;
pub use schedule::*;
pub use session::*;
pub use user::*;
