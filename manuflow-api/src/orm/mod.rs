pub mod asset;
pub mod company;
pub mod contract;
pub mod dashboard;
mod db;
pub mod email_queue;
pub mod inspection;
pub mod login;
pub mod measurement;
pub mod relevant_item;
pub mod report;
pub mod ronda;
pub mod schedule;
pub mod testing;
pub mod user;

pub use db::*;
