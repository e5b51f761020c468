pub mod auth;
pub mod checklist;
pub mod command;
pub mod order;
