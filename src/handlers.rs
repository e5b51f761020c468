pub mod admin;
pub mod documents;
pub mod orders;
