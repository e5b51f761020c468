pub mod auth;
pub mod certificate;
pub mod document_service;
pub mod mailer;
pub mod order_service;
pub mod pricing;
pub mod route;
pub mod storage;
pub mod workflow;
