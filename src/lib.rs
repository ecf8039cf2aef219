pub mod action;
pub mod adapters;
pub mod config;
pub mod error;
pub mod event;
pub mod forward;
pub mod gateway;
pub mod http;
pub mod mailer;
pub mod response;
pub mod signature;
