//! HTTP handlers

pub mod admin;
pub mod form;
pub mod health;
