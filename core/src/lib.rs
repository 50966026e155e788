pub mod config;
pub mod db;
pub mod event;
pub mod membership;
pub mod project;
pub mod reconcile;
pub mod user;
pub mod workspace;
