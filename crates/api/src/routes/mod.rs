pub mod activity;
pub mod analytics;
pub mod assistant;
pub mod auth;
pub mod health;
pub mod models;
pub mod notifications;
pub mod polls;
pub mod station;
pub mod users;
pub mod vault;
