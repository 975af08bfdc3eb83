pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod paging;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
pub mod swagger;
pub mod test_utils;
