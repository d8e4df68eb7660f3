// Library for tests to access modules

pub mod cache;
pub mod collector;
pub mod config;
pub mod docker_repo;
pub mod federation;
pub mod models;
pub mod monitor_repo;
pub mod resolver;
pub mod routes;
pub mod sysinfo_repo;
pub mod version;
