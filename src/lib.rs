/// Basic application code
pub mod app;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Cryptography-related objects
pub mod crypto;
/// Domain objects
pub mod domain;
/// Error enums
pub mod error;
/// Data records
pub mod model;
/// Email queue draining
pub mod processor;
/// Repositories
pub mod repo;
/// Application settings
pub mod settings;
/// Fitness stats client cache
pub mod strava;
/// Application telemetry for tracing and logging
pub mod telemetry;
/// HTML email templates and pages
pub mod template;
