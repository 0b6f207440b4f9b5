pub mod core;
pub mod permissions;

// GitHub lookups behind the classifier
pub mod github;

// Request interception and permission logs
pub mod monitor;
pub mod report;

// Optional components
pub mod cli;
pub mod logging;
