//! Hosting API access
//!
//! `GithubClient` implements both secondary-lookup traits of the
//! classification engine over `reqwest`.

pub mod client;

pub use client::{issue_comment_path, issue_event_path, pull_request_path, repository_path, GithubClient};
