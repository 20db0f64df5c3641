//! Webhook handling for GitHub and GitLab events.
//!
//! This module provides:
//! - Authenticity checks (GitHub HMAC-SHA256 signatures, GitLab secret tokens)
//! - Event routing by platform and kind header
//! - The GitLab `Pipeline Hook` payload type

pub mod events;
pub mod signature;

pub use events::{
    EventRoute, GITHUB_PULL_REQUEST, GITHUB_PUSH, GITLAB_PIPELINE_HOOK, HookBuild, HookCommit,
    PipelineAttributes, PipelineHook, Platform, SyncTrigger, route_event,
};
pub use signature::{
    compute_signature, format_signature_header, parse_signature_header, verify_gitlab_token,
    verify_signature,
};
