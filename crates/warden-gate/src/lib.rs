//! Eligibility gating for PR events.
//!
//! Decides, per inbound pull request event and workflow kind, whether the
//! workflow should run: draft handling, PR state, stale commits, event
//! actions, and branch targeting. Stale code-review events also trigger a
//! detached cleanup of check runs left on the superseded commit.

pub mod branch;
pub mod checkrun;
pub mod eligibility;
pub mod github;
pub mod workflow;
