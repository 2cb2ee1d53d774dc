//! HTTP surface over [`crate::governance::Governance`].

pub mod extract;
pub mod handlers;
