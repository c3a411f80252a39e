//! Eager expiry
//!
//! Authorization already expires records lazily. The sweeper additionally flips lapsed
//! records so listings and metadata reflect expiry without waiting for an access attempt.

mod sweeper;

pub use sweeper::ExpirySweeper;
