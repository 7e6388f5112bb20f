//! Bulk Dispatch - paced bulk messaging over a single authenticated session
//!
//! Tracks the session's connection lifecycle, runs one guarded send job at
//! a time and streams progress to every connected observer.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
