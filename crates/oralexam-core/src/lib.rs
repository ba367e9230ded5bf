//! oralexam-core: Exam lifecycle, deterministic scoring, and CLB mapping.
//!
//! This crate defines the data model, the exam phase state machine, and the
//! scoring pipeline that turns a transcript into a CLB level with feedback.

pub mod config;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
pub mod state_machine;
pub mod traits;
