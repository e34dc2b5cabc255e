//! Candidate board for a job: reconciliation of the job's file list with
//! stored analyses, contact extraction, ranking, filtering and batch scoring.

pub mod board;
pub mod extraction;
pub mod filter;
pub mod handlers;
pub mod ranking;
pub mod rebuild;
pub mod reconcile;
pub mod scoring;
