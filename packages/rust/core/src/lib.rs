//! Run orchestration for the company enricher.
//!
//! This crate ties the source reader, the profile client, and the sink writer
//! together into one transactional run (see [`pipeline::run_enrichment`]).

pub mod pipeline;
