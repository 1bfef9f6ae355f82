//! docpack: plan, generate, validate and consolidate multi-document
//! compliance projects.
//!
//! A [`brief::ProjectBrief`] is planned into an acyclic
//! [`planner::DocumentPlan`], generated under bounded concurrency by
//! [`runner::Scheduler`], checked per document, across documents and
//! against the brief's requirements ([`validate`]), then folded into one
//! [`consolidate::ProjectResult`]. [`pipeline::Pipeline`] runs the whole
//! sequence.

pub mod brief;
pub mod cli;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod knowledge;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod provider;
pub mod runner;
pub mod validate;
