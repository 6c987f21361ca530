// src/lib.rs

//! Attack-surface reconnaissance and risk-scoring engine.
//!
//! Given one target domain, the engine discovers candidate subdomains,
//! probes each host (DNS, TLS certificate, HTTP security headers,
//! technology fingerprint) under a bounded-concurrency pool and a global
//! wall-clock deadline, and scores the aggregated result into a 0-100
//! risk score, a letter grade, and a prioritized remediation list.
//!
//! The entrypoints are [`core::scanner::run_scan`] and
//! [`core::risk::assess`]; everything they return is a plain serde
//! wire shape owned by the caller. Presentation, export, and storage of
//! reports are external concerns.

pub mod core;
pub mod logging;
