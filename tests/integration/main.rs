//! Integration test harness
//!
//! Every test runs against a wiremock server standing in for the listing API
//! and, where needed, the captcha solving service.

mod crawl_tests;
mod support;
