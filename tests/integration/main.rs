//! Integration tests for Shelf-Sweep

mod crawl_tests;
mod http_tests;
mod support;
