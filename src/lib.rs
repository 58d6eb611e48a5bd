//! AtomPub-style feed server.
//!
//! Feeds are named collections of entries stored in SQLite. The server
//! exposes two operations over HTTP: fetch a feed as an Atom document, and
//! append an entry to a feed, creating the feed on first use.
//!
//! - [`feed`] - domain model and Atom encode/decode
//! - [`storage`] - SQLite persistence behind the [`storage::FeedStore`] trait
//! - [`service`] - the get-feed and add-entry operations
//! - [`server`] - axum routes mapping requests to the service
//! - [`config`] - TOML configuration

pub mod config;
pub mod feed;
pub mod server;
pub mod service;
pub mod storage;
pub mod util;
