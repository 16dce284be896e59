#![doc = "gittomd-core: turns a remote repository listing into one deterministic Markdown document."]

//! This crate holds every piece of the conversion pipeline: path classification,
//! tree construction and rendering, concurrent content fetching, document assembly
//! and the compressed document cache, plus the GitHub and cache-store collaborators.
//!
//! # Usage
//! Build a [`convert::Converter`] (directly from collaborators, or with
//! [`convert::Converter::from_config`]) and call `convert(owner, repo)`.

pub mod assemble;
pub mod cache;
pub mod classify;
pub mod config;
pub mod contract;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod github;
pub mod render;
pub mod tree;
