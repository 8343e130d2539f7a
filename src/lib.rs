pub mod downloader;
pub mod generation;
pub mod models;
pub mod prompting;

pub(crate) use anyhow::{anyhow, bail, Result};
