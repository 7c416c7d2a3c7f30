//! dynupd library
//!
//! Pushes dynamic content updates (application, threat, antivirus and
//! WildFire signatures) to firewalls over the XML API and waits for the
//! resulting install jobs.

pub mod cli;
pub mod discovery;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod parse;
pub mod report;
pub mod shutdown;
pub mod storage;
pub mod update;
pub mod utils;
pub mod xapi;
