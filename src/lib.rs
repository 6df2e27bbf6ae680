#![warn(clippy::pedantic)]
// Gives warnings for every diesel::prelude::* import
#![allow(clippy::wildcard_imports)]
// Too subjective
#![allow(clippy::similar_names, clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod model;
pub mod schema;
pub mod store;
pub mod time;
