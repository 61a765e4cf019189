//! API request and response types.
//!
//! Requests derive `Deserialize`, responses derive `Serialize`. SHOW
//! statements answer with a [`functions::ResultSet`].

pub mod catalog;
pub mod databases;
pub mod functions;
