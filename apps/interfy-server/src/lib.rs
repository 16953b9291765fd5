//! HTTP host for the Interfy modules: middleware stack, request ids and
//! process shutdown handling.

pub mod request_id;
pub mod shutdown;
pub mod web;
