#![doc = include_str!("../README.md")]

pub mod discover;
pub mod dispatch;
pub mod error;
pub mod probe;
pub mod result;
pub mod submit;
