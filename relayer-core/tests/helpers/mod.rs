#![allow(dead_code)]

pub mod fixtures;
pub mod mock_guardians;
pub mod vaa_builder;

pub use fixtures::*;
pub use mock_guardians::*;
pub use vaa_builder::*;
