// Test modules

mod kda_service_test;

pub mod common;
