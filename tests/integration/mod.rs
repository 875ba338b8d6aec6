//! Integration tests for the permadeploy deployment engine

mod config_integration;
mod deploy_properties;
mod test_utils;
mod tree_collection;
