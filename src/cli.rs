//! CLI domain: parse, route, and presentation only.
//! Engine behavior lives in the library modules; the route table wires them together.

mod parse;
mod presentation;
mod route;

pub use parse::{Cli, Commands, OutputFormat};
pub use route::RunContext;
