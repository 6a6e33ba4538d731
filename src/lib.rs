pub mod config;
pub mod error;
pub mod process;
pub mod report;
pub mod schema;

#[cfg(test)]
mod test_support;
