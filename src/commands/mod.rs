pub mod compile;
pub mod find;
pub mod parse;

#[cfg(test)]
#[path = "../commands_test.rs"]
mod commands_test;
