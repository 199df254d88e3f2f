pub mod intent_log;
pub mod reader;
