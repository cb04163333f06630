pub mod chatbot;
pub mod dynamodb;
pub mod google;
pub mod stores;

#[cfg(test)]
mod log_capture;
