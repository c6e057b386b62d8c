pub mod image_processor;
pub mod job_runner;
pub mod orchestrator;
