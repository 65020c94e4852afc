/// Interview-prep brief generation.
///
/// `pipeline` is the entry point: documents in, `Brief` out. The other modules are
/// its stages (`request_builder`, `parser`) and the contract they share (`models`,
/// `prompts`). `handlers` exposes the pipeline over HTTP.
pub mod errors;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod request_builder;
