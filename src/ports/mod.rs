pub mod capture;
pub mod config;
pub mod http;
pub mod output;
pub mod script;

pub use capture::{CaptureHost, CaptureStream, StreamHandle};
pub use config::ConfigStore;
pub use http::HttpClient;
pub use output::ClipboardWriter;
pub use script::ScriptGenerator;
