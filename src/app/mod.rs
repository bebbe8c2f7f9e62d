mod controller;
mod script_service;
mod session;

pub use controller::{AppController, ControllerOptions};
pub use script_service::ScriptService;
pub use session::CaptureSession;

#[cfg(test)]
pub(crate) use controller::tests as test_support;
