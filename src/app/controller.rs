use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{
    ArboardClipboard, GeminiScriptGenerator, NetworkGuard, SimulatedCaptureHost, TomlConfigStore,
};
use crate::app::{CaptureSession, ScriptService};
use crate::domain::{AppConfig, CaptureBackend, DomainError, Platform, ScriptError, ScriptFlavor};
use crate::infrastructure::init_logging;
use crate::ports::{CaptureHost, ClipboardWriter, ConfigStore, ScriptGenerator};

/// Label used in prompts when no stream is open.
const UNKNOWN_CAMERA: &str = "Unknown camera";

/// Per-run overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    pub config_dir: Option<PathBuf>,
    pub backend: Option<CaptureBackend>,
    pub log_level: Option<String>,
}

/// Application controller that orchestrates initialization and owns the session.
pub struct AppController {
    config: AppConfig,
    config_store: Arc<dyn ConfigStore>,
    session: CaptureSession,
    scripts: ScriptService,
    clipboard: Arc<dyn ClipboardWriter>,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Initialize the application controller.
    /// This sets up configuration, logging, the capture host and the script backend.
    pub fn new(options: ControllerOptions) -> Result<Self, DomainError> {
        // Step 1: Initialize config store
        let config_store: Arc<dyn ConfigStore> = match options.config_dir {
            Some(dir) => Arc::new(TomlConfigStore::at(dir)?),
            None => Arc::new(TomlConfigStore::new()?),
        };

        // Step 2: Load configuration, then apply one-run overrides
        let mut config = config_store.load()?;
        if let Some(backend) = options.backend {
            config.capture.backend = backend;
        }
        if let Some(level) = options.log_level {
            config.logging.level = level;
        }

        // Step 3: Initialize logging
        let log_guard = init_logging(
            &config_store.logs_dir(),
            &config.logging.level,
            config.logging.file_logging,
        )?;

        info!("CamTune starting up");

        // Step 4: Capture host
        let host = capture_host(config.capture.backend)?;

        // Step 5: Script backend behind the network guard
        let http = NetworkGuard::new(&config.network)?;
        let generator = GeminiScriptGenerator::from_env(http, &config.script);

        info!(
            backend = %config.capture.backend,
            local_only = config.network.local_only,
            "AppController initialized"
        );

        let mut controller = Self::from_parts(
            config,
            config_store,
            host,
            Arc::new(generator),
            Arc::new(ArboardClipboard::new()),
        );
        controller._log_guard = log_guard;
        Ok(controller)
    }

    /// Assemble a controller from ready-made collaborators. Does not touch logging.
    pub fn from_parts(
        config: AppConfig,
        config_store: Arc<dyn ConfigStore>,
        host: Arc<dyn CaptureHost>,
        generator: Arc<dyn ScriptGenerator>,
        clipboard: Arc<dyn ClipboardWriter>,
    ) -> Self {
        let hint = config.capture.resolution_hint();
        Self {
            config,
            config_store,
            session: CaptureSession::new(host, hint),
            scripts: ScriptService::new(generator),
            clipboard,
            _log_guard: None,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn scripts(&self) -> &ScriptService {
        &self.scripts
    }

    /// Get the config file path.
    pub fn config_path(&self) -> String {
        self.config_store.config_path().to_string_lossy().to_string()
    }

    /// Get the logs directory path.
    pub fn logs_dir(&self) -> String {
        self.config_store.logs_dir().to_string_lossy().to_string()
    }

    /// Generate a startup script for the current settings.
    ///
    /// Missing arguments fall back to the configured defaults.
    pub async fn generate_script(
        &self,
        platform: Option<Platform>,
        flavor: Option<ScriptFlavor>,
    ) -> Result<String, ScriptError> {
        let platform = platform.unwrap_or(self.config.script.default_platform);
        let flavor = flavor.unwrap_or(self.config.script.default_flavor);
        let settings = self.session.settings();
        let label = self
            .session
            .active_device_label()
            .unwrap_or_else(|| UNKNOWN_CAMERA.to_string());

        self.scripts.generate(&settings, &label, platform, flavor).await
    }

    /// Put the last generated script on the clipboard.
    pub fn copy_last_script(&self) -> Result<usize, DomainError> {
        let script = self
            .scripts
            .last_script()
            .ok_or_else(|| DomainError::Clipboard("No script has been generated yet".to_string()))?;
        self.clipboard.copy_text(&script)?;
        Ok(script.len())
    }

    /// Release the stream before exit.
    pub fn shutdown(&self) {
        self.session.close();
        info!("CamTune shut down");
    }
}

fn capture_host(backend: CaptureBackend) -> Result<Arc<dyn CaptureHost>, DomainError> {
    match backend {
        CaptureBackend::Simulated => Ok(Arc::new(SimulatedCaptureHost::with_demo_devices())),
        #[cfg(all(feature = "v4l2", target_os = "linux"))]
        CaptureBackend::V4l2 => Ok(Arc::new(crate::adapters::V4l2CaptureHost::new())),
        #[cfg(not(all(feature = "v4l2", target_os = "linux")))]
        CaptureBackend::V4l2 => {
            tracing::warn!("V4L2 backend requested but this build has no V4L2 support");
            Err(DomainError::Config(
                "This build has no V4L2 support; rebuild with --features v4l2 or use the simulated backend"
                    .to_string(),
            ))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::domain::ScriptRequest;

    pub(crate) struct EchoGenerator;

    #[async_trait]
    impl ScriptGenerator for EchoGenerator {
        async fn generate(&self, request: &ScriptRequest) -> Result<String, ScriptError> {
            Ok(format!("```bash\n{}\n```", request.prompt))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[derive(Default)]
    pub(crate) struct MemoryClipboard {
        pub(crate) text: Mutex<Option<String>>,
    }

    impl ClipboardWriter for MemoryClipboard {
        fn copy_text(&self, text: &str) -> Result<(), DomainError> {
            *self.text.lock() = Some(text.to_string());
            Ok(())
        }
    }

    pub(crate) fn test_controller(name: &str) -> (AppController, Arc<MemoryClipboard>) {
        test_controller_with(name, Arc::new(EchoGenerator))
    }

    pub(crate) fn test_controller_with(
        name: &str,
        generator: Arc<dyn ScriptGenerator>,
    ) -> (AppController, Arc<MemoryClipboard>) {
        let dir = env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        let store = Arc::new(TomlConfigStore::at(dir).unwrap());
        let clipboard = Arc::new(MemoryClipboard::default());
        let controller = AppController::from_parts(
            AppConfig::new(),
            store,
            Arc::new(SimulatedCaptureHost::with_demo_devices()),
            generator,
            clipboard.clone(),
        );
        (controller, clipboard)
    }

    #[tokio::test]
    async fn test_generate_without_stream_uses_unknown_camera() {
        let (controller, _) = test_controller("camtune_controller_unknown");

        let script = controller
            .generate_script(Some(Platform::Linux), Some(ScriptFlavor::Shell))
            .await
            .unwrap();
        assert!(script.contains(UNKNOWN_CAMERA));
    }

    #[tokio::test]
    async fn test_generate_uses_active_device_label() {
        let (controller, _) = test_controller("camtune_controller_label");
        controller.session().refresh_devices().await.unwrap();
        controller.session().select_device("sim-0").await.unwrap();

        let script = controller.generate_script(None, None).await.unwrap();
        assert!(script.contains("Simulated Studio Camera"));
    }

    #[tokio::test]
    async fn test_copy_last_script() {
        let (controller, clipboard) = test_controller("camtune_controller_copy");
        assert!(controller.copy_last_script().is_err());

        let script = controller.generate_script(None, None).await.unwrap();
        let copied = controller.copy_last_script().unwrap();

        assert_eq!(copied, script.len());
        assert_eq!(clipboard.text.lock().clone(), Some(script));
    }

    #[tokio::test]
    async fn test_shutdown_releases_stream() {
        let host = SimulatedCaptureHost::with_demo_devices();
        let dir = env::temp_dir().join("camtune_controller_shutdown");
        let _ = std::fs::remove_dir_all(&dir);
        let controller = AppController::from_parts(
            AppConfig::new(),
            Arc::new(TomlConfigStore::at(dir).unwrap()),
            Arc::new(host.clone()),
            Arc::new(EchoGenerator),
            Arc::new(MemoryClipboard::default()),
        );

        controller.session().select_device("sim-0").await.unwrap();
        assert_eq!(host.live_streams(), 1);

        controller.shutdown();
        assert_eq!(host.live_streams(), 0);
        assert!(controller.session().stream_state().is_idle());
    }

    #[test]
    fn test_v4l2_backend_availability() {
        let result = capture_host(CaptureBackend::V4l2);
        if cfg!(all(feature = "v4l2", target_os = "linux")) {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(DomainError::Config(_))));
        }
    }
}
