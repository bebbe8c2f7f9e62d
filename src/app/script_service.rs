use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::domain::{Platform, ScriptError, ScriptFlavor, SettingsModel};
use crate::engine::{build_request, extract_script};
use crate::ports::ScriptGenerator;

/// Runs script generation for the script panel.
///
/// At most one generation is outstanding at a time. Failures stay here and
/// never touch capture state.
pub struct ScriptService {
    generator: Arc<dyn ScriptGenerator>,
    in_flight: AtomicBool,
    last_script: RwLock<Option<String>>,
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScriptService {
    pub fn new(generator: Arc<dyn ScriptGenerator>) -> Self {
        Self {
            generator,
            in_flight: AtomicBool::new(false),
            last_script: RwLock::new(None),
        }
    }

    /// Whether a generation is outstanding (the trigger should be disabled).
    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Generate a startup script from a settings snapshot.
    pub async fn generate(
        &self,
        settings: &SettingsModel,
        device_label: &str,
        platform: Platform,
        flavor: ScriptFlavor,
    ) -> Result<String, ScriptError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScriptError::InProgress);
        }
        let _guard = InFlight(&self.in_flight);

        let request = build_request(settings, device_label, platform, flavor);
        info!(
            backend = self.generator.name(),
            platform = %platform,
            flavor = %flavor,
            "Requesting startup script"
        );

        match extract_script(self.generator.generate(&request).await) {
            Ok(script) => {
                info!(chars = script.len(), "Startup script generated");
                *self.last_script.write() = Some(script.clone());
                Ok(script)
            }
            Err(e) => {
                warn!(error = %e, "Script generation failed");
                Err(e)
            }
        }
    }

    /// The most recent successfully generated script.
    pub fn last_script(&self) -> Option<String> {
        self.last_script.read().clone()
    }
}
