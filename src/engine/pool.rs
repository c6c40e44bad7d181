//! Model Pool
//!
//! Holds the OpenVINO runtime and the compiled pose model. Both are created
//! on first use, so a run that never reaches inference never loads the
//! runtime library.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use openvino::{CompiledModel, Core};
use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::config::InferenceConfig;

/// Wrapper for OpenVINO Core that implements Send + Sync
pub struct SafeCore(Core);
unsafe impl Send for SafeCore {}
unsafe impl Sync for SafeCore {}

impl Deref for SafeCore {
    type Target = Core;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for SafeCore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Wrapper for OpenVINO CompiledModel that implements Send + Sync
#[derive(Clone)]
pub struct SafeCompiledModel(pub Arc<CompiledModel>);
unsafe impl Send for SafeCompiledModel {}
unsafe impl Sync for SafeCompiledModel {}

impl SafeCompiledModel {
    /// Create an inference request
    /// OpenVINO CompiledModel methods are thread-safe in C++, but Rust bindings
    /// require &mut self.
    pub fn create_infer_request(&self) -> anyhow::Result<openvino::InferRequest> {
        unsafe {
            let ptr = Arc::as_ptr(&self.0) as *mut CompiledModel;
            (*ptr).create_infer_request().map_err(|e| e.into())
        }
    }
}

/// Lazily loaded pose model bound to one device
pub struct ModelPool {
    core: Mutex<Option<SafeCore>>,
    device: String,
    model_path: PathBuf,
    model: RwLock<Option<SafeCompiledModel>>,
}

impl ModelPool {
    /// Create a new model pool. Nothing is loaded until `get_model`.
    pub fn new(config: &InferenceConfig, model_path: impl Into<PathBuf>) -> Self {
        Self {
            core: Mutex::new(None),
            device: config.device.clone(),
            model_path: model_path.into(),
            model: RwLock::new(None),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Get or load the model, returns a clone of the compiled model
    pub fn get_model(&self) -> anyhow::Result<SafeCompiledModel> {
        if let Some(compiled) = self.model.read().as_ref() {
            return Ok(compiled.clone());
        }

        let mut write_guard = self.model.write();

        // Double-check after acquiring write lock
        if let Some(compiled) = write_guard.as_ref() {
            return Ok(compiled.clone());
        }

        let path = self
            .model_path
            .to_str()
            .with_context(|| format!("model path is not valid UTF-8: {}", self.model_path.display()))?;

        info!("Loading pose model from {} on {}", path, self.device);
        let start = Instant::now();

        // Core methods like read_model require &mut self in Rust bindings
        let mut core_guard = self.core.lock();
        if core_guard.is_none() {
            let core = Core::new().context("failed to initialize OpenVINO runtime")?;
            *core_guard = Some(SafeCore(core));
        }
        let core = core_guard
            .as_mut()
            .context("OpenVINO runtime unavailable")?;

        let model = core
            .read_model_from_file(path, "")
            .with_context(|| format!("failed to read model {}", path))?;
        let compiled = core
            .compile_model(&model, self.device.as_str().into())
            .with_context(|| format!("failed to compile model for device {}", self.device))?;
        let safe_compiled = SafeCompiledModel(Arc::new(compiled));

        info!("Pose model loaded in {:?}", start.elapsed());

        *write_guard = Some(safe_compiled.clone());
        Ok(safe_compiled)
    }

    /// Check if the model is loaded
    pub fn is_loaded(&self) -> bool {
        self.model.read().is_some()
    }
}
