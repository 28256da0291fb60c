//! The Import Dispatcher.
//!
//! [`Importer`] is the front controller of the library: it owns the loader
//! list, the post-processing pipeline, the IO system, the property store,
//! and at most one imported scene at a time. A single call to
//! [`Importer::read_file`] drives probe, decode, validation, preprocessing,
//! and the pipeline to completion.
//!
//! All failures funnel into an internal error string: a failed import
//! returns no scene and [`Importer::error_string`] carries the message. No
//! error ever unwinds out of the public surface; panics inside loaders or
//! stages are caught at this boundary.
//!
//! One `Importer` is single-threaded; run several instances for parallel
//! imports.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::errors::{ImportError, Result};
use crate::importer::loaders::{ObjLoader, StlLoader};
use crate::importer::preprocess::preprocess_scene;
use crate::importer::properties::PropertyStore;
use crate::importer::SceneLoader;
use crate::io::{FileSystemIo, IoSystem};
use crate::postprocess::{
    default_pipeline, PostProcessStage, PostProcessSteps, SharedPostState, ValidateDataStructure,
};
use crate::scene::{compute_memory_requirements, MemoryInfo, Scene};

pub struct Importer {
    loaders: Vec<Box<dyn SceneLoader>>,
    pipeline: Vec<Box<dyn PostProcessStage>>,
    validator: ValidateDataStructure,
    io: Box<dyn IoSystem>,
    io_is_default: bool,
    properties: PropertyStore,
    scene: Option<Scene>,
    error: String,
    extra_verbose: bool,
    shared: SharedPostState,
}

impl Default for Importer {
    fn default() -> Self {
        Self::new()
    }
}

impl Importer {
    /// Creates a dispatcher with the resident loaders, the canonical
    /// pipeline, and the default filesystem IO.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(
            vec![Box::new(ObjLoader), Box::new(StlLoader)],
            default_pipeline(),
        )
    }

    /// Creates a dispatcher from explicit parts. The stage list is fixed
    /// for the dispatcher's lifetime; order is the caller's responsibility.
    #[must_use]
    pub fn with_parts(
        loaders: Vec<Box<dyn SceneLoader>>,
        pipeline: Vec<Box<dyn PostProcessStage>>,
    ) -> Self {
        Self {
            loaders,
            pipeline,
            validator: ValidateDataStructure,
            io: Box::new(FileSystemIo),
            io_is_default: true,
            properties: PropertyStore::new(),
            scene: None,
            error: String::new(),
            extra_verbose: false,
            shared: SharedPostState::new(),
        }
    }

    // ========================================================================
    // Loader registry
    // ========================================================================

    /// Appends a loader. Advertising an extension another registered loader
    /// already handles is allowed but logged; probing iterates in insertion
    /// order, so the earlier registrant keeps winning for that extension.
    pub fn register_loader(&mut self, loader: Box<dyn SceneLoader>) {
        for ext in loader.extensions() {
            if self
                .loaders
                .iter()
                .any(|existing| existing.extensions().contains(ext))
            {
                log::warn!(
                    "The file extension {ext} is already in use by another loader; \
                     the earlier registration keeps precedence"
                );
            }
        }
        self.loaders.push(loader);
    }

    /// Removes the loader registered under `name`.
    pub fn unregister_loader(&mut self, name: &str) -> Result<()> {
        let before = self.loaders.len();
        self.loaders.retain(|loader| loader.name() != name);
        if self.loaders.len() == before {
            return Err(ImportError::LoaderNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Whether some registered loader handles `extension` (leading dot
    /// optional). Answered from extension advertisement alone; no IO.
    #[must_use]
    pub fn is_extension_supported(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.');
        if ext.is_empty() {
            return false;
        }
        let probe = format!("probe.{ext}");
        self.loaders
            .iter()
            .any(|loader| loader.can_read(&probe, None, false))
    }

    /// All supported extensions in `*.a;*.b;...` form.
    #[must_use]
    pub fn extension_list(&self) -> String {
        let mut out = String::new();
        for loader in &self.loaders {
            loader.append_extension_list(&mut out);
        }
        out
    }

    // ========================================================================
    // IO handler
    // ========================================================================

    /// Installs an IO system, taking ownership. Passing `None` reinstalls
    /// the default filesystem IO; any previously owned handler is dropped
    /// either way.
    pub fn set_io_handler(&mut self, io: Option<Box<dyn IoSystem>>) {
        match io {
            Some(io) => {
                self.io = io;
                self.io_is_default = false;
            }
            None => {
                self.io = Box::new(FileSystemIo);
                self.io_is_default = true;
            }
        }
    }

    #[must_use]
    pub fn io_handler(&self) -> &dyn IoSystem {
        &*self.io
    }

    #[must_use]
    pub fn is_default_io_handler(&self) -> bool {
        self.io_is_default
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn set_property_int(&mut self, key: &str, value: i32) {
        self.properties.set_int(key, value);
    }

    pub fn set_property_float(&mut self, key: &str, value: f32) {
        self.properties.set_float(key, value);
    }

    pub fn set_property_string(&mut self, key: &str, value: &str) {
        self.properties.set_string(key, value);
    }

    #[must_use]
    pub fn property_int(&self, key: &str, default: i32) -> i32 {
        self.properties.get_int(key, default)
    }

    #[must_use]
    pub fn property_float(&self, key: &str, default: f32) -> f32 {
        self.properties.get_float(key, default)
    }

    #[must_use]
    pub fn property_string<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.properties.get_string(key, default)
    }

    // ========================================================================
    // Step validation
    // ========================================================================

    /// Rejects mutually exclusive step combinations and bits no stage of
    /// this pipeline services. Validation itself is dispatched out of band
    /// and always accepted.
    #[must_use]
    pub fn validate_steps(&self, steps: PostProcessSteps) -> bool {
        if steps.contains(PostProcessSteps::GEN_NORMALS | PostProcessSteps::GEN_SMOOTH_NORMALS) {
            log::error!("GEN_NORMALS and GEN_SMOOTH_NORMALS are mutually exclusive");
            return false;
        }
        for bit in steps.iter() {
            if bit == PostProcessSteps::VALIDATE_DATA_STRUCTURE {
                continue;
            }
            if !self.pipeline.iter().any(|stage| stage.is_active(bit)) {
                log::error!("No pipeline stage services the requested step {bit:?}");
                return false;
            }
        }
        true
    }

    // ========================================================================
    // Scene ownership
    // ========================================================================

    /// Borrow of the current scene, valid until the next mutating call.
    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Transfers ownership of the current scene to the caller.
    #[must_use]
    pub fn orphan_scene(&mut self) -> Option<Scene> {
        self.scene.take()
    }

    /// Drops the current scene, if any.
    pub fn free_scene(&mut self) {
        self.scene = None;
    }

    /// Message of the most recent failure; empty after a successful import.
    #[must_use]
    pub fn error_string(&self) -> &str {
        &self.error
    }

    /// Byte footprint of the current scene per category; zeros when no
    /// scene is held.
    #[must_use]
    pub fn memory_requirements(&self) -> MemoryInfo {
        self.scene
            .as_ref()
            .map(compute_memory_requirements)
            .unwrap_or_default()
    }

    /// Toggles validation between every pair of pipeline stages (when
    /// validation is requested at all). A development aid; slow.
    pub fn set_extra_verbose(&mut self, enable: bool) {
        self.extra_verbose = enable;
    }

    // ========================================================================
    // Import
    // ========================================================================

    /// Imports `path`, running every requested post-processing step.
    ///
    /// On success the returned borrow is also retrievable via
    /// [`Importer::scene`] until the next import, [`Importer::free_scene`],
    /// or [`Importer::orphan_scene`]. On failure `None` is returned and
    /// [`Importer::error_string`] describes the problem.
    pub fn read_file(&mut self, path: &str, steps: PostProcessSteps) -> Option<&Scene> {
        debug_assert!(self.validate_steps(steps), "invalid step bitset {steps:?}");
        let path = path.to_owned();

        self.scene = None;
        self.error.clear();
        self.shared.clear();

        match self.read_file_inner(&path, steps) {
            Ok(scene) => {
                self.scene = Some(scene);
                self.scene.as_ref()
            }
            Err(err) => {
                self.error = err.to_string();
                log::error!("{}", self.error);
                self.shared.clear();
                None
            }
        }
    }

    fn read_file_inner(&mut self, path: &str, steps: PostProcessSteps) -> Result<Scene> {
        if !self.io.exists(path) {
            return Err(ImportError::MissingFile(path.to_string()));
        }

        let loader_index = self.select_loader(path)?;
        let loader = &mut self.loaders[loader_index];
        log::debug!("Found a matching loader: {}", loader.name());
        loader.setup_properties(&self.properties);

        let io = &*self.io;
        let loader = &self.loaders[loader_index];
        let decoded = catch_unwind(AssertUnwindSafe(|| loader.intern_read(path, io)));
        let mut scene = match decoded {
            Ok(result) => result?,
            Err(payload) => {
                return Err(ImportError::CrashedUnexpectedly {
                    path: path.to_string(),
                    message: panic_message(&payload),
                });
            }
        };

        // Validation sits outside the ordered pipeline and runs first.
        let validate = steps.contains(PostProcessSteps::VALIDATE_DATA_STRUCTURE);
        if validate {
            self.validator.execute(&mut scene, &mut self.shared)?;
        }

        preprocess_scene(&mut scene);
        self.run_pipeline(&mut scene, steps, validate)?;
        self.shared.clear();
        Ok(scene)
    }

    /// Two-phase loader selection: extension pass, then signature pass.
    fn select_loader(&self, path: &str) -> Result<usize> {
        let io = &*self.io;
        if let Some(index) = self
            .loaders
            .iter()
            .position(|loader| loader.can_read(path, Some(io), false))
        {
            return Ok(index);
        }

        // The signature pass only makes sense for paths that look like file
        // names at all.
        if path.contains('.') {
            log::info!("File extension of {path} not known, trying signature detection");
            if let Some(index) = self
                .loaders
                .iter()
                .position(|loader| loader.can_read(path, Some(io), true))
            {
                return Ok(index);
            }
        }
        Err(ImportError::NoLoader(path.to_string()))
    }

    fn run_pipeline(
        &mut self,
        scene: &mut Scene,
        steps: PostProcessSteps,
        validate: bool,
    ) -> Result<()> {
        for stage in &mut self.pipeline {
            if !stage.is_active(steps) {
                continue;
            }
            stage.setup_properties(&self.properties);
            log::debug!("Executing post-processing stage: {}", stage.name());

            let shared = &mut self.shared;
            let outcome = catch_unwind(AssertUnwindSafe(|| stage.execute(scene, shared)));
            match outcome {
                Ok(result) => result.map_err(|err| ImportError::StageFailed {
                    stage: stage.name(),
                    message: err.to_string(),
                })?,
                Err(payload) => {
                    return Err(ImportError::StageFailed {
                        stage: stage.name(),
                        message: format!("crashed unexpectedly: {}", panic_message(&payload)),
                    });
                }
            }

            if self.extra_verbose && validate {
                self.validator.execute(scene, &mut self.shared)?;
            }
        }
        Ok(())
    }
}

/// Copying a dispatcher propagates configuration, never loaded data: the
/// clone gets a fresh loader set, pipeline, and default IO, plus the source
/// dispatcher's property store contents.
impl Clone for Importer {
    fn clone(&self) -> Self {
        let mut fresh = Self::new();
        fresh.properties = self.properties.clone();
        fresh.extra_verbose = self.extra_verbose;
        fresh
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_else(|| "unknown panic payload".to_string())
    }
}
