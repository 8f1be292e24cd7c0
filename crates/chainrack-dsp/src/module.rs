//! Module-backed plugins.
//!
//! A [`ModuleKernel`] is a processing core that keeps its state and its I/O
//! block in a [`LinearMemory`] rather than in Rust-owned buffers. It is
//! produced by a [`ModuleLoader`] on the control context, inside the registry
//! factory, so a failed load surfaces as a [`ConstructionError`] before the
//! instance ever reaches a pipeline.
//!
//! [`ModulePlugin`] adapts a kernel to the [`Plugin`] contract:
//!
//! - the kernel is re-instantiated (memory reset, state re-reserved) on any
//!   format change or when a layout parameter changes;
//! - other parameter changes are pushed to the kernel with
//!   [`ModuleKernel::update`] from `set_parameters` itself;
//! - views invalidated by memory growth are reacquired before each copy.

use crate::error::{ModuleError, Result};
use crate::memory::{LinearMemory, MemoryView, PAGE_SAMPLES};
use chainrack_core::{
    AudioBlock, ConstructionError, ContextCache, FormatDescriptor, ParameterMap, ParameterSet,
    Plugin,
};

/// Default cap on a module's linear memory, in samples.
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * PAGE_SAMPLES;

/// A processing core that lives in linear memory.
pub trait ModuleKernel: Send {
    /// Declared parameters with their defaults.
    fn parameters(&self) -> ParameterSet;

    /// Parameters whose change alters the memory layout and forces
    /// re-instantiation.
    fn layout_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Reserve state in `memory` for `format`. The memory has just been reset.
    fn instantiate(
        &mut self,
        memory: &mut LinearMemory,
        format: &FormatDescriptor,
        params: &ParameterSet,
    ) -> Result<()>;

    /// Refresh derived constants after a parameter change that keeps the layout.
    fn update(
        &mut self,
        memory: &mut LinearMemory,
        format: &FormatDescriptor,
        params: &ParameterSet,
    ) -> Result<()>;

    /// Process the planar block held in `io` in place.
    fn process(
        &mut self,
        memory: &mut LinearMemory,
        io: &MemoryView,
        format: &FormatDescriptor,
    ) -> Result<()>;
}

/// Produces kernels. Loading may fail, e.g. when a compiled module is missing.
pub trait ModuleLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn ModuleKernel>>;
}

impl<F> ModuleLoader for F
where
    F: Fn() -> Result<Box<dyn ModuleKernel>> + Send + Sync,
{
    fn load(&self) -> Result<Box<dyn ModuleKernel>> {
        self()
    }
}

/// [`Plugin`] adapter around a [`ModuleKernel`].
pub struct ModulePlugin {
    type_id: String,
    params: ParameterSet,
    kernel: Box<dyn ModuleKernel>,
    memory: LinearMemory,
    /// I/O view of the current instantiation, or why it failed.
    context: ContextCache<Vec<u64>, Result<MemoryView>>,
    fallback: bool,
    last_error: Option<ModuleError>,
}

impl ModulePlugin {
    /// Load a kernel, trying `fallback` if the primary loader fails.
    pub fn load(
        type_id: &str,
        primary: &dyn ModuleLoader,
        fallback: Option<&dyn ModuleLoader>,
    ) -> std::result::Result<Self, ConstructionError> {
        let module_load = |e: ModuleError| ConstructionError::ModuleLoad {
            type_id: type_id.to_string(),
            reason: e.to_string(),
        };
        let (kernel, used_fallback) = match (primary.load(), fallback) {
            (Ok(kernel), _) => (kernel, false),
            (Err(e), Some(fallback)) => {
                tracing::warn!("Module for {} failed to load ({}), using fallback", type_id, e);
                (fallback.load().map_err(module_load)?, true)
            }
            (Err(e), None) => return Err(module_load(e)),
        };
        Ok(Self::with_kernel(type_id, kernel, used_fallback))
    }

    fn with_kernel(type_id: &str, kernel: Box<dyn ModuleKernel>, fallback: bool) -> Self {
        Self {
            type_id: type_id.to_string(),
            params: kernel.parameters(),
            kernel,
            memory: LinearMemory::new(DEFAULT_MEMORY_LIMIT),
            context: ContextCache::new(),
            fallback,
            last_error: None,
        }
    }

    /// Whether the fallback loader supplied the kernel.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    /// Most recent instantiation or processing error. The affected blocks
    /// were passed through unchanged.
    pub fn last_error(&self) -> Option<&ModuleError> {
        self.last_error.as_ref()
    }

    fn layout_key(&self) -> Vec<u64> {
        self.kernel
            .layout_keys()
            .iter()
            .map(|key| self.params.float(key).to_bits())
            .collect()
    }

    /// Push the current parameters to a live instantiation. Layout changes
    /// are left to the next block, which re-instantiates.
    fn update_kernel(&mut self) -> Result<()> {
        let key = self.layout_key();
        let format = match self.context.built_for() {
            Some((format, built_key)) if *built_key == key => *format,
            _ => return Ok(()),
        };
        let Self {
            params,
            kernel,
            memory,
            context,
            ..
        } = self;
        match context.get_mut() {
            Some(Ok(_)) => kernel.update(memory, &format, params),
            _ => Ok(()),
        }
    }

    fn run(&mut self, block: &mut AudioBlock<'_>, format: &FormatDescriptor) -> Result<()> {
        let key = self.layout_key();
        let Self {
            params,
            kernel,
            memory,
            context,
            ..
        } = self;

        let io = context.get_or_rebuild(format, &key, |format, _| {
            memory.reset();
            let io = memory.reserve(format.samples())?;
            kernel.instantiate(memory, format, params)?;
            Ok(io)
        });
        let io = match io {
            Ok(io) => io,
            Err(e) => return Err(e.clone()),
        };

        if memory.is_stale(io) {
            *io = memory.reacquire(io)?;
        }
        let samples = block.as_slice().len().min(io.len());
        memory.slice_mut(io)?[..samples].copy_from_slice(&block.as_slice()[..samples]);

        kernel.process(memory, io, format)?;

        if memory.is_stale(io) {
            *io = memory.reacquire(io)?;
        }
        block.as_mut_slice()[..samples].copy_from_slice(&memory.slice(io)?[..samples]);
        Ok(())
    }
}

impl Plugin for ModulePlugin {
    fn type_id(&self) -> &str {
        &self.type_id
    }

    fn parameters(&self) -> ParameterMap {
        self.params.snapshot()
    }

    fn parameter_set(&self) -> Option<&ParameterSet> {
        Some(&self.params)
    }

    fn set_parameters(&mut self, partial: &ParameterMap) {
        if !self.params.apply(partial) {
            return;
        }
        if let Err(e) = self.update_kernel() {
            self.last_error = Some(e);
        }
    }

    fn process(&mut self, block: &mut AudioBlock<'_>, format: &FormatDescriptor) {
        if let Err(e) = self.run(block, format) {
            self.last_error = Some(e);
        }
    }

    fn release(&mut self) {
        self.context.clear();
        self.memory.clear();
    }

    fn reinit_count(&self) -> u64 {
        self.context.reinit_count()
    }
}
