//! Shared wgpu adapter/device selection for the rollout engine.
//!
//! A single device is initialized once and handed out to every GPU consumer,
//! so repeated solver construction does not re-enumerate adapters.

use std::env;
use std::sync::{Arc, Mutex, OnceLock};

#[derive(Clone)]
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_info: Arc<wgpu::AdapterInfo>,
}

impl GpuContext {
    pub async fn new() -> Result<Self, String> {
        Self::new_with_label("GPU Context").await
    }

    pub async fn new_with_label(label: &str) -> Result<Self, String> {
        // WGPU_BACKEND can force a specific backend (useful in containers).
        let backends = match env::var("WGPU_BACKEND") {
            Ok(backend) => match backend.to_uppercase().as_str() {
                "VULKAN" => wgpu::Backends::VULKAN,
                "DX12" => wgpu::Backends::DX12,
                "METAL" => wgpu::Backends::METAL,
                "GL" => wgpu::Backends::GL,
                _ => {
                    eprintln!("⚠ Unknown WGPU_BACKEND '{}', using all backends", backend);
                    wgpu::Backends::all()
                }
            },
            Err(_) => wgpu::Backends::all(),
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapters = instance.enumerate_adapters(backends);
        if adapters.is_empty() {
            eprintln!("❌ No GPU adapters found (backends: {:?})", backends);
            eprintln!("   Check drivers, container GPU flags, or set WGPU_BACKEND");
        }

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| "Failed to find an appropriate GPU adapter".to_string())?;

        let adapter_info = adapter.get_info();
        eprintln!(
            "✓ Selected GPU: {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some(label),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to create device: {}", e))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info: Arc::new(adapter_info),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn new_sync() -> Result<Self, String> {
        pollster::block_on(Self::new())
    }

    pub fn new_sync_with_label(label: &str) -> Result<Self, String> {
        pollster::block_on(Self::new_with_label(label))
    }
}

static SHARED_GPU_CONTEXT: OnceLock<Mutex<Option<GpuContext>>> = OnceLock::new();

/// Get or initialize the process-wide GPU context.
pub fn get_shared_context() -> Result<GpuContext, String> {
    let mutex = SHARED_GPU_CONTEXT.get_or_init(|| Mutex::new(None));

    let mut guard = mutex
        .lock()
        .map_err(|e| format!("Failed to lock GPU context: {}", e))?;

    if let Some(ref context) = *guard {
        Ok(context.clone())
    } else {
        eprintln!("🔄 Initializing shared GPU context...");
        let context = GpuContext::new_sync_with_label("Shared GPU Context")?;
        *guard = Some(context.clone());
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_context_creation() {
        let context = GpuContext::new_sync();
        if let Err(e) = &context {
            println!("Skipping test: GPU not available - {}", e);
            return;
        }
        let ctx = context.unwrap();
        println!("GPU: {}", ctx.adapter_info().name);
    }

    #[test]
    fn shared_context_reuses_the_same_device() {
        let ctx1 = match get_shared_context() {
            Ok(ctx) => ctx,
            Err(e) => {
                println!("Skipping test: GPU not available - {}", e);
                return;
            }
        };
        let ctx2 = get_shared_context().unwrap();
        assert_eq!(ctx1.adapter_info().name, ctx2.adapter_info().name);
        assert_eq!(ctx1.adapter_info().device, ctx2.adapter_info().device);
    }
}
