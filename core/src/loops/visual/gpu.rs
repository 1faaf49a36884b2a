//! GPU 初始化与表面配置

use anyhow::{Result, anyhow};
use futures_lite::future;
use tracing::info;

/// GPU 初始化结果
pub struct GpuContext {
    /// wgpu 表面
    pub surface: wgpu::Surface<'static>,
    /// GPU 设备
    pub device: wgpu::Device,
    /// 命令队列
    pub queue: wgpu::Queue,
    /// 表面配置
    pub config: wgpu::SurfaceConfiguration,
}

/// 为窗口创建表面、设备与队列
///
/// 窗口必须比返回的表面活得更久。
///
/// # Errors
///
/// - 表面创建失败
/// - 没有可用的适配器
/// - 设备创建失败
pub fn init_gpu<W>(window: &W, size: (u32, u32)) -> Result<GpuContext>
where
    W: wgpu::WindowHandle,
{
    let instance = wgpu::Instance::default();
    // SAFETY: 调用方保证窗口在表面销毁前一直存活
    let surface = unsafe {
        let target =
            wgpu::SurfaceTargetUnsafe::from_window(window).map_err(|e| anyhow!("{e}"))?;
        instance.create_surface_unsafe(target)?
    };

    let adapter = future::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        force_fallback_adapter: false,
        compatible_surface: Some(&surface),
    }))
    .map_err(|e| anyhow!("request_adapter failed: {e:?}"))?;
    let adapter_info = adapter.get_info();
    info!(name = %adapter_info.name, backend = ?adapter_info.backend, "已选择图形适配器");

    let (device, queue) = future::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::downlevel_defaults(),
        experimental_features: wgpu::ExperimentalFeatures::disabled(),
        memory_hints: wgpu::MemoryHints::default(),
        trace: wgpu::Trace::Off,
        label: Some("beat-lanes-device"),
    }))?;

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .or_else(|| caps.formats.first().copied())
        .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
    let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::FifoRelaxed) {
        wgpu::PresentMode::FifoRelaxed
    } else {
        wgpu::PresentMode::Fifo
    };
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.0.max(1),
        height: size.1.max(1),
        present_mode,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };

    Ok(GpuContext {
        surface,
        device,
        queue,
        config,
    })
}
