//! 视觉循环：事件线程上的矩形渲染
//!
//! - 在 `Resumed` 创建窗口与渲染器，发送启动信号
//! - 在 `RedrawRequested` 非阻塞接收最新帧并渲染
//! - 在 `about_to_wait` 请求重绘以维持刷新
//!
//! 所有可见元素（轨道按键、慢动作进度条、连击点、暂停标记）都是同一个单位
//! 四边形的实例，一次 `draw_indexed` 画完。

mod gpu;
pub use gpu::{GpuContext, init_gpu};

use std::mem;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use tracing::warn;
use wgpu::util::DeviceExt;

use crate::Instance;

/// 实例缓冲容量
pub const MAX_INSTANCES: usize = 1024;

/// 窗口逻辑宽度（像素）
pub const WINDOW_WIDTH: f32 = 480.0;
/// 窗口逻辑高度（像素）
pub const WINDOW_HEIGHT: f32 = 320.0;

/// 背景色
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// 以原点为中心的单位四边形
const QUAD_VERTICES: [[f32; 2]; 4] = [[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const QUAD_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

/// 与 [`Instance`] 的字段顺序一致
const INSTANCE_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    1 => Float32x2, // pos
    2 => Float32x2, // size
    3 => Float32x4, // color
];

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
/// 屏幕统一参数
struct ScreenUniform {
    /// 屏幕尺寸（宽, 高）
    size: [f32; 2],
}

impl ScreenUniform {
    #[allow(clippy::cast_precision_loss)]
    fn from_surface(config: &wgpu::SurfaceConfiguration) -> Self {
        Self {
            size: [config.width as f32, config.height as f32],
        }
    }
}

/// 矩形实例渲染器
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    /// 屏幕尺寸绑定组
    screen_group: wgpu::BindGroup,
    /// 屏幕尺寸统一缓冲，仅在尺寸变化时写入
    screen_buffer: wgpu::Buffer,
    quad_vertices: wgpu::Buffer,
    quad_indices: wgpu::Buffer,
    /// 每帧覆盖写入的实例缓冲
    instances: wgpu::Buffer,
}

impl Renderer {
    /// 由 GPU 上下文创建渲染器
    ///
    /// # Errors
    ///
    /// 目前不会失败，保留 `Result` 以便后续加入资源加载
    pub fn new(ctx: GpuContext) -> Result<Self> {
        let GpuContext {
            surface,
            device,
            queue,
            config,
        } = ctx;
        surface.configure(&device, &config);

        let screen_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("screen-uniform"),
            contents: bytemuck::bytes_of(&ScreenUniform::from_surface(&config)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let (screen_layout, screen_group) = screen_binding(&device, &screen_buffer);
        let pipeline = build_pipeline(&device, &screen_layout, config.format);

        let quad_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad-vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad-indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lane-instances"),
            size: (mem::size_of::<Instance>() * MAX_INSTANCES) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            screen_group,
            screen_buffer,
            quad_vertices,
            quad_indices,
            instances,
        })
    }

    /// 绘制一帧，超出缓冲容量的实例被丢弃
    ///
    /// # Errors
    ///
    /// - 获取表面纹理失败
    pub fn draw(&self, instances: &[Instance]) -> Result<()> {
        let visible = if instances.len() > MAX_INSTANCES {
            warn!(count = instances.len(), "实例数超过缓冲容量，多余部分不绘制");
            instances.get(..MAX_INSTANCES).unwrap_or_default()
        } else {
            instances
        };
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.queue
            .write_buffer(&self.instances, 0, bytemuck::cast_slice(visible));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lane-frame"),
            });
        self.encode_pass(&mut encoder, &view, visible.len());
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        count: usize,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lane-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.screen_group, &[]);
        pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
        pass.set_vertex_buffer(1, self.instances.slice(..));
        pass.set_index_buffer(self.quad_indices.slice(..), wgpu::IndexFormat::Uint16);
        #[allow(clippy::cast_possible_truncation)]
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..count as u32);
    }

    /// 处理窗口尺寸变化；最小化（零尺寸）时保持原配置
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        let uniform = ScreenUniform::from_surface(&self.config);
        self.queue
            .write_buffer(&self.screen_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}

fn screen_binding(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> (wgpu::BindGroupLayout, wgpu::BindGroup) {
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("screen-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("screen-group"),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (layout, group)
}

fn build_pipeline(
    device: &wgpu::Device,
    screen_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("rect-shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../rect.wgsl").into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("lane-pipeline-layout"),
        bind_group_layouts: &[screen_layout],
        immediate_size: 0,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("lane-pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[quad_layout(), instance_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

const fn quad_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: mem::size_of::<[f32; 2]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &QUAD_ATTRS,
    }
}

const fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: mem::size_of::<Instance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout_covers_struct() {
        let layout = instance_layout();
        assert_eq!(layout.array_stride, 32);
        let last = layout.attributes.last().map(|a| a.offset + a.format.size());
        assert_eq!(last, Some(layout.array_stride));
    }

    #[test]
    fn test_quad_is_centered_unit_square() {
        let (min, max) = QUAD_VERTICES
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), [x, y]| {
                (lo.min(x.min(*y)), hi.max(x.max(*y)))
            });
        assert!((min + 0.5).abs() < f32::EPSILON);
        assert!((max - 0.5).abs() < f32::EPSILON);
        assert!(QUAD_INDICES.iter().all(|&i| usize::from(i) < QUAD_VERTICES.len()));
    }
}
