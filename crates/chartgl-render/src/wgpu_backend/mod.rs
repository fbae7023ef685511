//! Headless [`RenderBackend`] on top of wgpu.
//!
//! Calls made between `begin_frame` and `end_frame` are recorded, and the
//! whole frame is replayed into one render pass at `end_frame`. Immediate
//! geometry gets its buffers when it is recorded; cached geometry lives in
//! a handle table until released. The frame is drawn into an offscreen
//! texture (resolved from a multisampled one when MSAA is on) that
//! [`RenderBackend::capture`] reads back.

mod pipelines;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytemuck::Zeroable;
use chartgl_core::{ClipPlane, ClipPlaneUniforms, LightingUniforms, Mat4, ShapeKind};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::backend::{
    Batch, FrameSetup, Geometry, GeometryHandle, OverlayBatch, RenderBackend, TexturedQuad,
    Topology, ViewUniforms,
};
use crate::buffer::{
    aligned_bytes_per_row, create_index_buffer, create_uniform_buffer, create_vertex_buffer,
    update_uniform_buffer,
};
use crate::error::{RenderError, RenderResult};
use crate::screenshot::{image_from_rgba, ScreenshotError};
use pipelines::{Pipelines, COLOR_FORMAT, DEPTH_FORMAT};

/// Per-frame uniform block shared by every pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    /// Width, height, dpi scale and the blend flag.
    viewport: [f32; 4],
    lighting: LightingUniforms,
    clip: ClipPlaneUniforms,
}

/// Per-batch uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    model: [[f32; 4]; 4],
    /// Inverse of the model scale, applied to normals.
    normal_scale: [f32; 4],
    /// x: lit, y: clipped.
    flags: [f32; 4],
}

impl DrawUniforms {
    fn new(model: Mat4, lit: bool, clip: bool) -> Self {
        let diag = glam::Vec3::new(model.x_axis.x, model.y_axis.y, model.z_axis.z);
        let inv = |s: f32| if s.abs() > f32::EPSILON { 1.0 / s } else { 0.0 };
        Self {
            model: model.to_cols_array_2d(),
            normal_scale: [inv(diag.x), inv(diag.y), inv(diag.z), 0.0],
            flags: [
                if lit { 1.0 } else { 0.0 },
                if clip { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

struct GpuBatch {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    topology: Topology,
    lit: bool,
}

struct GpuQuad {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
}

/// Geometry resident on the device.
struct GpuGeometry {
    batches: Vec<GpuBatch>,
    quads: Vec<GpuQuad>,
}

enum DrawOp {
    Immediate { geometry: GpuGeometry, clip: bool },
    Cached {
        handle: GeometryHandle,
        model: Mat4,
        clip: bool,
    },
    Overlay(GpuBatch),
}

struct FrameRecording {
    setup: FrameSetup,
    uniforms: FrameUniforms,
    clip: bool,
    ops: Vec<DrawOp>,
}

struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipelines: Pipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
}

/// Size-dependent render targets.
struct Targets {
    width: u32,
    height: u32,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    readback: wgpu::Buffer,
}

/// Offscreen renderer with readback.
pub struct WgpuBackend {
    instance: wgpu::Instance,
    sample_count: u32,
    gpu: Option<Gpu>,
    targets: Option<Targets>,
    frame: Option<FrameRecording>,
    cache: HashMap<GeometryHandle, GpuGeometry>,
    next_handle: u64,
    device_lost: Arc<AtomicBool>,
}

impl WgpuBackend {
    /// Creates the device without a window surface.
    ///
    /// `sample_count` is fixed for the backend's lifetime; pass 1 to turn
    /// multisampling off. Frames that ask for no antialiasing still use it.
    pub async fn new_headless(sample_count: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });
        let device_lost = Arc::new(AtomicBool::new(false));
        let gpu = Self::create_gpu(&instance, sample_count, &device_lost).await?;
        Ok(Self {
            instance,
            sample_count: sample_count.max(1),
            gpu: Some(gpu),
            targets: None,
            frame: None,
            cache: HashMap::new(),
            next_handle: 0,
            device_lost,
        })
    }

    async fn create_gpu(
        instance: &wgpu::Instance,
        sample_count: u32,
        device_lost: &Arc<AtomicBool>,
    ) -> RenderResult<Gpu> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        log::info!("chartgl using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("chartgl device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        device_lost.store(false, Ordering::SeqCst);
        let flag = Arc::clone(device_lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("wgpu device lost: reason={reason:?}, message={message}");
            flag.store(true, Ordering::SeqCst);
        });

        let pipelines = Pipelines::new(&device, sample_count.max(1));
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame uniforms"),
            contents: bytemuck::bytes_of(&FrameUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame bind group"),
            layout: &pipelines.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        Ok(Gpu {
            device,
            queue,
            pipelines,
            frame_buffer,
            frame_bind_group,
        })
    }

    /// Multisample count every pipeline was built with.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Number of uploads not yet released.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn check(&self) -> RenderResult<&Gpu> {
        if self.device_lost.load(Ordering::SeqCst) {
            return Err(RenderError::ContextLost("wgpu device lost".into()));
        }
        self.gpu
            .as_ref()
            .ok_or_else(|| RenderError::ContextLost("no wgpu device".into()))
    }

    fn recording(&mut self) -> RenderResult<&mut FrameRecording> {
        self.frame
            .as_mut()
            .ok_or_else(|| RenderError::InvalidState {
                expected: crate::engine::EngineState::Rendering,
                actual: crate::engine::EngineState::Ready,
            })
    }

    fn create_targets(&self, gpu: &Gpu, width: u32, height: u32) -> Targets {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("chartgl color target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa_view = (self.sample_count > 1).then(|| {
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("chartgl msaa target"),
                    size,
                    mip_level_count: 1,
                    sample_count: self.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: COLOR_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth_view = gpu
            .device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("chartgl depth target"),
                size,
                mip_level_count: 1,
                sample_count: self.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let readback = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("chartgl readback"),
            size: u64::from(aligned_bytes_per_row(width)) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Targets {
            width,
            height,
            color,
            color_view,
            msaa_view,
            depth_view,
            readback,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn upload_batch(device: &wgpu::Device, batch: &Batch) -> GpuBatch {
        GpuBatch {
            vertex_buffer: create_vertex_buffer(device, &batch.vertices, Some("chartgl vertices")),
            index_buffer: create_index_buffer(device, &batch.indices, Some("chartgl indices")),
            index_count: batch.indices.len() as u32,
            topology: batch.topology,
            lit: batch.lit,
        }
    }

    fn upload_quad(gpu: &Gpu, quad: &TexturedQuad) -> RenderResult<GpuQuad> {
        let image = &quad.image;
        let expected = u64::from(image.width) * u64::from(image.height) * 4;
        if image.width == 0 || image.height == 0 || image.pixels.len() as u64 != expected {
            return Err(RenderError::TextureCreationFailed(format!(
                "{}x{} image with {} bytes",
                image.width,
                image.height,
                image.pixels.len()
            )));
        }
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("chartgl image"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("chartgl image bind group"),
            layout: &gpu.pipelines.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&gpu.pipelines.sampler),
                },
            ],
        });
        Ok(GpuQuad {
            vertex_buffer: create_vertex_buffer(&gpu.device, &quad.vertices, Some("chartgl quad")),
            index_buffer: create_index_buffer(&gpu.device, &[0, 1, 2, 0, 2, 3], Some("chartgl quad")),
            bind_group,
            _texture: texture,
        })
    }

    fn upload_geometry(gpu: &Gpu, geometry: &Geometry) -> RenderResult<GpuGeometry> {
        let batches = geometry
            .batches
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| Self::upload_batch(&gpu.device, b))
            .collect();
        let quads = geometry
            .textures
            .iter()
            .map(|q| Self::upload_quad(gpu, q))
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(GpuGeometry { batches, quads })
    }

    fn draw_bind_group(gpu: &Gpu, uniforms: &DrawUniforms) -> wgpu::BindGroup {
        let buffer = create_uniform_buffer(&gpu.device, uniforms, Some("draw uniforms"));
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw bind group"),
            layout: &gpu.pipelines.draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    /// Drops everything tied to the current device.
    fn drop_device_state(&mut self) {
        self.frame = None;
        self.cache.clear();
        self.targets = None;
        self.gpu = None;
    }
}

/// Draw bind groups for every batch and quad in the frame, in replay order.
fn build_draw_bind_groups(
    gpu: &Gpu,
    cache: &HashMap<GeometryHandle, GpuGeometry>,
    ops: &[DrawOp],
) -> RenderResult<Vec<wgpu::BindGroup>> {
    let mut groups = Vec::new();
    for op in ops {
        let (geometry, model, clip) = match op {
            DrawOp::Immediate { geometry, clip } => (geometry, Mat4::IDENTITY, *clip),
            DrawOp::Cached {
                handle,
                model,
                clip,
            } => (
                cache
                    .get(handle)
                    .ok_or(RenderError::UnknownHandle(handle.0))?,
                *model,
                *clip,
            ),
            DrawOp::Overlay(_) => continue,
        };
        for batch in &geometry.batches {
            let u = DrawUniforms::new(model, batch.lit, clip);
            groups.push(WgpuBackend::draw_bind_group(gpu, &u));
        }
        for _ in &geometry.quads {
            let u = DrawUniforms::new(model, false, clip);
            groups.push(WgpuBackend::draw_bind_group(gpu, &u));
        }
    }
    Ok(groups)
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn init(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if self.gpu.is_none() || self.device_lost.load(Ordering::SeqCst) {
            log::warn!("recreating wgpu device");
            self.drop_device_state();
            let gpu = pollster::block_on(Self::create_gpu(
                &self.instance,
                self.sample_count,
                &self.device_lost,
            ))?;
            self.gpu = Some(gpu);
        }
        self.resize(width, height)
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        let gpu = self.check()?;
        let targets = self.create_targets(gpu, width, height);
        self.targets = Some(targets);
        Ok(())
    }

    fn dispose(&mut self) {
        self.frame = None;
        self.cache.clear();
        self.targets = None;
    }

    fn supports(&self, _kind: ShapeKind) -> bool {
        true
    }

    fn begin_frame(&mut self, setup: &FrameSetup) -> RenderResult<()> {
        self.check()?;
        if self.targets.is_none() {
            return Err(RenderError::InvalidState {
                expected: crate::engine::EngineState::Ready,
                actual: crate::engine::EngineState::Uninitialized,
            });
        }
        let mut uniforms = FrameUniforms::zeroed();
        uniforms.viewport = [
            setup.viewport.x,
            setup.viewport.y,
            setup.dpi_scale,
            if setup.blend { 1.0 } else { 0.0 },
        ];
        uniforms.view_proj = Mat4::IDENTITY.to_cols_array_2d();
        self.frame = Some(FrameRecording {
            setup: *setup,
            uniforms,
            clip: false,
            ops: Vec::new(),
        });
        Ok(())
    }

    fn set_view(&mut self, view: &ViewUniforms) -> RenderResult<()> {
        self.check()?;
        let frame = self.recording()?;
        frame.uniforms.view_proj = (view.projection * view.view).to_cols_array_2d();
        frame.uniforms.eye = view.eye.extend(1.0).to_array();
        frame.uniforms.lighting = view.lighting;
        Ok(())
    }

    // The planes are per frame; only the enable flag is recorded per draw.
    fn set_clip_planes(&mut self, planes: &[ClipPlane]) -> RenderResult<()> {
        self.check()?;
        let frame = self.recording()?;
        frame.clip = !planes.is_empty();
        if !planes.is_empty() {
            frame.uniforms.clip = ClipPlaneUniforms::from(planes);
        }
        Ok(())
    }

    fn upload(&mut self, geometry: &Geometry) -> RenderResult<GeometryHandle> {
        let gpu = self.check()?;
        let uploaded = Self::upload_geometry(gpu, geometry)?;
        self.next_handle += 1;
        let handle = GeometryHandle(self.next_handle);
        self.cache.insert(handle, uploaded);
        log::trace!("uploaded {} vertices as {handle:?}", geometry.vertex_count());
        Ok(handle)
    }

    fn release(&mut self, handle: GeometryHandle) {
        self.cache.remove(&handle);
    }

    fn draw_cached(&mut self, handle: GeometryHandle, model: Mat4) -> RenderResult<()> {
        self.check()?;
        if !self.cache.contains_key(&handle) {
            return Err(RenderError::UnknownHandle(handle.0));
        }
        let frame = self.recording()?;
        let clip = frame.clip;
        frame.ops.push(DrawOp::Cached {
            handle,
            model,
            clip,
        });
        Ok(())
    }

    fn draw(&mut self, geometry: &Geometry) -> RenderResult<()> {
        let gpu = self.check()?;
        let uploaded = Self::upload_geometry(gpu, geometry)?;
        let frame = self.recording()?;
        let clip = frame.clip;
        frame.ops.push(DrawOp::Immediate {
            geometry: uploaded,
            clip,
        });
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw_overlay(&mut self, batch: &OverlayBatch) -> RenderResult<()> {
        let gpu = self.check()?;
        if batch.is_empty() {
            return Ok(());
        }
        let uploaded = GpuBatch {
            vertex_buffer: create_vertex_buffer(&gpu.device, &batch.vertices, Some("overlay vertices")),
            index_buffer: create_index_buffer(&gpu.device, &batch.indices, Some("overlay indices")),
            index_count: batch.indices.len() as u32,
            topology: batch.topology,
            lit: false,
        };
        self.recording()?.ops.push(DrawOp::Overlay(uploaded));
        Ok(())
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        let Some(frame) = self.frame.take() else {
            return Err(RenderError::InvalidState {
                expected: crate::engine::EngineState::Rendering,
                actual: crate::engine::EngineState::Ready,
            });
        };
        let gpu = self.check()?;
        let targets = self.targets.as_ref().ok_or(RenderError::InvalidViewport {
            width: 0,
            height: 0,
        })?;

        update_uniform_buffer(&gpu.queue, &gpu.frame_buffer, &frame.uniforms);
        let draw_groups = build_draw_bind_groups(gpu, &self.cache, &frame.ops)?;

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("chartgl frame encoder"),
            });
        {
            let c = frame.setup.clear_color;
            let (view, resolve_target) = match &targets.msaa_view {
                Some(msaa) => (msaa, Some(&targets.color_view)),
                None => (&targets.color_view, None),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("chartgl frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(c.x),
                            g: f64::from(c.y),
                            b: f64::from(c.z),
                            a: f64::from(c.w),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_bind_group(0, &gpu.frame_bind_group, &[]);

            let mut groups = draw_groups.iter();
            for op in &frame.ops {
                let geometry = match op {
                    DrawOp::Immediate { geometry, .. } => geometry,
                    DrawOp::Cached { handle, .. } => match self.cache.get(handle) {
                        Some(g) => g,
                        None => continue,
                    },
                    DrawOp::Overlay(batch) => {
                        pass.set_pipeline(match batch.topology {
                            Topology::Triangles => &gpu.pipelines.overlay_triangles,
                            Topology::Lines => &gpu.pipelines.overlay_lines,
                        });
                        pass.set_vertex_buffer(0, batch.vertex_buffer.slice(..));
                        pass.set_index_buffer(batch.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..batch.index_count, 0, 0..1);
                        continue;
                    }
                };
                for batch in &geometry.batches {
                    let Some(group) = groups.next() else { break };
                    pass.set_pipeline(match batch.topology {
                        Topology::Triangles => &gpu.pipelines.scene_triangles,
                        Topology::Lines => &gpu.pipelines.scene_lines,
                    });
                    pass.set_bind_group(1, group, &[]);
                    pass.set_vertex_buffer(0, batch.vertex_buffer.slice(..));
                    pass.set_index_buffer(batch.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..batch.index_count, 0, 0..1);
                }
                for quad in &geometry.quads {
                    let Some(group) = groups.next() else { break };
                    pass.set_pipeline(&gpu.pipelines.textured);
                    pass.set_bind_group(1, group, &[]);
                    pass.set_bind_group(2, &quad.bind_group, &[]);
                    pass.set_vertex_buffer(0, quad.vertex_buffer.slice(..));
                    pass.set_index_buffer(quad.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..6, 0, 0..1);
                }
            }
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));

        if self.device_lost.load(Ordering::SeqCst) {
            return Err(RenderError::ContextLost("wgpu device lost during frame".into()));
        }
        Ok(())
    }

    fn capture(&mut self) -> RenderResult<RgbaImage> {
        let gpu = self.check()?;
        if self.frame.is_some() {
            return Err(ScreenshotError::InvalidImageData.into());
        }
        let targets = self
            .targets
            .as_ref()
            .ok_or(ScreenshotError::InvalidImageData)?;
        let bytes_per_row = aligned_bytes_per_row(targets.width);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("screenshot copy encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &targets.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &targets.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(targets.height),
                },
            },
            wgpu::Extent3d {
                width: targets.width,
                height: targets.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = targets.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = gpu.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| ScreenshotError::BufferMapFailed)?
            .map_err(|_| ScreenshotError::BufferMapFailed)?;

        let row_bytes = targets.width as usize * 4;
        let mut pixels = Vec::with_capacity(row_bytes * targets.height as usize);
        {
            let data = slice.get_mapped_range();
            for row in 0..targets.height as usize {
                let start = row * bytes_per_row as usize;
                pixels.extend_from_slice(&data[start..start + row_bytes]);
            }
        }
        targets.readback.unmap();

        Ok(image_from_rgba(targets.width, targets.height, pixels)?)
    }
}
