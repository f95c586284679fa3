//! Batched GPU rollout dispatch.
//!
//! Each invocation of the compute shader owns one simulation lane: it seeds a
//! private xorshift32 generator, plays one full random game from the packed
//! start position and writes a single f32 evaluation to its output slot. The
//! host only averages. The lane program is the shader-side twin of
//! `packed::rollout`; parity between the two is covered by tests in
//! `engine::mod`.

use super::gpu_context::GpuContext;
use crate::board::Direction;
use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use wgpu::util::DeviceExt;

const WORKGROUP_SIZE: u32 = 64;
/// Upper bound on lanes per dispatch, keeps buffer sizes well under limits.
pub const MAX_LANES: usize = 65536;

/// Uniform parameter block. Layout must match `Params` in rollout.wgsl:
/// the board rides as four u32 rows because WGSL has no 64-bit integers.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
struct GpuRolloutParams {
    rows: [u32; 4],
    lane_count: u32,
    first_move: u32,
    max_steps: u32,
    base_score: u32,
    empty_weight: f32,
    max_tile_weight: f32,
    _padding: [u32; 2],
}

unsafe impl Pod for GpuRolloutParams {}
unsafe impl Zeroable for GpuRolloutParams {}

pub struct GpuRolloutEngine {
    gpu_context: GpuContext,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuRolloutEngine {
    pub async fn new() -> Result<Self, String> {
        let gpu_context = super::gpu_context::get_shared_context()?;

        let shader_source = include_str!("shaders/rollout.wgsl");
        let shader = gpu_context
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Rollout Shader"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader_source)),
            });

        let bind_group_layout =
            gpu_context
                .device()
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Rollout Bind Group Layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: true },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: false },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout =
            gpu_context
                .device()
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Rollout Pipeline Layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    push_constant_ranges: &[],
                });

        let pipeline =
            gpu_context
                .device()
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some("Rollout Pipeline"),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    cache: None,
                });

        Ok(Self {
            gpu_context,
            pipeline,
            bind_group_layout,
        })
    }

    pub fn new_sync() -> Result<Self, String> {
        pollster::block_on(Self::new())
    }

    /// Runs one rollout per seed from the packed board, all lanes opening
    /// with `first_move`, and returns the per-lane evaluations.
    #[allow(clippy::too_many_arguments)]
    pub fn run_batch(
        &self,
        board: u64,
        first_move: Direction,
        seeds: &[u32],
        base_score: u32,
        max_steps: u32,
        empty_weight: f32,
        max_tile_weight: f32,
    ) -> Result<Vec<f32>, String> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        if seeds.len() > MAX_LANES {
            return Err(format!(
                "Batch of {} lanes exceeds the {} lane dispatch limit",
                seeds.len(),
                MAX_LANES
            ));
        }

        let lane_count = seeds.len();
        let params = GpuRolloutParams {
            rows: [
                (board & 0xFFFF) as u32,
                ((board >> 16) & 0xFFFF) as u32,
                ((board >> 32) & 0xFFFF) as u32,
                ((board >> 48) & 0xFFFF) as u32,
            ],
            lane_count: lane_count as u32,
            first_move: first_move.to_u8() as u32,
            max_steps,
            base_score,
            empty_weight,
            max_tile_weight,
            _padding: [0; 2],
        };

        let device = self.gpu_context.device();

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Rollout Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let seed_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Rollout Seed Buffer"),
            contents: bytemuck::cast_slice(seeds),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let result_size = (std::mem::size_of::<f32>() * lane_count) as u64;
        let result_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rollout Result Buffer"),
            size: result_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rollout Staging Buffer"),
            size: result_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Rollout Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: seed_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: result_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Rollout Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Rollout Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            let workgroups = (lane_count as u32 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        }

        encoder.copy_buffer_to_buffer(&result_buffer, 0, &staging_buffer, 0, result_size);
        self.gpu_context.queue().submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.gpu_context.device().poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| format!("Failed to receive buffer mapping result: {}", e))?
            .map_err(|e| format!("Failed to map buffer: {:?}", e))?;

        let data = buffer_slice.get_mapped_range();
        let scores: Vec<f32> = bytemuck::cast_slice(&data).to_vec();

        drop(data);
        staging_buffer.unmap();

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::packed;

    #[test]
    fn rollout_engine_creation() {
        let engine = GpuRolloutEngine::new_sync();
        if let Err(e) = &engine {
            println!("Skipping test: GPU not available - {}", e);
        }
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let engine = match GpuRolloutEngine::new_sync() {
            Ok(engine) => engine,
            Err(e) => {
                println!("Skipping test: GPU not available - {}", e);
                return;
            }
        };
        let scores = engine
            .run_batch(0x11, Direction::Left, &[], 0, 10, 128.0, 32.0)
            .unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn gpu_lanes_match_the_scalar_twin() {
        let engine = match GpuRolloutEngine::new_sync() {
            Ok(engine) => engine,
            Err(e) => {
                println!("Skipping test: GPU not available - {}", e);
                return;
            }
        };

        // A few small tiles, plenty of room, fixed seeds.
        let board = 0x0000_0000_0000_2011u64;
        let seeds: Vec<u32> = (1..=64).collect();
        let scores = engine
            .run_batch(board, Direction::Left, &seeds, 16, 50, 128.0, 32.0)
            .unwrap();
        assert_eq!(scores.len(), seeds.len());

        for (&seed, &gpu_score) in seeds.iter().zip(&scores) {
            let cpu_score =
                packed::rollout(board, Direction::Left, seed, 16, 50, 128.0, 32.0);
            assert_eq!(
                gpu_score, cpu_score,
                "lane with seed {} diverged from the scalar rollout",
                seed
            );
        }

        // Two exponent-15 tiles: the merge saturates identically on both
        // sides instead of wrapping into the neighbouring nibble.
        let ceiling = 0x0000_0000_0000_00FFu64;
        let scores = engine
            .run_batch(ceiling, Direction::Left, &[3], 0, 0, 128.0, 32.0)
            .unwrap();
        let expected = packed::rollout(ceiling, Direction::Left, 3, 0, 0, 128.0, 32.0);
        assert_eq!(scores[0], expected);
    }
}
