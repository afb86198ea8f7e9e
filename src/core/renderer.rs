use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use std::collections::HashMap;
use winit::window::Window;

use crate::core::bridge::{BridgeError, DrawUniforms, MeshHandle, Primitive, RenderBridge};
use crate::core::shader::{self, FRAGMENT_ENTRY, VERTEX_ENTRY};
use crate::core::{ResourceManager, SwapchainManager, VulkanContext};

const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Smallest vertex buffer ever allocated
const MIN_BUFFER_BYTES: vk::DeviceSize = 256;

const FLOATS_PER_VERTEX: usize = 3;

/// View and projection, shared by every draw of a frame
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Pod, Zeroable)]
struct CameraUniforms {
    view: Mat4,       // 64 bytes
    projection: Mat4, // 64 bytes
}

/// Per-draw push constants: model matrix, color and the grid/glow flags
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DrawPushConstants {
    model: Mat4,     // 64 bytes
    color: Vec4,     // 16 bytes
    flags: [u32; 4], // 16 bytes
}

impl From<&DrawUniforms> for DrawPushConstants {
    fn from(u: &DrawUniforms) -> Self {
        Self {
            model: u.model,
            color: u.color,
            flags: [u.is_grid as u32, u.glow as u32, 0, 0],
        }
    }
}

struct GpuMesh {
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    capacity: vk::DeviceSize,
    vertex_count: u32,
}

/// [`RenderBridge`] on top of Vulkan with a single frame in flight.
///
/// Vertex buffers live in host-coherent memory and are written directly.
/// `begin_frame` waits on the previous frame's fence, so writes made after it
/// never race the GPU. Buffers replaced or destroyed mid-frame are parked in
/// `retired` until that fence signals again.
pub struct VulkanRenderer {
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    depth_image: vk::Image,
    depth_image_memory: vk::DeviceMemory,
    depth_image_view: vk::ImageView,
    descriptor_set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    camera_buffer: vk::Buffer,
    camera_buffer_memory: vk::DeviceMemory,
    camera: Option<CameraUniforms>,
    pipeline_layout: vk::PipelineLayout,
    triangle_pipeline: vk::Pipeline,
    line_pipeline: vk::Pipeline,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
    meshes: HashMap<MeshHandle, GpuMesh>,
    retired: Vec<(vk::Buffer, vk::DeviceMemory)>,
    next_handle: u32,
    push: DrawPushConstants,
    /// Swapchain image being recorded, if any
    image_index: Option<u32>,
    resized: bool,
    // Dropped in this order after `Drop::drop` has run
    swapchain: SwapchainManager,
    ctx: VulkanContext,
    window: Window,
}

impl VulkanRenderer {
    pub fn new(window: Window) -> Result<Self, BridgeError> {
        let spirv = shader::compile_scene()?;
        let ctx = VulkanContext::new(&window)?;

        unsafe {
            let size = window.inner_size();
            let swapchain = SwapchainManager::new(&ctx, (size.width, size.height), vk::SwapchainKHR::null())?;

            let device = &ctx.device;
            let render_pass = Self::create_render_pass(device, swapchain.format)?;
            let (depth_image, depth_image_memory, depth_image_view) = ResourceManager::create_depth_resources(
                &ctx.instance,
                ctx.physical_device,
                device,
                swapchain.extent,
                DEPTH_FORMAT,
            )?;
            let framebuffers = Self::create_framebuffers(device, render_pass, &swapchain, depth_image_view)?;

            let descriptor_set_layout = Self::create_descriptor_set_layout(device)?;
            let (camera_buffer, camera_buffer_memory) = ResourceManager::create_host_buffer(
                &ctx.instance,
                ctx.physical_device,
                device,
                std::mem::size_of::<CameraUniforms>() as vk::DeviceSize,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
            )?;
            let (descriptor_pool, descriptor_set) =
                Self::create_descriptor_set(device, descriptor_set_layout, camera_buffer)?;

            let pipeline_layout = Self::create_pipeline_layout(device, descriptor_set_layout)?;
            let module = ResourceManager::create_shader_module(device, &spirv)?;
            let pipelines = Self::create_pipelines(device, render_pass, pipeline_layout, module);
            device.destroy_shader_module(module, None);
            let (triangle_pipeline, line_pipeline) = pipelines?;

            let command_pool = ResourceManager::create_command_pool(device, ctx.graphics_queue_family)?;
            let command_buffer = ResourceManager::create_command_buffer(device, command_pool)?;
            let (image_available, render_finished, in_flight) = ResourceManager::create_sync_objects(device)?;

            log::info!(
                "renderer ready at {}x{}",
                swapchain.extent.width,
                swapchain.extent.height
            );

            Ok(Self {
                render_pass,
                framebuffers,
                depth_image,
                depth_image_memory,
                depth_image_view,
                descriptor_set_layout,
                descriptor_pool,
                descriptor_set,
                camera_buffer,
                camera_buffer_memory,
                camera: None,
                pipeline_layout,
                triangle_pipeline,
                line_pipeline,
                command_pool,
                command_buffer,
                image_available,
                render_finished,
                in_flight,
                meshes: HashMap::new(),
                retired: Vec::new(),
                next_handle: 0,
                push: DrawPushConstants::zeroed(),
                image_index: None,
                resized: false,
                swapchain,
                ctx,
                window,
            })
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Rebuild the swapchain before the next frame
    pub fn handle_resize(&mut self) {
        self.resized = true;
    }

    unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass, BridgeError> {
        let attachments = [
            vk::AttachmentDescription::default()
                .format(format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription::default()
                .format(DEPTH_FORMAT)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];

        let color_ref = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let depth_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_ref)
            .depth_stencil_attachment(&depth_ref);

        let stages =
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .dst_stage_mask(stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            );

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        Ok(device.create_render_pass(&render_pass_info, None)?)
    }

    unsafe fn create_framebuffers(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        swapchain: &SwapchainManager,
        depth_view: vk::ImageView,
    ) -> Result<Vec<vk::Framebuffer>, BridgeError> {
        swapchain
            .image_views
            .iter()
            .map(|&view| {
                let attachments = [view, depth_view];
                let info = vk::FramebufferCreateInfo::default()
                    .render_pass(render_pass)
                    .attachments(&attachments)
                    .width(swapchain.extent.width)
                    .height(swapchain.extent.height)
                    .layers(1);
                device.create_framebuffer(&info, None).map_err(BridgeError::from)
            })
            .collect()
    }

    unsafe fn create_descriptor_set_layout(device: &ash::Device) -> Result<vk::DescriptorSetLayout, BridgeError> {
        let binding = vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX);

        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(std::slice::from_ref(&binding));
        Ok(device.create_descriptor_set_layout(&info, None)?)
    }

    unsafe fn create_descriptor_set(
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
        camera_buffer: vk::Buffer,
    ) -> Result<(vk::DescriptorPool, vk::DescriptorSet), BridgeError> {
        let pool_size = vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1);
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(std::slice::from_ref(&pool_size))
            .max_sets(1);
        let pool = device.create_descriptor_pool(&pool_info, None)?;

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let set = device
            .allocate_descriptor_sets(&alloc_info)?
            .into_iter()
            .next()
            .ok_or(BridgeError::Vulkan(vk::Result::ERROR_OUT_OF_POOL_MEMORY))?;

        let buffer_info = vk::DescriptorBufferInfo::default()
            .buffer(camera_buffer)
            .offset(0)
            .range(std::mem::size_of::<CameraUniforms>() as vk::DeviceSize);
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(std::slice::from_ref(&buffer_info));
        device.update_descriptor_sets(std::slice::from_ref(&write), &[]);

        Ok((pool, set))
    }

    unsafe fn create_pipeline_layout(
        device: &ash::Device,
        descriptor_set_layout: vk::DescriptorSetLayout,
    ) -> Result<vk::PipelineLayout, BridgeError> {
        let set_layouts = [descriptor_set_layout];
        let push_constant_range = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(std::mem::size_of::<DrawPushConstants>() as u32);

        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(std::slice::from_ref(&push_constant_range));

        Ok(device.create_pipeline_layout(&info, None)?)
    }

    /// Triangle and line pipelines over the same layout and program.
    /// Lines test depth but do not write it, so the translucent grid never
    /// hides a body behind it.
    unsafe fn create_pipelines(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        layout: vk::PipelineLayout,
        module: vk::ShaderModule,
    ) -> Result<(vk::Pipeline, vk::Pipeline), BridgeError> {
        let vs_name = std::ffi::CString::new(VERTEX_ENTRY).map_err(|e| BridgeError::ShaderCodegen(e.to_string()))?;
        let fs_name = std::ffi::CString::new(FRAGMENT_ENTRY).map_err(|e| BridgeError::ShaderCodegen(e.to_string()))?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(module)
                .name(&vs_name),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(module)
                .name(&fs_name),
        ];

        let binding = vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride((FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u32)
            .input_rate(vk::VertexInputRate::VERTEX);
        let attribute = vk::VertexInputAttributeDescription::default()
            .location(0)
            .binding(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(0);
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(std::slice::from_ref(&binding))
            .vertex_attribute_descriptions(std::slice::from_ref(&attribute));

        let triangle_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let line_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::default().topology(vk::PrimitiveTopology::LINE_LIST);

        // Viewport and scissor are set per frame so resizes keep the pipelines
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE);

        let multisampling =
            vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let solid_depth = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS);
        let line_depth = solid_depth.depth_write_enable(false);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD);
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let base = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let infos = [
            base.input_assembly_state(&triangle_assembly)
                .depth_stencil_state(&solid_depth),
            base.input_assembly_state(&line_assembly)
                .depth_stencil_state(&line_depth),
        ];

        let pipelines = device
            .create_graphics_pipelines(vk::PipelineCache::null(), &infos, None)
            .map_err(|(_, e)| BridgeError::Vulkan(e))?;

        match pipelines.as_slice() {
            &[triangles, lines] => Ok((triangles, lines)),
            _ => Err(BridgeError::Vulkan(vk::Result::ERROR_UNKNOWN)),
        }
    }

    unsafe fn recreate_swapchain(&mut self) -> Result<(), BridgeError> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            // Minimized; try again once the window has an area
            self.resized = true;
            return Ok(());
        }

        self.ctx.device.device_wait_idle()?;
        self.cleanup_swapchain();

        let replacement = SwapchainManager::new(&self.ctx, (size.width, size.height), self.swapchain.swapchain)?;
        let mut old = std::mem::replace(&mut self.swapchain, replacement);
        old.cleanup_image_views(&self.ctx.device);
        drop(old);

        let (image, memory, view) = ResourceManager::create_depth_resources(
            &self.ctx.instance,
            self.ctx.physical_device,
            &self.ctx.device,
            self.swapchain.extent,
            DEPTH_FORMAT,
        )?;
        self.depth_image = image;
        self.depth_image_memory = memory;
        self.depth_image_view = view;
        self.framebuffers =
            Self::create_framebuffers(&self.ctx.device, self.render_pass, &self.swapchain, self.depth_image_view)?;

        log::debug!(
            "swapchain recreated at {}x{}",
            self.swapchain.extent.width,
            self.swapchain.extent.height
        );
        Ok(())
    }

    /// Framebuffers and depth target; the image views go with their swapchain
    unsafe fn cleanup_swapchain(&mut self) {
        let device = &self.ctx.device;
        for framebuffer in self.framebuffers.drain(..) {
            device.destroy_framebuffer(framebuffer, None);
        }
        device.destroy_image_view(self.depth_image_view, None);
        device.destroy_image(self.depth_image, None);
        device.free_memory(self.depth_image_memory, None);
        self.depth_image_view = vk::ImageView::null();
        self.depth_image = vk::Image::null();
        self.depth_image_memory = vk::DeviceMemory::null();
    }

    unsafe fn free_retired(&mut self) {
        for (buffer, memory) in self.retired.drain(..) {
            self.ctx.device.destroy_buffer(buffer, None);
            self.ctx.device.free_memory(memory, None);
        }
    }

    fn create_mesh(&mut self, vertices: &[f32]) -> Result<MeshHandle, BridgeError> {
        let handle = MeshHandle(self.next_handle);
        let mesh = unsafe { self.allocate_mesh(vertices)? };
        self.next_handle += 1;
        self.meshes.insert(handle, mesh);
        Ok(handle)
    }

    unsafe fn allocate_mesh(&self, vertices: &[f32]) -> Result<GpuMesh, BridgeError> {
        let bytes = std::mem::size_of_val(vertices) as vk::DeviceSize;
        let capacity = bytes.max(MIN_BUFFER_BYTES);
        let (buffer, memory) = ResourceManager::create_host_buffer(
            &self.ctx.instance,
            self.ctx.physical_device,
            &self.ctx.device,
            capacity,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        ResourceManager::write(&self.ctx.device, memory, vertices)?;

        Ok(GpuMesh {
            buffer,
            memory,
            capacity,
            vertex_count: (vertices.len() / FLOATS_PER_VERTEX) as u32,
        })
    }

    fn write_mesh(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError> {
        let bytes = std::mem::size_of_val(vertices) as vk::DeviceSize;
        let fits = self
            .meshes
            .get(&handle)
            .map(|mesh| bytes <= mesh.capacity)
            .ok_or(BridgeError::UnknownMesh(handle))?;

        unsafe {
            if fits {
                if let Some(mesh) = self.meshes.get_mut(&handle) {
                    ResourceManager::write(&self.ctx.device, mesh.memory, vertices)?;
                    mesh.vertex_count = (vertices.len() / FLOATS_PER_VERTEX) as u32;
                }
            } else {
                let grown = self.allocate_mesh(vertices)?;
                if let Some(old) = self.meshes.insert(handle, grown) {
                    self.retired.push((old.buffer, old.memory));
                }
            }
        }
        Ok(())
    }

    fn command_buffer_for_draw(&self) -> Option<vk::CommandBuffer> {
        self.image_index.map(|_| self.command_buffer)
    }
}

impl RenderBridge for VulkanRenderer {
    fn frame_size(&self) -> (u32, u32) {
        (self.swapchain.extent.width, self.swapchain.extent.height)
    }

    fn begin_frame(&mut self) -> Result<bool, BridgeError> {
        unsafe {
            self.ctx
                .device
                .wait_for_fences(std::slice::from_ref(&self.in_flight), true, u64::MAX)?;
            self.free_retired();

            if self.resized {
                self.resized = false;
                self.recreate_swapchain()?;
                return Ok(false);
            }

            let acquired = self.swapchain.swapchain_loader.acquire_next_image(
                self.swapchain.swapchain,
                u64::MAX,
                self.image_available,
                vk::Fence::null(),
            );
            let image_index = match acquired {
                Ok((index, _suboptimal)) => index,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    self.recreate_swapchain()?;
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            };

            let device = &self.ctx.device;
            device.reset_fences(std::slice::from_ref(&self.in_flight))?;
            device.reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())?;
            device.begin_command_buffer(self.command_buffer, &vk::CommandBufferBeginInfo::default())?;

            let extent = self.swapchain.extent;
            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: [0.0, 0.0, 0.0, 1.0],
                    },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                },
            ];
            let render_area = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            let render_pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.framebuffers[image_index as usize])
                .render_area(render_area)
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(self.command_buffer, &render_pass_info, vk::SubpassContents::INLINE);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(self.command_buffer, 0, std::slice::from_ref(&viewport));
            device.cmd_set_scissor(self.command_buffer, 0, std::slice::from_ref(&render_area));
            device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                std::slice::from_ref(&self.descriptor_set),
                &[],
            );

            self.image_index = Some(image_index);
            Ok(true)
        }
    }

    fn create_triangle_mesh(&mut self, vertices: &[f32]) -> Result<MeshHandle, BridgeError> {
        self.create_mesh(vertices)
    }

    fn update_mesh(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError> {
        self.write_mesh(handle, vertices)
    }

    fn create_line_mesh(&mut self, vertices: &[f32]) -> Result<MeshHandle, BridgeError> {
        self.create_mesh(vertices)
    }

    fn update_line_mesh(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError> {
        self.write_mesh(handle, vertices)
    }

    fn set_uniforms(&mut self, uniforms: &DrawUniforms) {
        self.push = DrawPushConstants::from(uniforms);

        let camera = CameraUniforms {
            view: uniforms.view,
            projection: uniforms.projection,
        };
        if self.camera != Some(camera) {
            // Identical for every draw of a frame; the last write wins
            match unsafe { ResourceManager::write(&self.ctx.device, self.camera_buffer_memory, &[camera]) } {
                Ok(()) => self.camera = Some(camera),
                Err(e) => log::warn!("failed to write camera uniforms: {e}"),
            }
        }
    }

    fn draw(&mut self, handle: MeshHandle, primitive: Primitive) -> Result<(), BridgeError> {
        let mesh = self.meshes.get(&handle).ok_or(BridgeError::UnknownMesh(handle))?;
        let Some(command_buffer) = self.command_buffer_for_draw() else {
            return Ok(());
        };
        if mesh.vertex_count == 0 {
            return Ok(());
        }

        let pipeline = match primitive {
            Primitive::Triangles => self.triangle_pipeline,
            Primitive::Lines => self.line_pipeline,
        };

        unsafe {
            let device = &self.ctx.device;
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
            device.cmd_push_constants(
                command_buffer,
                self.pipeline_layout,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&self.push),
            );
            device.cmd_bind_vertex_buffers(command_buffer, 0, std::slice::from_ref(&mesh.buffer), &[0]);
            device.cmd_draw(command_buffer, mesh.vertex_count, 1, 0, 0);
        }
        Ok(())
    }

    fn destroy(&mut self, handle: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&handle) {
            self.retired.push((mesh.buffer, mesh.memory));
        }
    }

    fn end_frame(&mut self) -> Result<(), BridgeError> {
        let Some(image_index) = self.image_index.take() else {
            return Ok(());
        };

        unsafe {
            let device = &self.ctx.device;
            device.cmd_end_render_pass(self.command_buffer);
            device.end_command_buffer(self.command_buffer)?;

            let wait_semaphores = [self.image_available];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [self.render_finished];
            let command_buffers = [self.command_buffer];
            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);
            device.queue_submit(
                self.ctx.graphics_queue,
                std::slice::from_ref(&submit_info),
                self.in_flight,
            )?;

            let swapchains = [self.swapchain.swapchain];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match self
                .swapchain
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present_info)
            {
                Ok(false) => {}
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => self.resized = true,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.ctx.device.device_wait_idle() {
                log::warn!("device_wait_idle failed during shutdown: {e}");
            }

            let handles: Vec<MeshHandle> = self.meshes.keys().copied().collect();
            if !handles.is_empty() {
                log::debug!("releasing {} meshes still alive at shutdown", handles.len());
            }
            for handle in handles {
                self.destroy(handle);
            }
            self.free_retired();

            let device = &self.ctx.device;
            device.destroy_pipeline(self.triangle_pipeline, None);
            device.destroy_pipeline(self.line_pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_pool(self.descriptor_pool, None);
            device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
            device.destroy_buffer(self.camera_buffer, None);
            device.free_memory(self.camera_buffer_memory, None);

            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight, None);
            device.destroy_command_pool(self.command_pool, None);

            self.cleanup_swapchain();
            self.swapchain.cleanup_image_views(&self.ctx.device);
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
        // swapchain, then context (device, surface, instance), then window
    }
}
