use ash::vk;

use crate::core::bridge::BridgeError;
use crate::core::VulkanContext;

/// Swapchain images and their views for the window surface
pub struct SwapchainManager {
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_loader: ash::khr::swapchain::Device,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl SwapchainManager {
    /// `window_size` is used only when the surface leaves the extent to us.
    /// Pass the swapchain being replaced as `old`, or a null handle.
    pub unsafe fn new(
        ctx: &VulkanContext,
        window_size: (u32, u32),
        old: vk::SwapchainKHR,
    ) -> Result<Self, BridgeError> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        let (swapchain, images, format, extent) =
            Self::create_swapchain(ctx, &swapchain_loader, window_size, old)?;
        let image_views = Self::create_image_views(&ctx.device, &images, format)?;

        log::debug!(
            "swapchain ready: {} images, {}x{}, {:?}",
            images.len(),
            extent.width,
            extent.height,
            format
        );

        Ok(Self {
            swapchain,
            swapchain_loader,
            images,
            image_views,
            format,
            extent,
        })
    }

    unsafe fn create_swapchain(
        ctx: &VulkanContext,
        swapchain_loader: &ash::khr::swapchain::Device,
        window_size: (u32, u32),
        old: vk::SwapchainKHR,
    ) -> Result<(vk::SwapchainKHR, Vec<vk::Image>, vk::Format, vk::Extent2D), BridgeError> {
        let loader = &ctx.surface_loader;
        let capabilities = loader.get_physical_device_surface_capabilities(ctx.physical_device, ctx.surface)?;
        let formats = loader.get_physical_device_surface_formats(ctx.physical_device, ctx.surface)?;
        let present_modes = loader.get_physical_device_surface_present_modes(ctx.physical_device, ctx.surface)?;

        let surface_format = formats
            .iter()
            .copied()
            .find(|f| {
                f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .or_else(|| formats.first().copied())
            .ok_or(BridgeError::NoSuitableGpu)?;

        // FIFO is always available and keeps the frame rate tied to the display
        let present_mode = if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
            vk::PresentModeKHR::MAILBOX
        } else {
            vk::PresentModeKHR::FIFO
        };

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: window_size.0.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: window_size.1.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };

        let mut image_count = capabilities.min_image_count + 1;
        if capabilities.max_image_count > 0 {
            image_count = image_count.min(capabilities.max_image_count);
        }

        let queue_family_indices = [ctx.graphics_queue_family, ctx.present_queue_family];
        let shared = ctx.graphics_queue_family != ctx.present_queue_family;

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(ctx.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old);

        create_info = if shared {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain = swapchain_loader.create_swapchain(&create_info, None)?;
        let images = swapchain_loader.get_swapchain_images(swapchain)?;

        Ok((swapchain, images, surface_format.format, extent))
    }

    unsafe fn create_image_views(
        device: &ash::Device,
        images: &[vk::Image],
        format: vk::Format,
    ) -> Result<Vec<vk::ImageView>, BridgeError> {
        images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                device.create_image_view(&create_info, None).map_err(BridgeError::from)
            })
            .collect()
    }

    /// Views must go before the swapchain itself is dropped
    pub unsafe fn cleanup_image_views(&mut self, device: &ash::Device) {
        for &image_view in &self.image_views {
            device.destroy_image_view(image_view, None);
        }
        self.image_views.clear();
    }
}

impl Drop for SwapchainManager {
    fn drop(&mut self) {
        unsafe {
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
