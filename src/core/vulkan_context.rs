use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{c_char, CStr};
use winit::window::Window;

use crate::core::bridge::BridgeError;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance, surface and logical device for a single window.
pub struct VulkanContext {
    pub entry: Entry,
    pub instance: ash::Instance,
    pub debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub graphics_queue_family: u32,
    pub present_queue_family: u32,
}

impl VulkanContext {
    pub fn new(window: &Window) -> Result<Self, BridgeError> {
        unsafe {
            let entry = Entry::load()?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(c"spacetime-grid")
                .application_version(vk::make_api_version(0, 0, 1, 0))
                .engine_name(c"spacetime-grid")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let display = window.display_handle()?.as_raw();
            let mut extensions: Vec<*const c_char> =
                ash_window::enumerate_required_extensions(display)?.to_vec();

            let validation = cfg!(debug_assertions) && Self::has_validation_layer(&entry);
            if validation {
                extensions.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layers: Vec<*const c_char> = if validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                Vec::new()
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_extension_names(&extensions)
                .enabled_layer_names(&layers);

            let instance = entry.create_instance(&create_info, None)?;
            log::debug!("Vulkan instance created (validation: {validation})");

            let debug_utils = if validation {
                Some(Self::setup_debug_messenger(&entry, &instance)?)
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display,
                window.window_handle()?.as_raw(),
                None,
            )?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, indices) = Self::pick_physical_device(&instance, &surface_loader, surface)?;
            let props = instance.get_physical_device_properties(physical_device);
            if let Ok(name) = props.device_name_as_c_str() {
                log::info!("using GPU {}", name.to_string_lossy());
            }

            let (device, graphics_queue, present_queue) =
                Self::create_logical_device(&instance, physical_device, &indices)?;

            Ok(Self {
                entry,
                instance,
                debug_utils,
                surface,
                surface_loader,
                physical_device,
                device,
                graphics_queue,
                present_queue,
                graphics_queue_family: indices.graphics_family,
                present_queue_family: indices.present_family,
            })
        }
    }

    unsafe fn has_validation_layer(entry: &Entry) -> bool {
        entry
            .enumerate_instance_layer_properties()
            .unwrap_or_default()
            .iter()
            .any(|layer| {
                layer
                    .layer_name_as_c_str()
                    .map(|name| name == VALIDATION_LAYER)
                    .unwrap_or(false)
            })
    }

    unsafe fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT), BridgeError> {
        let debug_utils_loader = ash::ext::debug_utils::Instance::new(entry, instance);

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let debug_messenger = debug_utils_loader.create_debug_utils_messenger(&debug_info, None)?;
        Ok((debug_utils_loader, debug_messenger))
    }

    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies), BridgeError> {
        instance
            .enumerate_physical_devices()?
            .into_iter()
            .filter(|&device| Self::check_device_extension_support(instance, device))
            .find_map(|device| {
                Self::find_queue_families(instance, device, surface_loader, surface)
                    .map(|indices| (device, indices))
            })
            .ok_or(BridgeError::NoSuitableGpu)
    }

    unsafe fn find_queue_families(
        instance: &ash::Instance,
        device: vk::PhysicalDevice,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Option<QueueFamilies> {
        let queue_families = instance.get_physical_device_queue_family_properties(device);

        let mut graphics_family = None;
        let mut present_family = None;

        for (i, queue_family) in queue_families.iter().enumerate() {
            let i = i as u32;
            if queue_family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics_family.get_or_insert(i);
            }

            let present_support = surface_loader
                .get_physical_device_surface_support(device, i, surface)
                .unwrap_or(false);
            if present_support {
                present_family.get_or_insert(i);
            }

            if graphics_family.is_some() && present_family.is_some() {
                break;
            }
        }

        Some(QueueFamilies {
            graphics_family: graphics_family?,
            present_family: present_family?,
        })
    }

    unsafe fn check_device_extension_support(instance: &ash::Instance, device: vk::PhysicalDevice) -> bool {
        instance
            .enumerate_device_extension_properties(device)
            .unwrap_or_default()
            .iter()
            .any(|ext| {
                ext.extension_name_as_c_str()
                    .map(|name| name == ash::khr::swapchain::NAME)
                    .unwrap_or(false)
            })
    }

    unsafe fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        indices: &QueueFamilies,
    ) -> Result<(ash::Device, vk::Queue, vk::Queue), BridgeError> {
        let mut families = vec![indices.graphics_family];
        if indices.present_family != indices.graphics_family {
            families.push(indices.present_family);
        }

        let queue_priority = [1.0f32];
        let queue_create_infos: Vec<_> = families
            .iter()
            .map(|&queue_family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_family)
                    .queue_priorities(&queue_priority)
            })
            .collect();

        let device_features = vk::PhysicalDeviceFeatures::default();
        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        let device = instance.create_device(physical_device, &device_create_info, None)?;

        let graphics_queue = device.get_device_queue(indices.graphics_family, 0);
        let present_queue = device.get_device_queue(indices.present_family, 0);

        Ok((device, graphics_queue, present_queue))
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);

            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}

struct QueueFamilies {
    graphics_family: u32,
    present_family: u32,
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("[vulkan {message_type:?}] {message}"),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("[vulkan {message_type:?}] {message}"),
        _ => log::debug!("[vulkan {message_type:?}] {message}"),
    }

    vk::FALSE
}
