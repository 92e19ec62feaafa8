use ash::{extensions::khr, vk};
use raw_window_handle::{HasRawWindowHandle, RawWindowHandle};
use snafu::{ResultExt, Snafu};
use std::os::raw::c_char;
use winit::window::Window;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create window surface: {}", source))]
    CreateSurface { source: ash::vk::Result },

    #[snafu(display("Window system is not supported by this renderer"))]
    UnsupportedWindowSystem,
}

/// Instance extensions needed to present to the given window.
pub fn surface_extension_names(window: &Window) -> Result<Vec<*const c_char>> {
    let mut names = vec![khr::Surface::name().as_ptr()];
    match window.raw_window_handle() {
        #[cfg(target_os = "windows")]
        RawWindowHandle::Windows(_) => names.push(khr::Win32Surface::name().as_ptr()),
        #[cfg(any(
            target_os = "linux",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        RawWindowHandle::Xlib(_) => names.push(khr::XlibSurface::name().as_ptr()),
        #[cfg(any(
            target_os = "linux",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        RawWindowHandle::Wayland(_) => names.push(khr::WaylandSurface::name().as_ptr()),
        _ => return UnsupportedWindowSystem.fail(),
    }
    Ok(names)
}

pub struct Surface {
    surface: khr::Surface,
    surface_khr: vk::SurfaceKHR,
}

impl Surface {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance, window: &Window) -> Result<Self> {
        let surface = khr::Surface::new(entry, instance);
        let surface_khr = unsafe { Self::create_surface_khr(entry, instance, window)? };
        Ok(Self {
            surface,
            surface_khr,
        })
    }

    unsafe fn create_surface_khr(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &Window,
    ) -> Result<vk::SurfaceKHR> {
        match window.raw_window_handle() {
            #[cfg(target_os = "windows")]
            RawWindowHandle::Windows(handle) => {
                let create_info = vk::Win32SurfaceCreateInfoKHR::builder()
                    .hinstance(handle.hinstance as *const _)
                    .hwnd(handle.hwnd as *const _)
                    .build();
                khr::Win32Surface::new(entry, instance)
                    .create_win32_surface(&create_info, None)
                    .context(CreateSurface)
            }
            #[cfg(any(
                target_os = "linux",
                target_os = "dragonfly",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd"
            ))]
            RawWindowHandle::Xlib(handle) => {
                let create_info = vk::XlibSurfaceCreateInfoKHR::builder()
                    .dpy(handle.display as *mut vk::Display)
                    .window(handle.window)
                    .build();
                khr::XlibSurface::new(entry, instance)
                    .create_xlib_surface(&create_info, None)
                    .context(CreateSurface)
            }
            #[cfg(any(
                target_os = "linux",
                target_os = "dragonfly",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd"
            ))]
            RawWindowHandle::Wayland(handle) => {
                let create_info = vk::WaylandSurfaceCreateInfoKHR::builder()
                    .display(handle.display as *mut _)
                    .surface(handle.surface as *mut _)
                    .build();
                khr::WaylandSurface::new(entry, instance)
                    .create_wayland_surface(&create_info, None)
                    .context(CreateSurface)
            }
            _ => UnsupportedWindowSystem.fail(),
        }
    }

    pub fn surface(&self) -> &khr::Surface {
        &self.surface
    }

    pub fn surface_khr(&self) -> vk::SurfaceKHR {
        self.surface_khr
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.surface.destroy_surface(self.surface_khr, None);
        }
    }
}
