use wgpu::SurfaceError;

use super::GraphicsError;

/// Picks `preferred` when the surface supports it, else the first supported format.
///
/// Returns `None` if the surface reports no formats for the adapter.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    preferred: wgpu::TextureFormat,
) -> Option<wgpu::TextureFormat> {
    if formats.contains(&preferred) {
        return Some(preferred);
    }
    formats.first().copied()
}

/// Maps a present sync interval onto a supported present mode.
///
/// Interval 0 asks for tearing presentation; anything else waits for vblank.
/// FIFO is the only mode every surface must support.
pub(crate) fn choose_present_mode(
    modes: &[wgpu::PresentMode],
    sync_interval: u32,
) -> wgpu::PresentMode {
    if sync_interval == 0 {
        for mode in [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox] {
            if modes.contains(&mode) {
                return mode;
            }
        }
    }
    wgpu::PresentMode::Fifo
}

pub(crate) fn choose_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        return wgpu::CompositeAlphaMode::Opaque;
    }
    modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Converts a back buffer acquisition failure into the fatal frame error.
///
/// Surface recovery (reconfigure, skip) is out of scope: every variant is fatal.
pub(crate) fn map_surface_error(err: SurfaceError) -> GraphicsError {
    let reason = match err {
        SurfaceError::Lost => "surface lost",
        SurfaceError::Outdated => "surface outdated",
        SurfaceError::OutOfMemory => "out of memory acquiring back buffer",
        SurfaceError::Timeout => "timed out acquiring back buffer",
        SurfaceError::Other => "back buffer acquisition failed",
    };
    GraphicsError::device_lost(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode, PresentMode, TextureFormat};

    #[test]
    fn preferred_format_wins_when_supported() {
        let formats = [TextureFormat::Rgba8Unorm, TextureFormat::Bgra8Unorm];
        assert_eq!(
            choose_surface_format(&formats, TextureFormat::Bgra8Unorm),
            Some(TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn falls_back_to_first_supported_format() {
        let formats = [TextureFormat::Rgba8UnormSrgb, TextureFormat::Rgba8Unorm];
        assert_eq!(
            choose_surface_format(&formats, TextureFormat::Bgra8Unorm),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(choose_surface_format(&[], TextureFormat::Bgra8Unorm), None);
    }

    #[test]
    fn sync_interval_one_is_fifo() {
        let modes = [PresentMode::Immediate, PresentMode::Fifo];
        assert_eq!(choose_present_mode(&modes, 1), PresentMode::Fifo);
    }

    #[test]
    fn sync_interval_zero_prefers_immediate() {
        assert_eq!(
            choose_present_mode(&[PresentMode::Fifo, PresentMode::Immediate], 0),
            PresentMode::Immediate
        );
        assert_eq!(
            choose_present_mode(&[PresentMode::Fifo, PresentMode::Mailbox], 0),
            PresentMode::Mailbox
        );
        assert_eq!(choose_present_mode(&[PresentMode::Fifo], 0), PresentMode::Fifo);
    }

    #[test]
    fn alpha_mode_prefers_opaque() {
        let modes = [CompositeAlphaMode::PreMultiplied, CompositeAlphaMode::Opaque];
        assert_eq!(choose_alpha_mode(&modes), CompositeAlphaMode::Opaque);
        assert_eq!(choose_alpha_mode(&[]), CompositeAlphaMode::Auto);
    }

    #[test]
    fn surface_errors_are_fatal() {
        for err in [SurfaceError::Lost, SurfaceError::Outdated, SurfaceError::Timeout] {
            assert!(matches!(map_surface_error(err), GraphicsError::DeviceLost(_)));
        }
    }
}
