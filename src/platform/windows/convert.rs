use crate::bitmap::{self, BACKGROUND};
use crate::error::IconError;
use crate::platform::RasterIcon;
use image::RgbaImage;
use std::ffi::c_void;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAP, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleDC, CreateDIBSection,
    CreatedHDC, DIB_RGB_COLORS, DeleteDC, DeleteObject, GdiFlush, GetDC, GetObjectW,
    GetWindowDC, HBITMAP, HDC, HGDIOBJ, ReleaseDC, SRCCOPY, SelectObject,
};
use windows::Win32::UI::WindowsAndMessaging::{DI_NORMAL, DrawIconEx, GetIconInfo, HICON, ICONINFO};

fn conversion(what: &str, err: impl std::fmt::Display) -> IconError {
    IconError::ConversionFailure(format!("{what}: {err}"))
}

struct DeviceContext {
    window: HWND,
    hdc: HDC,
}

impl DeviceContext {
    fn screen() -> Result<Self, IconError> {
        let hdc = unsafe { GetDC(HWND::default()) };
        if hdc.is_invalid() {
            return Err(IconError::ConversionFailure("GetDC returned no screen DC".into()));
        }
        Ok(Self {
            window: HWND::default(),
            hdc,
        })
    }

    fn window(window: HWND) -> Result<Self, IconError> {
        let hdc = unsafe { GetWindowDC(window) };
        if hdc.is_invalid() {
            return Err(IconError::ConversionFailure("GetWindowDC failed".into()));
        }
        Ok(Self { window, hdc })
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(self.window, self.hdc);
        }
    }
}

struct MemoryDc(CreatedHDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct GdiBitmap(HBITMAP);

impl Drop for GdiBitmap {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = DeleteObject(self.0);
            }
        }
    }
}

/// Puts the DC's original object back so the bitmap can be deleted.
struct Selection {
    dc: CreatedHDC,
    previous: HGDIOBJ,
}

impl Drop for Selection {
    fn drop(&mut self) {
        unsafe {
            let _ = SelectObject(self.dc, self.previous);
        }
    }
}

/// Off-screen 32-bit top-down surface. Fields drop in order: deselect,
/// delete the bitmap, delete the DC.
struct DibSurface {
    _selection: Selection,
    _bitmap: GdiBitmap,
    memory: MemoryDc,
    bits: *mut u8,
    width: u32,
    height: u32,
}

impl DibSurface {
    fn new(width: u32, height: u32) -> Result<Self, IconError> {
        let screen = DeviceContext::screen()?;
        let memory = MemoryDc(unsafe { CreateCompatibleDC(screen.hdc) });
        if memory.0.is_invalid() {
            return Err(IconError::ConversionFailure("CreateCompatibleDC failed".into()));
        }

        let bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width as i32,
                biHeight: -(height as i32), // top-down
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            bmiColors: [Default::default()],
        };

        let mut bits: *mut c_void = std::ptr::null_mut();
        let bitmap =
            unsafe { CreateDIBSection(screen.hdc, &bmi, DIB_RGB_COLORS, &mut bits, None, 0) }
                .map(GdiBitmap)
                .map_err(|e| conversion("CreateDIBSection", e))?;
        if bits.is_null() {
            return Err(IconError::ConversionFailure("DIB section has no pixel memory".into()));
        }

        let previous = unsafe { SelectObject(memory.0, bitmap.0) };
        let selection = Selection {
            dc: memory.0,
            previous,
        };
        Ok(Self {
            _selection: selection,
            _bitmap: bitmap,
            memory,
            bits: bits.cast(),
            width,
            height,
        })
    }

    fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    fn fill(&self, value: u8) {
        unsafe { std::ptr::write_bytes(self.bits, value, self.byte_len()) };
    }

    fn pixels(&self) -> Result<RgbaImage, IconError> {
        let bits = unsafe {
            let _ = GdiFlush();
            std::slice::from_raw_parts(self.bits, self.byte_len())
        };
        bitmap::bgrx_to_rgba(bits, self.width, self.height)
    }
}

/// Draws `hicon` at `size × size` on a white surface and reads it back.
/// The caller keeps ownership of `hicon`.
pub fn to_raster(hicon: HICON, size: u32) -> Result<RasterIcon, IconError> {
    if hicon.is_invalid() {
        return Err(IconError::ConversionFailure("null icon handle".into()));
    }
    let surface = DibSurface::new(size, size)?;
    surface.fill(BACKGROUND);
    unsafe {
        DrawIconEx(
            surface.memory.0,
            0,
            0,
            hicon,
            size as i32,
            size as i32,
            0,
            None,
            DI_NORMAL,
        )
    }
    .map_err(|e| conversion("DrawIconEx", e))?;

    let image = surface.pixels()?;
    Ok(RasterIcon::new(image, bit_depth(hicon).unwrap_or(32), "ICO"))
}

/// Colour depth of the icon's own bitmap.
fn bit_depth(hicon: HICON) -> Option<u16> {
    let mut info = ICONINFO::default();
    unsafe { GetIconInfo(hicon, &mut info) }.ok()?;
    let color = GdiBitmap(info.hbmColor);
    let mask = GdiBitmap(info.hbmMask);
    let source = if color.0.is_invalid() { &mask } else { &color };

    let mut bm = BITMAP::default();
    let read = unsafe {
        GetObjectW(
            source.0,
            std::mem::size_of::<BITMAP>() as i32,
            Some(&mut bm as *mut BITMAP as *mut c_void),
        )
    };
    (read > 0 && bm.bmBitsPixel > 0).then_some(bm.bmBitsPixel)
}

/// Copies `width × height` pixels at window-relative `(x, y)` out of a
/// window's DC.
pub fn capture_window(
    window: HWND,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
) -> Result<RgbaImage, IconError> {
    if width == 0 || height == 0 {
        return Err(IconError::ConversionFailure("empty capture rectangle".into()));
    }
    let source = DeviceContext::window(window)?;
    let surface = DibSurface::new(width, height)?;
    unsafe {
        BitBlt(
            surface.memory.0,
            0,
            0,
            width as i32,
            height as i32,
            source.hdc,
            x,
            y,
            SRCCOPY,
        )
    }
    .map_err(|e| conversion("BitBlt", e))?;
    surface.pixels()
}
