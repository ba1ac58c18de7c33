use super::{NativeIcon, from_wide, to_wide};
use crate::bitmap;
use crate::error::IconError;
use crate::platform::{RasterIcon, ShortcutLink};
use image::DynamicImage;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use windows::Win32::Foundation::MAX_PATH;
use windows::Win32::Storage::FileSystem::{FILE_FLAGS_AND_ATTRIBUTES, WIN32_FIND_DATAW};
use windows::Win32::System::Com::{
    CLSCTX_INPROC_SERVER, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx,
    CoTaskMemFree, CoUninitialize, IPersistFile, STGM_READ,
};
use windows::Win32::UI::Controls::IImageList;
use windows::Win32::UI::Shell::Common::ITEMIDLIST;
use windows::Win32::UI::Shell::{
    ExtractIconExW, ExtractIconW, IShellLinkW, SHFILEINFOW, SHGFI_FLAGS, SHGFI_ICON,
    SHGFI_LARGEICON, SHGFI_PIDL, SHGFI_SYSICONINDEX, SHGetFileInfoW, SHGetImageList,
    SHIL_EXTRALARGE, SHIL_JUMBO, SHParseDisplayName, ShellLink,
};
use windows::Win32::UI::WindowsAndMessaging::{HICON, LoadIconW};
use windows::core::{ComInterface, PCWSTR, w};

/// `SystemIcons` ids 100..=106 map onto the predefined `IDI_*` resources.
const IDI_BASE: u32 = 32512;
const IDI_MAP: [(u32, u32); 7] = [
    (100, IDI_BASE),     // application
    (101, IDI_BASE + 3), // warning
    (102, IDI_BASE + 2), // question
    (103, IDI_BASE + 1), // error
    (104, IDI_BASE + 4), // information
    (105, IDI_BASE + 5), // windows logo
    (106, IDI_BASE + 6), // shield
];

/// Balances a successful `CoInitializeEx` on this thread.
pub struct ComInit {
    initialized: bool,
}

impl ComInit {
    pub fn new() -> Self {
        let initialized = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.is_ok();
        Self { initialized }
    }
}

impl Drop for ComInit {
    fn drop(&mut self) {
        if self.initialized {
            unsafe { CoUninitialize() };
        }
    }
}

struct Pidl(*mut ITEMIDLIST);

impl Drop for Pidl {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { CoTaskMemFree(Some(self.0 as *const c_void)) };
        }
    }
}

/// Asks for one large and one small icon at `index` and keeps the large one
/// when both exist. The unused handle is destroyed on return.
pub fn extract_icon_pair(path: &Path, index: i32) -> Option<NativeIcon> {
    let wide = to_wide(path);
    let mut large = HICON::default();
    let mut small = HICON::default();
    let extracted = unsafe {
        ExtractIconExW(
            PCWSTR(wide.as_ptr()),
            index,
            Some(&mut large),
            Some(&mut small),
            1,
        )
    };
    if extracted == 0 || extracted == u32::MAX {
        return None;
    }
    let large = NativeIcon::owned(large);
    let small = NativeIcon::owned(small);
    large.or(small)
}

/// `IDI_*` resource for a system icon id: a table id or a raw `IDI_*` value.
fn stock_resource(id: u32) -> Option<u32> {
    IDI_MAP
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, idi)| *idi)
        .or_else(|| IDI_MAP.iter().map(|(_, idi)| *idi).find(|idi| *idi == id))
}

/// Predefined system icon. The handle is shared and never destroyed.
pub fn load_stock_icon(id: u32) -> Option<NativeIcon> {
    // Only predefined ids are valid without a module instance.
    let resource = stock_resource(id)?;
    // MAKEINTRESOURCE: the id travels in the pointer value.
    let name = PCWSTR(resource as usize as *const u16);
    let hicon = unsafe { LoadIconW(None, name) }.ok()?;
    NativeIcon::borrowed(hicon)
}

/// Icon by index from the shared shell resource library.
pub fn shell32_icon(id: u32) -> Option<NativeIcon> {
    let hicon = unsafe { ExtractIconW(None, w!("shell32.dll"), id) };
    // 1 means "not an executable".
    if hicon.0 == 1 {
        return None;
    }
    NativeIcon::owned(hicon)
}

/// Icon of a shell namespace location such as `::{20D04FE0-...}`.
pub fn location_icon(location: &str) -> Result<NativeIcon, IconError> {
    let _com = ComInit::new();
    let wide = to_wide(location);
    let mut raw: *mut ITEMIDLIST = std::ptr::null_mut();
    unsafe { SHParseDisplayName(PCWSTR(wide.as_ptr()), None, &mut raw, 0, None) }?;
    let pidl = Pidl(raw);

    let mut shfi = SHFILEINFOW::default();
    let result = unsafe {
        SHGetFileInfoW(
            PCWSTR(pidl.0 as *const u16),
            FILE_FLAGS_AND_ATTRIBUTES(0),
            Some(&mut shfi),
            std::mem::size_of::<SHFILEINFOW>() as u32,
            SHGFI_ICON | SHGFI_LARGEICON | SHGFI_PIDL,
        )
    };
    if result == 0 {
        return Err(IconError::NativeApiFailure(format!(
            "SHGetFileInfo returned no icon for {location}"
        )));
    }
    NativeIcon::owned(shfi.hIcon).ok_or_else(|| {
        IconError::NativeApiFailure(format!("SHGetFileInfo returned no icon for {location}"))
    })
}

fn file_info(path: &Path, flags: SHGFI_FLAGS) -> Option<SHFILEINFOW> {
    let wide = to_wide(path);
    let mut shfi = SHFILEINFOW::default();
    let result = unsafe {
        SHGetFileInfoW(
            PCWSTR(wide.as_ptr()),
            FILE_FLAGS_AND_ATTRIBUTES(0),
            Some(&mut shfi),
            std::mem::size_of::<SHFILEINFOW>() as u32,
            flags,
        )
    };
    (result != 0).then_some(shfi)
}

/// Larger sizes come from the system image list, which carries 256px
/// artwork that `SHGFI_LARGEICON` does not.
fn image_list_icon(path: &Path, size: u32) -> Option<NativeIcon> {
    let list_type = if size > 48 { SHIL_JUMBO } else { SHIL_EXTRALARGE };
    let index = file_info(path, SHGFI_SYSICONINDEX)?.iIcon;
    unsafe {
        let image_list: IImageList = SHGetImageList(list_type as i32).ok()?;
        let hicon = image_list.GetIcon(index, 0).ok()?;
        NativeIcon::owned(hicon)
    }
}

/// What Explorer shows for an existing file or folder.
pub fn item_icon(path: &Path, size: u32) -> Result<RasterIcon, IconError> {
    if size > 32 {
        if let Some(icon) = image_list_icon(path, size) {
            if let Ok(raster) = icon.to_raster(size) {
                return Ok(raster);
            }
        }
    }

    if let Some(icon) = file_info(path, SHGFI_ICON | SHGFI_LARGEICON)
        .and_then(|shfi| NativeIcon::owned(shfi.hIcon))
    {
        return icon.to_raster(size);
    }

    let text = path.to_string_lossy();
    match windows_icons::get_icon_by_path(&text) {
        Ok(icon) => {
            let image = bitmap::fit_square(&DynamicImage::ImageRgba8(icon), size);
            Ok(RasterIcon::new(image, 32, "PNG"))
        }
        Err(e) => Err(IconError::NativeApiFailure(format!(
            "no shell icon for {}: {e}",
            path.display()
        ))),
    }
}

pub fn resolve_shortcut(path: &Path) -> Result<ShortcutLink, IconError> {
    let _com = ComInit::new();
    unsafe {
        let link: IShellLinkW = CoCreateInstance(&ShellLink, None, CLSCTX_INPROC_SERVER)?;
        let file: IPersistFile = link.cast()?;
        let wide = to_wide(path);
        file.Load(PCWSTR(wide.as_ptr()), STGM_READ)?;

        let mut buffer = [0u16; MAX_PATH as usize];
        let mut find = WIN32_FIND_DATAW::default();
        let target = link
            .GetPath(&mut buffer, &mut find, 0)
            .ok()
            .map(|_| from_wide(&buffer))
            .filter(|t| !t.trim().is_empty())
            .map(PathBuf::from);

        let mut buffer = [0u16; MAX_PATH as usize];
        let mut index = 0i32;
        let icon_location = link
            .GetIconLocation(&mut buffer, &mut index)
            .ok()
            .map(|_| from_wide(&buffer))
            .filter(|p| !p.trim().is_empty())
            .map(|p| (PathBuf::from(p), index));

        Ok(ShortcutLink {
            target,
            icon_location,
        })
    }
}
