//! Notification-area discovery tiers.

use super::{NativeIcon, convert, process, raw, window};
use crate::bitmap;
use crate::error::IconError;
use crate::tray::{ScreenRect, TrayStrategy};
use crate::types::TrayIconRecord;
use image::{DynamicImage, RgbaImage};
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::UI::Controls::{
    TB_BUTTONCOUNT, TB_GETBUTTON, TB_GETBUTTONTEXTW, TB_GETITEMRECT, TBBUTTON,
};
use windows::Win32::UI::WindowsAndMessaging::HICON;

const TASKBAR_CLASS: &str = "Shell_TrayWnd";
const NOTIFY_CLASS: &str = "TrayNotifyWnd";
const PAGER_CLASS: &str = "SysPager";
const TOOLBAR_CLASS: &str = "ToolbarWindow32";
const OVERFLOW_CLASS: &str = "NotifyIconOverflowWindow";

/// Containers the precise tier descends into.
const CONTAINER_CLASSES: [&str; 3] = [NOTIFY_CLASS, TOOLBAR_CLASS, PAGER_CLASS];

/// Child windows that can host a single tray icon. Containers are not
/// controls: they have no icon of their own.
const CONTROL_CLASSES: [&str; 4] = [TOOLBAR_CLASS, "Button", "Static", "SysImageView32"];

fn is_icon_control(class: &str) -> bool {
    CONTROL_CLASSES.contains(&class)
}

/// Per-button record explorer keeps behind `TBBUTTON::dwData`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct TrayData {
    hwnd: isize,
    uid: u32,
    callback_message: u32,
    reserved: [u32; 2],
    hicon: isize,
}

#[derive(Debug, Clone, Copy)]
enum Filter {
    /// Visible, icon-sized and overlapping the container.
    Strict(ScreenRect),
    Loose,
}

impl Filter {
    fn admits(&self, hwnd: HWND) -> bool {
        if !window::is_visible(hwnd) {
            return false;
        }
        match self {
            Filter::Loose => true,
            Filter::Strict(bounds) => window::window_rect(hwnd)
                .is_some_and(|rect| rect.is_icon_sized() && bounds.intersects(&rect)),
        }
    }
}

fn taskbar() -> Result<HWND, IconError> {
    window::find_window(TASKBAR_CLASS)
        .ok_or_else(|| IconError::NativeApiFailure("no taskbar window".into()))
}

fn record(image: RgbaImage, index: i32, size: u32, pid: u32, title: String, tooltip: String) -> TrayIconRecord {
    TrayIconRecord::new(image, format!("PID_{pid}"), index, size, pid, title, tooltip)
}

/// Window message icon, then class icon, then the first icon of the owning
/// executable.
fn acquire_icon(hwnd: HWND, pid: u32) -> Option<NativeIcon> {
    window::message_icon(hwnd)
        .or_else(|| window::registered_class_icon(hwnd))
        .or_else(|| (pid != 0).then(|| process::exe_icon(pid)).flatten())
}

fn render(icon: &NativeIcon, size: u32) -> Option<RgbaImage> {
    icon.to_raster(size)
        .map_err(|err| tracing::trace!(%err, "tray icon did not rasterise"))
        .ok()
        .map(|raster| raster.image)
}

/// One record per hosted control under `container` that passes `filter`.
fn scan_container(container: HWND, size: u32, filter: Filter) -> Vec<TrayIconRecord> {
    let mut records = Vec::new();
    for child in window::descendants(container) {
        let class = window::class_name(child);
        if !is_icon_control(&class) || !filter.admits(child) {
            continue;
        }
        let pid = window::process_id(child);
        tracing::trace!(pid, class = %class, "inspecting tray control");
        let Some(image) = acquire_icon(child, pid).and_then(|icon| render(&icon, size)) else {
            continue;
        };
        // Controls carry no separate tooltip, so the window text serves as both.
        let text = window::window_text(child);
        records.push(record(image, 0, size, pid, text.clone(), text));
    }
    records
}

/// Reads every button of a toolbar that lives in another process. The
/// button rectangle, its `TRAYDATA` and its text all come back through a
/// buffer allocated inside the toolbar's process.
fn toolbar_buttons(toolbar: HWND, size: u32, bounds: ScreenRect) -> Vec<TrayIconRecord> {
    let count = window::send_message(toolbar, TB_BUTTONCOUNT, 0, 0).unwrap_or(0);
    if count == 0 {
        return Vec::new();
    }
    let Some(origin) = window::window_rect(toolbar) else {
        return Vec::new();
    };
    let host_pid = window::process_id(toolbar);
    let host = match process::ProcessHandle::for_memory(host_pid) {
        Ok(host) => host,
        Err(err) => {
            tracing::trace!(pid = host_pid, %err, "toolbar process not readable");
            return Vec::new();
        }
    };
    let buffer = match process::RemoteBuffer::new(&host) {
        Ok(buffer) => buffer,
        Err(err) => {
            tracing::trace!(pid = host_pid, %err, "no remote buffer for toolbar");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for index in 0..count {
        let remote = buffer.address() as isize;
        if window::send_message(toolbar, TB_GETITEMRECT, index, remote).unwrap_or(0) == 0 {
            continue;
        }
        let Ok(item) = buffer.read::<RECT>() else {
            continue;
        };
        let rect = ScreenRect::new(item.left, item.top, item.right, item.bottom)
            .offset(origin.left, origin.top);
        if !rect.is_icon_sized() || !bounds.intersects(&rect) {
            continue;
        }

        let button = window::send_message(toolbar, TB_GETBUTTON, index, remote)
            .filter(|&ok| ok != 0)
            .and_then(|_| buffer.read::<TBBUTTON>().ok());
        let data = button
            .filter(|b| b.dwData != 0)
            .and_then(|b| process::read_at::<TrayData>(&host, b.dwData).ok())
            .unwrap_or_default();
        let tooltip = button
            .and_then(|b| {
                let len = window::send_message(toolbar, TB_GETBUTTONTEXTW, b.idCommand as usize, remote)?;
                // -1 comes back as usize::MAX
                (len > 0 && len < usize::MAX).then(|| buffer.read_wide(len).ok()).flatten()
            })
            .unwrap_or_default();

        let owner = HWND(data.hwnd);
        let (pid, title) = if data.hwnd != 0 {
            (window::process_id(owner), window::window_text(owner))
        } else {
            (host_pid, String::new())
        };

        let image = NativeIcon::borrowed(HICON(data.hicon))
            .and_then(|icon| render(&icon, size))
            .or_else(|| {
                (data.hwnd != 0)
                    .then(|| acquire_icon(owner, pid))
                    .flatten()
                    .and_then(|icon| render(&icon, size))
            })
            .or_else(|| capture_button(toolbar, rect, origin, size));
        let Some(image) = image else {
            continue;
        };
        tracing::trace!(pid, index, "toolbar button captured");
        records.push(record(image, index as i32, size, pid, title, tooltip));
    }
    records
}

/// On-screen pixels of a toolbar button, scaled to `size`.
fn capture_button(toolbar: HWND, rect: ScreenRect, origin: ScreenRect, size: u32) -> Option<RgbaImage> {
    let pixels = convert::capture_window(
        toolbar,
        rect.left - origin.left,
        rect.top - origin.top,
        rect.width() as u32,
        rect.height() as u32,
    )
    .ok()?;
    Some(bitmap::fit_square(&DynamicImage::ImageRgba8(pixels), size))
}

fn scan_precise(container: HWND, size: u32) -> Vec<TrayIconRecord> {
    let Some(bounds) = window::window_rect(container) else {
        return Vec::new();
    };
    if window::class_name(container) == TOOLBAR_CLASS {
        toolbar_buttons(container, size, bounds)
    } else {
        scan_container(container, size, Filter::Strict(bounds))
    }
}

/// Taskbar subtree from the notification area onward, plus the overflow
/// flyout.
pub struct PreciseTier;

impl TrayStrategy for PreciseTier {
    fn name(&self) -> &'static str {
        "precise"
    }

    fn discover(&self, size: u32) -> Result<Vec<TrayIconRecord>, IconError> {
        let taskbar = taskbar()?;
        let children = window::descendants(taskbar);
        let start = children
            .iter()
            .position(|&child| window::class_name(child) == NOTIFY_CLASS)
            .unwrap_or(children.len());

        let mut records = Vec::new();
        for &container in &children[start..] {
            if CONTAINER_CLASSES.contains(&window::class_name(container).as_str()) {
                records.extend(scan_precise(container, size));
            }
        }
        if let Some(overflow) = window::find_window(OVERFLOW_CLASS) {
            records.extend(scan_precise(overflow, size));
            for toolbar in window::descendants(overflow) {
                if window::class_name(toolbar) == TOOLBAR_CLASS {
                    records.extend(scan_precise(toolbar, size));
                }
            }
        }
        Ok(records)
    }
}

/// Notification windows found by class name, scanned without the size and
/// overlap checks.
pub struct WindowEnumTier;

impl WindowEnumTier {
    fn containers(taskbar: HWND) -> Vec<HWND> {
        let mut found = Vec::new();
        found.extend(window::find_child(taskbar, NOTIFY_CLASS));
        found.extend(
            window::find_child(taskbar, PAGER_CLASS)
                .and_then(|pager| window::find_child(pager, NOTIFY_CLASS)),
        );
        found.extend(window::find_child(taskbar, TOOLBAR_CLASS));
        if found.is_empty() {
            found = window::descendants(taskbar)
                .into_iter()
                .filter(|&child| CONTAINER_CLASSES.contains(&window::class_name(child).as_str()))
                .collect();
        }
        found
    }
}

impl TrayStrategy for WindowEnumTier {
    fn name(&self) -> &'static str {
        "window-enum"
    }

    fn discover(&self, size: u32) -> Result<Vec<TrayIconRecord>, IconError> {
        let taskbar = taskbar()?;
        let mut containers = Self::containers(taskbar);
        containers.extend(window::find_window(OVERFLOW_CLASS));

        let mut records = Vec::new();
        for container in containers {
            records.extend(scan_container(container, size, Filter::Loose));
        }
        Ok(records)
    }
}

/// Direct `user32` calls only: taskbar children that look like notification
/// windows and answer `WM_GETICON`.
pub struct RawApiTier;

impl TrayStrategy for RawApiTier {
    fn name(&self) -> &'static str {
        "raw-api"
    }

    fn discover(&self, size: u32) -> Result<Vec<TrayIconRecord>, IconError> {
        let taskbar = raw::find_window(TASKBAR_CLASS)
            .ok_or_else(|| IconError::NativeApiFailure("no taskbar window".into()))?;

        let mut records = Vec::new();
        for found in raw::windows_matching(taskbar, &[NOTIFY_CLASS, TOOLBAR_CLASS]) {
            let Some(handle) = raw::window_icon(found.hwnd, window::MESSAGE_TIMEOUT_MS) else {
                continue;
            };
            let Some(image) = NativeIcon::borrowed(HICON(handle)).and_then(|icon| render(&icon, size))
            else {
                continue;
            };
            tracing::trace!(pid = found.pid, class = %found.class, "raw tray window");
            records.push(record(image, 0, size, found.pid, found.title.clone(), found.title));
        }
        Ok(records)
    }
}

pub fn strategies() -> Vec<Box<dyn TrayStrategy>> {
    vec![Box::new(PreciseTier), Box::new(WindowEnumTier), Box::new(RawApiTier)]
}
