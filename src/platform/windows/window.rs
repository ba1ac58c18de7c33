use super::{NativeIcon, from_wide, to_wide};
use crate::tray::ScreenRect;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumChildWindows, FindWindowExW, FindWindowW, GET_CLASS_LONG_INDEX, GetClassNameW,
    GetWindowRect, GetWindowTextW, GetWindowThreadProcessId, HICON, ICON_BIG, ICON_SMALL,
    ICON_SMALL2, IsWindowVisible, SMTO_ABORTIFHUNG, SendMessageTimeoutW, WM_GETICON,
};
use windows::core::PCWSTR;

/// Per-window message timeout, so a hung tray owner cannot stall discovery.
pub const MESSAGE_TIMEOUT_MS: u32 = 200;

const GCLP_HICON: GET_CLASS_LONG_INDEX = GET_CLASS_LONG_INDEX(-14);
const GCLP_HICONSM: GET_CLASS_LONG_INDEX = GET_CLASS_LONG_INDEX(-34);

pub fn find_window(class: &str) -> Option<HWND> {
    let class = to_wide(class);
    let hwnd = unsafe { FindWindowW(PCWSTR(class.as_ptr()), PCWSTR::null()) };
    (hwnd != HWND::default()).then_some(hwnd)
}

pub fn find_child(parent: HWND, class: &str) -> Option<HWND> {
    let class = to_wide(class);
    let hwnd = unsafe {
        FindWindowExW(parent, HWND::default(), PCWSTR(class.as_ptr()), PCWSTR::null())
    };
    (hwnd != HWND::default()).then_some(hwnd)
}

pub fn class_name(hwnd: HWND) -> String {
    let mut buffer = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd, &mut buffer) };
    from_wide(&buffer[..len.max(0) as usize])
}

pub fn window_text(hwnd: HWND) -> String {
    let mut buffer = [0u16; 512];
    let len = unsafe { GetWindowTextW(hwnd, &mut buffer) };
    from_wide(&buffer[..len.max(0) as usize])
}

pub fn window_rect(hwnd: HWND) -> Option<ScreenRect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect) }.ok()?;
    Some(ScreenRect::new(rect.left, rect.top, rect.right, rect.bottom))
}

pub fn is_visible(hwnd: HWND) -> bool {
    unsafe { IsWindowVisible(hwnd) }.as_bool()
}

pub fn process_id(hwnd: HWND) -> u32 {
    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
    pid
}

unsafe extern "system" fn collect_child(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let children = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };
    children.push(hwnd);
    TRUE
}

/// Every descendant of `parent`, depth first, in z-order.
pub fn descendants(parent: HWND) -> Vec<HWND> {
    let mut children: Vec<HWND> = Vec::new();
    unsafe {
        EnumChildWindows(
            parent,
            Some(collect_child),
            LPARAM(&mut children as *mut Vec<HWND> as isize),
        );
    }
    children
}

/// `SendMessageTimeout` that gives up on hung windows. `None` when the
/// message was not delivered.
pub fn send_message(hwnd: HWND, msg: u32, wparam: usize, lparam: isize) -> Option<usize> {
    let mut result = 0usize;
    let sent = unsafe {
        SendMessageTimeoutW(
            hwnd,
            msg,
            WPARAM(wparam),
            LPARAM(lparam),
            SMTO_ABORTIFHUNG,
            MESSAGE_TIMEOUT_MS,
            Some(&mut result),
        )
    };
    (sent.0 != 0).then_some(result)
}

fn send_icon_query(hwnd: HWND, kind: u32) -> Option<NativeIcon> {
    let handle = send_message(hwnd, WM_GETICON, kind as usize, 0)?;
    NativeIcon::borrowed(HICON(handle as isize))
}

#[cfg(target_pointer_width = "64")]
fn class_icon(hwnd: HWND, index: GET_CLASS_LONG_INDEX) -> Option<NativeIcon> {
    use windows::Win32::UI::WindowsAndMessaging::GetClassLongPtrW;
    let value = unsafe { GetClassLongPtrW(hwnd, index) };
    NativeIcon::borrowed(HICON(value as isize))
}

#[cfg(target_pointer_width = "32")]
fn class_icon(hwnd: HWND, index: GET_CLASS_LONG_INDEX) -> Option<NativeIcon> {
    use windows::Win32::UI::WindowsAndMessaging::GetClassLongW;
    let value = unsafe { GetClassLongW(hwnd, index) };
    NativeIcon::borrowed(HICON(value as isize))
}

/// `WM_GETICON` small, big, then the system-generated small icon.
pub fn message_icon(hwnd: HWND) -> Option<NativeIcon> {
    [ICON_SMALL, ICON_BIG, ICON_SMALL2]
        .into_iter()
        .find_map(|kind| send_icon_query(hwnd, kind))
}

/// Small then large icon registered with the window class.
pub fn registered_class_icon(hwnd: HWND) -> Option<NativeIcon> {
    class_icon(hwnd, GCLP_HICONSM).or_else(|| class_icon(hwnd, GCLP_HICON))
}
