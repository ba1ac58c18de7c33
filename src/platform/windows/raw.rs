//! Bare `user32` imports for the last tray tier. Nothing here goes through
//! the `windows` crate wrappers, so this tier keeps working when those
//! bindings misbehave on an unusual shell.

#![allow(clashing_extern_declarations)]

use std::ffi::c_void;

windows_targets::link!("user32.dll" "system" fn FindWindowW(class: *const u16, title: *const u16) -> isize);
windows_targets::link!("user32.dll" "system" fn EnumChildWindows(parent: isize, callback: Option<unsafe extern "system" fn(isize, isize) -> i32>, lparam: isize) -> i32);
windows_targets::link!("user32.dll" "system" fn GetClassNameW(hwnd: isize, buffer: *mut u16, len: i32) -> i32);
windows_targets::link!("user32.dll" "system" fn GetWindowTextW(hwnd: isize, buffer: *mut u16, len: i32) -> i32);
windows_targets::link!("user32.dll" "system" fn GetWindowThreadProcessId(hwnd: isize, pid: *mut u32) -> u32);
windows_targets::link!("user32.dll" "system" fn SendMessageTimeoutW(hwnd: isize, msg: u32, wparam: usize, lparam: isize, flags: u32, timeout: u32, result: *mut usize) -> isize);

const WM_GETICON: u32 = 0x007F;
const ICON_SMALL: usize = 0;
const ICON_BIG: usize = 1;
const SMTO_ABORTIFHUNG: u32 = 0x0002;

/// One window found by the raw walk.
#[derive(Debug, Clone)]
pub struct RawWindow {
    pub hwnd: isize,
    pub class: String,
    pub title: String,
    pub pid: u32,
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn read_text(hwnd: isize, read: unsafe extern "system" fn(isize, *mut u16, i32) -> i32) -> String {
    let mut buffer = [0u16; 256];
    let len = unsafe { read(hwnd, buffer.as_mut_ptr(), buffer.len() as i32) };
    super::from_wide(&buffer[..len.max(0) as usize])
}

unsafe extern "system" fn push_child(hwnd: isize, lparam: isize) -> i32 {
    let children = unsafe { &mut *(lparam as *mut Vec<isize>) };
    children.push(hwnd);
    1
}

pub fn find_window(class: &str) -> Option<isize> {
    let class = wide(class);
    let hwnd = unsafe { FindWindowW(class.as_ptr(), std::ptr::null()) };
    (hwnd != 0).then_some(hwnd)
}

/// Descendants of `parent` whose class name contains any of `classes`.
pub fn windows_matching(parent: isize, classes: &[&str]) -> Vec<RawWindow> {
    let mut children: Vec<isize> = Vec::new();
    unsafe {
        EnumChildWindows(
            parent,
            Some(push_child),
            &mut children as *mut Vec<isize> as *mut c_void as isize,
        );
    }
    children
        .into_iter()
        .filter_map(|hwnd| {
            let class = read_text(hwnd, GetClassNameW);
            if !classes.iter().any(|c| class.contains(c)) {
                return None;
            }
            let mut pid = 0u32;
            unsafe { GetWindowThreadProcessId(hwnd, &mut pid) };
            Some(RawWindow {
                hwnd,
                title: read_text(hwnd, GetWindowTextW),
                class,
                pid,
            })
        })
        .collect()
}

/// Small then big `WM_GETICON` answer, as a raw handle value.
pub fn window_icon(hwnd: isize, timeout_ms: u32) -> Option<isize> {
    [ICON_SMALL, ICON_BIG].into_iter().find_map(|kind| {
        let mut result = 0usize;
        let sent = unsafe {
            SendMessageTimeoutW(hwnd, WM_GETICON, kind, 0, SMTO_ABORTIFHUNG, timeout_ms, &mut result)
        };
        (sent != 0 && result != 0).then_some(result as isize)
    })
}
