use super::NativeIcon;
use super::shell;
use crate::error::IconError;
use std::ffi::c_void;
use std::path::PathBuf;
use windows::Win32::Foundation::{CloseHandle, HANDLE, MAX_PATH};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE, VirtualAllocEx, VirtualFreeEx,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_ACCESS_RIGHTS, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE, QueryFullProcessImageNameW,
};
use windows::core::PWSTR;

/// Scratch space allocated inside another process for toolbar messages.
pub const REMOTE_BUFFER_LEN: usize = 4096;

pub struct ProcessHandle(HANDLE);

impl ProcessHandle {
    pub fn open(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> Result<Self, IconError> {
        let handle = unsafe { OpenProcess(access, false, pid) }?;
        Ok(Self(handle))
    }

    /// Enough access to allocate, read and write memory in `pid`.
    pub fn for_memory(pid: u32) -> Result<Self, IconError> {
        Self::open(
            pid,
            PROCESS_VM_OPERATION | PROCESS_VM_READ | PROCESS_VM_WRITE,
        )
    }

    pub fn raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Memory committed in a foreign process, released on drop.
pub struct RemoteBuffer<'p> {
    process: &'p ProcessHandle,
    address: *mut c_void,
}

impl<'p> RemoteBuffer<'p> {
    pub fn new(process: &'p ProcessHandle) -> Result<Self, IconError> {
        let address = unsafe {
            VirtualAllocEx(
                process.raw(),
                None,
                REMOTE_BUFFER_LEN,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_READWRITE,
            )
        };
        if address.is_null() {
            return Err(IconError::NativeApiFailure(
                "VirtualAllocEx returned no memory".into(),
            ));
        }
        Ok(Self { process, address })
    }

    /// Address as seen by the foreign process, suitable for an `LPARAM`.
    pub fn address(&self) -> usize {
        self.address as usize
    }

    pub fn read<T: Copy + Default>(&self) -> Result<T, IconError> {
        read_at(self.process, self.address())
    }

    /// `len` UTF-16 units from the start of the buffer.
    pub fn read_wide(&self, len: usize) -> Result<String, IconError> {
        let len = len.min(REMOTE_BUFFER_LEN / 2);
        let mut units = vec![0u16; len];
        unsafe {
            ReadProcessMemory(
                self.process.raw(),
                self.address as *const c_void,
                units.as_mut_ptr().cast(),
                len * 2,
                None,
            )
        }?;
        Ok(super::from_wide(&units))
    }
}

impl Drop for RemoteBuffer<'_> {
    fn drop(&mut self) {
        unsafe {
            let _ = VirtualFreeEx(self.process.raw(), self.address, 0, MEM_RELEASE);
        }
    }
}

/// Copies a `T` out of `process` at `address`.
pub fn read_at<T: Copy + Default>(process: &ProcessHandle, address: usize) -> Result<T, IconError> {
    let mut value = T::default();
    unsafe {
        ReadProcessMemory(
            process.raw(),
            address as *const c_void,
            &mut value as *mut T as *mut c_void,
            std::mem::size_of::<T>(),
            None,
        )
    }?;
    Ok(value)
}

pub fn image_path(pid: u32) -> Option<PathBuf> {
    let process = ProcessHandle::open(pid, PROCESS_QUERY_LIMITED_INFORMATION).ok()?;
    let mut buffer = [0u16; MAX_PATH as usize];
    let mut len = buffer.len() as u32;
    unsafe {
        QueryFullProcessImageNameW(
            process.raw(),
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut len,
        )
    }
    .ok()?;
    Some(PathBuf::from(super::from_wide(&buffer[..len as usize])))
}

/// First icon of the executable that runs `pid`.
pub fn exe_icon(pid: u32) -> Option<NativeIcon> {
    let exe = image_path(pid)?;
    shell::extract_icon_pair(&exe, 0)
}
