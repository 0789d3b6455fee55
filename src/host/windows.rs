// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The real Windows host, implemented over `windows-sys` and `std`.

use std::ffi::{c_void, OsString};
use std::io;
use std::os::windows::ffi::OsStringExt;
use std::ptr::{null, null_mut, NonNull};

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_INSUFFICIENT_BUFFER, HANDLE, HMODULE, WAIT_OBJECT_0,
};
use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceW;
use windows_sys::Win32::System::Console::{
    FreeConsole, GetConsoleScreenBufferInfo, GetStdHandle, CONSOLE_SCREEN_BUFFER_INFO,
    STD_OUTPUT_HANDLE,
};
use windows_sys::Win32::System::LibraryLoader::{
    FreeLibrary, GetModuleFileNameW, GetProcAddress, LoadLibraryW,
};
use windows_sys::Win32::System::SystemInformation::GetSystemTimeAsFileTime;
use windows_sys::Win32::System::Threading::{
    CreateProcessW, CreateWaitableTimerW, SetWaitableTimer, Sleep, TerminateProcess,
    WaitForSingleObject, INFINITE, PROCESS_INFORMATION, STARTF_USESTDHANDLES, STARTUPINFOW,
};

use super::*;
use crate::encoding::WideString;

/// Host backed directly by the Win32 API. Stateless; one leaked instance
/// serves the whole process.
pub struct WindowsHost {
    _private: (),
}

impl WindowsHost {
    pub fn new() -> &'static Self {
        &WindowsHost { _private: () }
    }
}

impl Provider for WindowsHost {}

impl ClockProvider for WindowsHost {
    fn current_time(&self) -> FileTime {
        let mut raw = windows_sys::Win32::Foundation::FILETIME {
            dwLowDateTime: 0,
            dwHighDateTime: 0,
        };
        // SAFETY: `raw` is a valid FILETIME for the call to write into.
        unsafe { GetSystemTimeAsFileTime(&mut raw) };
        FileTime((u64::from(raw.dwHighDateTime) << 32) | u64::from(raw.dwLowDateTime))
    }
}

/// Owned waitable-timer handle, closed on drop.
pub struct WaitableTimer(HANDLE);

impl Drop for WaitableTimer {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by CreateWaitableTimerW and is
        // closed exactly once.
        unsafe { CloseHandle(self.0) };
    }
}

impl TimerProvider for WindowsHost {
    type WaitableTimer = WaitableTimer;

    fn create_waitable_timer(&self) -> Result<WaitableTimer, TimerError> {
        // SAFETY: all-null arguments request an anonymous manual-reset timer.
        let handle = unsafe { CreateWaitableTimerW(null(), 1, null()) };
        if handle.is_null() {
            return Err(TimerError::CreateFailed);
        }
        Ok(WaitableTimer(handle))
    }

    fn arm(&self, timer: &WaitableTimer, delay_100ns: i64) -> Result<(), TimerError> {
        // Negative due time means relative to now.
        let due = -delay_100ns;
        // SAFETY: the timer handle is live for the duration of the call and
        // `due` outlives it.
        let ok = unsafe { SetWaitableTimer(timer.0, &due, 0, None, null(), 0) };
        if ok == 0 {
            return Err(TimerError::ArmFailed);
        }
        Ok(())
    }

    fn wait(&self, timer: &WaitableTimer) -> Result<(), TimerError> {
        // SAFETY: the timer handle is live for the duration of the call.
        let status = unsafe { WaitForSingleObject(timer.0, INFINITE) };
        if status != WAIT_OBJECT_0 {
            return Err(TimerError::WaitFailed);
        }
        Ok(())
    }

    fn sleep_ms(&self, milliseconds: u64) {
        let clamped = u32::try_from(milliseconds).unwrap_or(u32::MAX);
        // SAFETY: Sleep has no memory preconditions.
        unsafe { Sleep(clamped) };
    }
}

impl VolumeProvider for WindowsHost {
    const MAX_PATH: u64 = windows_sys::Win32::Foundation::MAX_PATH as u64;

    fn disk_free_space(&self, path: &str) -> Result<DiskGeometry, HostError> {
        let path = WideString::from(path);
        let mut geometry = DiskGeometry {
            sectors_per_cluster: 0,
            bytes_per_sector: 0,
            free_clusters: 0,
            total_clusters: 0,
        };
        // SAFETY: the path is NUL-terminated and the out-pointers are valid.
        let ok = unsafe {
            GetDiskFreeSpaceW(
                path.as_units_with_nul().as_ptr(),
                &mut geometry.sectors_per_cluster,
                &mut geometry.bytes_per_sector,
                &mut geometry.free_clusters,
                &mut geometry.total_clusters,
            )
        };
        if ok == 0 {
            // SAFETY: reading the calling thread's last-error value.
            return Err(HostError(unsafe { GetLastError() }));
        }
        Ok(geometry)
    }
}

/// Owned loaded-module handle. Release is explicit through
/// [`ModuleProvider::unload_module`] to mirror the dlopen/dlclose pairing.
pub struct Module(HMODULE);

impl ModuleProvider for WindowsHost {
    type Module = Module;

    fn load_module(&self, path: &str) -> Option<Module> {
        let path = WideString::from(path);
        // SAFETY: the path is NUL-terminated UTF-16.
        let handle = unsafe { LoadLibraryW(path.as_units_with_nul().as_ptr()) };
        if handle.is_null() {
            return None;
        }
        Some(Module(handle))
    }

    fn unload_module(&self, module: Module) {
        // SAFETY: the handle came from LoadLibraryW and is released once.
        unsafe { FreeLibrary(module.0) };
    }

    fn resolve_symbol(&self, module: &Module, symbol: &str) -> Option<NonNull<c_void>> {
        let mut name: Vec<u8> = symbol.bytes().collect();
        name.push(0);
        // SAFETY: the module handle is live and the name is NUL-terminated.
        let farproc = unsafe { GetProcAddress(module.0, name.as_ptr()) };
        NonNull::new(farproc? as usize as *mut c_void)
    }
}

impl FileProvider for WindowsHost {
    type File = std::fs::File;

    fn open_wide(&self, path: &WideString, mode: OpenMode) -> Result<std::fs::File, HostError> {
        let path = OsString::from_wide(path.as_units());
        let mut options = std::fs::OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
        };
        options
            .open(&path)
            .map_err(|err| HostError(os_error_code(&err)))
    }
}

fn os_error_code(err: &io::Error) -> u32 {
    err.raw_os_error().map(|code| code as u32).unwrap_or(0)
}

impl ConsoleProvider for WindowsHost {
    fn screen_buffer_size(&self) -> Option<ConsoleSize> {
        // SAFETY: CONSOLE_SCREEN_BUFFER_INFO is plain data, so a zeroed
        // value is valid for the call to fill in.
        let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { core::mem::zeroed() };
        // SAFETY: GetStdHandle needs no preconditions; a bad handle makes
        // GetConsoleScreenBufferInfo fail rather than fault.
        let ok = unsafe { GetConsoleScreenBufferInfo(GetStdHandle(STD_OUTPUT_HANDLE), &mut info) };
        if ok == 0 {
            return None;
        }
        Some(ConsoleSize {
            width: info.dwSize.X,
            height: info.dwSize.Y,
        })
    }

    fn detach_console(&self) {
        // SAFETY: no preconditions; failure just means there was no console.
        unsafe { FreeConsole() };
    }
}

/// Owned process handle, closed on drop.
pub struct ProcessHandle(HANDLE);

// SAFETY: process handles are process-wide tokens, not thread-affine.
unsafe impl Send for ProcessHandle {}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateProcessW and is closed once.
        unsafe { CloseHandle(self.0) };
    }
}

impl ProcessProvider for WindowsHost {
    type ProcessHandle = ProcessHandle;
    type StreamHandle = HANDLE;

    fn create_process(
        &self,
        command_line: &WideString,
        stdio: StdStreams<HANDLE>,
        flags: u32,
    ) -> Result<SpawnedChild<ProcessHandle>, HostError> {
        // CreateProcessW may rewrite the buffer in place.
        let mut command_line = command_line.as_units_with_nul().to_vec();

        // SAFETY: STARTUPINFOW is plain data; unset fields stay zero.
        let mut startup: STARTUPINFOW = unsafe { core::mem::zeroed() };
        startup.cb = core::mem::size_of::<STARTUPINFOW>() as u32;
        startup.dwFlags = STARTF_USESTDHANDLES;
        startup.hStdInput = stdio.stdin;
        startup.hStdOutput = stdio.stdout;
        startup.hStdError = stdio.stderr;

        // SAFETY: PROCESS_INFORMATION is plain data for the call to fill in.
        let mut info: PROCESS_INFORMATION = unsafe { core::mem::zeroed() };

        // SAFETY: the command line is a NUL-terminated mutable buffer and
        // both structs are valid for the duration of the call.
        let ok = unsafe {
            CreateProcessW(
                null(),
                command_line.as_mut_ptr(),
                null(),
                null(),
                1,
                flags,
                null(),
                null(),
                &startup,
                &mut info,
            )
        };
        if ok == 0 {
            // SAFETY: reading the calling thread's last-error value.
            return Err(HostError(unsafe { GetLastError() }));
        }

        // Only the process handle is kept; the primary-thread handle has no
        // further use.
        // SAFETY: hThread came from CreateProcessW and is closed once.
        unsafe { CloseHandle(info.hThread) };

        Ok(SpawnedChild {
            handle: ProcessHandle(info.hProcess),
            pid: info.dwProcessId,
        })
    }

    fn terminate_process(&self, handle: &ProcessHandle) {
        // SAFETY: the process handle is live; exit code 0 by convention.
        unsafe { TerminateProcess(handle.0, 0) };
    }
}

impl InvocationProvider for WindowsHost {
    fn invocation_path(&self) -> WideString {
        let mut buffer = vec![0u16; 256];
        loop {
            // SAFETY: the buffer is writable for its full length.
            let written =
                unsafe { GetModuleFileNameW(null_mut(), buffer.as_mut_ptr(), buffer.len() as u32) };
            let truncated =
                written as usize >= buffer.len()
                    // SAFETY: reading the calling thread's last-error value.
                    || unsafe { GetLastError() } == ERROR_INSUFFICIENT_BUFFER;
            if written > 0 && !truncated {
                buffer.truncate(written as usize);
                return WideString::from_units(buffer);
            }
            if buffer.len() >= 1 << 16 {
                // Give up on pathological paths; an empty path maps to the
                // current-directory fallback downstream.
                return WideString::from_units(Vec::new());
            }
            buffer.resize(buffer.len() * 2, 0);
        }
    }
}
