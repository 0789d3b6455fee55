// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Crate-local test-only mock host for easily running tests in the various
//! modules.
//!
//! Some great features of this mock host:
//!
//! - Full determinism: the clock moves one millisecond per reading, volume
//!   geometry and console size are whatever the test configured.
//! - Waitable timers actually sleep the requested duration, so timing
//!   properties are observable with `std::time::Instant`.
//! - Spawned children are recorded along with a liveness flag, so teardown
//!   behavior can be asserted after the fact.

use std::cell::Cell;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use super::*;
use crate::encoding::{self, WideString};
use crate::winposix::{ChildTracker, DescriptorTable, RawFd, WinPosix};

/// Ticks between the host epoch (1601) and the POSIX epoch (1970).
pub(crate) const UNIX_EPOCH_FILETIME: u64 = 11_644_473_600 * 10_000_000;

/// Which stage of the waitable-timer sequence should be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerStage {
    Create,
    Arm,
    Wait,
}

pub(crate) struct MockHost {
    clock: AtomicU64,
    files: RwLock<HashMap<String, Arc<RwLock<Vec<u8>>>>>,
    geometry: Option<DiskGeometry>,
    console: Option<ConsoleSize>,
    console_detached: AtomicBool,
    /// module path -> exported symbol -> fake address
    modules: HashMap<String, HashMap<String, usize>>,
    invocation: Vec<u16>,
    fail_timer: Option<TimerStage>,
    pub(crate) timer_waits: Mutex<Vec<Duration>>,
    pub(crate) sleeps_ms: Mutex<Vec<u64>>,
    fail_spawn: Option<HostError>,
    next_pid: AtomicU32,
    pub(crate) spawned: Mutex<Vec<SpawnRecord>>,
}

pub(crate) struct SpawnRecord {
    pub(crate) command_line: String,
    pub(crate) stdio: (usize, usize, usize),
    pub(crate) flags: u32,
    pub(crate) alive: Arc<AtomicBool>,
}

impl MockHost {
    pub(crate) fn new() -> Self {
        MockHost {
            clock: AtomicU64::new(UNIX_EPOCH_FILETIME + 1_000_000_000 * 10_000_000),
            files: RwLock::new(HashMap::new()),
            geometry: Some(DiskGeometry {
                sectors_per_cluster: 8,
                bytes_per_sector: 512,
                free_clusters: 100,
                total_clusters: 1000,
            }),
            console: Some(ConsoleSize {
                width: 85,
                height: 40,
            }),
            console_detached: AtomicBool::new(false),
            modules: HashMap::new(),
            invocation: "C:\\Program Files\\winposix\\shimmed.exe"
                .encode_utf16()
                .collect(),
            fail_timer: None,
            timer_waits: Mutex::new(Vec::new()),
            sleeps_ms: Mutex::new(Vec::new()),
            fail_spawn: None,
            next_pid: AtomicU32::new(4000),
            spawned: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_clock_base(mut self, filetime: u64) -> Self {
        self.clock = AtomicU64::new(filetime);
        self
    }

    pub(crate) fn with_geometry(mut self, geometry: DiskGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub(crate) fn without_volume(mut self) -> Self {
        self.geometry = None;
        self
    }

    pub(crate) fn with_console(mut self, width: i16, height: i16) -> Self {
        self.console = Some(ConsoleSize { width, height });
        self
    }

    pub(crate) fn without_console(mut self) -> Self {
        self.console = None;
        self
    }

    pub(crate) fn with_module(mut self, path: &str, symbols: &[(&str, usize)]) -> Self {
        self.modules.insert(
            path.to_string(),
            symbols
                .iter()
                .map(|&(name, addr)| (name.to_string(), addr))
                .collect(),
        );
        self
    }

    pub(crate) fn with_invocation_path(mut self, path: &str) -> Self {
        self.invocation = path.encode_utf16().collect();
        self
    }

    pub(crate) fn with_invocation_units(mut self, units: Vec<u16>) -> Self {
        self.invocation = units;
        self
    }

    pub(crate) fn with_file(self, path: &str, contents: &[u8]) -> Self {
        self.files
            .write()
            .unwrap()
            .insert(path.to_string(), Arc::new(RwLock::new(contents.to_vec())));
        self
    }

    pub(crate) fn failing_timer(mut self, stage: TimerStage) -> Self {
        self.fail_timer = Some(stage);
        self
    }

    pub(crate) fn failing_spawn(mut self, code: HostError) -> Self {
        self.fail_spawn = Some(code);
        self
    }

    /// Since this is used entirely for tests, leaking a bit of memory is
    /// perfectly fine in order to give ourselves a statically lived host
    /// easily.
    pub(crate) fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    pub(crate) fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .map(|data| data.read().unwrap().clone())
    }

    pub(crate) fn console_detached(&self) -> bool {
        self.console_detached.load(Ordering::SeqCst)
    }
}

impl Provider for MockHost {}

impl ClockProvider for MockHost {
    fn current_time(&self) -> FileTime {
        // One millisecond per reading keeps consecutive readings distinct
        // and strictly increasing.
        FileTime(self.clock.fetch_add(10_000, Ordering::SeqCst))
    }
}

pub(crate) struct MockTimer {
    due_100ns: Cell<Option<i64>>,
}

impl TimerProvider for MockHost {
    type WaitableTimer = MockTimer;

    fn create_waitable_timer(&self) -> Result<MockTimer, TimerError> {
        if self.fail_timer == Some(TimerStage::Create) {
            return Err(TimerError::CreateFailed);
        }
        Ok(MockTimer {
            due_100ns: Cell::new(None),
        })
    }

    fn arm(&self, timer: &MockTimer, delay_100ns: i64) -> Result<(), TimerError> {
        if self.fail_timer == Some(TimerStage::Arm) {
            return Err(TimerError::ArmFailed);
        }
        timer.due_100ns.set(Some(delay_100ns));
        Ok(())
    }

    fn wait(&self, timer: &MockTimer) -> Result<(), TimerError> {
        if self.fail_timer == Some(TimerStage::Wait) {
            return Err(TimerError::WaitFailed);
        }
        let Some(due) = timer.due_100ns.get() else {
            return Err(TimerError::WaitFailed);
        };
        let duration = Duration::from_nanos(due.unsigned_abs() * 100);
        self.timer_waits.lock().unwrap().push(duration);
        std::thread::sleep(duration);
        Ok(())
    }

    fn sleep_ms(&self, milliseconds: u64) {
        self.sleeps_ms.lock().unwrap().push(milliseconds);
    }
}

impl VolumeProvider for MockHost {
    const MAX_PATH: u64 = 260;

    fn disk_free_space(&self, _path: &str) -> Result<DiskGeometry, HostError> {
        // 3 is ERROR_PATH_NOT_FOUND, the usual failure for a bogus root.
        self.geometry.ok_or(HostError(3))
    }
}

impl ModuleProvider for MockHost {
    type Module = String;

    fn load_module(&self, path: &str) -> Option<String> {
        self.modules.contains_key(path).then(|| path.to_string())
    }

    fn unload_module(&self, _module: String) {}

    fn resolve_symbol(
        &self,
        module: &String,
        symbol: &str,
    ) -> Option<core::ptr::NonNull<core::ffi::c_void>> {
        let addr = *self.modules.get(module)?.get(symbol)?;
        core::ptr::NonNull::new(addr as *mut core::ffi::c_void)
    }
}

/// A byte stream over one entry of the mock file table.
pub(crate) struct MockFile {
    data: Arc<RwLock<Vec<u8>>>,
    pos: u64,
}

impl io::Read for MockFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.read().unwrap();
        let pos = usize::try_from(self.pos).unwrap_or(usize::MAX);
        let available = data.len().saturating_sub(pos);
        let len = available.min(buf.len());
        buf[..len].copy_from_slice(&data[pos..pos + len]);
        self.pos += len as u64;
        Ok(len)
    }
}

impl io::Write for MockFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.write().unwrap();
        let pos = usize::try_from(self.pos).expect("mock file position overflow");
        if data.len() < pos {
            data.resize(pos, 0);
        }
        let end = pos + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[pos..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for MockFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let len = self.data.read().unwrap().len() as i64;
        let target = match pos {
            io::SeekFrom::Start(n) => i64::try_from(n).unwrap_or(i64::MAX),
            io::SeekFrom::End(n) => len + n,
            io::SeekFrom::Current(n) => self.pos as i64 + n,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of mock file",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

impl FileProvider for MockHost {
    type File = MockFile;

    fn open_wide(&self, path: &WideString, mode: OpenMode) -> Result<MockFile, HostError> {
        // 123 is ERROR_INVALID_NAME.
        let path = encoding::utf16_to_utf8(path.as_units()).or(Err(HostError(123)))?;
        let mut files = self.files.write().unwrap();
        match mode {
            OpenMode::Read => {
                // 2 is ERROR_FILE_NOT_FOUND.
                let data = files.get(&path).ok_or(HostError(2))?;
                Ok(MockFile {
                    data: Arc::clone(data),
                    pos: 0,
                })
            }
            OpenMode::Write => {
                let data = Arc::new(RwLock::new(Vec::new()));
                files.insert(path, Arc::clone(&data));
                Ok(MockFile { data, pos: 0 })
            }
            OpenMode::Append => {
                let data = Arc::clone(
                    files
                        .entry(path)
                        .or_insert_with(|| Arc::new(RwLock::new(Vec::new()))),
                );
                let pos = data.read().unwrap().len() as u64;
                Ok(MockFile { data, pos })
            }
        }
    }
}

impl ConsoleProvider for MockHost {
    fn screen_buffer_size(&self) -> Option<ConsoleSize> {
        if self.console_detached() {
            return None;
        }
        self.console
    }

    fn detach_console(&self) {
        self.console_detached.store(true, Ordering::SeqCst);
    }
}

/// A mock child handle. Dropping it only releases the handle; the recorded
/// liveness flag stays with the host so tests can observe termination.
pub(crate) struct MockChild {
    pub(crate) pid: u32,
    alive: Arc<AtomicBool>,
}

impl ProcessProvider for MockHost {
    type ProcessHandle = MockChild;
    type StreamHandle = usize;

    fn create_process(
        &self,
        command_line: &WideString,
        stdio: StdStreams<usize>,
        flags: u32,
    ) -> Result<SpawnedChild<MockChild>, HostError> {
        if let Some(code) = self.fail_spawn {
            return Err(code);
        }
        let command_line =
            encoding::utf16_to_utf8(command_line.as_units()).or(Err(HostError(123)))?;
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let alive = Arc::new(AtomicBool::new(true));
        self.spawned.lock().unwrap().push(SpawnRecord {
            command_line,
            stdio: (stdio.stdin, stdio.stdout, stdio.stderr),
            flags,
            alive: Arc::clone(&alive),
        });
        Ok(SpawnedChild {
            handle: MockChild { pid, alive },
            pid,
        })
    }

    fn terminate_process(&self, handle: &MockChild) {
        handle.alive.store(false, Ordering::SeqCst);
    }
}

impl InvocationProvider for MockHost {
    fn invocation_path(&self) -> WideString {
        WideString::from_units(self.invocation.clone())
    }
}

/// A child tracker that accepts every child and immediately forgets it.
pub(crate) struct DiscardTracker;

impl ChildTracker<MockHost> for DiscardTracker {
    fn register_child(&self, handle: MockChild, _pid: u32) -> Result<(), MockChild> {
        drop(handle);
        Ok(())
    }
}

/// Descriptor translation that maps each descriptor to itself.
pub(crate) struct IdentityDescriptors;

impl DescriptorTable<MockHost> for IdentityDescriptors {
    fn native_handle(&self, fd: RawFd) -> usize {
        fd.unsigned_abs() as usize
    }
}

/// Convenience constructor for a shim over a leaked mock host.
pub(crate) fn shim(
    host: &'static MockHost,
) -> WinPosix<MockHost, DiscardTracker, IdentityDescriptors> {
    WinPosix::new(host, DiscardTracker, IdentityDescriptors)
}
