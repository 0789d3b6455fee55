// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Dynamic-loading operations in the shape of `dlopen`/`dlsym`/`dlclose`.

use core::ffi::c_void;
use core::ptr::NonNull;

use tracing::debug;

use crate::host::{ModuleProvider as _, Provider};
use crate::winposix::WinPosix;

impl<Host: Provider, Children, Descriptors> WinPosix<Host, Children, Descriptors> {
    /// Loads the module at `path`, or `None` if the host cannot.
    pub fn dlopen(&self, path: &str) -> Option<Host::Module> {
        let module = self.host.load_module(path);
        if module.is_none() {
            debug!(path, "module load failed");
        }
        module
    }

    /// Releases a module obtained from [`Self::dlopen`].
    pub fn dlclose(&self, module: Host::Module) {
        self.host.unload_module(module);
    }

    /// Resolves an exported symbol by name from a loaded module.
    pub fn dlsym(&self, module: &Host::Module, symbol: &str) -> Option<NonNull<c_void>> {
        self.host.resolve_symbol(module, symbol)
    }
}
