use std::fmt;
use std::ptr;
use std::sync::Arc;

use log::trace;

use super::ffi::{IPLerror, IPLhandle, PhononApi, ReleaseFn, IPL_STATUS_SUCCESS};
use crate::error::{AcousticsError, AcousticsResult};

/// An engine object that is released when dropped.
///
/// Each handle keeps the entry point table alive, so the library cannot be
/// unloaded while objects created from it still exist.
pub struct EngineHandle {
    raw: IPLhandle,
    release: ReleaseFn,
    kind: &'static str,
    _api: Arc<PhononApi>,
}

impl EngineHandle {
    /// Runs an engine constructor and takes ownership of what it produced.
    ///
    /// `create` receives the out-pointer; a non-success status or a null
    /// result becomes [`AcousticsError::Engine`].
    pub fn create(
        api: &Arc<PhononApi>,
        kind: &'static str,
        release: ReleaseFn,
        create: impl FnOnce(*mut IPLhandle) -> IPLerror,
    ) -> AcousticsResult<Self> {
        let mut raw: IPLhandle = ptr::null_mut();
        let status = create(&mut raw);
        if status != IPL_STATUS_SUCCESS || raw.is_null() {
            if !raw.is_null() {
                // SAFETY: the engine handed us an object despite failing.
                unsafe { release(&mut raw) };
            }
            return Err(AcousticsError::Engine {
                call: kind,
                status,
            });
        }
        trace!("created {kind} {raw:p}");
        Ok(Self {
            raw,
            release,
            kind,
            _api: Arc::clone(api),
        })
    }

    pub fn raw(&self) -> IPLhandle {
        self.raw
    }
}

// SAFETY: engine objects are not tied to the thread that created them.
unsafe impl Send for EngineHandle {}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineHandle({} {:p})", self.kind, self.raw)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        trace!("releasing {} {:p}", self.kind, self.raw);
        // SAFETY: `raw` came from the matching constructor and is released once.
        unsafe { (self.release)(&mut self.raw) };
        self.raw = ptr::null_mut();
    }
}
