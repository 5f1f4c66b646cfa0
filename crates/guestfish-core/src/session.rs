//! The session handle and its one-shot launcher.

use crate::backend::{Backend, BackendResult};

/// Settings resolved from the command line before the shell starts.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Verbosity level handed to the backend.
    pub verbose: u32,
    /// Sync disks when the handle is closed.
    pub autosync: bool,
    /// Program used to format long help text. `None` prints it raw.
    pub help_filter: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            autosync: true,
            help_filter: Some("pod2text".to_string()),
        }
    }
}

/// A backend handle plus the state the shell tracks about it.
///
/// There is one session per process. `launched` only ever goes from false
/// to true.
#[derive(Debug)]
pub struct Session<B> {
    backend: B,
    launched: bool,
    verbose: u32,
    autosync: bool,
}

impl<B: Backend> Session<B> {
    /// Wrap a freshly created backend. Autosync starts enabled.
    pub fn new(mut backend: B) -> BackendResult<Self> {
        backend.set_autosync(true)?;
        Ok(Self {
            backend,
            launched: false,
            verbose: 0,
            autosync: true,
        })
    }

    /// Start the backend and wait for it, once.
    ///
    /// Later calls are no-ops. A failed start or wait leaves the session
    /// unlaunched so the caller may retry.
    pub fn launch(&mut self) -> BackendResult<()> {
        if self.launched {
            tracing::debug!("launch: already launched");
            return Ok(());
        }
        self.backend.launch()?;
        self.backend.wait_ready()?;
        self.launched = true;
        tracing::info!("backend launched and ready");
        Ok(())
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    pub fn verbose(&self) -> u32 {
        self.verbose
    }

    pub fn set_verbose(&mut self, level: u32) -> BackendResult<()> {
        self.backend.set_verbose(level)?;
        self.verbose = level;
        Ok(())
    }

    pub fn autosync(&self) -> bool {
        self.autosync
    }

    pub fn set_autosync(&mut self, autosync: bool) -> BackendResult<()> {
        self.backend.set_autosync(autosync)?;
        self.autosync = autosync;
        Ok(())
    }

    pub fn add_drive(&mut self, path: &str) -> BackendResult<()> {
        self.backend.add_drive(path)
    }

    pub fn add_cdrom(&mut self, path: &str) -> BackendResult<()> {
        self.backend.add_cdrom(path)
    }

    pub fn mount(&mut self, device: &str, mountpoint: &str) -> BackendResult<()> {
        self.backend.mount(device, mountpoint)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A backend that records every call, for ordering tests.

    use crate::backend::{Backend, BackendError, BackendResult};

    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        pub calls: Vec<String>,
        pub fail_launch: usize,
        pub fail_wait: usize,
        pub fail_mount: Option<String>,
        pub fail_add: bool,
    }

    impl Backend for RecordingBackend {
        fn launch(&mut self) -> BackendResult<()> {
            self.calls.push("launch".into());
            if self.fail_launch > 0 {
                self.fail_launch -= 1;
                return Err(BackendError::LaunchFailed("injected".into()));
            }
            Ok(())
        }

        fn wait_ready(&mut self) -> BackendResult<()> {
            self.calls.push("wait_ready".into());
            if self.fail_wait > 0 {
                self.fail_wait -= 1;
                return Err(BackendError::NotReady("injected".into()));
            }
            Ok(())
        }

        fn add_drive(&mut self, path: &str) -> BackendResult<()> {
            self.calls.push(format!("add_drive {path}"));
            if self.fail_add {
                return Err(BackendError::NoSuchFile(path.into()));
            }
            Ok(())
        }

        fn add_cdrom(&mut self, path: &str) -> BackendResult<()> {
            self.calls.push(format!("add_cdrom {path}"));
            Ok(())
        }

        fn mount(&mut self, device: &str, mountpoint: &str) -> BackendResult<()> {
            self.calls.push(format!("mount {device} {mountpoint}"));
            if self.fail_mount.as_deref() == Some(device) {
                return Err(BackendError::NoSuchDevice(device.into()));
            }
            Ok(())
        }

        fn set_autosync(&mut self, autosync: bool) -> BackendResult<()> {
            self.calls.push(format!("set_autosync {autosync}"));
            Ok(())
        }

        fn set_verbose(&mut self, level: u32) -> BackendResult<()> {
            self.calls.push(format!("set_verbose {level}"));
            Ok(())
        }
    }

    impl RecordingBackend {
        /// Calls other than the autosync/verbose setters.
        pub fn operations(&self) -> Vec<&str> {
            self.calls
                .iter()
                .map(String::as_str)
                .filter(|c| !c.starts_with("set_"))
                .collect()
        }
    }
}
