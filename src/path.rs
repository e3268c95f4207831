//! Platform-aware conversion of input paths for the renderer.

/// Operating system family the renderer runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Windows,
    Other,
}

impl PlatformFamily {
    /// Family of the host this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            PlatformFamily::Windows
        } else {
            PlatformFamily::Other
        }
    }
}

/// Windows builds of the renderer only open local files given as `file:///` URIs.
pub fn normalize(path: &str, family: PlatformFamily) -> String {
    match family {
        PlatformFamily::Windows => format!("file:///{}", path.replace('\\', "/")),
        PlatformFamily::Other => path.to_string(),
    }
}
