//! Host platform detection.

/// The two families of process-creation behavior this crate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Unix-like hosts: `/bin/sh`, `:` path lists, case-sensitive env.
    Posix,
    /// Windows hosts: `cmd.exe`, `;` path lists, case-insensitive env.
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Separator used to join path-list environment values.
    pub fn path_list_separator(&self) -> &'static str {
        match self {
            Platform::Posix => ":",
            Platform::Windows => ";",
        }
    }

    /// Whether environment variable names compare case-insensitively.
    pub fn env_case_insensitive(&self) -> bool {
        matches!(self, Platform::Windows)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        assert_eq!(Platform::Posix.path_list_separator(), ":");
        assert_eq!(Platform::Windows.path_list_separator(), ";");
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(!Platform::Posix.env_case_insensitive());
        assert!(Platform::Windows.env_case_insensitive());
    }

    #[test]
    #[cfg(unix)]
    fn test_current_is_posix() {
        assert_eq!(Platform::current(), Platform::Posix);
    }
}
