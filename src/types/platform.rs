/// The host platform an asset must match.
///
/// Carried explicitly (rather than read from `std::env::consts` at the point
/// of use) so asset selection is testable for any os/arch pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// The platform of the running host. `std::env::consts::ARCH` reports
    /// `x86_64`/`x86`; release assets tend to use the Go-style `amd64`/`386`
    /// spelling, which is what the variation tables are keyed on.
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Name variations an asset may use for this OS. An OS outside the
    /// variation tables matches only its own name.
    pub fn os_variations(&self) -> Vec<&str> {
        match self.os.as_str() {
            "darwin" => vec!["darwin", "macos", "osx"],
            "windows" => vec!["windows", "win"],
            "linux" => vec!["linux"],
            other => vec![other],
        }
    }

    /// Name variations an asset may use for this architecture.
    pub fn arch_variations(&self) -> Vec<&str> {
        match self.arch.as_str() {
            "amd64" => vec!["amd64", "x86_64", "x64"],
            "386" => vec!["i386", "i686", "386"],
            "arm64" => vec!["arm64", "aarch64"],
            "arm" => vec!["arm", "armv7"],
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn darwin_variations_include_osx() {
        let p = Platform::new("darwin", "arm64");
        assert!(p.os_variations().contains(&"osx"));
        assert!(p.arch_variations().contains(&"aarch64"));
    }

    #[test]
    fn amd64_variations_include_x86_64() {
        let p = Platform::new("linux", "amd64");
        assert_eq!(p.os_variations(), vec!["linux"]);
        assert!(p.arch_variations().contains(&"x86_64"));
    }

    #[test]
    fn unknown_host_matches_only_its_own_name() {
        let p = Platform::new("freebsd", "riscv64");
        assert_eq!(p.os_variations(), vec!["freebsd"]);
        assert_eq!(p.arch_variations(), vec!["riscv64"]);
    }
}
