//! Platform detection and release archive URLs

use crate::core::config::MirrorConfig;
use crate::core::PipelineError;
use crate::toolchain::{Release, ReleaseVersion, ToolKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
}

/// An OS/architecture pair we know how to download runtimes for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Map Rust's `std::env::consts` names onto a supported platform
    pub fn detect(os: &str, arch: &str) -> Result<Self, PipelineError> {
        let unsupported = || PipelineError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_kind = match os {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Arm64,
            _ => return Err(unsupported()),
        };

        Ok(Self {
            os: os_kind,
            arch: arch_kind,
        })
    }

    /// The platform this binary runs on
    pub fn current() -> Result<Self, PipelineError> {
        Self::detect(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Download URL of the archive for `release` on this platform
    pub fn archive_url(&self, release: &Release, mirrors: &MirrorConfig) -> String {
        match (release.kind, &release.version) {
            (ToolKind::Node, version) => {
                let os = match self.os {
                    Os::Linux => "linux",
                    Os::MacOs => "darwin",
                };
                let arch = match self.arch {
                    Arch::X64 => "x64",
                    Arch::Arm64 => "arm64",
                };
                let v = version.label();
                format!(
                    "{}/v{v}/node-v{v}-{os}-{arch}.tar.gz",
                    mirrors.node.trim_end_matches('/')
                )
            }
            (ToolKind::Java, version) => {
                let os = match self.os {
                    Os::Linux => "linux",
                    Os::MacOs => "mac",
                };
                let arch = match self.arch {
                    Arch::X64 => "x64",
                    Arch::Arm64 => "aarch64",
                };
                format!(
                    "{}/binary/latest/{}/ga/{os}/{arch}/jdk/hotspot/normal/eclipse",
                    mirrors.java.trim_end_matches('/'),
                    version.label()
                )
            }
            (ToolKind::Parlay, version) => {
                let os = match self.os {
                    Os::Linux => "Linux",
                    Os::MacOs => "Darwin",
                };
                let arch = match self.arch {
                    Arch::X64 => "x86_64",
                    Arch::Arm64 => "arm64",
                };
                let root = mirrors.parlay.trim_end_matches('/');
                let asset = format!("parlay_{os}_{arch}.tar.gz");
                match version {
                    ReleaseVersion::Latest => format!("{root}/latest/download/{asset}"),
                    other => format!("{root}/download/v{}/{asset}", other.label()),
                }
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            Os::Linux => "linux",
            Os::MacOs => "macos",
        };
        let arch = match self.arch {
            Arch::X64 => "x86_64",
            Arch::Arm64 => "aarch64",
        };
        write!(f, "{}/{}", os, arch)
    }
}
