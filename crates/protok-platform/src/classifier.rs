//! Platform classifiers for protoc-style binary artifacts.
//!
//! Release coordinates carry a `<os>-<arch>` classifier; this module maps
//! the detected host onto the classifiers that actually exist in the
//! protobuf release train.

use protok_util::errors::{ProtokError, ProtokResult};

use crate::host::{CpuArch, HostSystem, OperatingSystem};

/// Map (os, arch) to the artifact classifier for `artifact_id`.
///
/// Pure function of the host: repeated calls return the same string.
/// Windows on aarch64 has no native protoc build and falls back to the
/// x86_64 binary, which runs under emulation.
pub fn platform_classifier(host: &HostSystem, artifact_id: &str) -> ProtokResult<String> {
    let classifier = match (host.os(), host.cpu_arch()) {
        (OperatingSystem::Linux, CpuArch::X86_64) => "linux-x86_64",
        (OperatingSystem::Linux, CpuArch::Aarch64) => "linux-aarch_64",
        (OperatingSystem::Linux, CpuArch::S390x) => "linux-s390_64",
        (OperatingSystem::Linux, CpuArch::Ppc64le) => "linux-ppcle_64",
        (OperatingSystem::MacOs, CpuArch::X86_64) => "osx-x86_64",
        (OperatingSystem::MacOs, CpuArch::Aarch64) => "osx-aarch_64",
        (OperatingSystem::Windows, CpuArch::X86_64) => "windows-x86_64",
        (OperatingSystem::Windows, CpuArch::X86_32) => "windows-x86_32",
        (OperatingSystem::Windows, CpuArch::Aarch64) => "windows-x86_64",
        (os, arch) => {
            return Err(ProtokError::Resolution {
                message: format!(
                    "no {artifact_id} binary is published for {os:?}/{arch:?}"
                ),
            }
            .into())
        }
    };
    Ok(classifier.to_string())
}
