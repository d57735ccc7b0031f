use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use regex::Regex;
use sysinfo::System;

use crate::error::{Error, Result};

pub const METADATA_FILE: &str = "meta.yaml";

const SIZE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// A snapshot of the machine the benchmarks ran on.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Metadata {
    pub os_name: String,
    pub node_name: String,
    pub os_release: String,
    pub os_version: String,
    pub machine_hw: String,
    pub python_version: String,
    pub cuda_version: Option<String>,
    pub num_gpus: usize,
    /// `[device name, total memory]` per GPU.
    pub gpu_info: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDevice {
    pub name: String,
    pub memory_bytes: u64,
}

impl Metadata {
    /// Queries the host and its GPUs. Fails if no GPU can be found.
    pub fn collect() -> Result<Self> {
        let gpus = query_gpus()?;
        Ok(Metadata {
            os_name: System::name().unwrap_or_default(),
            node_name: System::host_name().unwrap_or_default(),
            os_release: System::kernel_version().unwrap_or_default(),
            os_version: System::os_version().unwrap_or_default(),
            machine_hw: System::cpu_arch().unwrap_or_else(|| std::env::consts::ARCH.to_string()),
            python_version: query_python_version().unwrap_or_else(|| "unknown".to_string()),
            cuda_version: query_cuda_version(),
            num_gpus: gpus.len(),
            gpu_info: gpus
                .into_iter()
                .map(|gpu| (gpu.name, convert_size(gpu.memory_bytes)))
                .collect(),
        })
    }

    /// Overwrites `path` with this snapshot as YAML.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }
}

/// Collects the host snapshot and writes it to `<results_dir>/meta.yaml`.
pub fn write_metadata(results_dir: &Path) -> Result<PathBuf> {
    let path = results_dir.join(METADATA_FILE);
    Metadata::collect()?.write(&path)?;
    Ok(path)
}

/// Renders a byte count in the largest binary unit that keeps it at or above 1.
pub fn convert_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    // floor(log1024(bytes)), computed exactly.
    let mut exponent = 0;
    let mut threshold: u128 = 1024;
    while exponent < SIZE_UNITS.len() - 1 && u128::from(bytes) >= threshold {
        exponent += 1;
        threshold *= 1024;
    }
    let scaled = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    // Debug formatting keeps a trailing ".0" on whole numbers ("16.0 GB").
    format!("{:?} {}", rounded, SIZE_UNITS[exponent])
}

fn query_gpus() -> Result<Vec<GpuDevice>> {
    let out = Command::new("nvidia-smi")
        .args([
            "--query-gpu=name,memory.total",
            "--format=csv,noheader,nounits",
        ])
        .output()
        .map_err(|e| Error::AcceleratorUnavailable(format!("failed to run nvidia-smi: {}", e)))?;
    if !out.status.success() {
        return Err(Error::AcceleratorUnavailable(format!(
            "nvidia-smi exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_gpu_listing(&String::from_utf8_lossy(&out.stdout))
}

/// Parses `nvidia-smi --query-gpu=name,memory.total --format=csv,noheader,nounits` output.
pub fn parse_gpu_listing(listing: &str) -> Result<Vec<GpuDevice>> {
    let mut gpus = vec![];
    for line in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (name, memory) = line
            .rsplit_once(',')
            .ok_or_else(|| Error::AcceleratorUnavailable(format!("unexpected GPU line {:?}", line)))?;
        let mebibytes: u64 = memory.trim().parse().map_err(|_| {
            Error::AcceleratorUnavailable(format!("unexpected GPU memory {:?}", memory.trim()))
        })?;
        gpus.push(GpuDevice {
            name: name.trim().to_string(),
            memory_bytes: mebibytes * 1024 * 1024,
        });
    }
    if gpus.is_empty() {
        return Err(Error::AcceleratorUnavailable("no GPU devices reported".to_string()));
    }
    Ok(gpus)
}

fn query_cuda_version() -> Option<String> {
    let out = Command::new("nvcc").arg("--version").output().ok()?;
    parse_cuda_version(&String::from_utf8_lossy(&out.stdout))
}

/// Extracts "X.Y" from the `release X.Y` part of `nvcc --version`.
pub fn parse_cuda_version(nvcc_output: &str) -> Option<String> {
    lazy_static! {
        // Example output:
        // Cuda compilation tools, release 12.2, V12.2.140
        static ref RELEASE: Regex = Regex::new(r"release ([[:digit:]]+\.[[:digit:]]+)").unwrap();
    }
    RELEASE
        .captures(nvcc_output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn query_python_version() -> Option<String> {
    let out = Command::new("python3").arg("--version").output().ok()?;
    if !out.status.success() {
        return None;
    }
    // Older interpreters print the version on stderr.
    let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&out.stderr));
    parse_python_version(&text)
}

pub fn parse_python_version(output: &str) -> Option<String> {
    lazy_static! {
        static ref VERSION: Regex = Regex::new(r"Python ([[:digit:]]+(?:\.[[:alnum:]]+)*)").unwrap();
    }
    VERSION
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_convert_size() {
        [
            (0, "0B"),
            (512, "512.0 B"),
            (1024, "1.0 KB"),
            (1536, "1.5 KB"),
            (16 * 1024 * 1024 * 1024, "16.0 GB"),
            (81_920 * 1024 * 1024, "80.0 GB"),
            (85_899_345_920 - 913_000_000, "79.15 GB"),
            (u64::MAX, "16.0 EB"),
        ]
        .map(|(bytes, expected)| assert_eq!(convert_size(bytes), expected));
    }

    #[test]
    fn test_parse_gpu_listing() {
        let listing = "NVIDIA A100-SXM4-80GB, 81920\nTesla V100-SXM2-32GB, 32768\n\n";
        let gpus = parse_gpu_listing(listing).unwrap();
        assert_eq!(
            gpus,
            vec![
                GpuDevice {
                    name: "NVIDIA A100-SXM4-80GB".to_string(),
                    memory_bytes: 81_920 * 1024 * 1024,
                },
                GpuDevice {
                    name: "Tesla V100-SXM2-32GB".to_string(),
                    memory_bytes: 32_768 * 1024 * 1024,
                },
            ]
        );
    }

    #[test]
    fn test_no_gpus_is_fatal() {
        assert!(matches!(
            parse_gpu_listing("\n"),
            Err(Error::AcceleratorUnavailable(_))
        ));
        assert!(matches!(
            parse_gpu_listing("No devices were found"),
            Err(Error::AcceleratorUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_versions() {
        let nvcc = "nvcc: NVIDIA (R) Cuda compiler driver\n\
                    Cuda compilation tools, release 12.2, V12.2.140\n";
        assert_eq!(parse_cuda_version(nvcc), Some("12.2".to_string()));
        assert_eq!(parse_cuda_version("command not found"), None);
        assert_eq!(
            parse_python_version("Python 3.10.12\n"),
            Some("3.10.12".to_string())
        );
    }

    #[test]
    fn test_write_keeps_field_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(METADATA_FILE);
        let meta = Metadata {
            os_name: "Linux".to_string(),
            node_name: "dgx01".to_string(),
            os_release: "5.15.0".to_string(),
            os_version: "22.04".to_string(),
            machine_hw: "x86_64".to_string(),
            python_version: "3.10.12".to_string(),
            cuda_version: Some("12.2".to_string()),
            num_gpus: 1,
            gpu_info: vec![("NVIDIA A100-SXM4-80GB".to_string(), "80.0 GB".to_string())],
        };
        meta.write(&path).unwrap();

        let yaml = fs::read_to_string(&path).unwrap();
        let keys: Vec<&str> = yaml
            .lines()
            .filter(|l| !l.starts_with(' ') && !l.starts_with('-'))
            .filter_map(|l| l.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec![
                "os_name",
                "node_name",
                "os_release",
                "os_version",
                "machine_hw",
                "python_version",
                "cuda_version",
                "num_gpus",
                "gpu_info",
            ]
        );
        assert!(yaml.contains("NVIDIA A100-SXM4-80GB"));
        assert!(yaml.contains("80.0 GB"));
    }
}
