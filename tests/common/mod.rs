use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;

/// A brand working directory, backup drive and directory-backed bucket
/// under one temporary root, with a config file pointing at them.
// Not every test crate touches every tier.
#[allow(dead_code)]
pub struct Workspace {
    _temp: TempDir,
    pub config: PathBuf,
    pub brand_root: PathBuf,
    pub backup_root: PathBuf,
    pub bucket_root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let brand_root = temp.path().join("video-projects/v-appydave");
        let backup_root = temp.path().join("T7/appydave");
        let bucket_root = temp.path().join("bucket");
        for dir in [&brand_root, &backup_root, &bucket_root] {
            fs::create_dir_all(dir).unwrap();
        }

        let config = temp.path().join("brands.json");
        let document = serde_json::json!({
            "brands": {
                "appydave": {
                    "name": "AppyDave",
                    "shortcut": "ad",
                    "locations": {
                        "video_projects": brand_root,
                        "ssd_backup": backup_root,
                    },
                    "aws": {
                        "profile": "appydave",
                        "s3_bucket": format!("file://{}", bucket_root.display()),
                        "s3_prefix": "staging/v-appydave/",
                    },
                },
                "voz": {
                    "name": "VOZ",
                    "locations": { "video_projects": temp.path().join("missing/v-voz") },
                },
            },
        });
        fs::write(&config, serde_json::to_string_pretty(&document).unwrap()).unwrap();

        Workspace {
            _temp: temp,
            config,
            brand_root,
            backup_root,
            bucket_root,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("dam");
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    #[allow(dead_code)]
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run `dam`")
    }

    /// Creates `<brand_root>/<id>` with the given files.
    #[allow(dead_code)]
    pub fn project(&self, id: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let dir = self.brand_root.join(id);
        write_files(&dir, files);
        dir
    }
}

pub fn write_files(dir: &Path, files: &[(&str, &[u8])]) {
    fs::create_dir_all(dir).unwrap();
    for (rel, content) in files {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

// Each integration test file is compiled as its own crate; not all of them
// read the fingerprint line.
#[allow(dead_code)]
pub fn extract_fingerprint(stdout: &[u8]) -> String {
    let output = std::str::from_utf8(stdout).expect("stdout should be UTF-8");
    output
        .lines()
        .find_map(|line| line.strip_prefix("Fingerprint: "))
        .expect("fingerprint not found in output")
        .to_string()
}
