//! Integration tests for imgwarm
//!
//! None of these reach a registry: warm tests run against pre-seeded
//! cache entries or Dockerfiles with no registry base image.

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use chrono::{Duration, Utc};
    use imgwarm::cache::{CacheKey, ManifestRecord};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Command isolated from the user's config file
    fn imgwarm(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("imgwarm");
        cmd.env("IMGWARM_CONFIG", temp.path().join("config.toml"));
        cmd
    }

    fn write_dockerfile(temp: &TempDir, content: &str) -> PathBuf {
        let path = temp.path().join("Dockerfile");
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Seed a committed entry for `reference` on linux/amd64
    fn seed_entry(cache_dir: &Path, reference: &str, age_hours: i64) {
        let key = CacheKey::new(reference, "linux/amd64");
        let record = ManifestRecord {
            reference: reference.to_string(),
            platform: "linux/amd64".to_string(),
            key: key.to_string(),
            digest: "sha256:feed".to_string(),
            config_digest: "sha256:c0ffee".to_string(),
            layers: vec!["sha256:aaaa".to_string()],
            created: None,
            cached_at: Utc::now() - Duration::hours(age_hours),
        };

        std::fs::create_dir_all(cache_dir).unwrap();
        std::fs::write(cache_dir.join(key.archive_file()), b"archive").unwrap();
        std::fs::write(
            cache_dir.join(key.manifest_file()),
            serde_json::to_vec(&record).unwrap(),
        )
        .unwrap();
    }

    const MULTI_STAGE: &str = "ARG version=latest\n\
                               FROM golang:${version} AS builder\n\
                               RUN go build ./...\n\
                               FROM builder AS test\n\
                               FROM alpine:3.19\n\
                               COPY --from=builder /out /out\n";

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("base image"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("imgwarm"));
    }

    #[test]
    fn resolve_plain_lists_images_in_order() {
        let temp = TempDir::new().unwrap();
        let dockerfile = write_dockerfile(&temp, MULTI_STAGE);

        imgwarm(&temp)
            .args(["resolve", "--format", "plain", "-f"])
            .arg(&dockerfile)
            .assert()
            .success()
            .stdout("golang:latest\nalpine:3.19\n");
    }

    #[test]
    fn resolve_applies_build_args() {
        let temp = TempDir::new().unwrap();
        let dockerfile = write_dockerfile(&temp, MULTI_STAGE);

        imgwarm(&temp)
            .args(["resolve", "--format", "plain", "--build-arg", "version=1.20", "-f"])
            .arg(&dockerfile)
            .assert()
            .success()
            .stdout(predicate::str::starts_with("golang:1.20\n"));
    }

    #[test]
    fn resolve_table() {
        let temp = TempDir::new().unwrap();
        let dockerfile = write_dockerfile(&temp, MULTI_STAGE);

        imgwarm(&temp)
            .args(["resolve", "-f"])
            .arg(&dockerfile)
            .assert()
            .success()
            .stdout(predicate::str::contains("IMAGE"))
            .stdout(predicate::str::contains("alpine:3.19"))
            .stdout(predicate::str::contains("2 image(s)"));
    }

    #[test]
    fn resolve_json() {
        let temp = TempDir::new().unwrap();
        let dockerfile =
            write_dockerfile(&temp, "FROM --platform=linux/arm64 alpine:latest\n");

        let output = imgwarm(&temp)
            .args(["resolve", "--format", "json", "-f"])
            .arg(&dockerfile)
            .output()
            .unwrap();
        assert!(output.status.success());

        let images: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(images[0]["reference"], "alpine:latest");
        assert_eq!(images[0]["platform"], "linux/arm64");
    }

    #[test]
    fn resolve_table_keys_follow_platform() {
        let temp = TempDir::new().unwrap();
        let dockerfile = write_dockerfile(&temp, "FROM alpine:3.19\n");
        let arm64 = CacheKey::new("alpine:3.19", "linux/arm64");
        let amd64 = CacheKey::new("alpine:3.19", "linux/amd64");

        imgwarm(&temp)
            .args(["resolve", "--custom-platform", "linux/arm64", "-f"])
            .arg(&dockerfile)
            .assert()
            .success()
            .stdout(predicate::str::contains(&arm64.as_str()[..12]))
            .stdout(predicate::str::contains(&amd64.as_str()[..12]).not());
    }

    #[test]
    fn resolve_unreadable_dockerfile() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp)
            .args(["resolve", "-f"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Dockerfile not found"));
    }

    #[test]
    fn resolve_missing_dockerfile() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp)
            .args(["resolve", "-f"])
            .arg(temp.path().join("nope"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Dockerfile not found"));
    }

    #[test]
    fn resolve_unresolved_variable() {
        let temp = TempDir::new().unwrap();
        let dockerfile = write_dockerfile(&temp, "FROM golang:${version}\n");

        imgwarm(&temp)
            .args(["resolve", "-f"])
            .arg(&dockerfile)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unresolved variable ${version}"))
            .stderr(predicate::str::contains("--build-arg"));
    }

    #[test]
    fn resolve_invalid_build_arg() {
        let temp = TempDir::new().unwrap();
        let dockerfile = write_dockerfile(&temp, "FROM alpine\n");

        imgwarm(&temp)
            .args(["resolve", "--build-arg", "version", "-f"])
            .arg(&dockerfile)
            .assert()
            .failure()
            .stderr(predicate::str::contains("expected NAME=VALUE"));
    }

    #[test]
    fn warm_without_inputs_fails() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp)
            .arg("warm")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Nothing to warm"));
    }

    #[test]
    fn warm_reports_valid_entry_as_cached() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("cache");
        seed_entry(&cache, "alpine:latest", 1);

        imgwarm(&temp)
            .args(["warm", "-i", "alpine:latest", "--custom-platform", "linux/amd64"])
            .arg("--cache-dir")
            .arg(&cache)
            .assert()
            .success()
            .stdout(predicate::str::contains("alpine:latest already cached (valid)"));
    }

    #[test]
    fn warm_reports_stale_entry_as_cached() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("cache");
        seed_entry(&cache, "golang:1.20", 48);
        let dockerfile = write_dockerfile(&temp, "FROM golang:1.20 AS build\n");

        imgwarm(&temp)
            .args(["warm", "--cache-ttl", "24", "--custom-platform", "linux/amd64"])
            .arg("--cache-dir")
            .arg(&cache)
            .arg("-f")
            .arg(&dockerfile)
            .assert()
            .success()
            .stdout(predicate::str::contains("golang:1.20 already cached (stale)"));
    }

    #[test]
    fn warm_huge_ttl_is_accepted() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("cache");
        seed_entry(&cache, "alpine:latest", 48);

        imgwarm(&temp)
            .args(["warm", "-i", "alpine:latest", "--custom-platform", "linux/amd64"])
            .args(["--cache-ttl", "18446744073709551615", "--cache-dir"])
            .arg(&cache)
            .assert()
            .success()
            .stdout(predicate::str::contains("alpine:latest already cached (valid)"));
    }

    #[test]
    fn warm_scratch_only_dockerfile_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let dockerfile = write_dockerfile(&temp, "FROM scratch\nCOPY app /app\n");

        imgwarm(&temp)
            .args(["warm", "--cache-dir"])
            .arg(temp.path().join("cache"))
            .arg("-f")
            .arg(&dockerfile)
            .assert()
            .success()
            .stdout(predicate::str::contains("No registry base images"));
    }

    #[test]
    fn config_path_honors_env() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                temp.path().join("config.toml").display().to_string(),
            ));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("ttl_hours = 336"));
    }

    #[test]
    fn config_init_then_show() {
        let temp = TempDir::new().unwrap();
        imgwarm(&temp).args(["config", "init"]).assert().success();
        assert!(temp.path().join("config.toml").exists());

        std::fs::write(
            temp.path().join("config.toml"),
            "[cache]\njobs = 2\n[build]\nplatform = \"linux/arm64\"\n",
        )
        .unwrap();
        imgwarm(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("jobs = 2"))
            .stdout(predicate::str::contains("linux/arm64"));
    }

    #[test]
    fn malformed_config_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[cache\n").unwrap();

        imgwarm(&temp)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
