//! Base-image resolution
//!
//! Walks a Dockerfile's FROM instructions in file order and produces one
//! [`Image`] per stage that starts from a registry image. Stages built
//! `FROM` an earlier stage's alias, and `FROM scratch`, are skipped.
//! Duplicates are kept: two stages on the same base yield two entries.

use crate::config::WarmerOptions;
use crate::dockerfile::args::ArgEnv;
use crate::error::{WarmError, WarmResult};
use crate::image::Image;
use crate::platform::Platform;
use dockerfile_parser::{Dockerfile, FromInstruction, Instruction};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

const SCRATCH: &str = "scratch";

/// Read the Dockerfile named in `opts` and resolve its base images.
///
/// On error no images are returned; a partial list is never exposed.
pub async fn parse_dockerfile(opts: &WarmerOptions) -> WarmResult<Vec<Image>> {
    let path = opts
        .dockerfile_path
        .as_deref()
        .ok_or_else(|| WarmError::User("No Dockerfile path given".to_string()))?;

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() != ErrorKind::NotFound {
            debug!("Dockerfile {} unreadable: {}", path.display(), e);
        }
        WarmError::DockerfileNotFound {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    resolve_base_images(&content, path, &opts.build_args, &opts.platform)
}

/// Resolve base images from Dockerfile text.
///
/// `path` is only used for error messages.
pub fn resolve_base_images(
    content: &str,
    path: &Path,
    build_args: &[String],
    platform: &Platform,
) -> WarmResult<Vec<Image>> {
    let dockerfile = Dockerfile::parse(content).map_err(|e| WarmError::DockerfileParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut env = ArgEnv::for_platform(platform).with_overrides(build_args)?;
    for arg in &dockerfile.global_args {
        env.declare(
            &arg.name.content,
            arg.value.as_ref().map(|v| v.content.as_str()),
        )?;
    }

    let mut aliases: HashSet<String> = HashSet::new();
    let mut images = Vec::new();
    let mut stages = 0usize;

    for instruction in &dockerfile.instructions {
        let Instruction::From(from) = instruction else {
            continue;
        };
        stages += 1;

        let reference = env.substitute(&from.image.content)?;
        let lowered = reference.to_ascii_lowercase();

        if aliases.contains(&lowered) {
            debug!("Stage {} builds on stage alias {}, skipping", stages, reference);
        } else if lowered == SCRATCH {
            debug!("Stage {} starts from scratch, skipping", stages);
        } else {
            let platform = platform_flag(from, &env)?;
            debug!("Stage {} base image: {} {}", stages, reference, platform);
            images.push(Image {
                reference,
                platform,
            });
        }

        if let Some(alias) = &from.alias {
            aliases.insert(alias.content.to_ascii_lowercase());
        }
    }

    if stages == 0 {
        return Err(WarmError::DockerfileParse {
            path: path.to_path_buf(),
            reason: "no FROM instruction found".to_string(),
        });
    }

    debug!("Resolved {} base image(s) from {}", images.len(), path.display());
    Ok(images)
}

/// The expanded `--platform=` flag of a FROM line, or empty
fn platform_flag(from: &FromInstruction, env: &ArgEnv) -> WarmResult<String> {
    match from
        .flags
        .iter()
        .find(|flag| flag.name.content.eq_ignore_ascii_case("platform"))
    {
        Some(flag) => env.substitute(&flag.value.content),
        None => Ok(String::new()),
    }
}
