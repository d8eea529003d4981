//! Warm command - fetch base images into the local cache

use crate::cache::{warm_stream, FsCacheStore, WarmReport};
use crate::cli::args::WarmArgs;
use crate::config::{ttl_from_hours, Config, WarmerOptions};
use crate::dockerfile::parse_dockerfile;
use crate::error::{WarmError, WarmResult};
use crate::image::Image;
use crate::registry::{OciFetcher, RemoteFetcher};
use crate::ui::{self, UiContext, WarmProgress};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::debug;

/// Execute the warm command
pub async fn execute(args: WarmArgs, config: &Config) -> WarmResult<()> {
    let ctx = UiContext::detect();
    let jobs = args.jobs.unwrap_or(config.cache.jobs);
    let opts = build_options(args, config)?;

    let images = gather_images(&opts).await?;
    if images.is_empty() {
        ui::step_info(&ctx, "No registry base images to warm");
        return Ok(());
    }

    ui::intro(&ctx, "Warming base images");
    ui::key_value(&ctx, "cache", &opts.cache.dir.display().to_string());
    ui::key_value(&ctx, "platform", &opts.platform.to_string());

    let store = Arc::new(FsCacheStore::new(opts.cache.dir.clone()));
    let remote: Arc<dyn RemoteFetcher> = Arc::new(OciFetcher::new());

    let progress = WarmProgress::new(&ctx, images.len());
    let reports: Vec<WarmReport> = warm_stream(store, remote, images, &opts, jobs)
        .inspect(|report| progress.inc(&report.image.reference))
        .collect()
        .await;
    progress.finish();

    for report in &reports {
        print_report(&ctx, report);
    }

    let tally = Tally::of(&reports);
    debug!(
        "{} warmed, {} cached, {} failed",
        tally.warmed, tally.cached, tally.failed
    );

    if tally.failed > 0 {
        ui::outro_error(
            &ctx,
            &format!("{} of {} image(s) failed", tally.failed, reports.len()),
        );
        return Err(WarmError::WarmFailed {
            failed: tally.failed,
            total: reports.len(),
        });
    }

    ui::outro_success(
        &ctx,
        &format!(
            "{} image(s) ready ({} warmed, {} already cached)",
            reports.len(),
            tally.warmed,
            tally.cached
        ),
    );
    Ok(())
}

/// Layer CLI flags over the config file
fn build_options(args: WarmArgs, config: &Config) -> WarmResult<WarmerOptions> {
    let mut opts = WarmerOptions::from_config(config)?;

    opts.dockerfile_path = args.dockerfile;
    opts.build_args = args.build_args;
    opts.images = args.images;
    opts.force = args.force;

    if let Some(dir) = args.cache_dir {
        opts.cache.dir = dir;
    }
    if let Some(hours) = args.cache_ttl_hours {
        opts.cache.ttl = ttl_from_hours(hours);
    }
    if let Some(platform) = args.custom_platform {
        opts.platform = platform.parse()?;
    }
    opts.registry
        .insecure_registries
        .extend(args.insecure_registries);
    opts.registry.skip_tls_verify |= args.skip_tls_verify;

    Ok(opts)
}

/// Explicit images first, then the Dockerfile's base images
async fn gather_images(opts: &WarmerOptions) -> WarmResult<Vec<Image>> {
    if opts.images.is_empty() && opts.dockerfile_path.is_none() {
        return Err(WarmError::User(
            "Nothing to warm: pass --dockerfile or --image".to_string(),
        ));
    }

    let mut images: Vec<Image> = opts.images.iter().map(Image::new).collect();
    if opts.dockerfile_path.is_some() {
        images.extend(parse_dockerfile(opts).await?);
    }
    Ok(images)
}

fn print_report(ctx: &UiContext, report: &WarmReport) {
    let name = report.image.to_string();
    match &report.result {
        Ok(warmed) => ui::step_ok_detail(ctx, &name, &format!("warmed {}", warmed.digest)),
        Err(WarmError::AlreadyCached { state, .. }) => {
            ui::step_info(ctx, &format!("{} already cached ({})", name, state))
        }
        Err(e) => ui::step_error_detail(ctx, &name, &e.to_string()),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    warmed: usize,
    cached: usize,
    failed: usize,
}

impl Tally {
    fn of(reports: &[WarmReport]) -> Self {
        reports.iter().fold(Self::default(), |mut tally, report| {
            match &report.result {
                Ok(_) => tally.warmed += 1,
                Err(e) if e.is_already_cached() => tally.cached += 1,
                Err(_) => tally.failed += 1,
            }
            tally
        })
    }
}
