//! Resolve command - list the base images a Dockerfile needs

use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::config::{Config, WarmerOptions};
use crate::dockerfile::parse_dockerfile;
use crate::error::WarmResult;
use crate::image::Image;
use crate::platform::Platform;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> WarmResult<()> {
    let mut opts = WarmerOptions::from_config(config)?;
    opts.dockerfile_path = Some(args.dockerfile);
    opts.build_args = args.build_args;
    if let Some(platform) = args.custom_platform {
        opts.platform = platform.parse()?;
    }

    let images = parse_dockerfile(&opts).await?;

    if images.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No registry base images");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&images, &opts.platform),
        OutputFormat::Json => print_json(&images)?,
        OutputFormat::Plain => print_plain(&images),
    }

    Ok(())
}

fn print_table(images: &[Image], default: &Platform) {
    println!(
        "{:<4} {:<50} {:<16} {:<12}",
        style("#").bold(),
        style("IMAGE").bold(),
        style("PLATFORM").bold(),
        style("KEY").bold()
    );
    println!("{}", "-".repeat(85));

    for (i, image) in images.iter().enumerate() {
        let platform = if image.platform.is_empty() {
            style("default".to_string()).dim()
        } else {
            style(image.platform.clone())
        };
        let key = image.cache_key(default);

        println!(
            "{:<4} {:<50} {:<16} {:<12}",
            i + 1,
            image.reference,
            platform,
            &key.as_str()[..12]
        );
    }

    println!();
    println!("{} image(s)", images.len());
}

fn print_json(images: &[Image]) -> WarmResult<()> {
    let json = serde_json::to_string_pretty(images)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(images: &[Image]) {
    for image in images {
        println!("{}", image.reference);
    }
}
