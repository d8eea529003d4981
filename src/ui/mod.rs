//! Terminal output
//!
//! Uses `cliclack` log lines and an `indicatif` bar on a terminal, and
//! plain `[OK]` / `[WARN]` / `[ERROR]` lines everywhere else (CI, pipes).
//!
//! ```rust,ignore
//! use imgwarm::ui::{self, UiContext, WarmProgress};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "Warming base images");
//! let progress = WarmProgress::new(&ctx, 3);
//! // ... warm ...
//! progress.finish();
//! ui::step_ok_detail(&ctx, "alpine:latest", "warmed");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_error, outro_success, step_error_detail, step_info, step_ok_detail,
    step_warn_hint,
};
pub use progress::WarmProgress;
