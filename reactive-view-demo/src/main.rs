//! A list of items that loads in over time, each row fetching its own name,
//! with a detail screen combining an image and a description.
//!
//! The app runs a scripted session: it waits for a row to show up, opens its
//! detail screen, closes it again once everything there has loaded and then
//! keeps printing frames until every source has completed.

use std::{io, sync::Arc};

use clap::Parser;
use reactive_view::UiThread;
use tracing_subscriber::EnvFilter;

mod combine;
mod model;
mod node;
mod screens;
mod source;

use self::{
    node::Node,
    screens::App,
    source::{MockConfig, MockSource},
};

#[derive(Debug, Parser)]
#[command(about)]
struct Args {
    /// Speed all simulated delays up by this factor.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Shorthand for `--speed 10`.
    #[arg(long, conflicts_with = "speed")]
    fast: bool,

    /// The id of the item whose detail screen to open.
    #[arg(long, default_value_t = 3)]
    open: usize,

    /// Probability of the image fetch failing, from 0 to 1.
    #[arg(long, default_value_t = 0.0)]
    image_failure_rate: f64,
}

impl Args {
    fn config(&self) -> MockConfig {
        let speed = if self.fast { 10.0 } else { self.speed };
        MockConfig { image_failure_rate: self.image_failure_rate, ..MockConfig::default() }
            .scaled(speed)
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    UiThread::new().block_on(&runtime, run(args));

    Ok(())
}

enum Step {
    WaitForRow,
    WaitForDetail,
    Done,
}

async fn run(args: Args) {
    let source = MockSource::new(args.config());
    let mut app = App::new(Arc::new(source));
    let mut frames = Frames::default();
    let target = format!("Item: {}", args.open);
    let mut step = Step::WaitForRow;

    frames.show(&app.body());
    while app.changed().await {
        frames.show(&app.body());

        match step {
            Step::WaitForRow => {
                if let Some(id) = app.body().find_link(&target) {
                    app.open(id);
                    step = Step::WaitForDetail;
                }
            }
            Step::WaitForDetail => {
                if app.detail().is_some_and(|detail| detail.is_complete()) {
                    app.close();
                    step = Step::Done;
                }
            }
            Step::Done => continue,
        }
        frames.show(&app.body());
    }

    tracing::info!(frames = frames.count, "All sources completed");
}

/// Prints frames to stdout, skipping ones that look like the previous one.
#[derive(Default)]
struct Frames {
    last: String,
    count: usize,
}

impl Frames {
    fn show(&mut self, body: &Node) {
        let frame = body.to_string();
        if frame == self.last {
            return;
        }

        self.count += 1;
        println!("--- frame {} ---", self.count);
        print!("{frame}");
        self.last = frame;
    }
}
