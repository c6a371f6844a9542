//! The data the demo displays, produced by a mock backend.

use std::{ops::RangeInclusive, time::Duration};

use futures_util::{
    future,
    stream::{self, BoxStream},
    StreamExt,
};
use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;

use crate::model::{DataState, Image, Item};

/// Where screens get their streams from.
///
/// Every stream is failure-free: implementations substitute a fallback value
/// for anything that goes wrong.
pub(crate) trait DataSource: Send + Sync + 'static {
    fn items(&self) -> BoxStream<'static, DataState>;
    fn name(&self, item: &Item) -> BoxStream<'static, String>;
    fn image(&self, item: &Item) -> BoxStream<'static, Image>;
    fn description(&self, item: &Item) -> BoxStream<'static, String>;
}

/// Timings and behavior of [`MockSource`].
#[derive(Clone, Debug)]
pub(crate) struct MockConfig {
    /// Delay before the first list of items.
    pub(crate) initial_delay: Duration,
    /// Delay between growing the list by one item.
    pub(crate) step_delay: Duration,
    /// The id of the last item; the list grows from `[0]` to `[0..=last_item]`.
    pub(crate) last_item: usize,
    /// Range of delays for names, picked at random per item.
    pub(crate) name_delay: RangeInclusive<Duration>,
    pub(crate) description_delay: Duration,
    pub(crate) image_url: String,
    pub(crate) image_delay: Duration,
    /// Probability of a simulated image fetch failing, from 0 to 1.
    pub(crate) image_failure_rate: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            step_delay: Duration::from_millis(150),
            last_item: 20,
            name_delay: Duration::from_millis(100)..=Duration::from_millis(400),
            description_delay: Duration::from_millis(300),
            image_url: "https://upload.wikimedia.org/wikipedia/commons/d/dd/A-haVistalegre19.JPG"
                .to_owned(),
            image_delay: Duration::from_millis(500),
            image_failure_rate: 0.0,
        }
    }
}

impl MockConfig {
    /// Speed all delays up by `factor`.
    pub(crate) fn scaled(mut self, factor: f64) -> Self {
        let scale = |d: Duration| d.div_f64(factor);
        self.initial_delay = scale(self.initial_delay);
        self.step_delay = scale(self.step_delay);
        self.name_delay = scale(*self.name_delay.start())..=scale(*self.name_delay.end());
        self.description_delay = scale(self.description_delay);
        self.image_delay = scale(self.image_delay);
        self
    }
}

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("could not reach {url}")]
    Unreachable { url: String },
    #[error("response from {url} is not a valid image ({len} bytes)")]
    Decode { url: String, len: usize },
}

/// A [`DataSource`] that makes everything up, with delays.
#[derive(Debug)]
pub(crate) struct MockSource {
    config: MockConfig,
}

impl MockSource {
    pub(crate) fn new(config: MockConfig) -> Self {
        Self { config }
    }
}

impl DataSource for MockSource {
    fn items(&self) -> BoxStream<'static, DataState> {
        let MockConfig { initial_delay, step_delay, last_item, .. } = self.config;

        let growing = stream::iter(0..=last_item).then(move |last| async move {
            sleep(if last == 0 { initial_delay } else { step_delay }).await;
            DataState::Data((0..=last).map(Item::new).collect())
        });

        stream::once(future::ready(DataState::Loading)).chain(growing).boxed()
    }

    fn name(&self, item: &Item) -> BoxStream<'static, String> {
        let delay = rand::rng().random_range(self.config.name_delay.clone());
        let id = item.id;
        stream::once(async move {
            sleep(delay).await;
            format!("Item: {id}")
        })
        .boxed()
    }

    fn image(&self, item: &Item) -> BoxStream<'static, Image> {
        let url = self.config.image_url.clone();
        let delay = self.config.image_delay;
        let fails = rand::rng().random_bool(self.config.image_failure_rate.clamp(0.0, 1.0));
        let id = item.id;

        stream::once(async move {
            sleep(delay).await;
            fetch_image(&url, fails).await.unwrap_or_else(|error| {
                tracing::warn!(item = id, %error, "Image fetch failed, using fallback");
                Image::fallback()
            })
        })
        .boxed()
    }

    fn description(&self, item: &Item) -> BoxStream<'static, String> {
        let delay = self.config.description_delay;
        let id = item.id;
        stream::once(async move {
            sleep(delay).await;
            format!("Testing item no: {id}")
        })
        .boxed()
    }
}

/// Pretend to download and decode the image at `url`.
async fn fetch_image(url: &str, fail: bool) -> Result<Image, FetchError> {
    if fail {
        return Err(FetchError::Unreachable { url: url.to_owned() });
    }

    let body: Vec<u8> = url.bytes().cycle().take(64 * 48).collect();
    decode(url, &body)
}

fn decode(url: &str, body: &[u8]) -> Result<Image, FetchError> {
    const WIDTH: u32 = 64;

    let len = body.len();
    if len == 0 || len % WIDTH as usize != 0 {
        return Err(FetchError::Decode { url: url.to_owned(), len });
    }

    let height = (len / WIDTH as usize) as u32;
    Ok(Image { width: WIDTH, height, pixels: body.into() })
}
