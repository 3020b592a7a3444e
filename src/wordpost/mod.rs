// src/wordpost/mod.rs
//! Random-word image post: word → image → hashtags → publish. Keeps no history.

pub mod image;

use chrono::Utc;
use metrics::counter;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{error, info, warn};

use crate::ai::{build_model, DynTextModel};
use crate::config::RelayConfig;
use crate::error::{RelayError, Stage};
use crate::message::compose_word_post;
use crate::notify::{build_publisher, DynPublisher, Message};
use crate::pipeline::RunOutcome;

pub use image::{decode_image_payload, GradioSpaceImage, ImageGenerator};

pub const HIRAGANA: &str =
    "あいうえおかきくけこさしすせそたちつてとなにぬねのはひふへほまみむめもやゆよらりるれろわをん";
pub const WORD_LEN: usize = 3;

pub fn generate_word<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let table: Vec<char> = HIRAGANA.chars().collect();
    (0..len).filter_map(|_| table.choose(rng).copied()).collect()
}

pub fn image_prompt(word: &str) -> String {
    format!("『{word}』という日本語の単語から連想されるバズるイラストまたは写真")
}

pub fn hashtag_prompt(word: &str) -> String {
    format!("「{word}」から連想される面白く自然な日本語ハッシュタグを5個、#をつけて改行区切りで出力してください。")
}

/// One tag per non-empty trimmed line of the reply.
pub async fn generate_hashtags(model: &DynTextModel, word: &str) -> anyhow::Result<Vec<String>> {
    let raw = model.generate(&hashtag_prompt(word)).await?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

pub struct WordPoster {
    model: DynTextModel,
    image: Option<Box<dyn ImageGenerator>>,
    publisher: DynPublisher,
}

impl WordPoster {
    pub fn new(
        model: DynTextModel,
        image: Option<Box<dyn ImageGenerator>>,
        publisher: DynPublisher,
    ) -> Self {
        Self {
            model,
            image,
            publisher,
        }
    }

    pub fn from_config(cfg: &RelayConfig) -> Result<Self, RelayError> {
        let http = crate::http::build_client(cfg.http_timeout_secs)
            .map_err(|e| RelayError::Config(format!("{e:#}")))?;
        let image: Option<Box<dyn ImageGenerator>> = match &cfg.image_space {
            Some(space) => Some(Box::new(GradioSpaceImage::new(http.clone(), space))),
            None => {
                warn!("HF_SPACE_ID not set; posting without image");
                None
            }
        };
        let publisher = build_publisher(cfg, http.clone())?;
        if image.is_some() && !publisher.supports_images() {
            warn!(
                publisher = publisher.name(),
                "publisher cannot carry images; word post will be text only (use publisher = \"x\" or \"discord\")"
            );
        }
        Ok(Self::new(build_model(&cfg.model, http), image, publisher))
    }

    /// Post with a freshly drawn word.
    pub async fn run(&self) -> RunOutcome {
        let word = generate_word(&mut rand::rng(), WORD_LEN);
        self.run_with_word(&word).await
    }

    pub async fn run_with_word(&self, word: &str) -> RunOutcome {
        crate::metrics::ensure_described();
        counter!("relay_runs_total").increment(1);
        info!(%word, "word drawn");

        let image = match &self.image {
            Some(_) if !self.publisher.supports_images() => {
                warn!(publisher = self.publisher.name(), "publisher drops images, skipping image generation");
                None
            }
            Some(generator) => match generator.generate(&image_prompt(word)).await {
                Ok(img) => {
                    info!(bytes = img.bytes.len(), mime = %img.mime, "image generated");
                    Some(img)
                }
                Err(e) => {
                    counter!("relay_failures_total", "stage" => Stage::Image.as_str()).increment(1);
                    warn!(source = generator.name(), error = %format!("{e:#}"), "image generation failed, posting text only");
                    None
                }
            },
            None => None,
        };

        let hashtags = match generate_hashtags(&self.model, word).await {
            Ok(tags) => tags,
            Err(e) => {
                counter!("relay_failures_total", "stage" => Stage::Model.as_str()).increment(1);
                warn!(error = %format!("{e:#}"), "hashtag generation failed");
                Vec::new()
            }
        };

        let msg = Message::text(compose_word_post(word, &hashtags)).with_image(image);
        if let Err(e) = self.publisher.publish(&msg).await {
            let err = RelayError::upstream(Stage::Publish, e);
            counter!("relay_failures_total", "stage" => err.label()).increment(1);
            error!(error = %err, "word post failed");
            return RunOutcome::Failed(err);
        }

        counter!("relay_published_total").increment(1);
        info!(%word, publisher = self.publisher.name(), "word post published");
        RunOutcome::Published {
            identifier: word.to_string(),
            published_at: Utc::now(),
        }
    }
}
