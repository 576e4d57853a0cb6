use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationMode {
    TextToImage,
    ImageToImage,
    Inpainting,
    Outpainting,
    ImageConditioning,
    BackgroundRemoval,
    TextToVideo,
    ImageToVideo,
}

impl GenerationMode {
    pub fn requires_mask_prompt(&self) -> bool {
        matches!(
            self,
            GenerationMode::Inpainting | GenerationMode::Outpainting
        )
    }

    pub fn requires_reference_image(&self) -> bool {
        !matches!(
            self,
            GenerationMode::TextToImage | GenerationMode::TextToVideo
        )
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            GenerationMode::TextToVideo | GenerationMode::ImageToVideo
        )
    }
}

/// Everything collected for one generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub mask_prompt: Option<String>,
    pub reference_image_b64: Option<String>,
    /// Preset name from the family's size table, e.g. `SIZE_1_1`.
    pub size: Option<String>,
    pub count: u32,
    pub seed: u32,
    pub cfg_scale: Option<f64>,
    /// Image-to-image strength (Stable Diffusion) or similarity strength (Amazon).
    pub strength: Option<f64>,
    /// Preset name from the family's duration table, e.g. `DURATION_5`.
    pub duration: Option<String>,
    pub resolution: Option<String>,
    pub looped: Option<bool>,
}

impl GenerationRequest {
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            mode,
            prompt: None,
            negative_prompt: None,
            mask_prompt: None,
            reference_image_b64: None,
            size: None,
            count: 1,
            seed: 0,
            cfg_scale: None,
            strength: None,
            duration: None,
            resolution: None,
            looped: None,
        }
    }

    pub fn text_to_image(prompt: impl Into<String>) -> Self {
        Self::new(GenerationMode::TextToImage).with_prompt(prompt)
    }

    pub fn text_to_video(prompt: impl Into<String>) -> Self {
        Self::new(GenerationMode::TextToVideo).with_prompt(prompt)
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(prompt.into());
        self
    }

    pub fn with_mask_prompt(mut self, mask_prompt: impl Into<String>) -> Self {
        self.mask_prompt = Some(mask_prompt.into());
        self
    }

    pub fn with_reference_image(mut self, image_b64: impl Into<String>) -> Self {
        self.reference_image_b64 = Some(image_b64.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cfg_scale(mut self, cfg_scale: f64) -> Self {
        self.cfg_scale = Some(cfg_scale);
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn with_loop(mut self, looped: bool) -> Self {
        self.looped = Some(looped);
        self
    }
}

/// What a provider hands back: images right away, or a job to poll elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderResponse {
    Immediate { images: Vec<String> },
    Deferred { job_handle: String },
}

/// Body returned by synchronous image models. Amazon models fill `error`,
/// Stability models fill `seeds` and `finish_reasons`.
#[derive(Debug, Deserialize)]
pub struct ImageInvokeResponse {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub seeds: Vec<u64>,
    #[serde(default)]
    pub finish_reasons: Vec<Option<String>>,
}
