//! Request bodies for each model family.
//!
//! Field names and value tokens are fixed per family. `build` validates the
//! request against the family first and never touches the network.

use crate::{
    error::{BedrockError, Result},
    models::{
        presets::{self, Dimension, DurationPreset, SizePreset},
        GenerationMode, GenerationRequest, ModelFamily,
    },
};
use serde_json::{json, Map, Value};

pub const MAX_AMAZON_IMAGES: u32 = 5;
pub const MAX_AMAZON_SEED: u32 = 2_147_483_646;
pub const MAX_STABILITY_SEED: u32 = 4_294_967_294;
pub const DEFAULT_CFG_SCALE: f64 = 8.0;
pub const DEFAULT_STRENGTH: f64 = 0.7;
pub const DEFAULT_RESOLUTION: &str = "720p";
pub const NOVA_REEL_FPS: u32 = 24;

const LUMA_RESOLUTIONS: &[&str] = &["540p", "720p"];
const MEDIA_KEYS: &[&str] = &["image", "images", "conditionImage", "bytes"];

pub fn supports(family: ModelFamily, mode: GenerationMode) -> bool {
    use GenerationMode::*;
    match family {
        ModelFamily::NovaCanvas | ModelFamily::TitanImage => !mode.is_video(),
        ModelFamily::StableDiffusion => matches!(mode, TextToImage | ImageToImage),
        ModelFamily::LumaRay | ModelFamily::NovaReel => mode.is_video(),
    }
}

pub fn max_images(family: ModelFamily) -> u32 {
    if family.uses_amazon_image_schema() {
        MAX_AMAZON_IMAGES
    } else {
        1
    }
}

/// Build the JSON body `family` expects for `request`.
pub fn build(request: &GenerationRequest, family: ModelFamily) -> Result<Value> {
    validate(request, family)?;
    let size = resolve_size(request, family)?;

    match family {
        ModelFamily::NovaCanvas | ModelFamily::TitanImage => build_amazon_image(request, size),
        ModelFamily::StableDiffusion => build_stable_diffusion(request, size),
        ModelFamily::LumaRay => build_luma_ray(request, size, resolve_duration(request, family)?),
        ModelFamily::NovaReel => build_nova_reel(request, size, resolve_duration(request, family)?),
    }
}

/// Checks the mode/field invariants without building anything.
pub fn validate(request: &GenerationRequest, family: ModelFamily) -> Result<()> {
    let mode = request.mode;
    if !supports(family, mode) {
        return Err(invalid(format!(
            "{:?} is not supported by {}",
            mode,
            family.name()
        )));
    }

    let mask = non_blank(&request.mask_prompt);
    if mode.requires_mask_prompt() && mask.is_none() {
        return Err(invalid(format!("mask prompt is required for {:?}", mode)));
    }
    if !mode.requires_mask_prompt() && mask.is_some() {
        return Err(invalid(format!("mask prompt is not accepted for {:?}", mode)));
    }

    let reference = non_blank(&request.reference_image_b64);
    if mode.requires_reference_image() && reference.is_none() {
        return Err(invalid(format!("reference image is required for {:?}", mode)));
    }
    if !mode.requires_reference_image() && reference.is_some() {
        return Err(invalid(format!(
            "reference image is not accepted for {:?}",
            mode
        )));
    }

    if requires_prompt(family, mode) && non_blank(&request.prompt).is_none() {
        return Err(invalid(format!("prompt is required for {:?}", mode)));
    }

    let max = max_images(family);
    if request.count == 0 || request.count > max {
        return Err(invalid(format!(
            "count must be between 1 and {} for {}, got {}",
            max,
            family.name(),
            request.count
        )));
    }

    let max_seed = match family {
        ModelFamily::NovaCanvas | ModelFamily::TitanImage | ModelFamily::NovaReel => {
            MAX_AMAZON_SEED
        }
        ModelFamily::StableDiffusion => MAX_STABILITY_SEED,
        ModelFamily::LumaRay => u32::MAX,
    };
    if request.seed > max_seed {
        return Err(invalid(format!("seed must not exceed {}", max_seed)));
    }

    if let Some(cfg) = request.cfg_scale {
        if !(1.0..=10.0).contains(&cfg) {
            return Err(invalid(format!("cfg scale must be within 1.0..=10.0, got {}", cfg)));
        }
    }

    if let Some(strength) = request.strength {
        let min = if family.uses_amazon_image_schema() { 0.2 } else { 0.0 };
        if !(min..=1.0).contains(&strength) {
            return Err(invalid(format!(
                "strength must be within {}..=1.0, got {}",
                min, strength
            )));
        }
    }

    if family == ModelFamily::LumaRay {
        if let Some(resolution) = request.resolution.as_deref() {
            if !LUMA_RESOLUTIONS.contains(&resolution) {
                return Err(invalid(format!("unsupported resolution {}", resolution)));
            }
        }
    }

    Ok(())
}

fn requires_prompt(family: ModelFamily, mode: GenerationMode) -> bool {
    use GenerationMode::*;
    match mode {
        TextToImage | ImageConditioning | TextToVideo | ImageToVideo => true,
        ImageToImage => family == ModelFamily::StableDiffusion,
        Inpainting | Outpainting | BackgroundRemoval => false,
    }
}

pub fn resolve_size(
    request: &GenerationRequest,
    family: ModelFamily,
) -> Result<&'static SizePreset> {
    match request.size.as_deref() {
        Some(name) => presets::find_size(family, name).ok_or_else(|| {
            invalid(format!("size {} is not available for {}", name, family.name()))
        }),
        None => Ok(presets::default_size(family)),
    }
}

fn resolve_duration(
    request: &GenerationRequest,
    family: ModelFamily,
) -> Result<&'static DurationPreset> {
    let preset = match request.duration.as_deref() {
        Some(name) => presets::find_duration(family, name),
        None => presets::default_duration(family),
    };
    preset.ok_or_else(|| {
        invalid(format!(
            "duration {} is not available for {}",
            request.duration.as_deref().unwrap_or("<default>"),
            family.name()
        ))
    })
}

fn build_amazon_image(request: &GenerationRequest, size: &SizePreset) -> Result<Value> {
    let text = non_blank(&request.prompt);
    let negative = non_blank(&request.negative_prompt);
    let image = non_blank(&request.reference_image_b64);
    let mask = non_blank(&request.mask_prompt);

    let mut params = Map::new();
    insert_opt(&mut params, "text", text);
    insert_opt(&mut params, "negativeText", negative);

    let (task_type, params_key) = match request.mode {
        GenerationMode::TextToImage => ("TEXT_IMAGE", "textToImageParams"),
        GenerationMode::ImageToImage => {
            params.insert("images".into(), json!([image]));
            params.insert(
                "similarityStrength".into(),
                json!(request.strength.unwrap_or(DEFAULT_STRENGTH)),
            );
            ("IMAGE_VARIATION", "imageVariationParams")
        }
        GenerationMode::Inpainting => {
            insert_opt(&mut params, "image", image);
            insert_opt(&mut params, "maskPrompt", mask);
            ("INPAINTING", "inPaintingParams")
        }
        GenerationMode::Outpainting => {
            insert_opt(&mut params, "image", image);
            insert_opt(&mut params, "maskPrompt", mask);
            params.insert("outPaintingMode".into(), json!("DEFAULT"));
            ("OUTPAINTING", "outPaintingParams")
        }
        GenerationMode::ImageConditioning => {
            insert_opt(&mut params, "conditionImage", image);
            params.insert("controlMode".into(), json!("CANNY_EDGE"));
            ("TEXT_IMAGE", "textToImageParams")
        }
        GenerationMode::BackgroundRemoval => {
            return Ok(json!({
                "taskType": "BACKGROUND_REMOVAL",
                "backgroundRemovalParams": { "image": image }
            }));
        }
        GenerationMode::TextToVideo | GenerationMode::ImageToVideo => {
            return Err(invalid(format!("{:?} is not an image mode", request.mode)))
        }
    };

    let (width, height) = pixels(size)?;
    Ok(json!({
        "taskType": task_type,
        params_key: params,
        "imageGenerationConfig": {
            "numberOfImages": request.count,
            "width": width,
            "height": height,
            "cfgScale": request.cfg_scale.unwrap_or(DEFAULT_CFG_SCALE),
            "seed": request.seed,
            "quality": "standard"
        }
    }))
}

fn build_stable_diffusion(request: &GenerationRequest, size: &SizePreset) -> Result<Value> {
    let mut body = match request.mode {
        GenerationMode::TextToImage => json!({
            "prompt": non_blank(&request.prompt),
            "mode": "text-to-image",
            "aspect_ratio": aspect_ratio(size)?,
            "seed": request.seed,
            "output_format": "png"
        }),
        GenerationMode::ImageToImage => json!({
            "prompt": non_blank(&request.prompt),
            "mode": "image-to-image",
            "image": non_blank(&request.reference_image_b64),
            "strength": request.strength.unwrap_or(DEFAULT_STRENGTH),
            "seed": request.seed,
            "output_format": "png"
        }),
        mode => {
            return Err(invalid(format!(
                "{:?} is not supported by Stable Diffusion",
                mode
            )))
        }
    };

    if let Some(negative) = non_blank(&request.negative_prompt) {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("negative_prompt".into(), json!(negative));
        }
    }
    Ok(body)
}

fn build_luma_ray(
    request: &GenerationRequest,
    size: &SizePreset,
    duration: &DurationPreset,
) -> Result<Value> {
    let prompt = non_blank(&request.prompt);
    let ratio = aspect_ratio(size)?;
    let duration = format!("{}s", duration.seconds);
    let resolution = request.resolution.as_deref().unwrap_or(DEFAULT_RESOLUTION);

    match request.mode {
        GenerationMode::TextToVideo => Ok(json!({
            "prompt": prompt,
            "aspect_ratio": ratio,
            "duration": duration,
            "seed": request.seed,
            "resolution": resolution,
            "loop": request.looped.unwrap_or(true)
        })),
        GenerationMode::ImageToVideo => Ok(json!({
            "prompt": prompt,
            "mode": "image-to-image",
            "image": non_blank(&request.reference_image_b64),
            "aspect_ratio": ratio,
            "duration": duration,
            "seed": request.seed,
            "resolution": resolution
        })),
        mode => Err(invalid(format!("{:?} is not supported by Luma Ray", mode))),
    }
}

fn build_nova_reel(
    request: &GenerationRequest,
    size: &SizePreset,
    duration: &DurationPreset,
) -> Result<Value> {
    let (width, height) = pixels(size)?;

    let mut params = Map::new();
    insert_opt(&mut params, "text", non_blank(&request.prompt));
    if let Some(image) = non_blank(&request.reference_image_b64) {
        params.insert(
            "images".into(),
            json!([{
                "format": base64_image_format(image),
                "source": { "bytes": image }
            }]),
        );
    }

    Ok(json!({
        "taskType": "TEXT_VIDEO",
        "textToVideoParams": params,
        "videoGenerationConfig": {
            "durationSeconds": duration.seconds,
            "fps": NOVA_REEL_FPS,
            "dimension": format!("{}x{}", width, height),
            "seed": request.seed
        }
    }))
}

/// Copy of `body` with base64 media replaced by a length marker, for history details.
pub fn redact_media(body: &Value) -> Value {
    redact(body, false)
}

fn redact(value: &Value, media: bool) -> Value {
    match value {
        Value::String(s) if media => Value::String(format!("<base64: {} chars>", s.len())),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact(v, media)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact(v, MEDIA_KEYS.contains(&k.as_str()))))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// PNG data starts with `iVBORw0KGgo` once base64-encoded, JPEG with `/9j/`.
pub fn base64_image_format(image_b64: &str) -> &'static str {
    if image_b64.starts_with("iVBOR") {
        "png"
    } else {
        "jpeg"
    }
}

fn pixels(size: &SizePreset) -> Result<(u32, u32)> {
    match size.dimension {
        Dimension::Pixels { width, height } => Ok((width, height)),
        Dimension::AspectRatio { ratio } => Err(invalid(format!(
            "size {} is an aspect ratio ({}), expected pixels",
            size.name, ratio
        ))),
    }
}

fn aspect_ratio(size: &SizePreset) -> Result<&'static str> {
    match size.dimension {
        Dimension::AspectRatio { ratio } => Ok(ratio),
        Dimension::Pixels { .. } => Err(invalid(format!(
            "size {} is a pixel size, expected an aspect ratio",
            size.name
        ))),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.insert(key.to_string(), json!(value));
    }
}

fn invalid(message: String) -> BedrockError {
    BedrockError::InvalidRequest(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB";
    const JPEG_B64: &str = "/9j/4AAQSkZJRgABAQAAAQABAAD";

    fn inpainting(mask: &str) -> GenerationRequest {
        GenerationRequest::new(GenerationMode::Inpainting)
            .with_prompt("a red hat")
            .with_mask_prompt(mask)
            .with_reference_image(PNG_B64)
    }

    #[test]
    fn test_text_to_image_scenario() {
        let request = GenerationRequest::text_to_image("a cat")
            .with_size("SIZE_1_1")
            .with_count(2)
            .with_seed(42);

        let body = build(&request, ModelFamily::NovaCanvas).unwrap();
        assert_eq!(body["taskType"], "TEXT_IMAGE");
        assert_eq!(body["textToImageParams"]["text"], "a cat");
        assert_eq!(body["imageGenerationConfig"]["numberOfImages"], 2);
        assert_eq!(body["imageGenerationConfig"]["width"], 1024);
        assert_eq!(body["imageGenerationConfig"]["height"], 1024);
        assert_eq!(body["imageGenerationConfig"]["cfgScale"], 8.0);
        assert_eq!(body["imageGenerationConfig"]["seed"], 42);
        assert!(!body.to_string().contains("maskPrompt"));
        assert!(body["textToImageParams"].get("negativeText").is_none());
    }

    #[test]
    fn test_inpainting_requires_mask_prompt() {
        let body = build(&inpainting("the hat"), ModelFamily::NovaCanvas).unwrap();
        assert_eq!(body["taskType"], "INPAINTING");
        assert_eq!(body["inPaintingParams"]["maskPrompt"], "the hat");
        assert_eq!(body["inPaintingParams"]["image"], PNG_B64);

        for mask in ["", "   "] {
            let err = build(&inpainting(mask), ModelFamily::NovaCanvas).unwrap_err();
            assert!(matches!(err, BedrockError::InvalidRequest(_)), "{:?}", err);
        }

        let mut missing = inpainting("x");
        missing.mask_prompt = None;
        assert!(matches!(
            build(&missing, ModelFamily::TitanImage),
            Err(BedrockError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_mask_prompt_rejected_outside_masking_modes() {
        let request = GenerationRequest::text_to_image("a cat").with_mask_prompt("sky");
        assert!(matches!(
            build(&request, ModelFamily::NovaCanvas),
            Err(BedrockError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_reference_image_invariant() {
        let request = GenerationRequest::new(GenerationMode::BackgroundRemoval);
        assert!(build(&request, ModelFamily::TitanImage).is_err());

        let request = GenerationRequest::text_to_image("a cat").with_reference_image(PNG_B64);
        assert!(build(&request, ModelFamily::NovaCanvas).is_err());

        let request = GenerationRequest::new(GenerationMode::BackgroundRemoval)
            .with_reference_image(PNG_B64);
        let body = build(&request, ModelFamily::TitanImage).unwrap();
        assert_eq!(
            body,
            json!({
                "taskType": "BACKGROUND_REMOVAL",
                "backgroundRemovalParams": { "image": PNG_B64 }
            })
        );
    }

    #[test]
    fn test_amazon_edit_modes() {
        let variation = GenerationRequest::new(GenerationMode::ImageToImage)
            .with_prompt("watercolor")
            .with_reference_image(PNG_B64)
            .with_size("SIZE_16_9");
        let body = build(&variation, ModelFamily::NovaCanvas).unwrap();
        assert_eq!(body["taskType"], "IMAGE_VARIATION");
        assert_eq!(body["imageVariationParams"]["images"], json!([PNG_B64]));
        assert_eq!(body["imageVariationParams"]["similarityStrength"], 0.7);
        assert_eq!(body["imageGenerationConfig"]["width"], 1280);
        assert_eq!(body["imageGenerationConfig"]["height"], 720);

        let outpainting = GenerationRequest::new(GenerationMode::Outpainting)
            .with_mask_prompt("the dog")
            .with_reference_image(PNG_B64);
        let body = build(&outpainting, ModelFamily::NovaCanvas).unwrap();
        assert_eq!(body["taskType"], "OUTPAINTING");
        assert_eq!(body["outPaintingParams"]["outPaintingMode"], "DEFAULT");
        assert!(body["outPaintingParams"].get("text").is_none());

        let conditioning = GenerationRequest::new(GenerationMode::ImageConditioning)
            .with_prompt("a castle")
            .with_reference_image(PNG_B64)
            .with_cfg_scale(6.5);
        let body = build(&conditioning, ModelFamily::TitanImage).unwrap();
        assert_eq!(body["taskType"], "TEXT_IMAGE");
        assert_eq!(body["textToImageParams"]["conditionImage"], PNG_B64);
        assert_eq!(body["textToImageParams"]["controlMode"], "CANNY_EDGE");
        assert_eq!(body["imageGenerationConfig"]["cfgScale"], 6.5);
    }

    #[test]
    fn test_stable_diffusion() {
        let request = GenerationRequest::text_to_image("a fox")
            .with_size("SIZE_21_9")
            .with_negative_prompt("blurry")
            .with_seed(7);
        let body = build(&request, ModelFamily::StableDiffusion).unwrap();
        assert_eq!(
            body,
            json!({
                "prompt": "a fox",
                "mode": "text-to-image",
                "aspect_ratio": "21:9",
                "seed": 7,
                "output_format": "png",
                "negative_prompt": "blurry"
            })
        );

        let request = GenerationRequest::new(GenerationMode::ImageToImage)
            .with_prompt("a fox")
            .with_reference_image(JPEG_B64)
            .with_strength(0.4);
        let body = build(&request, ModelFamily::StableDiffusion).unwrap();
        assert_eq!(body["mode"], "image-to-image");
        assert_eq!(body["strength"], 0.4);

        let request = GenerationRequest::text_to_image("a fox").with_count(2);
        assert!(build(&request, ModelFamily::StableDiffusion).is_err());

        let request = inpainting("hat");
        assert!(build(&request, ModelFamily::StableDiffusion).is_err());
    }

    #[test]
    fn test_size_must_belong_to_family() {
        let request = GenerationRequest::text_to_image("a cat").with_size("SIZE_21_9");
        let err = build(&request, ModelFamily::NovaCanvas).unwrap_err();
        assert!(err.to_string().contains("SIZE_21_9"));
    }

    #[test]
    fn test_numeric_limits() {
        let base = GenerationRequest::text_to_image("a cat");
        assert!(build(&base.clone().with_count(0), ModelFamily::NovaCanvas).is_err());
        assert!(build(&base.clone().with_count(5), ModelFamily::NovaCanvas).is_ok());
        assert!(build(&base.clone().with_count(6), ModelFamily::NovaCanvas).is_err());
        assert!(build(&base.clone().with_cfg_scale(10.5), ModelFamily::NovaCanvas).is_err());
        let max_seed = base.clone().with_seed(MAX_AMAZON_SEED);
        assert!(build(&max_seed, ModelFamily::NovaCanvas).is_ok());
        let over_seed = base.with_seed(MAX_AMAZON_SEED + 1);
        assert!(build(&over_seed, ModelFamily::NovaCanvas).is_err());
    }

    #[test]
    fn test_luma_ray() {
        let request = GenerationRequest::text_to_video("waves at dusk").with_seed(3);
        let body = build(&request, ModelFamily::LumaRay).unwrap();
        assert_eq!(
            body,
            json!({
                "prompt": "waves at dusk",
                "aspect_ratio": "16:9",
                "duration": "9s",
                "seed": 3,
                "resolution": "720p",
                "loop": true
            })
        );

        let once = GenerationRequest::text_to_video("waves at dusk").with_loop(false);
        let body = build(&once, ModelFamily::LumaRay).unwrap();
        assert_eq!(body["loop"], false);

        let request = GenerationRequest::new(GenerationMode::ImageToVideo)
            .with_prompt("pan left")
            .with_reference_image(JPEG_B64)
            .with_size("SIZE_9_16")
            .with_duration("DURATION_5")
            .with_resolution("540p");
        let body = build(&request, ModelFamily::LumaRay).unwrap();
        assert_eq!(body["mode"], "image-to-image");
        assert_eq!(body["duration"], "5s");
        assert_eq!(body["aspect_ratio"], "9:16");
        assert_eq!(body["resolution"], "540p");
        assert!(body.get("loop").is_none());

        let request = GenerationRequest::text_to_video("x").with_resolution("4k");
        assert!(build(&request, ModelFamily::LumaRay).is_err());
        let request = GenerationRequest::text_to_video("x").with_duration("DURATION_6");
        assert!(build(&request, ModelFamily::LumaRay).is_err());
    }

    #[test]
    fn test_nova_reel() {
        let request = GenerationRequest::new(GenerationMode::ImageToVideo)
            .with_prompt("slow zoom")
            .with_reference_image(JPEG_B64)
            .with_seed(11);
        let body = build(&request, ModelFamily::NovaReel).unwrap();
        assert_eq!(body["taskType"], "TEXT_VIDEO");
        assert_eq!(body["textToVideoParams"]["text"], "slow zoom");
        assert_eq!(
            body["textToVideoParams"]["images"],
            json!([{ "format": "jpeg", "source": { "bytes": JPEG_B64 } }])
        );
        assert_eq!(
            body["videoGenerationConfig"],
            json!({ "durationSeconds": 6, "fps": 24, "dimension": "1280x720", "seed": 11 })
        );

        let request = GenerationRequest::text_to_video("slow zoom");
        let body = build(&request, ModelFamily::NovaReel).unwrap();
        assert!(body["textToVideoParams"].get("images").is_none());
    }

    #[test]
    fn test_video_modes_rejected_by_image_families() {
        let request = GenerationRequest::text_to_video("x");
        assert!(build(&request, ModelFamily::NovaCanvas).is_err());
        let request = GenerationRequest::text_to_image("x");
        assert!(build(&request, ModelFamily::LumaRay).is_err());
    }

    #[test]
    fn test_redact_media() {
        let request = GenerationRequest::new(GenerationMode::ImageToVideo)
            .with_prompt("slow zoom")
            .with_reference_image(JPEG_B64);
        let body = build(&request, ModelFamily::NovaReel).unwrap();
        let redacted = redact_media(&body);
        assert!(!redacted.to_string().contains(JPEG_B64));
        assert_eq!(redacted["textToVideoParams"]["images"][0]["format"], "jpeg");
        assert_eq!(redacted["textToVideoParams"]["text"], "slow zoom");
    }
}
