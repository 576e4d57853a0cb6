use rgenmedia::{
    logger::{self, LogLevel, LoggerConfig},
    media::{extract_thumbnail, OutputFormat},
    BedrockClient, BedrockConfig, Config, GenerationRequest, MediaRef, MediaType, ModelFamily,
};
use std::collections::HashSet;
use std::fs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded"),
        Err(_) => log::warn!("⚠️  No .env file found, using system environment variables"),
    }

    logger::init_with_config(LoggerConfig::development().with_level(LogLevel::Debug))?;

    let config = Config::from_env();
    logger::log_config_info(&config);
    let bedrock_config = config.bedrock.clone().unwrap_or_else(BedrockConfig::from_env);

    let client = if config.use_psql {
        BedrockClient::with_history(bedrock_config, config).await?
    } else {
        BedrockClient::new(bedrock_config).await?
    };

    for model in BedrockClient::supported_models() {
        log::info!("{} ({}) -> {}", model.name, model.provider, model.id);
    }

    let request = GenerationRequest::text_to_image("a lighthouse on a cliff at dawn, oil painting")
        .with_negative_prompt("blurry")
        .with_size("SIZE_16_9")
        .with_count(2)
        .with_seed(42);

    let records = client.generate(&request, ModelFamily::NovaCanvas).await?;
    for (i, record) in records.iter().enumerate() {
        if let MediaRef::Inline(bytes) = &record.media_ref {
            let path = format!("generated_{}.png", i);
            fs::write(&path, bytes)?;
            log::info!("💾 Saved {}", path);

            let preview = rgenmedia::media::encode_base64(bytes, (512, 512), OutputFormat::Jpeg)?;
            log::debug!(
                "Preview is a {} of {} base64 chars",
                OutputFormat::Jpeg.mime_type(),
                preview.len()
            );
        }
    }

    if client.config().output_location().is_some() {
        let video = GenerationRequest::text_to_video("slow pan across the same lighthouse");
        let records = client.generate(&video, ModelFamily::LumaRay).await?;
        for record in &records {
            log::info!(
                "🎬 Video job submitted, output will land at {}",
                record.media_ref.as_uri().unwrap_or("<unknown>")
            );
        }
    } else {
        log::warn!("BEDROCK_BUCKET_NAME not set, skipping video generation");
    }

    if let Ok(path) = std::env::var("THUMBNAIL_SOURCE") {
        let video_bytes = fs::read(&path)?;
        match extract_thumbnail(&video_bytes, 1.0)? {
            Some(jpeg) => {
                fs::write("thumbnail.jpg", jpeg)?;
                log::info!("🖼️  Wrote thumbnail.jpg from {}", path);
            }
            None => log::warn!("No frame at 1s in {}", path),
        }
    }

    let images: HashSet<MediaType> = [MediaType::Image].into_iter().collect();
    let history = client.history().list(&images).await?;
    log::info!("📚 {} image(s) in history", history.len());

    Ok(())
}
