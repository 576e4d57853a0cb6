//! Size and duration presets per model family.
//!
//! Each family accepts a fixed set of output sizes. Pixel-based families
//! (Nova Canvas, Titan, Nova Reel) take explicit width/height, the others
//! take an aspect-ratio token. Callers pick a preset by `name` and the
//! payload builder resolves it against the family's table.

use super::common::ModelFamily;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dimension {
    Pixels { width: u32, height: u32 },
    AspectRatio { ratio: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizePreset {
    pub name: &'static str,
    pub label: &'static str,
    pub dimension: Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationPreset {
    pub name: &'static str,
    pub seconds: u32,
}

const fn px(name: &'static str, label: &'static str, width: u32, height: u32) -> SizePreset {
    SizePreset {
        name,
        label,
        dimension: Dimension::Pixels { width, height },
    }
}

const fn ratio(name: &'static str, ratio: &'static str) -> SizePreset {
    SizePreset {
        name,
        label: ratio,
        dimension: Dimension::AspectRatio { ratio },
    }
}

const NOVA_CANVAS_SIZES: &[SizePreset] = &[
    px("SIZE_1_1", "1024 X 1024", 1024, 1024),
    px("SIZE_1_1_SMALL", "512 X 512", 512, 512),
    px("SIZE_1_1_LARGE", "2048 X 2048", 2048, 2048),
    px("SIZE_16_9", "1280 X 720", 1280, 720),
    px("SIZE_9_16", "720 X 1280", 720, 1280),
    px("SIZE_4_3", "1152 X 864", 1152, 864),
    px("SIZE_3_4", "864 X 1152", 864, 1152),
    px("SIZE_3_2", "1536 X 1024", 1536, 1024),
    px("SIZE_2_3", "1024 X 1536", 1024, 1536),
];

const TITAN_IMAGE_SIZES: &[SizePreset] = &[
    px("SIZE_1_1", "1024 X 1024", 1024, 1024),
    px("SIZE_1_1_MEDIUM", "768 X 768", 768, 768),
    px("SIZE_1_1_SMALL", "512 X 512", 512, 512),
    px("SIZE_3_2", "1152 X 768", 1152, 768),
    px("SIZE_2_3", "768 X 1152", 768, 1152),
    px("SIZE_5_3", "1280 X 768", 1280, 768),
    px("SIZE_3_5", "768 X 1280", 768, 1280),
    px("SIZE_9_7", "1152 X 896", 1152, 896),
    px("SIZE_7_9", "896 X 1152", 896, 1152),
];

const STABLE_DIFFUSION_SIZES: &[SizePreset] = &[
    ratio("SIZE_1_1", "1:1"),
    ratio("SIZE_16_9", "16:9"),
    ratio("SIZE_21_9", "21:9"),
    ratio("SIZE_2_3", "2:3"),
    ratio("SIZE_3_2", "3:2"),
    ratio("SIZE_4_5", "4:5"),
    ratio("SIZE_5_4", "5:4"),
    ratio("SIZE_9_16", "9:16"),
    ratio("SIZE_9_21", "9:21"),
];

const LUMA_RAY_SIZES: &[SizePreset] = &[
    ratio("SIZE_1_1", "1:1"),
    ratio("SIZE_3_4", "3:4"),
    ratio("SIZE_4_3", "4:3"),
    ratio("SIZE_16_9", "16:9"),
    ratio("SIZE_9_16", "9:16"),
    ratio("SIZE_21_9", "21:9"),
    ratio("SIZE_9_21", "9:21"),
];

const NOVA_REEL_SIZES: &[SizePreset] = &[px("SIZE_16_9", "1280 X 720", 1280, 720)];

const LUMA_RAY_DURATIONS: &[DurationPreset] = &[
    DurationPreset {
        name: "DURATION_5",
        seconds: 5,
    },
    DurationPreset {
        name: "DURATION_9",
        seconds: 9,
    },
];

const NOVA_REEL_DURATIONS: &[DurationPreset] = &[DurationPreset {
    name: "DURATION_6",
    seconds: 6,
}];

pub fn size_presets(family: ModelFamily) -> &'static [SizePreset] {
    match family {
        ModelFamily::NovaCanvas => NOVA_CANVAS_SIZES,
        ModelFamily::TitanImage => TITAN_IMAGE_SIZES,
        ModelFamily::StableDiffusion => STABLE_DIFFUSION_SIZES,
        ModelFamily::LumaRay => LUMA_RAY_SIZES,
        ModelFamily::NovaReel => NOVA_REEL_SIZES,
    }
}

pub fn duration_presets(family: ModelFamily) -> &'static [DurationPreset] {
    match family {
        ModelFamily::LumaRay => LUMA_RAY_DURATIONS,
        ModelFamily::NovaReel => NOVA_REEL_DURATIONS,
        _ => &[],
    }
}

pub fn find_size(family: ModelFamily, name: &str) -> Option<&'static SizePreset> {
    size_presets(family).iter().find(|preset| preset.name == name)
}

pub fn find_duration(family: ModelFamily, name: &str) -> Option<&'static DurationPreset> {
    duration_presets(family)
        .iter()
        .find(|preset| preset.name == name)
}

/// Preset used when a request leaves the size unset.
pub fn default_size(family: ModelFamily) -> &'static SizePreset {
    match family {
        ModelFamily::LumaRay | ModelFamily::NovaReel => {
            find_size(family, "SIZE_16_9").unwrap_or(&size_presets(family)[0])
        }
        _ => &size_presets(family)[0],
    }
}

/// Longest clip is the default.
pub fn default_duration(family: ModelFamily) -> Option<&'static DurationPreset> {
    duration_presets(family).iter().max_by_key(|d| d.seconds)
}
