use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Sample {
    /// Vertex-coloured triangle over an animated clear colour
    Triangle,
    /// Textured triangle sliding across the screen through a uniform buffer
    Textured,
}

#[derive(Debug, Parser)]
#[command(name = "vk_samples", about = "Vulkan triangle samples")]
pub struct Args {
    #[arg(long, value_enum, default_value_t = Sample::Textured)]
    pub sample: Sample,

    /// Number of frame slots; defaults to the swapchain image count
    #[arg(long)]
    pub frames_in_flight: Option<usize>,

    /// Directory the asset manager reads from
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Enable VK_LAYER_KHRONOS_validation
    #[arg(long, overrides_with = "no_validation")]
    pub validation: bool,

    #[arg(long, overrides_with = "validation")]
    pub no_validation: bool,
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub sample: Sample,
    pub frames_in_flight: Option<usize>,
    pub validation: bool,
    pub assets: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sample: Sample::Textured,
            frames_in_flight: None,
            validation: cfg!(debug_assertions),
            assets: PathBuf::from("assets"),
            width: 800,
            height: 600,
        }
    }
}

impl From<Args> for RendererConfig {
    fn from(args: Args) -> Self {
        let validation = if args.validation {
            true
        } else if args.no_validation {
            false
        } else {
            cfg!(debug_assertions)
        };

        Self {
            sample: args.sample,
            frames_in_flight: args.frames_in_flight,
            validation,
            assets: args.assets,
            width: args.width,
            height: args.height,
        }
    }
}

impl RendererConfig {
    /// Slot count for a swapchain with `image_count` images, clamped to `[1, image_count]`.
    pub fn frame_slot_count(&self, image_count: usize) -> usize {
        let image_count = image_count.max(1);
        self.frames_in_flight
            .unwrap_or(image_count)
            .clamp(1, image_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RendererConfig {
        let args = Args::try_parse_from(std::iter::once("vk_samples").chain(args.iter().copied()))
            .unwrap();
        RendererConfig::from(args)
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.sample, Sample::Textured);
        assert_eq!(config.frames_in_flight, None);
        assert_eq!(config.assets, PathBuf::from("assets"));
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.validation, cfg!(debug_assertions));
    }

    #[test]
    fn parses_sample_and_slots() {
        let config = parse(&["--sample", "triangle", "--frames-in-flight", "2"]);
        assert_eq!(config.sample, Sample::Triangle);
        assert_eq!(config.frames_in_flight, Some(2));
    }

    #[test]
    fn last_validation_flag_wins() {
        assert!(!parse(&["--validation", "--no-validation"]).validation);
        assert!(parse(&["--no-validation", "--validation"]).validation);
    }

    #[test]
    fn slot_count_follows_image_count_by_default() {
        let config = RendererConfig::default();
        assert_eq!(config.frame_slot_count(3), 3);
    }

    #[test]
    fn slot_count_is_clamped() {
        let mut config = RendererConfig::default();

        config.frames_in_flight = Some(0);
        assert_eq!(config.frame_slot_count(3), 1);

        config.frames_in_flight = Some(8);
        assert_eq!(config.frame_slot_count(3), 3);

        config.frames_in_flight = Some(2);
        assert_eq!(config.frame_slot_count(3), 2);
    }
}
