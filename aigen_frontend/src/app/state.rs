use aigen_backend::imaging::fit_within;
use image::DynamicImage;

/// Text shown in the image pane when nothing has been generated.
pub const PLACEHOLDER_TEXT: &str = "Generated image will appear here";
pub const READY_STATUS: &str = "Ready";

/// Checkpoints a generation passes through, each with a fixed status line and
/// progress value. The model service does not report sampling progress, so
/// these are approximations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submitting,
    Processing,
    Preparing,
}

impl Stage {
    pub fn status(&self) -> &'static str {
        match self {
            Stage::Submitting => "Generating image...",
            Stage::Processing => "Processing prompt...",
            Stage::Preparing => "Preparing display...",
        }
    }

    pub fn progress(&self) -> f32 {
        match self {
            Stage::Submitting => 0.2,
            Stage::Processing => 0.4,
            Stage::Preparing => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Generating {
        job: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A modal message waiting for the user to acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, "Error", message)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// RGBA pixels ready to be uploaded as an egui texture.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub size: [usize; 2],
    pub pixels: Vec<u8>,
}

/// The image returned by the model service plus its on-screen copy.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    full: DynamicImage,
    display: LoadedImage,
}

impl GeneratedImage {
    pub fn new(full: DynamicImage, display_max: u32) -> Self {
        let fitted = fit_within(&full, display_max);
        let size = [fitted.width() as usize, fitted.height() as usize];
        let display = LoadedImage {
            size,
            pixels: fitted.to_rgba8().into_raw(),
        };
        Self { full, display }
    }

    /// Full-resolution image, used when saving.
    pub fn full(&self) -> &DynamicImage {
        &self.full
    }

    pub fn display(&self) -> &LoadedImage {
        &self.display
    }
}
