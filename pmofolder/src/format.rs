//! Registre des formats média indexables.
//!
//! A file is indexable when its extension (case-insensitive) appears in
//! [`FORMATS`]. Everything else is ignored by the indexer without error.

use std::path::Path;

/// Media classification, each group owning one top-level container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentGroup {
    Video,
    Image,
    Audio,
}

impl ContentGroup {
    /// All groups, in the order their containers appear under the root
    pub const ALL: [ContentGroup; 3] = [ContentGroup::Video, ContentGroup::Image, ContentGroup::Audio];

    /// Id of the group's top-level container
    pub fn container_id(&self) -> &'static str {
        match self {
            ContentGroup::Video => "1-videos",
            ContentGroup::Image => "2-images",
            ContentGroup::Audio => "3-audio",
        }
    }

    /// Prefix of every id generated for content of this group
    pub fn item_id_prefix(&self) -> &'static str {
        match self {
            ContentGroup::Video => "video-",
            ContentGroup::Image => "image-",
            ContentGroup::Audio => "audio-",
        }
    }

    pub fn human_name(&self) -> &'static str {
        match self {
            ContentGroup::Video => "Videos",
            ContentGroup::Image => "Images",
            ContentGroup::Audio => "Audio",
        }
    }

    /// Classe UPnP des items du groupe
    pub fn item_class(&self) -> &'static str {
        match self {
            ContentGroup::Video => "object.item.videoItem",
            ContentGroup::Image => "object.item.imageItem",
            ContentGroup::Audio => "object.item.audioItem",
        }
    }
}

/// Format d'un fichier : type MIME et groupe de contenu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaFormat {
    pub extension: &'static str,
    pub mime: &'static str,
    pub group: ContentGroup,
}

impl MediaFormat {
    const fn new(extension: &'static str, mime: &'static str, group: ContentGroup) -> Self {
        Self {
            extension,
            mime,
            group,
        }
    }

    /// `protocolInfo` DLNA pour une ressource servie en HTTP GET
    pub fn protocol_info(&self) -> String {
        pmodidl::http_get_protocol_info(self.mime)
    }
}

use ContentGroup::{Audio, Image, Video};

pub const FORMATS: &[MediaFormat] = &[
    MediaFormat::new("avi", "video/avi", Video),
    MediaFormat::new("mp4", "video/mp4", Video),
    MediaFormat::new("m4v", "video/mp4", Video),
    MediaFormat::new("mkv", "video/x-matroska", Video),
    MediaFormat::new("mov", "video/quicktime", Video),
    MediaFormat::new("flv", "video/x-flv", Video),
    MediaFormat::new("wmv", "video/x-ms-wmv", Video),
    MediaFormat::new("asf", "video/x-ms-asf", Video),
    MediaFormat::new("mpg", "video/mpeg", Video),
    MediaFormat::new("mpeg", "video/mpeg", Video),
    MediaFormat::new("ts", "video/mp2t", Video),
    MediaFormat::new("ogm", "video/ogg", Video),
    MediaFormat::new("webm", "video/webm", Video),
    MediaFormat::new("3gp", "video/3gpp", Video),
    MediaFormat::new("divx", "video/divx", Video),
    MediaFormat::new("jpg", "image/jpeg", Image),
    MediaFormat::new("jpeg", "image/jpeg", Image),
    MediaFormat::new("png", "image/png", Image),
    MediaFormat::new("gif", "image/gif", Image),
    MediaFormat::new("bmp", "image/bmp", Image),
    MediaFormat::new("webp", "image/webp", Image),
    MediaFormat::new("mp3", "audio/mpeg", Audio),
    MediaFormat::new("flac", "audio/flac", Audio),
    MediaFormat::new("ogg", "audio/ogg", Audio),
    MediaFormat::new("oga", "audio/ogg", Audio),
    MediaFormat::new("wav", "audio/wav", Audio),
    MediaFormat::new("m4a", "audio/mp4", Audio),
    MediaFormat::new("aac", "audio/aac", Audio),
    MediaFormat::new("wma", "audio/x-ms-wma", Audio),
    MediaFormat::new("opus", "audio/opus", Audio),
];

/// Identifie le format d'un fichier d'après son extension
pub fn classify(path: &Path) -> Option<&'static MediaFormat> {
    let extension = path.extension()?.to_str()?;
    FORMATS
        .iter()
        .find(|format| format.extension.eq_ignore_ascii_case(extension))
}

pub fn is_indexable(path: &Path) -> bool {
    classify(path).is_some()
}
