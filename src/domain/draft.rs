use std::path::Path;

/// A file attached to an outgoing post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    /// Read a local file, guessing the mime type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            mime_type: guess_mime(&file_name).to_string(),
            file_name,
            bytes,
        })
    }
}

fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// The post being replied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Backend-native id of the post.
    pub native_id: String,
    /// Author of the post. Fanfou wants it alongside the status id.
    pub user_id: Option<String>,
}

/// Content to publish on one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub content: String,
    pub media: Option<MediaUpload>,
    pub reply_to: Option<ReplyTarget>,
}

impl PostDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_media(mut self, media: MediaUpload) -> Self {
        self.media = Some(media);
        self
    }

    pub fn replying_to(mut self, target: ReplyTarget) -> Self {
        self.reply_to = Some(target);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("cat.JPG"), "image/jpeg");
        assert_eq!(guess_mime("clip.mp4"), "video/mp4");
        assert_eq!(guess_mime("README"), "application/octet-stream");
    }

    #[test]
    fn test_media_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let media = MediaUpload::from_path(&path).unwrap();
        assert_eq!(media.file_name, "photo.png");
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.bytes, b"\x89PNG");
    }

    #[test]
    fn test_draft_builders() {
        let draft = PostDraft::new("hi").replying_to(ReplyTarget {
            native_id: "42".into(),
            user_id: None,
        });
        assert_eq!(draft.content, "hi");
        assert!(draft.media.is_none());
        assert_eq!(draft.reply_to.unwrap().native_id, "42");
    }
}
