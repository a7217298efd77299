use crate::error::{CoreError, Result};
use crate::types::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where a channel's catalog payload comes from.
pub trait CatalogSource {
    /// Raw JSON payload for the channel. `CoreError::NotFound` when the
    /// channel has no data.
    fn fetch(&self, channel_id: &str) -> Result<String>;
}

/// Reads `<root>/<channel_id>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CatalogSource for DirectorySource {
    fn fetch(&self, channel_id: &str) -> Result<String> {
        if !is_plain_channel_id(channel_id) {
            return Err(CoreError::NotFound(channel_id.to_string()));
        }
        let path = self.root.join(format!("{}.json", channel_id));
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(channel_id.to_string()),
            _ => CoreError::Io(e),
        })
    }
}

pub(crate) fn is_plain_channel_id(channel_id: &str) -> bool {
    !channel_id.is_empty()
        && !channel_id.contains(['/', '\\'])
        && !channel_id.contains("..")
}

// Wire form before validation. Signed so negative offsets can be reported.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawClipRecord {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default, alias = "VideoTitle")]
    title: Option<String>,
    start: i64,
    #[serde(default)]
    end: i64,
    #[serde(default)]
    recommenders: Vec<String>,
}

impl RawClipRecord {
    fn validate(self, position: usize) -> Result<ClipRecord> {
        let video_id = match self.video_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(CoreError::Malformed(format!(
                    "clip {} has no video id",
                    position
                )))
            }
        };
        let start = to_seconds(self.start)
            .filter(|start| *start <= Seconds::MAX_OFFSET)
            .ok_or_else(|| {
            CoreError::Malformed(format!("clip {} has invalid start {}", position, self.start))
        })?;
        let end = to_seconds(self.end).ok_or_else(|| {
            CoreError::Malformed(format!("clip {} has invalid end {}", position, self.end))
        })?;
        if !end.is_zero() && end <= start {
            return Err(CoreError::Malformed(format!(
                "clip {} ends at {} before it starts at {}",
                position, end.0, start.0
            )));
        }
        Ok(ClipRecord {
            video_id,
            title: self.title.unwrap_or_default(),
            start,
            end,
            recommenders: self.recommenders,
        })
    }
}

fn to_seconds(value: i64) -> Option<Seconds> {
    u32::try_from(value).ok().map(Seconds)
}

/// Ordered clip list for one channel, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    channel_id: String,
    clips: Vec<ClipRecord>,
}

impl Catalog {
    /// Build a catalog from already validated records. Fails on an empty list.
    pub fn new(channel_id: impl Into<String>, clips: Vec<ClipRecord>) -> Result<Self> {
        if clips.is_empty() {
            return Err(CoreError::Malformed("catalog is empty".into()));
        }
        Ok(Self {
            channel_id: channel_id.into(),
            clips,
        })
    }

    /// Fetch and parse the catalog for `channel_id`.
    pub fn load(source: &dyn CatalogSource, channel_id: &str) -> Result<Self> {
        let payload = source.fetch(channel_id)?;
        let catalog = Self::from_json(channel_id, &payload)?;
        tracing::info!(
            "Loaded catalog for {} with {} clips",
            channel_id,
            catalog.len()
        );
        Ok(catalog)
    }

    pub fn from_json(channel_id: &str, payload: &str) -> Result<Self> {
        let raw: Vec<RawClipRecord> = serde_json::from_str(payload)
            .map_err(|e| CoreError::Malformed(e.to_string()))?;
        let clips = raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.validate(i))
            .collect::<Result<Vec<_>>>()?;
        Self::new(channel_id, clips)
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn at(&self, index: usize) -> Result<&ClipRecord> {
        self.clips.get(index).ok_or(CoreError::IndexOutOfRange {
            index,
            len: self.clips.len(),
        })
    }

    pub fn clips(&self) -> &[ClipRecord] {
        &self.clips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAYLOAD: &str = r#"[
        {"VideoId":"A","Title":"first","Start":0,"End":0,"Recommenders":["x"]},
        {"VideoId":"A","VideoTitle":"second","Start":50,"End":80,"Recommenders":["y","x"]},
        {"VideoId":"B","Start":5,"End":0}
    ]"#;

    #[test]
    fn parses_wire_format_with_title_alias() {
        let catalog = Catalog::from_json("chan", PAYLOAD).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.channel_id(), "chan");
        assert_eq!(catalog.at(1).unwrap().title, "second");
        assert_eq!(catalog.at(1).unwrap().end, Seconds(80));
        let third = catalog.at(2).unwrap();
        assert_eq!(third.title, "");
        assert!(third.recommenders.is_empty());
    }

    #[test]
    fn at_out_of_range() {
        let catalog = Catalog::from_json("chan", PAYLOAD).unwrap();
        match catalog.at(3) {
            Err(CoreError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 3);
                assert_eq!(len, 3);
            }
            other => panic!("expected IndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn empty_catalog_is_malformed() {
        assert!(matches!(
            Catalog::from_json("chan", "[]"),
            Err(CoreError::Malformed(_))
        ));
    }

    #[test]
    fn unparsable_payload_is_malformed() {
        assert!(matches!(
            Catalog::from_json("chan", "{not json"),
            Err(CoreError::Malformed(_))
        ));
        assert!(matches!(
            Catalog::from_json("chan", r#"{"VideoId":"A"}"#),
            Err(CoreError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_missing_video_id() {
        let err = Catalog::from_json("chan", r#"[{"Title":"t","Start":0,"End":0}]"#).unwrap_err();
        assert!(err.to_string().contains("clip 0 has no video id"));
        assert!(Catalog::from_json("chan", r#"[{"VideoId":" ","Start":0}]"#).is_err());
    }

    #[test]
    fn rejects_negative_start() {
        let err = Catalog::from_json(
            "chan",
            r#"[{"VideoId":"A","Start":0},{"VideoId":"A","Start":-5,"End":0}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("clip 1 has invalid start -5"));
    }

    #[test]
    fn rejects_start_past_offset_limit() {
        let payload = format!(r#"[{{"VideoId":"A","Start":{},"End":0}}]"#, u32::MAX);
        let err = Catalog::from_json("chan", &payload).unwrap_err();
        assert!(err.to_string().contains("clip 0 has invalid start 4294967295"));

        let payload = format!(r#"[{{"VideoId":"A","Start":{}}}]"#, Seconds::MAX_OFFSET.0);
        assert!(Catalog::from_json("chan", &payload).is_ok());
    }

    #[test]
    fn rejects_end_before_start() {
        let err =
            Catalog::from_json("chan", r#"[{"VideoId":"A","Start":30,"End":30}]"#).unwrap_err();
        assert!(matches!(err, CoreError::Malformed(_)));
    }

    #[test]
    fn directory_source_loads_channel_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("chan.json"), PAYLOAD).unwrap();

        let source = DirectorySource::new(dir.path());
        let catalog = Catalog::load(&source, "chan").unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn directory_source_missing_channel_is_not_found() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(
            Catalog::load(&source, "nobody"),
            Err(CoreError::NotFound(id)) if id == "nobody"
        ));
    }

    #[test]
    fn directory_source_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(source.fetch("../etc"), Err(CoreError::NotFound(_))));
        assert!(matches!(source.fetch("a/b"), Err(CoreError::NotFound(_))));
        assert!(matches!(source.fetch(""), Err(CoreError::NotFound(_))));
    }
}
