//! Chapters
//!
//! Chapters arrive from the feed with optional end times. The end of a
//! chapter without one is the start of the chapter after it.

use super::now_playing::NowPlayingItem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_official: bool,
}

impl Chapter {
    pub fn new(start_time: f64, title: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time: None,
            title: Some(title.into()),
            image_url: None,
            is_official: true,
        }
    }

    /// View a clip as a pseudo-chapter of its episode
    pub fn from_clip(item: &NowPlayingItem) -> Option<Self> {
        let start_time = item.clip_start_time?;
        item.clip_id.as_ref()?;
        Some(Self {
            start_time,
            end_time: item.clip_end_time,
            title: item.clip_title.clone(),
            image_url: None,
            is_official: item.clip_is_official_chapter,
        })
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start_time && self.end_time.map_or(true, |end| position < end)
    }
}

/// Sort by start time and fill missing end times from the next chapter
pub fn resolve_chapter_end_times(mut chapters: Vec<Chapter>) -> Vec<Chapter> {
    chapters.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    let starts: Vec<f64> = chapters.iter().map(|c| c.start_time).collect();
    for (i, chapter) in chapters.iter_mut().enumerate() {
        if chapter.end_time.is_none() {
            chapter.end_time = starts.get(i + 1).copied();
        }
    }
    chapters
}

/// Index of the chapter playing at `position`
pub fn chapter_at(chapters: &[Chapter], position: f64) -> Option<usize> {
    chapters.iter().rposition(|c| c.contains(position))
}

pub fn next_chapter(chapters: &[Chapter], position: f64) -> Option<&Chapter> {
    chapters.iter().find(|c| c.start_time > position)
}

/// Chapter to go back to: the one before the current chapter
pub fn previous_chapter(chapters: &[Chapter], position: f64) -> Option<&Chapter> {
    let current = chapter_at(chapters, position)?;
    current.checked_sub(1).and_then(|i| chapters.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClipId, EpisodeId, MediaType, PodcastSource};

    fn chapters() -> Vec<Chapter> {
        resolve_chapter_end_times(vec![
            Chapter::new(300.0, "Middle"),
            Chapter::new(0.0, "Intro"),
            Chapter {
                end_time: Some(900.0),
                ..Chapter::new(600.0, "Outro")
            },
        ])
    }

    #[test]
    fn test_end_times_come_from_next_start() {
        let c = chapters();
        assert_eq!(c[0].title.as_deref(), Some("Intro"));
        assert_eq!(c[0].end_time, Some(300.0));
        assert_eq!(c[1].end_time, Some(600.0));
        assert_eq!(c[2].end_time, Some(900.0));
    }

    #[test]
    fn test_navigation() {
        let c = chapters();
        assert_eq!(chapter_at(&c, 10.0), Some(0));
        assert_eq!(chapter_at(&c, 450.0), Some(1));
        assert_eq!(next_chapter(&c, 450.0).unwrap().start_time, 600.0);
        assert!(next_chapter(&c, 650.0).is_none());
        assert_eq!(previous_chapter(&c, 450.0).unwrap().start_time, 0.0);
        assert!(previous_chapter(&c, 10.0).is_none());
    }

    #[test]
    fn test_clip_as_chapter() {
        let clip = NowPlayingItem::clip(
            ClipId::new("c1"),
            Some(EpisodeId::new("e1")),
            PodcastSource::catalog("p1"),
            "https://cdn.example.com/e1.mp3",
            MediaType::Audio,
            30.0,
            Some(60.0),
        )
        .as_official_chapter();

        let chapter = Chapter::from_clip(&clip).unwrap();
        assert!(chapter.is_official);
        assert!(chapter.contains(45.0));
        assert!(!chapter.contains(60.0));
    }
}
