use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogError;

/// How a course delivers its videos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    /// Adaptive stream, each video url is an HLS manifest
    #[serde(alias = "m3u8", alias = "adaptive")]
    Hls,
    /// Third-party embed addressed by an id in the url path
    #[serde(alias = "video")]
    Embed,
    /// Archive-style embed (`details/<id>` or `embed/<id>`)
    Archive,
    /// Plain media file played as-is
    #[serde(alias = "direct", alias = "file")]
    Mp4,
    /// No player, the whole course is an outbound link
    #[serde(alias = "external")]
    Redirect,
}

impl VideoType {
    pub fn label(self) -> &'static str {
        match self {
            VideoType::Hls => "Adaptive stream",
            VideoType::Embed => "Embedded video",
            VideoType::Archive => "Archive embed",
            VideoType::Mp4 => "Video file",
            VideoType::Redirect => "External course",
        }
    }
}

/// A single entry of a course's playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub url: String,
}

/// A course record as found in `courses.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "courseName")]
    pub course_name: String,
    #[serde(rename = "coursecategory")]
    pub course_category: String,
    #[serde(rename = "videoType")]
    pub video_type: VideoType,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(rename = "redirecturl", default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub des: Option<String>,
    #[serde(rename = "imageofcourse", default)]
    pub image_of_course: Option<String>,
    #[serde(rename = "instructorname", default)]
    pub instructor_name: Option<String>,
    #[serde(default)]
    pub cost: Option<Value>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub subsection: Option<String>,
    #[serde(default)]
    pub homepage: bool,
}

impl Course {
    /// The outbound link of a redirect course, if it has a usable one
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    fn validate(&self) -> Result<(), String> {
        if self.course_name.trim().is_empty() {
            return Err("empty courseName".to_string());
        }
        if self.course_category.trim().is_empty() {
            return Err("empty coursecategory".to_string());
        }
        if self.video_type == VideoType::Redirect && self.redirect_target().is_none() {
            return Err("redirect course without redirecturl".to_string());
        }
        Ok(())
    }
}

/// A category record as found in `categories.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "categoryName")]
    pub category_name: String,
    #[serde(default)]
    pub des: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Read-only course and category collection
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    courses: Vec<Course>,
    categories: Vec<Category>,
}

impl Catalog {
    /// Build a catalog from already parsed records, dropping invalid and
    /// duplicate courses.
    pub fn new(courses: Vec<Course>, categories: Vec<Category>) -> Self {
        let mut seen = HashSet::new();
        let courses = courses
            .into_iter()
            .filter(|course| match course.validate() {
                Ok(()) => true,
                Err(reason) => {
                    warn!("Skipping course '{}': {}", course.course_name, reason);
                    false
                }
            })
            .filter(|course| {
                // same key as `find`, which ignores case
                let key = (
                    course.course_category.to_ascii_lowercase(),
                    course.course_name.to_ascii_lowercase(),
                );
                let fresh = seen.insert(key);
                if !fresh {
                    warn!(
                        "Skipping duplicate course '{}' in '{}'",
                        course.course_name, course.course_category
                    );
                }
                fresh
            })
            .collect();

        Self { courses, categories }
    }

    /// Load `courses.json` and `categories.json` from a directory.
    ///
    /// Malformed records are skipped, a missing file yields an empty
    /// collection. Only an unreadable or non-array file is an error.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let courses = read_records::<Course>(&dir.join("courses.json"))?;
        let categories = read_records::<Category>(&dir.join("categories.json"))?;
        info!(
            "Loaded catalog from {}: {} courses, {} categories",
            dir.display(),
            courses.len(),
            categories.len()
        );
        Ok(Self::new(courses, categories))
    }

    /// Like [`Catalog::load_dir`] but falls back to an empty catalog
    pub fn load_dir_or_empty<P: AsRef<Path>>(dir: P) -> Self {
        match Self::load_dir(&dir) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Catalog unavailable, continuing with an empty one: {}", e);
                Self::default()
            }
        }
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn by_category(&self, category: &str) -> Vec<Course> {
        self.courses
            .iter()
            .filter(|c| c.course_category.eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    pub fn by_name(&self, name: &str) -> Vec<Course> {
        self.courses
            .iter()
            .filter(|c| c.course_name.eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }

    pub fn by_subsection(&self, category: &str, subsection: &str) -> Vec<Course> {
        self.courses
            .iter()
            .filter(|c| c.course_category.eq_ignore_ascii_case(category))
            .filter(|c| {
                c.subsection
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(subsection))
            })
            .cloned()
            .collect()
    }

    /// Courses flagged for the landing page
    pub fn homepage(&self) -> Vec<Course> {
        self.courses.iter().filter(|c| c.homepage).cloned().collect()
    }

    pub fn find(&self, category: &str, name: &str) -> Option<&Course> {
        self.courses.iter().find(|c| {
            c.course_category.eq_ignore_ascii_case(category)
                && c.course_name.eq_ignore_ascii_case(name)
        })
    }

    /// Fuzzy search over course names, best match first
    pub fn search(&self, query: &str) -> Vec<Course> {
        if query.trim().is_empty() {
            return self.courses.clone();
        }

        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &Course)> = self
            .courses
            .iter()
            .filter_map(|c| {
                let haystack = format!("{} {}", c.course_name, c.course_category);
                matcher.fuzzy_match(&haystack, query).map(|score| (score, c))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, c)| c.clone()).collect()
    }
}

fn read_records<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<Vec<T>, CatalogError> {
    if !path.exists() {
        debug!("{} not found, treating as empty", path.display());
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.clone(),
        source,
    })?;
    let values: Vec<Value> = serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.clone(),
        source,
    })?;

    let mut records = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(e) => warn!("{}: skipping record {}: {}", path.display(), i, e),
        }
    }
    Ok(records)
}
