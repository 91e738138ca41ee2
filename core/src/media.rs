mod embed;
mod hls;

pub use embed::{HelperStatus, SdkLoader, global_sdk_loader};
pub use hls::{HlsEngine, HlsEngineFactory, parse_manifest};

use log::debug;

use crate::catalog::{Course, VideoType};
use crate::config::EmbedConfig;

/// Path marker that precedes the id of a third-party embed url
pub const EMBED_MARKER: &str = "video/";
/// Markers that precede the id of an archive item url
pub const ARCHIVE_MARKERS: [&str; 2] = ["details/", "embed/"];

/// Concrete delivery mechanism of one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mechanism {
    /// HLS manifest handed to the playback session controller
    AdaptiveStream { manifest: String },
    /// Third-party player addressed by an id taken from the url path
    Embed { id: String, embed_url: String },
    /// Archive item player
    Archive { id: String, embed_url: String },
    /// Media file used verbatim
    DirectFile { url: String },
    /// No playback surface, leave the app
    ExternalRedirect { url: String },
}

impl Mechanism {
    /// Reference an external player can open for this mechanism
    pub fn playable_url(&self) -> &str {
        match self {
            Mechanism::AdaptiveStream { manifest } => manifest,
            Mechanism::Embed { embed_url, .. } => embed_url,
            Mechanism::Archive { embed_url, .. } => embed_url,
            Mechanism::DirectFile { url } => url,
            Mechanism::ExternalRedirect { url } => url,
        }
    }
}

/// Outcome of resolving a course at a video index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The course is an outbound link, no player is rendered
    Redirect { url: String },
    /// The course has no videos to play
    NoVideos,
    Video {
        index: usize,
        title: String,
        mechanism: Mechanism,
    },
}

/// Resolve the delivery mechanism for `course` at `index`.
///
/// Never fails: indices past the end clamp to the last video and
/// unrecognized urls degrade to best-effort identifiers.
pub fn resolve(course: &Course, index: usize, embed: &EmbedConfig) -> Resolution {
    if course.video_type == VideoType::Redirect {
        let url = course.redirect_target().unwrap_or_default().to_string();
        return Resolution::Redirect { url };
    }

    let Some(last) = course.videos.len().checked_sub(1) else {
        return Resolution::NoVideos;
    };
    let index = index.min(last);
    let video = &course.videos[index];
    let url = video.url.trim();

    let mechanism = match course.video_type {
        VideoType::Hls => Mechanism::AdaptiveStream {
            manifest: url.to_string(),
        },
        VideoType::Embed => {
            let id = extract_embed_id(url);
            Mechanism::Embed {
                embed_url: fill_template(&embed.player_url, &id),
                id,
            }
        }
        VideoType::Archive => {
            let id = extract_archive_id(url);
            Mechanism::Archive {
                embed_url: fill_template(&embed.archive_url, &id),
                id,
            }
        }
        VideoType::Mp4 => Mechanism::DirectFile {
            url: url.to_string(),
        },
        // handled above, kept so a new variant fails to compile here
        VideoType::Redirect => Mechanism::ExternalRedirect {
            url: course.redirect_target().unwrap_or_default().to_string(),
        },
    };
    debug!(
        "Resolved '{}' video {} as {:?}",
        course.course_name, index, mechanism
    );

    Resolution::Video {
        index,
        title: video.title.clone(),
        mechanism,
    }
}

/// Id of an id-in-path embed url.
///
/// Takes the path component after [`EMBED_MARKER`] without query, fragment
/// or extension. Without the marker the whole input minus its extension is
/// taken to be the id already.
pub fn extract_embed_id(url: &str) -> String {
    let candidate = url
        .find(EMBED_MARKER)
        .map(|pos| path_component(&url[pos + EMBED_MARKER.len()..]))
        .map(strip_extension)
        .filter(|id| !id.is_empty());

    match candidate {
        Some(id) => id.to_string(),
        None => strip_extension(url).to_string(),
    }
}

/// Id of an archive item url (`details/<id>` or `embed/<id>`).
///
/// Query and fragment are dropped. Without either marker the url is
/// returned unchanged.
pub fn extract_archive_id(url: &str) -> String {
    ARCHIVE_MARKERS
        .iter()
        .find_map(|marker| url.find(marker).map(|pos| &url[pos + marker.len()..]))
        .map(path_component)
        .filter(|id| !id.is_empty())
        .unwrap_or(url)
        .to_string()
}

/// Leading path component, cut at the first `/`, `?` or `#`
fn path_component(rest: &str) -> &str {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// Drop a trailing `.ext` from the last path component. The host of an
/// absolute url is never a path component.
fn strip_extension(s: &str) -> &str {
    let path_start = match s.find("://") {
        Some(scheme_end) => match s[scheme_end + 3..].find('/') {
            Some(i) => scheme_end + 3 + i,
            None => return s,
        },
        None => 0,
    };
    let last_slash = s[path_start..]
        .rfind('/')
        .map_or(path_start, |i| path_start + i + 1);
    match s[last_slash..].rfind('.') {
        Some(dot) if dot > 0 => &s[..last_slash + dot],
        _ => s,
    }
}

fn fill_template(template: &str, id: &str) -> String {
    template.replace("{id}", &urlencoding::encode(id))
}
