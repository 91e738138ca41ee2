//! Plain-text rendering for crawler-equivalent requesters: every course of
//! the requested page with its canonical route, plus links to the other pages.

use std::io::{self, Write};

use anyhow::{Result, anyhow};
use courseplayer_core::config::EmbedConfig;
use courseplayer_core::{
    AnalyticsEvent, AnalyticsSink, Catalog, Config, Course, ListSession, ListView, Mechanism,
    Resolution, Verdict, VideoType, page_route, parse_route, resolve, route_for,
};
use log::info;

/// Print one page of `catalog`, or a single course when `route` is given
pub fn run<W: Write>(
    out: &mut W,
    catalog: &Catalog,
    config: &Config,
    verdict: Verdict,
    page: usize,
    route: Option<&str>,
    analytics: &dyn AnalyticsSink,
) -> Result<()> {
    if let Some(route) = route {
        let (category, name, index) =
            parse_route(route).ok_or_else(|| anyhow!("Not a course route: {}", route))?;
        let course = catalog
            .find(&category, &name)
            .ok_or_else(|| anyhow!("No course '{}' in '{}'", name, category))?;
        print_course(out, course, index.unwrap_or(0), &config.embed)?;
        return Ok(());
    }

    let mut session = ListSession::new(catalog.courses().to_vec(), verdict, config.list_options());
    let shown = session.go_to_page(page);
    info!("Headless listing, page {} of {}", shown, session.total_pages());
    analytics.record(&AnalyticsEvent::PageViewed {
        page: shown,
        mode: session.mode(),
    });
    print_listing(out, &session)?;
    Ok(())
}

pub fn print_listing<W: Write>(out: &mut W, session: &ListSession<Course>) -> io::Result<()> {
    match session.view() {
        ListView::Empty => writeln!(out, "No courses available."),
        ListView::Page {
            items,
            page,
            total_pages,
            window,
            has_prev,
            has_next,
        } => {
            writeln!(
                out,
                "Courses: page {} of {} ({} total)",
                page,
                total_pages,
                session.total()
            )?;
            writeln!(out)?;
            for course in items {
                print_course_line(out, course)?;
            }
            writeln!(out)?;

            let pages: Vec<String> = window
                .iter()
                .map(|&n| {
                    if n == page {
                        format!("[{n}]")
                    } else {
                        page_route(n)
                    }
                })
                .collect();
            writeln!(out, "Pages: {}", pages.join(" "))?;
            if has_prev {
                writeln!(out, "Previous: {}", page_route(page - 1))?;
            }
            if has_next {
                writeln!(out, "Next: {}", page_route(page + 1))?;
            }
            Ok(())
        }
        // a non-crawler verdict only gets the first batch
        ListView::Window { items, .. } => {
            for course in items {
                print_course_line(out, course)?;
            }
            Ok(())
        }
    }
}

fn print_course_line<W: Write>(out: &mut W, course: &Course) -> io::Result<()> {
    let link = match course.redirect_target() {
        Some(url) if course.video_type == VideoType::Redirect => url.to_string(),
        _ => route_for(course, None),
    };
    write!(out, "  {}  [{}]", course.course_name, course.video_type.label())?;
    if let Some(instructor) = &course.instructor_name {
        write!(out, " by {}", instructor)?;
    }
    writeln!(out, "\n    {}", link)
}

/// Course page: the resolved active video and a route to every video
pub fn print_course<W: Write>(
    out: &mut W,
    course: &Course,
    index: usize,
    embed: &EmbedConfig,
) -> io::Result<()> {
    writeln!(out, "{} ({})", course.course_name, course.course_category)?;
    if let Some(des) = &course.des {
        writeln!(out, "{}", des)?;
    }
    writeln!(out)?;

    match resolve(course, index, embed) {
        Resolution::Redirect { url } => writeln!(out, "Continue at {}", url),
        Resolution::NoVideos => writeln!(out, "No videos available for this course."),
        Resolution::Video {
            index,
            title,
            mechanism,
        } => {
            let kind = match &mechanism {
                Mechanism::AdaptiveStream { .. } => "stream",
                Mechanism::Embed { .. } => "embed",
                Mechanism::Archive { .. } => "archive",
                Mechanism::DirectFile { .. } => "file",
                Mechanism::ExternalRedirect { .. } => "link",
            };
            writeln!(out, "Now showing: {} ({}: {})", title, kind, mechanism.playable_url())?;
            writeln!(out)?;
            for (i, video) in course.videos.iter().enumerate() {
                let marker = if i == index { '>' } else { ' ' };
                writeln!(out, "{} {}. {}  {}", marker, i + 1, video.title, route_for(course, Some(i)))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseplayer_core::{ListMode, MemorySink, Video};

    fn course(i: usize) -> Course {
        Course {
            course_name: format!("course {i}"),
            course_category: "dsa".to_string(),
            video_type: VideoType::Hls,
            videos: vec![
                Video {
                    title: "Arrays".to_string(),
                    url: "https://cdn.example/arrays.m3u8".to_string(),
                },
                Video {
                    title: "Lists".to_string(),
                    url: "https://cdn.example/lists.m3u8".to_string(),
                },
            ],
            redirect_url: None,
            des: Some("Data structures".to_string()),
            image_of_course: None,
            instructor_name: Some("Ada".to_string()),
            cost: None,
            audio: None,
            subsection: None,
            homepage: false,
        }
    }

    fn render(catalog: &Catalog, page: usize, route: Option<&str>) -> (String, MemorySink) {
        let sink = MemorySink::default();
        let mut out = Vec::new();
        run(
            &mut out,
            catalog,
            &Config::default(),
            Verdict {
                is_crawler_like: true,
            },
            page,
            route,
            &sink,
        )
        .unwrap();
        (String::from_utf8(out).unwrap(), sink)
    }

    #[test]
    fn test_middle_page_links_both_ways() {
        let catalog = Catalog::new((0..25).map(course).collect(), Vec::new());
        let (text, sink) = render(&catalog, 2, None);

        assert!(text.contains("page 2 of 3 (25 total)"));
        assert!(text.contains("course 12"));
        assert!(text.contains("course 23"));
        assert!(!text.contains("course 24"));
        assert!(text.contains("/dsa/course%2012"));
        assert!(text.contains("Previous: /courses?page=1"));
        assert!(text.contains("Next: /courses?page=3"));
        assert_eq!(
            sink.events(),
            vec![AnalyticsEvent::PageViewed {
                page: 2,
                mode: ListMode::Paginated
            }]
        );
    }

    #[test]
    fn test_out_of_range_page_clamps() {
        let catalog = Catalog::new((0..25).map(course).collect(), Vec::new());
        let (text, _) = render(&catalog, 40, None);
        assert!(text.contains("page 3 of 3"));
        assert!(text.contains("course 24"));
        assert!(!text.contains("Next:"));
    }

    #[test]
    fn test_empty_catalog() {
        let (text, _) = render(&Catalog::default(), 1, None);
        assert_eq!(text.trim(), "No courses available.");
    }

    #[test]
    fn test_course_route_lists_videos() {
        let catalog = Catalog::new(vec![course(1)], Vec::new());
        let (text, _) = render(&catalog, 1, Some("/dsa/course%201/1"));
        assert!(text.contains("Now showing: Lists (stream: https://cdn.example/lists.m3u8)"));
        assert!(text.contains("> 2. Lists  /dsa/course%201/1"));
        assert!(text.contains("  1. Arrays  /dsa/course%201/0"));
    }
}
