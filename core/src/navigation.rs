use crate::catalog::{Course, VideoType};

/// Where the host should take the user next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Leave the app for an external page
    Outbound(String),
    /// In-app address, `/category/course[/video]`
    Route(String),
}

/// Canonical in-app address of a course, optionally at a video
pub fn route_for(course: &Course, video: Option<usize>) -> String {
    let mut route = format!(
        "/{}/{}",
        urlencoding::encode(&course.course_category),
        urlencoding::encode(&course.course_name)
    );
    if let Some(index) = video {
        route.push_str(&format!("/{index}"));
    }
    route
}

/// Plain link to a page of the course listing
pub fn page_route(page: usize) -> String {
    format!("/courses?page={}", page.max(1))
}

/// Intent for opening a course from a listing
pub fn intent_for(course: &Course) -> NavigationIntent {
    match course.video_type {
        VideoType::Redirect => {
            NavigationIntent::Outbound(course.redirect_target().unwrap_or_default().to_string())
        }
        _ => NavigationIntent::Route(route_for(course, None)),
    }
}

/// Parse `/category/course[/video]` back into its parts
pub fn parse_route(route: &str) -> Option<(String, String, Option<usize>)> {
    let mut parts = route.trim_matches('/').split('/');
    let category = urlencoding::decode(parts.next().filter(|s| !s.is_empty())?).ok()?;
    let course = urlencoding::decode(parts.next().filter(|s| !s.is_empty())?).ok()?;
    let video = match parts.next() {
        Some(index) => Some(index.parse().ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((category.into_owned(), course.into_owned(), video))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(name: &str, video_type: VideoType, redirect: Option<&str>) -> Course {
        Course {
            course_name: name.to_string(),
            course_category: "web dev".to_string(),
            video_type,
            videos: Vec::new(),
            redirect_url: redirect.map(str::to_string),
            des: None,
            image_of_course: None,
            instructor_name: None,
            cost: None,
            audio: None,
            subsection: None,
            homepage: false,
        }
    }

    #[test]
    fn test_routes_are_encoded() {
        let c = course("rust & wasm", VideoType::Hls, None);
        assert_eq!(route_for(&c, None), "/web%20dev/rust%20%26%20wasm");
        assert_eq!(route_for(&c, Some(2)), "/web%20dev/rust%20%26%20wasm/2");
        assert_eq!(
            parse_route(&route_for(&c, Some(2))),
            Some(("web dev".to_string(), "rust & wasm".to_string(), Some(2)))
        );
    }

    #[test]
    fn test_redirect_courses_go_outbound() {
        let c = course("partner", VideoType::Redirect, Some("https://partner.example"));
        assert_eq!(
            intent_for(&c),
            NavigationIntent::Outbound("https://partner.example".to_string())
        );
        let c = course("local", VideoType::Mp4, None);
        assert_eq!(intent_for(&c), NavigationIntent::Route("/web%20dev/local".to_string()));
    }

    #[test]
    fn test_page_route() {
        assert_eq!(page_route(3), "/courses?page=3");
        assert_eq!(page_route(0), "/courses?page=1");
    }

    #[test]
    fn test_parse_route_rejects_garbage() {
        assert_eq!(parse_route("/"), None);
        assert_eq!(parse_route("/only"), None);
        assert_eq!(parse_route("/a/b/x"), None);
        assert_eq!(parse_route("/a/b/1/extra"), None);
        assert_eq!(parse_route("a/b"), Some(("a".to_string(), "b".to_string(), None)));
    }
}
