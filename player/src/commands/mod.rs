use std::str::FromStr;

use anyhow::{Result, anyhow};
use ratatui::style::Color;

use crate::app::{App, AppView};

/// A `:` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Jump to a page (1-based)
    Page(usize),
    NextPage,
    PrevPage,
    More,
    /// Select a video of the open course (1-based)
    Video(usize),
    Retry,
    Play,
    Open(String),
    Search(String),
    /// Courses of a category, or of `category/subsection`
    Category(String),
    /// List the loaded categories
    Categories,
    /// Courses with this name in any category
    Course(String),
    Homepage,
    All,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.trim().splitn(2, ' ').collect();
        let cmd = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

        let number = |what: &str| -> Result<usize> {
            let arg = args.ok_or_else(|| anyhow!("{} requires a number", what))?;
            arg.parse::<usize>()
                .map_err(|_| anyhow!("Invalid {} number: {}", what, arg))
        };
        // pages are clamped by the list session, videos are not
        let positive = |what: &str| -> Result<usize> {
            match number(what)? {
                0 => Err(anyhow!("Invalid {} number: 0", what)),
                n => Ok(n),
            }
        };
        let text = |what: &str| -> Result<String> {
            args.map(str::to_string)
                .ok_or_else(|| anyhow!("{} requires an argument", what))
        };

        Ok(match cmd.as_str() {
            "page" | "pg" => Command::Page(number("page")?),
            "next" | "n" => Command::NextPage,
            "prev" | "previous" => Command::PrevPage,
            "more" | "m" => Command::More,
            "video" | "v" => Command::Video(positive("video")?),
            "retry" | "r" => Command::Retry,
            "play" | "p" => Command::Play,
            "open" | "o" => Command::Open(text("open")?),
            "search" | "s" | "/" => Command::Search(text("search")?),
            "category" | "cat" => Command::Category(text("category")?),
            "categories" | "cats" => Command::Categories,
            "course" | "c" => Command::Course(text("course")?),
            "home" => Command::Homepage,
            "all" => Command::All,
            "help" | "h" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "" => return Err(anyhow!("Empty command")),
            _ => return Err(anyhow!("Unknown command: {}", cmd)),
        })
    }
}

/// Command handler for the application
pub struct CommandHandler;

impl CommandHandler {
    /// Parse and execute a command
    pub fn execute(app: &mut App, command_str: &str) -> Result<()> {
        let command: Command = command_str.parse()?;
        match command {
            Command::Page(page) => app.go_to_page(page)?,
            Command::NextPage => app.go_to_page(app.session.current_page() + 1)?,
            Command::PrevPage => app.go_to_page(app.session.current_page().saturating_sub(1))?,
            Command::More => app.load_more()?,
            Command::Video(n) => {
                if app.view != AppView::Player {
                    return Err(anyhow!("Open a course first"));
                }
                app.select_video(n - 1)?;
            }
            Command::Retry => app.retry(),
            Command::Play => app.play_external()?,
            Command::Open(route) => app.open_route(&route)?,
            Command::Search(query) => {
                let results = app.catalog.search(&query);
                let found = results.len();
                if app.view == AppView::Player {
                    app.close_player();
                }
                app.show_courses(results, Some(format!("search: {}", query)));
                app.set_status(
                    format!("{} courses match '{}'", found, query),
                    if found == 0 { Color::Yellow } else { Color::Green },
                );
            }
            Command::Category(name) => {
                let courses = match name.split_once('/') {
                    Some((category, subsection)) => {
                        app.catalog.by_subsection(category.trim(), subsection.trim())
                    }
                    None => app.catalog.by_category(&name),
                };
                if courses.is_empty() {
                    return Err(anyhow!("No courses in category '{}'", name));
                }
                if app.view == AppView::Player {
                    app.close_player();
                }
                app.show_courses(courses, Some(format!("category: {}", name)));
            }
            Command::Categories => {
                let names: Vec<&str> = app
                    .catalog
                    .categories()
                    .iter()
                    .map(|c| c.category_name.as_str())
                    .collect();
                if names.is_empty() {
                    return Err(anyhow!("No categories loaded"));
                }
                app.set_status(format!("Categories: {}", names.join(", ")), Color::Cyan);
            }
            Command::Course(name) => {
                let courses = app.catalog.by_name(&name);
                if courses.is_empty() {
                    return Err(anyhow!("No course named '{}'", name));
                }
                if app.view == AppView::Player {
                    app.close_player();
                }
                app.show_courses(courses, Some(format!("course: {}", name)));
            }
            Command::Homepage => {
                let courses = app.catalog.homepage();
                if app.view == AppView::Player {
                    app.close_player();
                }
                app.show_courses(courses, Some("featured".to_string()));
            }
            Command::All => {
                if app.view == AppView::Player {
                    app.close_player();
                }
                app.show_courses(app.catalog.courses().to_vec(), None);
            }
            Command::Help => app.show_help = true,
            Command::Quit => {
                if app.view == AppView::Player {
                    app.close_player();
                    app.set_status("Back to courses", Color::Blue);
                } else {
                    app.should_quit = true;
                }
            }
        }
        Ok(())
    }
}

/// Handle a command string entered by the user
pub fn handle_command(app: &mut App, command: &str) -> Result<()> {
    CommandHandler::execute(app, command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!("page 3".parse::<Command>().unwrap(), Command::Page(3));
        assert_eq!(" video  2 ".parse::<Command>().unwrap(), Command::Video(2));
        assert_eq!("page 0".parse::<Command>().unwrap(), Command::Page(0));
        assert!("video 0".parse::<Command>().is_err());
        assert!("page x".parse::<Command>().is_err());
        assert!("page".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_text_arguments() {
        assert_eq!(
            "search rust async".parse::<Command>().unwrap(),
            Command::Search("rust async".to_string())
        );
        assert_eq!(
            "open /dsa/intro/1".parse::<Command>().unwrap(),
            Command::Open("/dsa/intro/1".to_string())
        );
        assert!("search   ".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_aliases_and_unknown() {
        assert_eq!("Q".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!("m".parse::<Command>().unwrap(), Command::More);
        assert_eq!("cats".parse::<Command>().unwrap(), Command::Categories);
        assert_eq!(
            "course graphs".parse::<Command>().unwrap(),
            Command::Course("graphs".to_string())
        );
        assert!("".parse::<Command>().is_err());
        assert!("seek 10".parse::<Command>().is_err());
    }
}
