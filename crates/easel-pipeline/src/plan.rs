use std::sync::OnceLock;

use regex::Regex;

/// One slide's worth of a lesson plan, carved out by its heading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanSection {
    pub title: String,
    pub body: String,
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Matches "### Slide 1: Title", "## Slide 2 - Title", "#### Slide 3".
    RE.get_or_init(|| {
        Regex::new(r"(?mi)^#{1,6}\s*slide\b\s*(\d+)?\s*[:.\-]?\s*(.*)$").expect("valid heading regex")
    })
}

/// Split a lesson-plan text into per-slide sections, preserving the plan's
/// own ordering. A plan with no recognizable slide headings becomes a
/// single section covering the whole plan.
pub fn parse_plan(plan: &str) -> Vec<PlanSection> {
    let matches: Vec<_> = heading_re().captures_iter(plan).collect();

    if matches.is_empty() {
        let title = plan
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim_start_matches('#').trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Slide 1".to_string());
        return vec![PlanSection {
            title,
            body: plan.trim().to_string(),
        }];
    }

    let spans: Vec<(usize, usize, String)> = matches
        .iter()
        .enumerate()
        .map(|(idx, caps)| {
            let whole = caps.get(0).expect("match group 0");
            let title = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("Slide {}", idx + 1));
            (whole.start(), whole.end(), title)
        })
        .collect();

    spans
        .iter()
        .enumerate()
        .map(|(idx, (start, _, title))| {
            let end = spans.get(idx + 1).map_or(plan.len(), |next| next.0);
            PlanSection {
                title: title.clone(),
                body: plan[*start..end].trim().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_slide_headings() {
        let plan = "### Slide 1: Intro\nWhat dinosaurs are.\n\n### Slide 2: Details\nKinds of dinosaurs.\n";
        let sections = parse_plan(plan);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Intro");
        assert!(sections[0].body.contains("What dinosaurs are."));
        assert!(!sections[0].body.contains("Kinds of dinosaurs."));
        assert_eq!(sections[1].title, "Details");
        assert!(sections[1].body.contains("Kinds of dinosaurs."));
    }

    #[test]
    fn order_follows_the_plan_not_the_numbers() {
        let plan = "### Slide 2: Second heading first\nbody a\n### Slide 1: First heading last\nbody b\n";
        let sections = parse_plan(plan);
        assert_eq!(sections[0].title, "Second heading first");
        assert_eq!(sections[1].title, "First heading last");
    }

    #[test]
    fn heading_without_number_or_title_gets_fallback() {
        let plan = "## Slide\nsomething\n### Slide 2\nmore\n";
        let sections = parse_plan(plan);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Slide 1");
        assert_eq!(sections[1].title, "Slide 2");
    }

    #[test]
    fn plan_without_headings_becomes_single_section() {
        let plan = "A lesson about volcanoes.\nCover eruptions and magma.";
        let sections = parse_plan(plan);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "A lesson about volcanoes.");
        assert_eq!(sections[0].body, plan.trim());
    }

    #[test]
    fn dash_and_dot_separators_accepted() {
        let plan = "### Slide 1 - Opening\nx\n### Slide 2. Closing\ny\n";
        let sections = parse_plan(plan);
        assert_eq!(sections[0].title, "Opening");
        assert_eq!(sections[1].title, "Closing");
    }

    #[test]
    fn section_body_includes_heading_line() {
        let plan = "### Slide 1: Intro\ncontent";
        let sections = parse_plan(plan);
        assert!(sections[0].body.starts_with("### Slide 1: Intro"));
    }
}
