//! HTML to readable markdown-style text.

use scraper::{ElementRef, Html, Selector};

/// Block elements rendered as their own paragraph.
const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, pre, blockquote, td";

/// Containers whose text is page chrome rather than content.
const SKIPPED_ANCESTORS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "form", "svg",
];

/// Containers already rendered as a block; nested blocks would repeat text.
const BLOCK_ANCESTORS: &[&str] = &["p", "li", "pre", "blockquote", "td"];

/// Main content areas, tried in order before falling back to `body`.
const CONTENT_SELECTORS: &[&str] = &["main", "article", "[role='main']", "#content"];

/// Convert an HTML document to markdown-style text.
///
/// Headings become `#` lines, list items `- ` lines and `pre` blocks fenced
/// code; everything else is a whitespace-collapsed paragraph. Paragraphs
/// are separated by blank lines.
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(blocks) = Selector::parse(BLOCK_SELECTOR) else {
        return String::new();
    };

    let root = content_root(&document);
    let mut out: Vec<String> = Vec::new();

    if let Some(root) = root {
        if let Some(title) = page_title(&document) {
            let has_h1 = Selector::parse("h1")
                .map(|s| root.select(&s).next().is_some())
                .unwrap_or(false);
            if !has_h1 {
                out.push(format!("# {}", title));
            }
        }

        for element in root.select(&blocks) {
            if has_ancestor(element, SKIPPED_ANCESTORS) || has_ancestor(element, BLOCK_ANCESTORS)
            {
                continue;
            }
            if let Some(block) = render_block(element) {
                out.push(block);
            }
        }

        if out.is_empty() {
            let text = collapse_whitespace(&root.text().collect::<String>());
            if !text.is_empty() {
                out.push(text);
            }
        }
    }

    out.join("\n\n")
}

/// The `<title>` text, if any.
pub fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn content_root(document: &Html) -> Option<ElementRef<'_>> {
    for selector in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector)
            && let Some(element) = document.select(&selector).next()
        {
            return Some(element);
        }
    }
    let body = Selector::parse("body").ok()?;
    document.select(&body).next()
}

fn render_block(element: ElementRef<'_>) -> Option<String> {
    let name = element.value().name();

    if name == "pre" {
        let code = element.text().collect::<String>();
        let code = code.trim_matches('\n');
        if code.trim().is_empty() {
            return None;
        }
        return Some(format!("```\n{}\n```", code));
    }

    let text = collapse_whitespace(&element.text().collect::<String>());
    if text.is_empty() {
        return None;
    }

    Some(match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            format!("{} {}", "#".repeat(level), text)
        }
        "li" => format!("- {}", text),
        "blockquote" => format!("> {}", text),
        _ => text,
    })
}

fn has_ancestor(element: ElementRef<'_>, names: &[&str]) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| names.contains(&a.value().name()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
