//! README conversion between remote HTML and local Markdown
//!
//! A line-oriented converter covering the constructs README files actually
//! use: headings, paragraphs, emphasis, inline and fenced code, links,
//! unordered lists. Not a general HTML engine; unknown markup passes through
//! as text.

use regex::Regex;
use std::sync::OnceLock;

fn heading_md_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.*)$").unwrap())
}

fn heading_html_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<h([1-6])>(.*?)</h[1-6]>").unwrap())
}

/// Convert local Markdown to the remote HTML representation
pub fn markdown_to_html(markdown: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut list_items: Vec<String> = Vec::new();
    let mut code_lines: Vec<String> = Vec::new();
    let mut in_code = false;

    fn flush_paragraph(paragraph: &mut Vec<String>, blocks: &mut Vec<String>) {
        if !paragraph.is_empty() {
            blocks.push(format!("<p>{}</p>", paragraph.join("<br />")));
            paragraph.clear();
        }
    }
    fn flush_list(list_items: &mut Vec<String>, blocks: &mut Vec<String>) {
        if !list_items.is_empty() {
            let items: String = list_items
                .iter()
                .map(|i| format!("<li>{i}</li>"))
                .collect::<Vec<_>>()
                .join("");
            blocks.push(format!("<ul>{items}</ul>"));
            list_items.clear();
        }
    }

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            if in_code {
                blocks.push(format!(
                    "<pre><code>{}</code></pre>",
                    escape_html(&code_lines.join("\n"))
                ));
                code_lines.clear();
            } else {
                flush_paragraph(&mut paragraph, &mut blocks);
                flush_list(&mut list_items, &mut blocks);
            }
            in_code = !in_code;
            continue;
        }
        if in_code {
            code_lines.push(line.to_string());
            continue;
        }

        if let Some(caps) = heading_md_re().captures(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list_items, &mut blocks);
            let level = caps[1].len();
            blocks.push(format!("<h{level}>{}</h{level}>", inline_to_html(&caps[2])));
        } else if let Some(item) = line.strip_prefix("- ") {
            flush_paragraph(&mut paragraph, &mut blocks);
            list_items.push(inline_to_html(item));
        } else if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list_items, &mut blocks);
        } else {
            flush_list(&mut list_items, &mut blocks);
            paragraph.push(inline_to_html(line));
        }
    }
    // An unclosed fence is treated as if it were closed at end of input
    if in_code && !code_lines.is_empty() {
        blocks.push(format!(
            "<pre><code>{}</code></pre>",
            escape_html(&code_lines.join("\n"))
        ));
    }
    flush_paragraph(&mut paragraph, &mut blocks);
    flush_list(&mut list_items, &mut blocks);

    blocks.join("\n")
}

/// Convert remote HTML back to local Markdown
pub fn html_to_markdown(html: &str) -> String {
    static PRE_RE: OnceLock<Regex> = OnceLock::new();
    static LI_RE: OnceLock<Regex> = OnceLock::new();
    static P_RE: OnceLock<Regex> = OnceLock::new();
    let pre_re =
        PRE_RE.get_or_init(|| Regex::new(r"(?s)<pre><code>(.*?)</code></pre>").unwrap());
    let li_re = LI_RE.get_or_init(|| Regex::new(r"(?s)<li>(.*?)</li>").unwrap());
    let p_re = P_RE.get_or_init(|| Regex::new(r"(?s)<p>(.*?)</p>").unwrap());

    let mut text = html.to_string();

    text = pre_re
        .replace_all(&text, |caps: &regex::Captures| {
            format!("```\n{}\n```\n", unescape_html(&caps[1]))
        })
        .into_owned();

    text = heading_html_re()
        .replace_all(&text, |caps: &regex::Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("{} {}\n", "#".repeat(level), inline_to_markdown(&caps[2]))
        })
        .into_owned();

    text = li_re
        .replace_all(&text, |caps: &regex::Captures| {
            format!("- {}\n", inline_to_markdown(&caps[1]))
        })
        .into_owned();
    text = text.replace("<ul>", "").replace("</ul>", "");

    text = p_re
        .replace_all(&text, |caps: &regex::Captures| {
            format!("{}\n\n", inline_to_markdown(&caps[1]).replace("<br />", "\n"))
        })
        .into_owned();

    let text = inline_to_markdown(&text);

    // Collapse the block separators the replacements accumulated
    let mut out = String::new();
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn inline_to_html(text: &str) -> String {
    static CODE_RE: OnceLock<Regex> = OnceLock::new();
    static BOLD_RE: OnceLock<Regex> = OnceLock::new();
    static EM_RE: OnceLock<Regex> = OnceLock::new();
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    let code_re = CODE_RE.get_or_init(|| Regex::new(r"`([^`]+)`").unwrap());
    let bold_re = BOLD_RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
    let em_re = EM_RE.get_or_init(|| Regex::new(r"\*([^*]+)\*").unwrap());
    let link_re = LINK_RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

    let mut out = escape_html(text);
    out = code_re.replace_all(&out, "<code>$1</code>").into_owned();
    out = bold_re.replace_all(&out, "<strong>$1</strong>").into_owned();
    out = em_re.replace_all(&out, "<em>$1</em>").into_owned();
    out = link_re
        .replace_all(&out, "<a href=\"$2\">$1</a>")
        .into_owned();
    out
}

fn inline_to_markdown(text: &str) -> String {
    static A_RE: OnceLock<Regex> = OnceLock::new();
    let a_re = A_RE.get_or_init(|| Regex::new(r#"(?s)<a href="([^"]+)">(.*?)</a>"#).unwrap());

    let mut out = a_re.replace_all(text, "[$2]($1)").into_owned();
    for (tag, md) in [
        ("strong", "**"),
        ("b", "**"),
        ("em", "*"),
        ("i", "*"),
        ("code", "`"),
    ] {
        out = out.replace(&format!("<{tag}>"), md);
        out = out.replace(&format!("</{tag}>"), md);
    }
    out = out.replace("<br />", "\n").replace("<br/>", "\n").replace("<br>", "\n");
    unescape_html(&out)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
