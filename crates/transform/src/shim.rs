//! Module shim wrapping and unwrapping for code files
//!
//! The remote runtime has no module system of its own; every code file is
//! framed so it can participate in `require`/`module`/`exports` semantics:
//!
//! ```text
//! function _main(module, exports, require) {
//!   ...user code...
//! }
//!
//! __defineModule__(_main);
//! ```
//!
//! Eager-loaded modules register with `__defineModule__(_main, true)`; the
//! flag round-trips through a leading `// @eager` directive in the local
//! body. Top-level platform trigger functions (onOpen, doGet, ...) need a
//! global declaration to be discoverable, so wrapping hoists one bridge per
//! trigger the body defines.

use regex::Regex;
use std::sync::OnceLock;

/// Trigger functions the platform dispatches by global name
const TRIGGER_FUNCTIONS: &[&str] = &[
    "onOpen",
    "onEdit",
    "onInstall",
    "onFormSubmit",
    "doGet",
    "doPost",
];

const EAGER_DIRECTIVE: &str = "// @eager";

fn main_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^function _main\s*\(").unwrap())
}

fn define_module_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"__defineModule__\s*\(\s*_main\s*(?:,\s*(true)\s*)?\)").unwrap())
}

fn trigger_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^(?:function\s+(onOpen|onEdit|onInstall|onFormSubmit|doGet|doPost)\s*\(|\s*(?:module\.)?exports\.(onOpen|onEdit|onInstall|onFormSubmit|doGet|doPost)\s*=)",
        )
        .unwrap()
    })
}

fn dotfile_export_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"module\.exports\s*=\s*("(?:[^"\\]|\\.)*");"#).unwrap())
}

/// Wrap a local code body into the remote module frame
///
/// `module_name` is the remote file name; bridges forward through it.
pub fn wrap_module(module_name: &str, body: &str) -> String {
    let (body, eager) = if body == EAGER_DIRECTIVE {
        ("", true)
    } else if let Some(rest) = body.strip_prefix("// @eager\n") {
        (rest, true)
    } else {
        (body, false)
    };

    let mut out = String::new();
    out.push_str("function _main(module, exports, require) {\n");
    out.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("}\n\n");
    if eager {
        out.push_str("__defineModule__(_main, true);\n");
    } else {
        out.push_str("__defineModule__(_main);\n");
    }

    for trigger in detect_triggers(body) {
        out.push_str(&format!(
            "function {trigger}(e) {{ return require('{module_name}').{trigger}(e); }}\n"
        ));
    }

    out
}

/// Strip the module frame from remote code content
///
/// Content without a recognizable frame passes through unchanged (it was
/// never wrapped, or a human edited it remotely). Hoisted bridges live
/// outside the frame and are dropped with it.
pub fn unwrap_module(content: &str) -> String {
    let Some(header) = main_header_re().find(content) else {
        return content.to_string();
    };
    let Some(define) = define_module_re().captures(content) else {
        return content.to_string();
    };
    let eager = define.get(1).is_some();
    let define_start = define.get(0).unwrap().start();
    if define_start < header.end() {
        return content.to_string();
    }

    let lines: Vec<&str> = content.lines().collect();
    let header_line = content[..header.start()].lines().count();
    let define_line = content[..define_start].lines().count();

    // The header may spread its parameters over several lines; the body
    // starts after the line that closes the parameter list with `{`.
    let mut body_start = None;
    for (i, line) in lines.iter().enumerate().skip(header_line) {
        if i >= define_line {
            break;
        }
        if line.trim_end().ends_with('{') {
            body_start = Some(i + 1);
            break;
        }
    }
    let Some(body_start) = body_start else {
        return content.to_string();
    };

    // Body ends at the last closing brace line before the register call
    let mut body_end = None;
    for i in (body_start..define_line).rev() {
        if lines[i].trim() == "}" {
            body_end = Some(i);
            break;
        }
    }
    let Some(body_end) = body_end else {
        return content.to_string();
    };

    let mut body_lines: Vec<&str> = lines[body_start..body_end].to_vec();

    // Writers that spread the header over several lines also indent the
    // framed body; strip that. Our own frame is single-line and verbatim.
    let foreign_frame = body_start > header_line + 1;
    let indent = if foreign_frame {
        body_lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start_matches(' ').len())
            .min()
            .unwrap_or(0)
    } else {
        0
    };
    if indent > 0 {
        body_lines = body_lines
            .iter()
            .map(|l| if l.len() >= indent { &l[indent..] } else { *l })
            .collect();
    }

    let mut body = body_lines.join("\n");
    if eager {
        body = format!("{EAGER_DIRECTIVE}\n{body}");
    }
    body
}

/// Trigger functions the body declares or exports, in declaration order
pub fn detect_triggers(body: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for caps in trigger_decl_re().captures_iter(body) {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if let Some(canonical) = TRIGGER_FUNCTIONS.iter().find(|t| **t == name) {
            if !found.contains(canonical) {
                found.push(*canonical);
            }
        }
    }
    found
}

/// Wrap raw dotfile text as a string export inside the module frame
///
/// JSON string encoding keeps arbitrary content (backticks, quotes,
/// newlines) safe inside the JavaScript source.
pub fn wrap_dotfile(content: &str) -> String {
    let literal = serde_json::to_string(content).expect("string serialization is infallible");
    format!(
        "function _main(module, exports, require) {{\n  module.exports = {literal};\n}}\n\n__defineModule__(_main);\n"
    )
}

/// Extract raw dotfile text from its string-export frame
///
/// Unframed content passes through; a frame whose export cannot be decoded
/// is an error.
pub fn unwrap_dotfile(content: &str) -> Result<String, String> {
    if !main_header_re().is_match(content) {
        return Ok(content.to_string());
    }
    let caps = dotfile_export_re()
        .captures(content)
        .ok_or_else(|| "no module.exports string literal found".to_string())?;
    serde_json::from_str(&caps[1]).map_err(|e| format!("invalid string literal: {e}"))
}
