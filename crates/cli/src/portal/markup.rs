//! Regex-based scanning of back-office pages.

use std::sync::LazyLock;

use arrivals::protocol::GuestRecord;
use regex_lite::Regex;
use url::Url;

use super::form::{self, Form};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("TAG_RE should compile"));
static SCRIPT_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("SCRIPT_RE should compile"));
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("MULTI_SPACE regex should compile"));
static MULTI_NEWLINE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\n{2,}").expect("MULTI_NEWLINE regex should compile"));
static NAV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<nav[\s>]").expect("NAV_RE should compile"));
static CLASS_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?is)<([a-z][a-z0-9]*)\b[^>]*?\bclass\s*=\s*["']([^"']*)["'][^>]*>"#)
		.expect("CLASS_TAG_RE should compile")
});
static PARAGRAPH_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("PARAGRAPH_RE should compile"));
static STRONG_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?is)<strong\b[^>]*>(.*?)</strong>").expect("STRONG_RE should compile"));
static ROOM_NUMBER_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\(\d+\)\s*(.+)$").expect("ROOM_NUMBER_RE should compile"));
static ROOM_LABEL_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"Type de chambre\s*:\s*([^\n]+)").expect("ROOM_LABEL_RE should compile"));
static PERSONS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*x\b").expect("PERSONS_RE should compile"));

/// Phrases that mark a second-factor prompt, matched against lowercased page text.
const CHALLENGE_KEYWORDS: &[&str] = &[
	"code de vérification",
	"two-factor",
	"2fa",
	"verification code",
	"code envoyé",
];

const CARD_CLASS: &str = "check-in-out-card";
const AMOUNT_LABEL: &str = "Montant dû:";

/// Decode the HTML entities back-office pages use in text.
pub(crate) fn decode_html_entities(s: &str) -> String {
	s.replace("&nbsp;", " ")
		.replace("&#160;", " ")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&apos;", "'")
		.replace("&#x27;", "'")
		.replace("&euro;", "€")
		.replace("&eacute;", "é")
		.replace("&ucirc;", "û")
		.replace("&amp;", "&")
}

/// Collapse runs of spaces and blank lines.
pub(crate) fn collapse_whitespace(s: &str) -> String {
	let result = MULTI_SPACE.replace_all(s, " ");
	MULTI_NEWLINE.replace_all(&result, "\n").to_string()
}

/// Rendered text of an HTML fragment, one block per line.
pub(crate) fn html_to_text(html: &str) -> String {
	let mut result = SCRIPT_RE.replace_all(html, "").to_string();
	for tag in ["p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr"] {
		result = result.replace(&format!("<{tag}"), &format!("\n<{tag}"));
	}

	let result = TAG_RE.replace_all(&result, "");
	let result = decode_html_entities(&result);
	let result = collapse_whitespace(&result);

	result
		.lines()
		.map(str::trim)
		.filter(|l| !l.is_empty())
		.collect::<Vec<_>>()
		.join("\n")
}

/// Single-line text of an HTML fragment.
fn inline_text(html: &str) -> String {
	html_to_text(html).lines().collect::<Vec<_>>().join(" ")
}

/// An authenticated page is off the login routes and shows app chrome.
pub(crate) fn looks_authenticated(url: &Url, html: &str) -> bool {
	let path = url.path().to_ascii_lowercase();
	if path.contains("/login") || path.contains("/signin") {
		return false;
	}
	if NAV_RE.is_match(html) {
		return true;
	}
	CLASS_TAG_RE.captures_iter(html).any(|caps| {
		let classes = caps.get(2).map_or("", |m| m.as_str());
		has_class(classes, "dashboard") || has_class(classes, "admin")
	})
}

/// A page asks for a one-time code when it shows a code input or mentions one.
pub(crate) fn challenge_present(html: &str) -> bool {
	let forms = form::parse_forms(html);
	if forms.iter().any(|f| f.inputs.iter().any(form::Input::is_code_input)) {
		return true;
	}
	if form::loose_inputs(html).iter().any(form::Input::is_code_input) {
		return true;
	}
	let text = inline_text(html).to_lowercase();
	CHALLENGE_KEYWORDS.iter().any(|k| text.contains(k))
}

/// The form carrying the password field.
pub(crate) fn login_form(html: &str) -> Option<Form> {
	form::parse_forms(html).into_iter().find(Form::has_password)
}

/// The form carrying the one-time code field.
pub(crate) fn challenge_form(html: &str) -> Option<Form> {
	form::parse_forms(html)
		.into_iter()
		.find(|f| f.inputs.iter().any(form::Input::is_code_input))
}

/// Arrival cards on the arrivals page. Cards without a guest name are skipped.
pub(crate) fn parse_arrivals(html: &str) -> Vec<GuestRecord> {
	card_segments(html)
		.into_iter()
		.filter_map(parse_card)
		.collect()
}

fn card_segments(html: &str) -> Vec<&str> {
	let starts: Vec<usize> = CLASS_TAG_RE
		.captures_iter(html)
		.filter(|caps| has_class(caps.get(2).map_or("", |m| m.as_str()), CARD_CLASS))
		.filter_map(|caps| caps.get(0).map(|m| m.start()))
		.collect();

	starts
		.iter()
		.enumerate()
		.map(|(i, &start)| {
			let end = starts.get(i + 1).copied().unwrap_or(html.len());
			&html[start..end]
		})
		.collect()
}

fn parse_card(card: &str) -> Option<GuestRecord> {
	let name = class_paragraph(card, "check-in-out-card-title")?;
	if name.is_empty() {
		return None;
	}

	let room_type = class_paragraph(card, "check-in-out-card-room")
		.map(|room| {
			ROOM_NUMBER_RE
				.captures(&room)
				.and_then(|c| c.get(1))
				.map_or_else(|| room.clone(), |m| m.as_str().trim().to_string())
		})
		.filter(|room| !room.is_empty())
		.or_else(|| {
			let text = html_to_text(card);
			ROOM_LABEL_RE
				.captures(&text)
				.and_then(|c| c.get(1))
				.map(|m| m.as_str().trim().to_string())
		})
		.unwrap_or_default();

	let dates = class_element_text(card, "check-in-out-card-date").unwrap_or_default();

	let persons = class_element_text(card, "size0")
		.as_deref()
		.and_then(|t| PERSONS_RE.captures(t))
		.and_then(|c| c.get(1))
		.map(|m| m.as_str().to_string())
		.unwrap_or_default();

	let amount_due = amount(card).unwrap_or_default();

	Some(GuestRecord {
		name,
		room_type,
		persons,
		amount_due,
		dates,
	})
}

fn has_class(classes: &str, class: &str) -> bool {
	classes.split_whitespace().any(|c| c == class)
}

/// Opening tag (name, end offset) of the first element carrying `class`.
fn find_class_tag<'a>(html: &'a str, class: &str) -> Option<(&'a str, usize)> {
	CLASS_TAG_RE.captures_iter(html).find_map(|caps| {
		let classes = caps.get(2)?.as_str();
		if !has_class(classes, class) {
			return None;
		}
		Some((caps.get(1)?.as_str(), caps.get(0)?.end()))
	})
}

/// Text of the first `<p>` inside the element carrying `class`.
fn class_paragraph(html: &str, class: &str) -> Option<String> {
	let (_, after) = find_class_tag(html, class)?;
	let caps = PARAGRAPH_RE.captures(&html[after..])?;
	Some(inline_text(caps.get(1)?.as_str()))
}

/// Text of the element carrying `class`, up to its first closing tag of the same name.
fn class_element_text(html: &str, class: &str) -> Option<String> {
	let (tag, after) = find_class_tag(html, class)?;
	let rest = &html[after..];
	let close = format!("</{}", tag.to_ascii_lowercase());
	let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
	let text = inline_text(&rest[..end]);
	(!text.is_empty()).then_some(text)
}

fn amount(card: &str) -> Option<String> {
	PARAGRAPH_RE.captures_iter(card).find_map(|caps| {
		let inner = caps.get(1)?.as_str();
		let text = inline_text(inner);
		if !text.contains(AMOUNT_LABEL) {
			return None;
		}
		let value = STRONG_RE
			.captures(inner)
			.and_then(|c| c.get(1))
			.map(|m| inline_text(m.as_str()))
			.unwrap_or_else(|| text.replace(AMOUNT_LABEL, "").trim().to_string());
		Some(value)
	})
}
